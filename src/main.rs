use clap::Parser;
use dialoguer::Select;
use indicatif::{ProgressBar, ProgressStyle};
use leaf_doctor::analyzer::{GeminiClient, Pipeline, PipelineState, RetryPolicy, StartOutcome};
use leaf_doctor::cli::{Cli, Commands, OutputFormat};
use leaf_doctor::config::Config;
use leaf_doctor::error::{DiagnosisError, Result};
use leaf_doctor::render::{render_html, render_text, DiagnosisReport};
use leaf_doctor::{loader, logging};
use leaf_doctor_common::Language;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Diagnose {
            image,
            language,
            format,
            output,
            preview,
        } => {
            let language = match language {
                Some(language) => language,
                None => choose_language(config.default_language)?,
            };
            if let Err(e) = diagnose(&config, &image, language, format, output, preview).await {
                if e.is_transient() {
                    eprintln!("⚠ 一時的な障害です。しばらくしてから再実行してください");
                }
                return Err(e);
            }
        }

        Commands::Languages => {
            println!("{:<10} {:<12} Native", "Code", "Name");
            for language in Language::ALL {
                println!(
                    "{:<10} {:<12} {}",
                    language.code(),
                    language.name(),
                    language.native_name()
                );
            }
        }

        Commands::Config {
            set_api_key,
            set_language,
            show,
        } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(language) = set_language {
                config.set_default_language(language)?;
                println!("✔ 既定の診断言語: {}", language.prompt_name());
            }

            if show {
                println!("設定 ({}):", Config::config_path()?.display());
                println!("  モデル: {}", config.model);
                println!("  エンドポイント: {}", config.base_url);
                println!("  温度: {}", config.temperature);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  既定の言語: {}", config.default_language.prompt_name());
                let key_status = if config.get_api_key().is_ok() {
                    "設定済み"
                } else {
                    "未設定"
                };
                println!("  APIキー: {}", key_status);
            }
        }
    }

    Ok(())
}

/// 言語未指定時: 端末なら選択肢を出し、そうでなければ既定値
fn choose_language(default: Language) -> Result<Language> {
    if !std::io::stdin().is_terminal() || !std::io::stderr().is_terminal() {
        return Ok(default);
    }

    let items: Vec<String> = Language::ALL.iter().map(Language::prompt_name).collect();
    let default_index = Language::ALL
        .iter()
        .position(|l| *l == default)
        .unwrap_or(0);

    let index = Select::new()
        .with_prompt("Diagnosis language")
        .items(&items)
        .default(default_index)
        .interact()
        .map_err(|e| DiagnosisError::Config(format!("言語選択に失敗: {}", e)))?;

    Ok(Language::ALL[index])
}

async fn diagnose(
    config: &Config,
    image: &Path,
    language: Language,
    format: OutputFormat,
    output: Option<PathBuf>,
    preview_path: Option<PathBuf>,
) -> Result<()> {
    let client = GeminiClient::from_config(config)?;
    let pipeline = Pipeline::new(client, RetryPolicy::default());
    pipeline.set_language(language);

    let candidate = loader::read_candidate(image).await?;
    let file_name = candidate.file_name.clone();
    let preview = pipeline.select_image(candidate)?;

    if let Some(path) = preview_path {
        match preview.as_ref().and_then(|p| p.png_bytes()) {
            Some(bytes) => {
                std::fs::write(&path, bytes)?;
                eprintln!("✔ プレビューを保存: {}", path.display());
            }
            None => eprintln!("⚠ プレビューを生成できませんでした"),
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("{} ({})", PipelineState::Analyzing, language.name()));

    // 状態変化をスピナーに反映
    let mut state_rx = pipeline.subscribe();
    let watcher_spinner = spinner.clone();
    let watcher = tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            watcher_spinner.set_message(state.to_string());
        }
    });

    let outcome = pipeline.start().await;
    spinner.finish_and_clear();
    watcher.abort();

    let diagnosis = match outcome? {
        StartOutcome::Completed(diagnosis) => diagnosis,
        StartOutcome::NotReady => return Err(DiagnosisError::NoImageSelected),
        StartOutcome::Ignored | StartOutcome::Discarded => return Ok(()),
    };

    let asset = pipeline.image().ok_or(DiagnosisError::NoImageSelected)?;
    let to_terminal = output.is_none() && std::io::stdout().is_terminal();
    let rendered = match format {
        OutputFormat::Text => render_text(&diagnosis, to_terminal),
        OutputFormat::Html => render_html(&diagnosis.formatted),
        OutputFormat::Json => DiagnosisReport::new(&file_name, &asset, &diagnosis).to_json()?,
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            eprintln!("✔ 診断結果を保存: {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
