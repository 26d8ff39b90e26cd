use clap::{Parser, Subcommand};
use leaf_doctor_common::Language;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "leaf-doctor")]
#[command(about = "葉の写真から植物の病気を診断するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 葉の写真を診断
    Diagnose {
        /// 画像ファイルのパス
        #[arg(required = true)]
        image: PathBuf,

        /// 診断言語（省略時は設定値、端末なら選択）
        #[arg(short, long)]
        language: Option<Language>,

        /// 出力形式 (text/html/json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// 出力ファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// プレビューPNGの保存先
        #[arg(long)]
        preview: Option<PathBuf>,
    },

    /// 対応言語の一覧
    Languages,

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 既定の診断言語を設定
        #[arg(long)]
        set_language: Option<Language>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Html,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "html" => Ok(OutputFormat::Html),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use text, html, or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Html => write!(f, "html"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
