use crate::error::{DiagnosisError, Result};
use leaf_doctor_common::Language;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// APIキーを読む環境変数（先頭優先）
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    #[serde(deserialize_with = "language_or_default")]
    pub default_language: Language,
}

/// 未知の言語コードは English として読む
fn language_or_default<'de, D>(deserializer: D) -> std::result::Result<Language, D::Error>
where
    D: Deserializer<'de>,
{
    let code = Option::<String>::deserialize(deserializer)?;
    Ok(match code {
        Some(code) => {
            if Language::from_code(&code).is_none() {
                tracing::warn!(%code, "unknown default_language in config; using English");
            }
            Language::from_code_or_default(&code)
        }
        None => Language::default(),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            // 低温度で安定した診断を得る
            temperature: 0.2,
            timeout_seconds: 120,
            default_language: Language::English,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DiagnosisError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("leaf-doctor").join("config.json"))
    }

    /// APIキーを取得（環境変数を優先）
    pub fn get_api_key(&self) -> Result<String> {
        let from_env = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|key| !key.trim().is_empty());

        resolve_api_key(from_env, self.api_key.as_deref())
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn set_default_language(&mut self, language: Language) -> Result<()> {
        self.default_language = language;
        self.save()
    }
}

fn resolve_api_key(from_env: Option<String>, from_file: Option<&str>) -> Result<String> {
    from_env
        .or_else(|| from_file.map(str::to_string))
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or(DiagnosisError::MissingApiKey)
}
