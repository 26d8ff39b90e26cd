//! Gemini API クライアント
//!
//! generateContent に プロンプト＋画像1枚 を送り、先頭候補のテキストを返す。

use super::transport::{AttemptOutcome, Transport};
use crate::config::Config;
use crate::error::{DiagnosisError, Result};
use async_trait::async_trait;
use leaf_doctor_common::AnalysisRequest;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 候補テキストが無い場合のメッセージ
pub const NO_ANALYSIS_MESSAGE: &str = "No analysis generated from the API";

/// エラー本文に message が無い場合のメッセージ
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Gemini APIリクエスト
#[derive(Debug, Serialize)]
pub(crate) struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

impl GeminiRequest {
    pub(crate) fn from_analysis(request: &AnalysisRequest, temperature: f32) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: request.prompt_text.clone(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.image.media_type().to_string(),
                            data: request.image.base64().to_string(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig { temperature },
        }
    }
}

/// Gemini APIレスポンス
#[derive(Debug, Default, Deserialize)]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    /// 先頭候補の先頭パートのテキスト
    pub(crate) fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

/// エラーレスポンス `{"error": {"message": ...}}`
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

pub(crate) fn error_message_from_body(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string())
}

/// 成功レスポンス本文を試行結果に変換
pub(crate) fn outcome_from_success_body(body: &str) -> AttemptOutcome {
    match serde_json::from_str::<GeminiResponse>(body) {
        Ok(response) => match response.first_text() {
            Some(text) => AttemptOutcome::Success(text.to_string()),
            None => AttemptOutcome::Fatal {
                status: StatusCode::OK.as_u16(),
                message: NO_ANALYSIS_MESSAGE.to_string(),
            },
        },
        Err(e) => AttemptOutcome::Fatal {
            status: StatusCode::OK.as_u16(),
            message: format!("{}: {}", NO_ANALYSIS_MESSAGE, e),
        },
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    /// 設定から生成
    ///
    /// APIキーが無くても生成はできる。送信前の `check_ready` で弾く。
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| DiagnosisError::Config(format!("HTTPクライアント初期化失敗: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.get_api_key().ok(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl Transport for GeminiClient {
    fn check_ready(&self) -> Result<()> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(DiagnosisError::MissingApiKey),
        }
    }

    async fn send(&self, request: &AnalysisRequest) -> AttemptOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return AttemptOutcome::Fatal {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                message: DiagnosisError::MissingApiKey.to_string(),
            };
        };

        let body = GeminiRequest::from_analysis(request, self.temperature);
        tracing::debug!(
            model = %self.model,
            media_type = request.image.media_type(),
            size = request.image.size(),
            "sending generateContent request"
        );

        let response = match self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return AttemptOutcome::Unreachable(e.to_string()),
        };

        // 503 は本文を読まずに判定する
        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::debug!(status = status.as_u16(), "service overloaded");
            return AttemptOutcome::Overloaded;
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return AttemptOutcome::Unreachable(e.to_string()),
        };
        tracing::debug!(status = status.as_u16(), bytes = text.len(), "response received");

        if !status.is_success() {
            AttemptOutcome::Fatal {
                status: status.as_u16(),
                message: error_message_from_body(&text),
            }
        } else {
            outcome_from_success_body(&text)
        }
    }
}
