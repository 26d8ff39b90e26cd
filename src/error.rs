use leaf_doctor_common::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("Gemini API key not configured. Set GEMINI_API_KEY or run `leaf-doctor config --set-api-key YOUR_KEY`")]
    MissingApiKey,

    #[error("Please select an image first")]
    NoImageSelected,

    #[error("An analysis is already in progress")]
    Busy,

    #[error("The AI service is currently busy. Please try again in a few minutes.")]
    Overloaded,

    #[error("Analysis failed: could not reach the AI service ({0})")]
    Unreachable(String),

    #[error("Analysis failed: API Error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] leaf_doctor_common::Error),
}

impl DiagnosisError {
    /// リトライ後の「混雑・到達不能」か
    pub fn is_transient(&self) -> bool {
        matches!(self, DiagnosisError::Overloaded | DiagnosisError::Unreachable(_))
    }
}

pub type Result<T> = std::result::Result<T, DiagnosisError>;
