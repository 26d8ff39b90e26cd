//! エラー型定義

use thiserror::Error;

/// 画像検証エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Image size should be less than 10MB (got {size} bytes)")]
    TooLarge { size: u64 },

    #[error("Please select a valid image file (JPG, PNG, WEBP), got: {0}")]
    UnsupportedType(String),
}

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error = Error::Json(json_error);
        let display = format!("{}", error);
        assert!(display.contains("JSON error"));
    }

    #[test]
    fn test_error_display_parse() {
        let error = Error::Parse("JSONオブジェクトが見つかりません".to_string());
        assert_eq!(
            format!("{}", error),
            "Parse error: JSONオブジェクトが見つかりません"
        );
    }

    #[test]
    fn test_validation_error_too_large_message() {
        let error = ValidationError::TooLarge { size: 11 * 1024 * 1024 };
        let display = format!("{}", error);
        assert!(display.contains("less than 10MB"));
        assert!(display.contains("11534336"));
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let error: Error = ValidationError::UnsupportedType("text/plain".into()).into();
        assert!(matches!(error, Error::Validation(_)));
        assert!(format!("{}", error).contains("text/plain"));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
