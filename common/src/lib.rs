//! Leaf Doctor Common Library
//!
//! CLIとテストで共有される診断パイプラインの純粋ロジック
//! （検証・プロンプト・応答解釈・整形）

pub mod error;
pub mod format;
pub mod language;
pub mod parser;
pub mod prompts;
pub mod types;
pub mod validate;

pub use error::{Error, Result, ValidationError};
pub use format::{
    format_diagnosis, format_text, FormattedDiagnosis, FormattedLine, FormattedSection,
    InlineSpan, LineKind,
};
pub use language::Language;
pub use parser::{
    extract_json_object, interpret_response, interpret_response_with_stage, normalize_text,
    InterpretStage,
};
pub use prompts::{build_diagnosis_prompt, build_request};
pub use types::{AnalysisRequest, DiagnosisField, DiagnosisResult, ImageAsset};
pub use validate::{validate_image, MAX_IMAGE_BYTES};
