//! 葉の診断
//!
//! - `transport`: 1回の送信の抽象
//! - `gemini`: Gemini API 実装
//! - `retry`: 過負荷・接続失敗のリトライ
//! - `pipeline`: 検証から整形までの状態機械

pub mod gemini;
pub mod pipeline;
pub mod retry;
pub mod transport;

pub use gemini::GeminiClient;
pub use pipeline::{Diagnosis, Pipeline, PipelineState, RunId, StartOutcome};
pub use retry::{send_with_retry, RetryEvent, RetryObserver, RetryPolicy, RetryReason};
pub use transport::{AnalysisAttempt, AttemptKind, AttemptOutcome, Transport};
