//! 送信リトライ
//!
//! - 最大3回
//! - 過負荷（503）: n回目のリトライ前に 2^n 秒待つ（2秒→4秒）
//! - 接続失敗: 固定2秒待つ
//! - その他の失敗: 即座に `DiagnosisError::Api`

use super::transport::{AnalysisAttempt, AttemptOutcome, Transport};
use crate::error::{DiagnosisError, Result};
use leaf_doctor_common::AnalysisRequest;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// 過負荷バックオフの単位（2^n 倍する）
    pub backoff_unit: Duration,
    /// 接続失敗時の固定待機
    pub unreachable_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            unreachable_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// n回目（1始まり）のリトライ前の過負荷待機
    pub fn overload_delay(&self, retry: u32) -> Duration {
        self.backoff_unit * 2u32.saturating_pow(retry)
    }
}

/// 待機理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    Overloaded,
    Unreachable(String),
}

/// 待機の通知内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    pub failed_attempt: u32,
    pub next_attempt: u32,
    pub delay: Duration,
    pub reason: RetryReason,
}

/// リトライ進行の通知先
pub trait RetryObserver {
    /// 送信直前
    fn on_attempt_start(&mut self, _attempt_number: u32) {}

    /// 送信結果
    fn on_attempt_finished(&mut self, _attempt: &AnalysisAttempt) {}

    /// 待機に入る直前
    fn on_backoff(&mut self, _event: &RetryEvent) {}
}

impl RetryObserver for () {}

/// 待機イベントを記録する
impl RetryObserver for Vec<RetryEvent> {
    fn on_backoff(&mut self, event: &RetryEvent) {
        self.push(event.clone());
    }
}

/// リトライ付きで送信し、生成テキストを返す
pub async fn send_with_retry<T, O>(
    transport: &T,
    request: &AnalysisRequest,
    policy: &RetryPolicy,
    observer: &mut O,
) -> Result<String>
where
    T: Transport + ?Sized,
    O: RetryObserver + Send,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt_number = 1;

    loop {
        observer.on_attempt_start(attempt_number);
        let outcome = transport.send(request).await;
        observer.on_attempt_finished(&AnalysisAttempt {
            attempt_number,
            outcome: outcome.kind(),
        });

        let (delay, reason) = match outcome {
            AttemptOutcome::Success(text) => {
                tracing::debug!(attempt = attempt_number, chars = text.len(), "analysis received");
                return Ok(text);
            }
            AttemptOutcome::Fatal { status, message } => {
                tracing::warn!(attempt = attempt_number, status, %message, "API returned fatal status");
                return Err(DiagnosisError::Api { status, message });
            }
            AttemptOutcome::Overloaded => {
                if attempt_number >= max_attempts {
                    tracing::warn!(attempt = attempt_number, "service still overloaded; giving up");
                    return Err(DiagnosisError::Overloaded);
                }
                (policy.overload_delay(attempt_number), RetryReason::Overloaded)
            }
            AttemptOutcome::Unreachable(cause) => {
                if attempt_number >= max_attempts {
                    tracing::warn!(attempt = attempt_number, %cause, "service unreachable; giving up");
                    return Err(DiagnosisError::Unreachable(cause));
                }
                (policy.unreachable_delay, RetryReason::Unreachable(cause))
            }
        };

        let event = RetryEvent {
            failed_attempt: attempt_number,
            next_attempt: attempt_number + 1,
            delay,
            reason,
        };
        tracing::info!(
            attempt = attempt_number,
            delay_ms = delay.as_millis() as u64,
            reason = ?event.reason,
            "retrying after backoff"
        );
        observer.on_backoff(&event);

        tokio::time::sleep(delay).await;
        attempt_number += 1;
    }
}
