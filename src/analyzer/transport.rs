//! 送信層の抽象
//!
//! 1回の送信結果を `AttemptOutcome` で返す。解釈やリトライはここでは行わない。

use crate::error::Result;
use async_trait::async_trait;
use leaf_doctor_common::AnalysisRequest;

/// 1回の送信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 生成テキスト
    Success(String),
    /// サービス過負荷（HTTP 503）
    Overloaded,
    /// その他の非成功ステータス
    Fatal { status: u16, message: String },
    /// 接続できなかった
    Unreachable(String),
}

/// 試行結果の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Success,
    TransientFailure,
    FatalFailure,
}

impl AttemptOutcome {
    pub fn kind(&self) -> AttemptKind {
        match self {
            AttemptOutcome::Success(_) => AttemptKind::Success,
            AttemptOutcome::Overloaded | AttemptOutcome::Unreachable(_) => {
                AttemptKind::TransientFailure
            }
            AttemptOutcome::Fatal { .. } => AttemptKind::FatalFailure,
        }
    }
}

/// 1回分の試行記録
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisAttempt {
    /// 1始まり
    pub attempt_number: u32,
    pub outcome: AttemptKind,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// 送信前の前提条件（認証情報など）
    fn check_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn send(&self, request: &AnalysisRequest) -> AttemptOutcome;
}
