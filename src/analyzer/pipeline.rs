//! 診断パイプライン
//!
//! 画像検証 → プロンプト生成 → 送信（リトライ付き） → 応答解釈 → 整形
//! を1つの状態機械として管理する。
//!
//! 状態は `watch` チャネルで公開する。ロックは `.await` をまたいで保持しない。
//! 各実行に `RunId` を振り、完了時に実行中IDと一致しなければ結果を捨てる。

use super::retry::{send_with_retry, RetryEvent, RetryObserver, RetryPolicy};
use super::transport::{AnalysisAttempt, Transport};
use crate::error::{DiagnosisError, Result};
use crate::loader::{build_preview, ImageCandidate, ImagePreview};
use leaf_doctor_common::{
    build_request, format_diagnosis, interpret_response_with_stage, validate_image,
    DiagnosisResult, FormattedDiagnosis, ImageAsset, InterpretStage, Language,
};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::Instrument;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Validating,
    Ready,
    Analyzing,
    Retrying,
    Succeeded,
    Failed,
}

impl PipelineState {
    /// 実行中（新しい入力を受け付けない）
    pub fn is_running(&self) -> bool {
        matches!(self, PipelineState::Analyzing | PipelineState::Retrying)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineState::Idle => "Waiting for an image",
            PipelineState::Validating => "Checking image",
            PipelineState::Ready => "Ready to analyze",
            PipelineState::Analyzing => "Analyzing leaf...",
            PipelineState::Retrying => "AI service busy, retrying...",
            PipelineState::Succeeded => "Analysis complete",
            PipelineState::Failed => "Analysis failed",
        };
        f.write_str(label)
    }
}

/// 実行ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// 1回の実行の成果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub run_id: RunId,
    pub language: Language,
    pub stage: InterpretStage,
    pub result: DiagnosisResult,
    pub formatted: FormattedDiagnosis,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Completed(Diagnosis),
    /// 実行中のため無視
    Ignored,
    /// 画像未選択
    NotReady,
    /// リセット等で古くなった結果を破棄
    Discarded,
}

#[derive(Debug, Default)]
struct PipelineInner {
    state: PipelineState,
    language: Language,
    file_name: Option<String>,
    image: Option<ImageAsset>,
    result: Option<Diagnosis>,
    error: Option<String>,
    active_run: Option<RunId>,
    next_run: u64,
}

impl PipelineInner {
    fn begin_run(&mut self) -> RunId {
        self.next_run += 1;
        let run_id = RunId(self.next_run);
        self.active_run = Some(run_id);
        self.result = None;
        self.error = None;
        run_id
    }

    fn clear_outcome(&mut self) {
        self.result = None;
        self.error = None;
    }
}

pub struct Pipeline<T: Transport> {
    inner: Arc<Mutex<PipelineInner>>,
    state_tx: Arc<watch::Sender<PipelineState>>,
    transport: Arc<T>,
    policy: RetryPolicy,
}

impl<T: Transport> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            state_tx: Arc::clone(&self.state_tx),
            transport: Arc::clone(&self.transport),
            policy: self.policy,
        }
    }
}

impl<T: Transport> Pipeline<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_shared_transport(Arc::new(transport), policy)
    }

    pub fn with_shared_transport(transport: Arc<T>, policy: RetryPolicy) -> Self {
        let (state_tx, _) = watch::channel(PipelineState::Idle);
        Self {
            inner: Arc::new(Mutex::new(PipelineInner::default())),
            state_tx: Arc::new(state_tx),
            transport,
            policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PipelineInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transition(&self, inner: &mut PipelineInner, state: PipelineState) {
        if inner.state != state {
            tracing::debug!(from = ?inner.state, to = ?state, "pipeline state");
        }
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    pub fn language(&self) -> Language {
        self.lock().language
    }

    /// 直近の成功結果
    pub fn result(&self) -> Option<Diagnosis> {
        self.lock().result.clone()
    }

    /// 直近の失敗メッセージ
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn image(&self) -> Option<ImageAsset> {
        self.lock().image.clone()
    }

    /// 画像を選択して検証
    ///
    /// 不正な画像なら保持中の画像も捨てて Idle に戻る。
    /// プレビューはロックを外してから生成する。
    pub fn select_image(&self, candidate: ImageCandidate) -> Result<Option<ImagePreview>> {
        let asset = {
            let mut inner = self.lock();
            if inner.state.is_running() {
                tracing::debug!(state = ?inner.state, "image selection ignored while running");
                return Err(DiagnosisError::Busy);
            }

            self.transition(&mut inner, PipelineState::Validating);
            match validate_image(candidate.bytes, &candidate.media_type) {
                Ok(asset) => {
                    tracing::info!(
                        file = %candidate.file_name,
                        fingerprint = asset.fingerprint(),
                        size = asset.size(),
                        "image accepted"
                    );
                    inner.file_name = Some(candidate.file_name);
                    inner.image = Some(asset.clone());
                    inner.clear_outcome();
                    self.transition(&mut inner, PipelineState::Ready);
                    asset
                }
                Err(e) => {
                    tracing::info!(file = %candidate.file_name, error = %e, "image rejected");
                    inner.file_name = None;
                    inner.image = None;
                    inner.clear_outcome();
                    self.transition(&mut inner, PipelineState::Idle);
                    return Err(e.into());
                }
            }
        };

        Ok(build_preview(&asset))
    }

    /// 診断言語を設定
    ///
    /// 実行中は false を返して何もしない。
    pub fn set_language(&self, language: Language) -> bool {
        let mut inner = self.lock();
        if inner.state.is_running() {
            return false;
        }

        inner.language = language;
        if matches!(
            inner.state,
            PipelineState::Ready | PipelineState::Succeeded | PipelineState::Failed
        ) {
            inner.clear_outcome();
            if inner.image.is_some() {
                self.transition(&mut inner, PipelineState::Ready);
            } else {
                self.transition(&mut inner, PipelineState::Idle);
            }
        }
        true
    }

    /// 初期状態に戻す
    ///
    /// 実行中に呼ばれた場合、その実行の結果は完了時に破棄される。
    pub fn reset(&self) {
        let mut inner = self.lock();
        if let Some(run_id) = inner.active_run.take() {
            tracing::info!(%run_id, "in-flight run abandoned by reset");
        }
        inner.file_name = None;
        inner.image = None;
        inner.clear_outcome();
        self.transition(&mut inner, PipelineState::Idle);
    }

    /// 診断を実行
    pub async fn start(&self) -> Result<StartOutcome> {
        let (run_id, request) = {
            let mut inner = self.lock();
            if inner.state.is_running() {
                tracing::debug!("start ignored: analysis already running");
                return Ok(StartOutcome::Ignored);
            }
            let Some(image) = inner.image.clone() else {
                return Ok(StartOutcome::NotReady);
            };

            if let Err(e) = self.transport.check_ready() {
                inner.result = None;
                inner.error = Some(e.to_string());
                self.transition(&mut inner, PipelineState::Failed);
                return Err(e);
            }

            let run_id = inner.begin_run();
            self.transition(&mut inner, PipelineState::Analyzing);
            (run_id, build_request(inner.language, image))
        };

        let span = tracing::info_span!(
            "diagnosis",
            %run_id,
            fingerprint = request.image.fingerprint(),
            language = %request.language_directive
        );
        let mut observer = RunObserver {
            pipeline: self,
            run_id,
        };
        let outcome = send_with_retry(
            self.transport.as_ref(),
            &request,
            &self.policy,
            &mut observer,
        )
        .instrument(span)
        .await;

        let mut inner = self.lock();
        if inner.active_run != Some(run_id) {
            tracing::info!(%run_id, "discarding stale analysis result");
            return Ok(StartOutcome::Discarded);
        }
        inner.active_run = None;

        match outcome {
            Ok(text) => {
                let (result, stage) = interpret_response_with_stage(&text);
                tracing::info!(%run_id, ?stage, "analysis interpreted");
                let diagnosis = Diagnosis {
                    run_id,
                    language: inner.language,
                    stage,
                    formatted: format_diagnosis(&result),
                    result,
                };
                inner.result = Some(diagnosis.clone());
                inner.error = None;
                self.transition(&mut inner, PipelineState::Succeeded);
                Ok(StartOutcome::Completed(diagnosis))
            }
            Err(e) => {
                tracing::warn!(%run_id, error = %e, "analysis failed");
                inner.result = None;
                inner.error = Some(e.to_string());
                self.transition(&mut inner, PipelineState::Failed);
                Err(e)
            }
        }
    }

    /// 実行中IDと一致する場合のみ状態を更新
    fn update_if_active(&self, run_id: RunId, state: PipelineState) {
        let mut inner = self.lock();
        if inner.active_run == Some(run_id) && inner.state != state {
            self.transition(&mut inner, state);
        }
    }
}

/// リトライ進行をパイプライン状態に反映
struct RunObserver<'a, T: Transport> {
    pipeline: &'a Pipeline<T>,
    run_id: RunId,
}

impl<T: Transport> RetryObserver for RunObserver<'_, T> {
    fn on_attempt_start(&mut self, attempt_number: u32) {
        tracing::debug!(run_id = %self.run_id, attempt = attempt_number, "attempt started");
        self.pipeline.update_if_active(self.run_id, PipelineState::Analyzing);
    }

    fn on_attempt_finished(&mut self, attempt: &AnalysisAttempt) {
        tracing::debug!(
            run_id = %self.run_id,
            attempt = attempt.attempt_number,
            outcome = ?attempt.outcome,
            "attempt finished"
        );
    }

    fn on_backoff(&mut self, event: &RetryEvent) {
        tracing::debug!(
            run_id = %self.run_id,
            next_attempt = event.next_attempt,
            delay_ms = event.delay.as_millis() as u64,
            "waiting before retry"
        );
        self.pipeline.update_if_active(self.run_id, PipelineState::Retrying);
    }
}
