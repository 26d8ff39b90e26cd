//! 診断パイプラインの型定義
//!
//! CLIとテストで共有される型:
//! - ImageAsset: 検証済みの画像（検証器のみが生成する）
//! - AnalysisRequest: 1回の解析実行ごとに組み立てる送信内容
//! - DiagnosisResult: 応答解釈後の6項目

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 検証済み画像
///
/// `validate::validate_image` からのみ生成される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    bytes: Vec<u8>,
    media_type: String,
    base64: String,
    fingerprint: String,
}

impl ImageAsset {
    pub(crate) fn new(bytes: Vec<u8>, media_type: String) -> Self {
        let base64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let fingerprint = hex::encode(Sha256::digest(&bytes));
        Self {
            bytes,
            media_type,
            base64,
            fingerprint,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// 送信用のBase64（data URLのプレフィックスなし）
    pub fn base64(&self) -> &str {
        &self.base64
    }

    /// SHA-256（hex）。ログとレポートでの照合用
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// 解析リクエスト（構築後は不変）
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: ImageAsset,
    pub language_directive: String,
    pub prompt_text: String,
}

/// 診断結果の項目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosisField {
    Disease,
    Confidence,
    Symptoms,
    Treatment,
    Prevention,
    AdditionalInfo,
}

impl DiagnosisField {
    /// 表示・抽出順
    pub const ALL: [DiagnosisField; 6] = [
        DiagnosisField::Disease,
        DiagnosisField::Confidence,
        DiagnosisField::Symptoms,
        DiagnosisField::Treatment,
        DiagnosisField::Prevention,
        DiagnosisField::AdditionalInfo,
    ];

    /// JSONキー
    pub fn key(&self) -> &'static str {
        match self {
            DiagnosisField::Disease => "disease",
            DiagnosisField::Confidence => "confidence",
            DiagnosisField::Symptoms => "symptoms",
            DiagnosisField::Treatment => "treatment",
            DiagnosisField::Prevention => "prevention",
            DiagnosisField::AdditionalInfo => "additional_info",
        }
    }

    /// 表示見出し
    pub fn heading(&self) -> &'static str {
        match self {
            DiagnosisField::Disease => "Disease Identification",
            DiagnosisField::Confidence => "Confidence Level",
            DiagnosisField::Symptoms => "Symptoms Observed",
            DiagnosisField::Treatment => "Treatment Recommendations",
            DiagnosisField::Prevention => "Prevention Tips",
            DiagnosisField::AdditionalInfo => "Additional Information",
        }
    }
}

/// AI診断結果
///
/// 解釈後は全項目が空でないことを保証する（`parser::interpret_response`）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub disease: String,
    pub confidence: String,
    pub symptoms: String,
    pub treatment: String,
    pub prevention: String,
    pub additional_info: String,
}

impl DiagnosisResult {
    pub fn get(&self, field: DiagnosisField) -> &str {
        match field {
            DiagnosisField::Disease => &self.disease,
            DiagnosisField::Confidence => &self.confidence,
            DiagnosisField::Symptoms => &self.symptoms,
            DiagnosisField::Treatment => &self.treatment,
            DiagnosisField::Prevention => &self.prevention,
            DiagnosisField::AdditionalInfo => &self.additional_info,
        }
    }

    pub fn get_mut(&mut self, field: DiagnosisField) -> &mut String {
        match field {
            DiagnosisField::Disease => &mut self.disease,
            DiagnosisField::Confidence => &mut self.confidence,
            DiagnosisField::Symptoms => &mut self.symptoms,
            DiagnosisField::Treatment => &mut self.treatment,
            DiagnosisField::Prevention => &mut self.prevention,
            DiagnosisField::AdditionalInfo => &mut self.additional_info,
        }
    }

    pub fn is_complete(&self) -> bool {
        DiagnosisField::ALL
            .iter()
            .all(|f| !self.get(*f).trim().is_empty())
    }
}
