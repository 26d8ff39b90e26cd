//! プロンプト生成モジュール
//!
//! - DIAGNOSIS_GUIDELINES: 診断指示の固定ガイドライン
//! - build_diagnosis_prompt: 言語名を差し込んだ診断プロンプト
//! - build_request: 画像と言語から AnalysisRequest を組み立てる

use crate::language::Language;
use crate::types::{AnalysisRequest, DiagnosisField, ImageAsset};

/// 診断ガイドライン（実用性・地域性・安全性）
pub const DIAGNOSIS_GUIDELINES: &[&str] = &[
    "If the image is unclear or doesn't show a plant, clearly state this",
    "If no disease is visible, mention the plant appears healthy",
    "Be specific about treatment concentrations and safety precautions",
    "Consider regional factors and common diseases in India",
    "Use simple language that farmers can easily understand",
    "Provide practical, actionable advice suitable for Indian farming conditions",
    "You can use **bold** formatting for important terms and concepts",
    "Use *italic* formatting for emphasis where appropriate",
];

/// 各項目の記述内容（出力形式のテンプレート）
fn field_description(field: DiagnosisField) -> &'static str {
    match field {
        DiagnosisField::Disease => "Specific disease name",
        DiagnosisField::Confidence => "High/Medium/Low with percentage if possible",
        DiagnosisField::Symptoms => "Detailed list of visible symptoms observed",
        DiagnosisField::Treatment => {
            "Comprehensive treatment recommendations including immediate actions, fungicides/treatments with concentrations, organic options, application methods"
        }
        DiagnosisField::Prevention => {
            "Prevention measures including cultural practices, crop rotation, sanitation, environmental management"
        }
        DiagnosisField::AdditionalInfo => {
            "Recovery timeline, disease spread info, when to seek professional help, regional considerations for Indian farming"
        }
    }
}

/// 診断プロンプト生成
///
/// 言語名は言語指示と締めの要件で計2回だけ出現する。
pub fn build_diagnosis_prompt(language_name: &str) -> String {
    let json_shape = DiagnosisField::ALL
        .iter()
        .map(|f| format!("  \"{}\": \"{}\"", f.key(), field_description(*f)))
        .collect::<Vec<_>>()
        .join(",\n");

    let guidelines = DIAGNOSIS_GUIDELINES
        .iter()
        .map(|g| format!("- {}", g))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert agricultural pathologist and plant disease specialist with extensive knowledge of Indian crops and farming conditions. Analyze this plant image thoroughly and provide a comprehensive disease diagnosis.

Please analyze the uploaded plant image and provide the following information in JSON format:

{{
{json_shape}
}}

IMPORTANT GUIDELINES:
{guidelines}
- IMPORTANT: Provide your entire response, including every field value in the JSON, in {language_name} language.

Please provide your analysis in the exact JSON format specified above, with all content in {language_name}."#
    )
}

/// 解析リクエストを組み立てる
pub fn build_request(language: Language, image: ImageAsset) -> AnalysisRequest {
    let language_directive = language.prompt_name();
    let prompt_text = build_diagnosis_prompt(&language_directive);
    AnalysisRequest {
        image,
        language_directive,
        prompt_text,
    }
}
