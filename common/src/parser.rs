//! APIレスポンス解釈
//!
//! モデルの生テキストを DiagnosisResult に変換する。失敗はしない。
//!
//! 1. 構造化ステージ: 最初の `{` から最後の `}` までをJSONとしてデコード
//! 2. ヒューリスティックステージ: デコード失敗時のみ、ラベル（"Treatment:" 等）で切り出し
//! 3. 既定値補完: 未設定の項目にプレースホルダを入れる

use crate::error::{Error, Result};
use crate::types::{DiagnosisField, DiagnosisResult};
use regex::Regex;
use serde_json::{Map, Value};

/// どのステージで解釈したか
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpretStage {
    Structured,
    Heuristic,
}

/// 情報なしの表示
pub const NO_INFORMATION: &str = "No information available";

/// 構造化ステージで欠けた項目の既定値
pub fn structured_placeholder(field: DiagnosisField) -> &'static str {
    match field {
        DiagnosisField::Disease => "Unknown Disease",
        DiagnosisField::Confidence => "N/A",
        _ => NO_INFORMATION,
    }
}

/// ヒューリスティックステージで一致しなかった項目の既定値
///
/// `AdditionalInfo` は正規化済みの全文が既定値になるため、ここでは全文が空の場合の値。
pub fn heuristic_placeholder(field: DiagnosisField) -> &'static str {
    match field {
        DiagnosisField::Disease => "Analysis completed",
        DiagnosisField::Confidence => "Available",
        DiagnosisField::Symptoms => "Check the detailed analysis below",
        DiagnosisField::Treatment => "Recommendations provided",
        DiagnosisField::Prevention => "Prevention tips included",
        DiagnosisField::AdditionalInfo => NO_INFORMATION,
    }
}

/// テキスト正規化
///
/// - 見出し記号（`#`〜`######`）を後続の空白ごと除去
/// - インラインコード（`` `x` `` / ```` ```x``` ````）を中身だけにする
/// - 連続する空行を1つの改行にまとめる
/// - 前後の空白を除去
pub fn normalize_text(text: &str) -> String {
    lazy_static::lazy_static! {
        static ref HEADING_RE: Regex = Regex::new(r"#{1,6}\s*").unwrap();
        static ref CODE_RE: Regex = Regex::new(r"`{1,3}(.*?)`{1,3}").unwrap();
        static ref BLANK_LINES_RE: Regex = Regex::new(r"\n\s*\n").unwrap();
    }

    let text = HEADING_RE.replace_all(text, "");
    let text = CODE_RE.replace_all(&text, "$1");
    let text = BLANK_LINES_RE.replace_all(&text, "\n");
    text.trim().to_string()
}

/// レスポンスからJSONオブジェクト部分を抽出
///
/// 最初の `{` から最後の `}` まで。入れ子の整合性は見ない。
pub fn extract_json_object(response: &str) -> Result<&str> {
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end > start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONオブジェクトが見つかりません".into()))
}

/// 構造化ステージ
///
/// デコードできれば各項目を正規化して返す。欠けた項目は `None`。
pub fn parse_structured(text: &str) -> Result<[Option<String>; 6]> {
    let json_str = extract_json_object(text)?;
    let map: Map<String, Value> = serde_json::from_str(json_str)?;

    let mut fields: [Option<String>; 6] = Default::default();
    for (slot, field) in fields.iter_mut().zip(DiagnosisField::ALL) {
        *slot = get_string(&map, field.key())
            .map(|s| normalize_text(&s))
            .filter(|s| !s.is_empty());
    }
    Ok(fields)
}

/// ヒューリスティックステージ
///
/// 各項目を固定の優先順で独立に切り出す。一致しない項目は `None`。
pub fn parse_heuristic(text: &str) -> [Option<String>; 6] {
    lazy_static::lazy_static! {
        static ref SECTION_RES: [Regex; 6] = [
            Regex::new(r"(?i)(?:disease|condition|problem):\s*([^\n]+)").unwrap(),
            Regex::new(r"(?i)(?:confidence|certainty):\s*([^\n]+)").unwrap(),
            Regex::new(r"(?is)(?:symptoms|visible symptoms):(.*?)(?:treatment|prevention|additional|$)").unwrap(),
            Regex::new(r"(?is)(?:treatment|recommendations):(.*?)(?:prevention|additional|$)").unwrap(),
            Regex::new(r"(?is)(?:prevention|preventive):(.*?)(?:additional|$)").unwrap(),
            Regex::new(r"(?is)(?:additional|other|note):(.*)$").unwrap(),
        ];
    }

    let mut fields: [Option<String>; 6] = Default::default();
    for (slot, re) in fields.iter_mut().zip(SECTION_RES.iter()) {
        *slot = re
            .captures(text)
            .and_then(|cap| cap.get(1))
            .map(|m| normalize_text(m.as_str().trim()))
            .filter(|s| !s.is_empty());
    }
    fields
}

/// 生テキストを解釈（ステージ付き）
pub fn interpret_response_with_stage(raw: &str) -> (DiagnosisResult, InterpretStage) {
    let text = normalize_text(raw);
    let mut result = DiagnosisResult::default();

    let stage = match parse_structured(&text) {
        Ok(fields) => {
            for (value, field) in fields.into_iter().zip(DiagnosisField::ALL) {
                *result.get_mut(field) =
                    value.unwrap_or_else(|| structured_placeholder(field).to_string());
            }
            InterpretStage::Structured
        }
        Err(_) => {
            let fields = parse_heuristic(&text);
            for (value, field) in fields.into_iter().zip(DiagnosisField::ALL) {
                let fallback = match field {
                    DiagnosisField::AdditionalInfo if !text.is_empty() => text.clone(),
                    _ => heuristic_placeholder(field).to_string(),
                };
                *result.get_mut(field) = value.unwrap_or(fallback);
            }
            InterpretStage::Heuristic
        }
    };

    (result, stage)
}

/// 生テキストを解釈
///
/// どんな入力でも全項目が空でない結果を返す。
pub fn interpret_response(raw: &str) -> DiagnosisResult {
    interpret_response_with_stage(raw).0
}

fn get_string(map: &Map<String, Value>, key: &str) -> Option<String> {
    let value = map.get(key)?;
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        // 配列は箇条書きにする
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item.as_str() {
                    Some(s) => format!("- {}", s),
                    None => format!("- {}", item),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================
    // normalize_text テスト
    // =============================================

    #[test]
    fn test_normalize_strips_headings() {
        assert_eq!(normalize_text("## Treatment\nSpray"), "Treatment\nSpray");
        assert_eq!(normalize_text("###### deep"), "deep");
    }

    #[test]
    fn test_normalize_unwraps_inline_code() {
        assert_eq!(normalize_text("use `copper oxychloride` now"), "use copper oxychloride now");
        assert_eq!(normalize_text("```x```"), "x");
    }

    #[test]
    fn test_normalize_collapses_blank_lines() {
        assert_eq!(normalize_text("a\n\n\n  \nb"), "a\nb");
    }

    #[test]
    fn test_normalize_trims() {
        assert_eq!(normalize_text("  \n hello \n "), "hello");
    }

    // =============================================
    // extract_json_object テスト
    // =============================================

    #[test]
    fn test_extract_json_object_with_surrounding_text() {
        let response = r#"Here you go: {"disease": "Rust"} thanks"#;
        assert_eq!(extract_json_object(response).unwrap(), r#"{"disease": "Rust"}"#);
    }

    #[test]
    fn test_extract_json_object_first_to_last_brace() {
        let response = r#"{"a": {"b": 1}} trailing }"#;
        assert_eq!(extract_json_object(response).unwrap(), r#"{"a": {"b": 1}} trailing }"#);
    }

    #[test]
    fn test_extract_json_object_missing() {
        assert!(extract_json_object("no braces").is_err());
        assert!(extract_json_object("} reversed {").is_err());
        assert!(extract_json_object("").is_err());
    }

    // =============================================
    // 構造化ステージ
    // =============================================

    #[test]
    fn test_structured_roundtrip_all_fields() {
        let raw = r#"```json
{
  "disease": "Early Blight (Alternaria solani)",
  "confidence": "High (85%)",
  "symptoms": "- Concentric rings on older leaves\n- Yellowing around lesions",
  "treatment": "**Mancozeb** 2g/L every 7 days",
  "prevention": "Crop rotation and *sanitation*",
  "additional_info": "Recovery in 2-3 weeks"
}
```"#;

        let (result, stage) = interpret_response_with_stage(raw);
        assert_eq!(stage, InterpretStage::Structured);
        assert_eq!(result.disease, "Early Blight (Alternaria solani)");
        assert_eq!(result.confidence, "High (85%)");
        assert_eq!(
            result.symptoms,
            "- Concentric rings on older leaves\n- Yellowing around lesions"
        );
        assert_eq!(result.treatment, "**Mancozeb** 2g/L every 7 days");
        assert_eq!(result.prevention, "Crop rotation and *sanitation*");
        assert_eq!(result.additional_info, "Recovery in 2-3 weeks");
    }

    #[test]
    fn test_structured_missing_keys_get_placeholders() {
        let result = interpret_response(r#"{"disease": "Powdery Mildew", "confidence": null}"#);
        assert_eq!(result.disease, "Powdery Mildew");
        assert_eq!(result.confidence, "N/A");
        assert_eq!(result.symptoms, NO_INFORMATION);
        assert_eq!(result.treatment, NO_INFORMATION);
        assert_eq!(result.prevention, NO_INFORMATION);
        assert_eq!(result.additional_info, NO_INFORMATION);
    }

    #[test]
    fn test_structured_empty_object_defaults() {
        let result = interpret_response("{}");
        assert_eq!(result.disease, "Unknown Disease");
        assert!(result.is_complete());
    }

    #[test]
    fn test_structured_normalizes_values() {
        let raw = r#"{"treatment": "Spray\n\n\nneem oil", "disease": "  Leaf spot  "}"#;
        let result = interpret_response(raw);
        assert_eq!(result.treatment, "Spray\nneem oil");
        assert_eq!(result.disease, "Leaf spot");
    }

    #[test]
    fn test_structured_non_string_values() {
        let result = interpret_response(r#"{"confidence": 92, "symptoms": ["spots", "wilting"]}"#);
        assert_eq!(result.confidence, "92");
        assert_eq!(result.symptoms, "- spots\n- wilting");
    }

    // =============================================
    // ヒューリスティックステージ
    // =============================================

    #[test]
    fn test_heuristic_treatment_stops_before_prevention() {
        let raw = "Disease: Bacterial Leaf Blight\nConfidence: Medium\nTreatment: Apply copper fungicide weekly.\nPrevention: Use resistant varieties.";
        let (result, stage) = interpret_response_with_stage(raw);
        assert_eq!(stage, InterpretStage::Heuristic);
        assert_eq!(result.treatment, "Apply copper fungicide weekly.");
        assert!(!result.treatment.contains("Prevention"));
        assert_eq!(result.prevention, "Use resistant varieties.");
        assert_eq!(result.disease, "Bacterial Leaf Blight");
        assert_eq!(result.confidence, "Medium");
    }

    #[test]
    fn test_heuristic_labels_are_case_insensitive() {
        let result = interpret_response("PROBLEM: Rust\nsymptoms: orange pustules\nNOTE: act fast");
        assert_eq!(result.disease, "Rust");
        assert_eq!(result.symptoms, "orange pustules\nNOTE: act fast");
        assert_eq!(result.additional_info, "act fast");
    }

    #[test]
    fn test_heuristic_unmatched_defaults_to_full_text() {
        let raw = "The leaf looks healthy overall.";
        let result = interpret_response(raw);
        assert_eq!(result.disease, "Analysis completed");
        assert_eq!(result.confidence, "Available");
        assert_eq!(result.symptoms, "Check the detailed analysis below");
        assert_eq!(result.treatment, "Recommendations provided");
        assert_eq!(result.prevention, "Prevention tips included");
        assert_eq!(result.additional_info, raw);
    }

    #[test]
    fn test_heuristic_on_broken_json() {
        let raw = "{ \"disease\": \"Rust\", broken\nTreatment: remove leaves }";
        let (result, stage) = interpret_response_with_stage(raw);
        assert_eq!(stage, InterpretStage::Heuristic);
        assert_eq!(result.treatment, "remove leaves }");
    }

    // =============================================
    // 既定値補完
    // =============================================

    #[test]
    fn test_empty_input_uses_placeholders() {
        let result = interpret_response("");
        for field in DiagnosisField::ALL {
            assert_eq!(result.get(field), heuristic_placeholder(field));
            assert!(!result.get(field).is_empty());
        }
    }

    #[test]
    fn test_whitespace_input_is_complete() {
        assert!(interpret_response("   \n\n ").is_complete());
    }
}
