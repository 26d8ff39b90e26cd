//! 診断結果の出力（text / html / json）

use crate::analyzer::Diagnosis;
use crate::error::Result;
use leaf_doctor_common::format::escape_html;
use leaf_doctor_common::{
    DiagnosisResult, FormattedDiagnosis, FormattedLine, ImageAsset, InlineSpan, InterpretStage,
    LineKind,
};
use serde::Serialize;

const BOLD: &str = "\x1b[1m";
const BOLD_OFF: &str = "\x1b[22m";
const ITALIC: &str = "\x1b[3m";
const ITALIC_OFF: &str = "\x1b[23m";

fn field_icon(field: &str) -> &'static str {
    match field {
        "disease" => "🦠",
        "confidence" => "📊",
        "symptoms" => "🔍",
        "treatment" => "💊",
        "prevention" => "🛡️",
        _ => "ℹ️",
    }
}

// ========================================
// text
// ========================================

/// 端末向けテキスト
///
/// `ansi` が false の場合は装飾記号を付けない（ファイル出力用）。
pub fn render_text(diagnosis: &Diagnosis, ansi: bool) -> String {
    let mut out = format!("🌿 Leaf diagnosis ({})\n", diagnosis.language.name());

    for section in &diagnosis.formatted.sections {
        out.push('\n');
        let heading = format!("{} {}", field_icon(section.field), section.heading);
        if ansi {
            out.push_str(&format!("{}{}{}\n", BOLD, heading, BOLD_OFF));
        } else {
            out.push_str(&heading);
            out.push('\n');
        }

        for line in &section.lines {
            out.push_str("  ");
            if line.kind == LineKind::ListItem {
                out.push_str(&text_marker(line));
                out.push(' ');
            }
            out.push_str(&text_spans(&line.spans, ansi));
            out.push('\n');
        }
    }

    if diagnosis.stage == InterpretStage::Heuristic {
        out.push_str("\n(The AI response was not structured; fields were extracted heuristically.)\n");
    }
    out
}

/// 箇条書き記号は "•" に揃え、番号はそのまま
fn text_marker(line: &FormattedLine) -> String {
    match line.marker.as_deref() {
        Some(marker) if marker.ends_with('.') => marker.to_string(),
        _ => "•".to_string(),
    }
}

fn text_spans(spans: &[InlineSpan], ansi: bool) -> String {
    spans
        .iter()
        .map(|span| match (span, ansi) {
            (InlineSpan::Strong(s), true) => format!("{}{}{}", BOLD, s, BOLD_OFF),
            (InlineSpan::Emphasis(s), true) => format!("{}{}{}", ITALIC, s, ITALIC_OFF),
            (span, _) => span.text().to_string(),
        })
        .collect()
}

// ========================================
// html
// ========================================

/// `<section>` 要素を並べたHTML断片
pub fn render_html(formatted: &FormattedDiagnosis) -> String {
    let mut html = String::new();
    for section in &formatted.sections {
        html.push_str(&format!(
            "<section class=\"diagnosis-field\" data-field=\"{}\">\n",
            section.field
        ));
        html.push_str(&format!("  <h3>{}</h3>\n", escape_html(section.heading)));
        for line in &section.lines {
            match line.kind {
                LineKind::Paragraph => {
                    html.push_str(&format!("  <p>{}</p>\n", line.to_html()));
                }
                LineKind::ListItem => {
                    html.push_str(&format!(
                        "  <p class=\"list-item\">{} {}</p>\n",
                        escape_html(&text_marker(line)),
                        line.to_html()
                    ));
                }
            }
        }
        html.push_str("</section>\n");
    }
    html
}

// ========================================
// json
// ========================================

#[derive(Debug, Clone, Serialize)]
pub struct ImageSummary {
    pub file_name: String,
    pub media_type: String,
    pub size: u64,
    pub fingerprint: String,
}

/// JSON出力
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisReport {
    pub language: String,
    pub image: ImageSummary,
    pub stage: InterpretStage,
    pub result: DiagnosisResult,
    pub formatted: FormattedDiagnosis,
    pub analyzed_at: String,
}

impl DiagnosisReport {
    pub fn new(file_name: &str, asset: &ImageAsset, diagnosis: &Diagnosis) -> Self {
        Self::with_timestamp(
            file_name,
            asset,
            diagnosis,
            chrono::Local::now().to_rfc3339(),
        )
    }

    pub fn with_timestamp(
        file_name: &str,
        asset: &ImageAsset,
        diagnosis: &Diagnosis,
        analyzed_at: String,
    ) -> Self {
        Self {
            language: diagnosis.language.code().to_string(),
            image: ImageSummary {
                file_name: file_name.to_string(),
                media_type: asset.media_type().to_string(),
                size: asset.size(),
                fingerprint: asset.fingerprint().to_string(),
            },
            stage: diagnosis.stage,
            result: diagnosis.result.clone(),
            formatted: diagnosis.formatted.clone(),
            analyzed_at,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::RunId;
    use leaf_doctor_common::{format_diagnosis, validate_image, Language};

    fn diagnosis(result: DiagnosisResult) -> Diagnosis {
        Diagnosis {
            run_id: RunId(1),
            language: Language::English,
            stage: InterpretStage::Structured,
            formatted: format_diagnosis(&result),
            result,
        }
    }

    fn sample() -> Diagnosis {
        diagnosis(DiagnosisResult {
            disease: "**Early Blight**".into(),
            confidence: "High".into(),
            symptoms: "- Brown *concentric* rings\n- Yellowing".into(),
            treatment: "1. Remove leaves\n2. Apply fungicide".into(),
            prevention: "Rotate crops".into(),
            additional_info: "No information available".into(),
        })
    }

    #[test]
    fn test_text_plain() {
        let text = render_text(&sample(), false);
        assert!(text.contains("🦠 Disease Identification\n  Early Blight\n"));
        assert!(text.contains("  • Brown concentric rings\n"));
        assert!(text.contains("  1. Remove leaves\n"));
        assert!(!text.contains('\x1b'));
        assert!(!text.contains("**"));
    }

    #[test]
    fn test_text_ansi() {
        let text = render_text(&sample(), true);
        assert!(text.contains("\x1b[1mEarly Blight\x1b[22m"));
        assert!(text.contains("\x1b[3mconcentric\x1b[23m"));
    }

    #[test]
    fn test_html_sections() {
        let html = render_html(&sample().formatted);
        assert_eq!(html.matches("<section").count(), 6);
        assert!(html.contains("<p><strong>Early Blight</strong></p>"));
        assert!(html.contains("<p class=\"list-item\">• Brown <em>concentric</em> rings</p>"));
    }

    #[test]
    fn test_html_escapes_adversarial_input() {
        let d = diagnosis(DiagnosisResult {
            disease: "<script>alert('x')</script>".into(),
            symptoms: "**<img src=x onerror=alert(1)>**".into(),
            ..sample().result
        });
        let html = render_html(&d.formatted);
        assert!(!html.contains("<script"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(html.contains("<strong>&lt;img src=x onerror=alert(1)&gt;</strong>"));
    }

    #[test]
    fn test_json_report() {
        let asset = validate_image(b"\xFF\xD8\xFF".to_vec(), "image/jpeg").unwrap();
        let report = DiagnosisReport::with_timestamp(
            "leaf.jpg",
            &asset,
            &sample(),
            "2026-01-01T00:00:00+00:00".into(),
        );
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["language"], "english");
        assert_eq!(value["image"]["file_name"], "leaf.jpg");
        assert_eq!(value["image"]["size"], 3);
        assert_eq!(value["image"]["fingerprint"], asset.fingerprint());
        assert_eq!(value["stage"], "structured");
        assert_eq!(value["result"]["confidence"], "High");
        assert_eq!(value["formatted"]["sections"][0]["lines"][0]["spans"][0]["type"], "strong");
        assert_eq!(value["analyzed_at"], "2026-01-01T00:00:00+00:00");
    }
}
