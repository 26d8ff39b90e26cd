//! 診断テキストの整形
//!
//! 項目ごとのテキストを行単位の表示レコードに変換する。
//! インライン装飾は強調（`**x**`）と斜体（`*x*`）の2種類のみを扱い、
//! それ以外の文字はすべてテキストとして残す。

use crate::parser::normalize_text;
use crate::types::{DiagnosisField, DiagnosisResult};
use regex::Regex;
use serde::Serialize;

/// 行の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Paragraph,
    ListItem,
}

/// インライン要素
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum InlineSpan {
    Text(String),
    Strong(String),
    Emphasis(String),
}

impl InlineSpan {
    pub fn text(&self) -> &str {
        match self {
            InlineSpan::Text(s) | InlineSpan::Strong(s) | InlineSpan::Emphasis(s) => s,
        }
    }
}

/// 整形済みの1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedLine {
    pub kind: LineKind,
    /// 箇条書き記号（"-", "•", "*", "1." など）。段落は None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    pub spans: Vec<InlineSpan>,
}

impl FormattedLine {
    /// 記号を除いた本文（装飾なし）
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(InlineSpan::text).collect()
    }

    /// インラインHTML
    ///
    /// タグは `<strong>` と `<em>` のみ。本文はすべてエスケープする。
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for span in &self.spans {
            match span {
                InlineSpan::Text(s) => html.push_str(&escape_html(s)),
                InlineSpan::Strong(s) => {
                    html.push_str("<strong>");
                    html.push_str(&escape_html(s));
                    html.push_str("</strong>");
                }
                InlineSpan::Emphasis(s) => {
                    html.push_str("<em>");
                    html.push_str(&escape_html(s));
                    html.push_str("</em>");
                }
            }
        }
        html
    }
}

/// 1項目分の整形結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedSection {
    pub field: &'static str,
    pub heading: &'static str,
    pub lines: Vec<FormattedLine>,
}

/// 6項目分の整形結果（表示順）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedDiagnosis {
    pub sections: Vec<FormattedSection>,
}

impl FormattedDiagnosis {
    pub fn section(&self, field: DiagnosisField) -> Option<&FormattedSection> {
        self.sections.iter().find(|s| s.field == field.key())
    }
}

/// テキストを行レコードに変換
///
/// 空行は捨てる。同じ入力には常に同じ結果を返す。
pub fn format_text(text: &str) -> Vec<FormattedLine> {
    normalize_text(text)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(format_line)
        .collect()
}

/// 診断結果の全項目を整形
pub fn format_diagnosis(result: &DiagnosisResult) -> FormattedDiagnosis {
    let sections = DiagnosisField::ALL
        .iter()
        .map(|field| FormattedSection {
            field: field.key(),
            heading: field.heading(),
            lines: format_text(result.get(*field)),
        })
        .collect();
    FormattedDiagnosis { sections }
}

fn format_line(line: &str) -> FormattedLine {
    lazy_static::lazy_static! {
        static ref BULLET_RE: Regex = Regex::new(r"^([-•*])\s+").unwrap();
        static ref ORDINAL_RE: Regex = Regex::new(r"^(\d+\.)\s+").unwrap();
    }

    let list_marker = BULLET_RE
        .captures(line)
        .or_else(|| ORDINAL_RE.captures(line))
        .and_then(|cap| Some((cap.get(0)?.end(), cap.get(1)?.as_str().to_string())));

    match list_marker {
        Some((end, marker)) => FormattedLine {
            kind: LineKind::ListItem,
            marker: Some(marker),
            spans: parse_inline(&line[end..]),
        },
        None => FormattedLine {
            kind: LineKind::Paragraph,
            marker: None,
            spans: parse_inline(line),
        },
    }
}

/// インライン装飾の解析
///
/// 先に `**x**` を強調にし、残った平文の中だけで `*x*` を斜体にする。
/// 対にならない `*` はそのまま残る。
pub fn parse_inline(text: &str) -> Vec<InlineSpan> {
    lazy_static::lazy_static! {
        static ref STRONG_RE: Regex = Regex::new(r"\*\*(.+?)\*\*").unwrap();
    }

    let mut spans = Vec::new();
    let mut last = 0;
    for cap in STRONG_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        push_emphasis_spans(&text[last..whole.start()], &mut spans);
        spans.push(InlineSpan::Strong(inner.as_str().to_string()));
        last = whole.end();
    }
    push_emphasis_spans(&text[last..], &mut spans);
    spans
}

fn push_emphasis_spans(text: &str, spans: &mut Vec<InlineSpan>) {
    lazy_static::lazy_static! {
        static ref EMPHASIS_RE: Regex = Regex::new(r"\*([^*]+)\*").unwrap();
    }

    let mut last = 0;
    for cap in EMPHASIS_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        push_text(&text[last..whole.start()], spans);
        spans.push(InlineSpan::Emphasis(inner.as_str().to_string()));
        last = whole.end();
    }
    push_text(&text[last..], spans);
}

fn push_text(text: &str, spans: &mut Vec<InlineSpan>) {
    if text.is_empty() {
        return;
    }
    // 隣接するテキストは結合
    if let Some(InlineSpan::Text(prev)) = spans.last_mut() {
        prev.push_str(text);
    } else {
        spans.push(InlineSpan::Text(text.to_string()));
    }
}

/// HTMLエスケープ
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
