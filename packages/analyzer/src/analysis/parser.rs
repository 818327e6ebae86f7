//! Turns raw model output into a validated [`Analysis`].
//!
//! Extraction is tolerant (markdown fences, chatter around the object) but
//! validation is strict: every required field must be present, correctly
//! typed and non-empty, otherwise the whole response is rejected.

use serde_json::{Map, Value};

use crate::error::{AnalyzerError, Result};
use crate::models::{Analysis, ArticleType, Category, Complexity, Summary};

/// Parser output: the analysis plus the model's self-reported certainty.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnalysis {
    pub analysis: Analysis,
    pub reported_confidence: Option<f64>,
}

/// Parse a raw completion into an analysis. All or nothing.
pub fn parse_response(raw: &str) -> Result<ParsedAnalysis> {
    let json = extract_json_object(raw)
        .ok_or_else(|| AnalyzerError::parse("no JSON object found in model response"))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| AnalyzerError::parse(format!("invalid JSON: {e}")))?;
    let root = value
        .as_object()
        .ok_or_else(|| AnalyzerError::parse("top-level value is not an object"))?;

    let category = object_field(root, "category", "category")?;
    let summary = object_field(root, "summary", "summary")?;

    let analysis = Analysis {
        main_topic: string_field(root, "main_topic", "main_topic")?,
        methodology: string_field(root, "methodology", "methodology")?,
        key_findings: string_list_field(root, "key_findings", "key_findings", 1)?,
        techniques: string_list_field(root, "techniques", "techniques", 0)?,
        category: Category {
            domain: string_field(category, "domain", "category.domain")?,
            subcategory: string_field(category, "subcategory", "category.subcategory")?,
            complexity: parse_complexity(&string_field(
                category,
                "complexity",
                "category.complexity",
            )?)?,
            article_type: parse_article_type(&string_field(
                category,
                "article_type",
                "category.article_type",
            )?),
        },
        summary: Summary {
            brief: string_field(summary, "brief", "summary.brief")?,
            key_points: string_list_field(summary, "key_points", "summary.key_points", 0)?,
        },
    };

    let reported_confidence = match root.get("confidence") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            value
                .as_f64()
                .ok_or_else(|| AnalyzerError::parse("field `confidence` must be a number"))?,
        ),
    };

    Ok(ParsedAnalysis {
        analysis,
        reported_confidence,
    })
}

/// Locate the first balanced `{ ... }` in `text`.
///
/// Braces inside string literals are skipped, including escaped quotes.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

fn object_field<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a Map<String, Value>> {
    match parent.get(key) {
        None | Some(Value::Null) => Err(missing(path)),
        Some(value) => value
            .as_object()
            .ok_or_else(|| AnalyzerError::parse(format!("field `{path}` must be an object"))),
    }
}

fn string_field(parent: &Map<String, Value>, key: &str, path: &str) -> Result<String> {
    let value = match parent.get(key) {
        None | Some(Value::Null) => return Err(missing(path)),
        Some(value) => value,
    };
    let text = value
        .as_str()
        .ok_or_else(|| AnalyzerError::parse(format!("field `{path}` must be a string")))?
        .trim();
    if text.is_empty() {
        return Err(AnalyzerError::parse(format!("field `{path}` is empty")));
    }
    Ok(text.to_string())
}

fn string_list_field(
    parent: &Map<String, Value>,
    key: &str,
    path: &str,
    min_len: usize,
) -> Result<Vec<String>> {
    let items = match parent.get(key) {
        None | Some(Value::Null) => return Err(missing(path)),
        Some(value) => value
            .as_array()
            .ok_or_else(|| AnalyzerError::parse(format!("field `{path}` must be an array")))?,
    };

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let text = item
            .as_str()
            .ok_or_else(|| AnalyzerError::parse(format!("field `{path}[{i}]` must be a string")))?
            .trim();
        if text.is_empty() {
            return Err(AnalyzerError::parse(format!("field `{path}[{i}]` is empty")));
        }
        out.push(text.to_string());
    }

    if out.len() < min_len {
        return Err(AnalyzerError::parse(format!(
            "field `{path}` needs at least {min_len} entries"
        )));
    }
    Ok(out)
}

fn missing(path: &str) -> AnalyzerError {
    AnalyzerError::parse(format!("missing field `{path}`"))
}

fn parse_complexity(label: &str) -> Result<Complexity> {
    match label.to_ascii_lowercase().as_str() {
        "basic" | "beginner" => Ok(Complexity::Basic),
        "intermediate" => Ok(Complexity::Intermediate),
        "advanced" => Ok(Complexity::Advanced),
        _ => Err(AnalyzerError::parse(format!(
            "field `category.complexity` has unknown value '{label}'"
        ))),
    }
}

fn parse_article_type(label: &str) -> ArticleType {
    ArticleType::ALL
        .into_iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(label))
        .unwrap_or(ArticleType::Other)
}
