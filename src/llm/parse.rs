//! The LLM response parse staircase: extract → demarkdown → repair →
//! parse → regex-fallback, stopping at the first stage that yields a
//! usable object. Local models emit malformed JSON often enough that a
//! single `serde_json::from_str` is not an acceptable implementation.

use crate::domain::LlmAnalysis;
use once_cell_fallback::Lazy;
use regex::Regex;
use serde_json::Value;

mod once_cell_fallback {
    /// A tiny lazy-once cell so this module doesn't need a dependency on
    /// `once_cell` purely for compiling a handful of static regexes.
    pub struct Lazy<T> {
        cell: std::sync::OnceLock<T>,
        init: fn() -> T,
    }

    impl<T> Lazy<T> {
        pub const fn new(init: fn() -> T) -> Self {
            Self {
                cell: std::sync::OnceLock::new(),
                init,
            }
        }
    }

    impl<T> std::ops::Deref for Lazy<T> {
        type Target = T;
        fn deref(&self) -> &T {
            self.cell.get_or_init(self.init)
        }
    }
}

static GREEDY_BRACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());
static FIELD_DOUBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([a-zA-Z_]+)"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());
static FIELD_SINGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'([a-zA-Z_]+)'\s*:\s*'([^']*)'"#).unwrap());
static FIELD_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*([a-zA-Z_]+)\s*:\s*([^\n,]+)"#).unwrap());
static ARRAY_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(tags|aliasSuggestions)"\s*:\s*\[([^\]]*)\]"#).unwrap()
});

/// Runs the full pipeline, returning a best-effort `LlmAnalysis`. Never
/// fails outright — stage E's regex fallback always returns *something*,
/// even if every field ends up empty/defaulted.
pub fn parse_response(raw: &str) -> LlmAnalysis {
    let candidate = stage_a_extract_braces(raw)
        .or_else(|| stage_b_demarkdown(raw))
        .unwrap_or_else(|| raw.to_string());

    let repaired = stage_c_repair(&candidate);

    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        return stage_d_extract_fields(&value);
    }

    stage_e_regex_fallback(raw)
}

fn stage_a_extract_braces(raw: &str) -> Option<String> {
    if let Some(m) = GREEDY_BRACES.find(raw) {
        return Some(m.as_str().to_string());
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end > start {
        Some(raw[start..=end].to_string())
    } else {
        None
    }
}

fn stage_b_demarkdown(raw: &str) -> Option<String> {
    let stripped = CODE_FENCE.captures(raw).map(|c| c[1].to_string())?;
    stage_a_extract_braces(&stripped).or(Some(stripped))
}

fn stage_c_repair(candidate: &str) -> String {
    let mut s = candidate.trim().to_string();

    let open_braces = s.matches('{').count();
    let close_braces = s.matches('}').count();
    if open_braces > close_braces {
        s.push_str(&"}".repeat(open_braces - close_braces));
    }

    let open_brackets = s.matches('[').count();
    let close_brackets = s.matches(']').count();
    if open_brackets > close_brackets {
        s.push_str(&"]".repeat(open_brackets - close_brackets));
    }

    // strip trailing commas before a closing brace/bracket
    let mut repaired = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ','
            && let Some(&next_non_ws) = chars[i + 1..].iter().find(|c| !c.is_whitespace())
            && (next_non_ws == '}' || next_non_ws == ']')
        {
            i += 1;
            continue;
        }
        repaired.push(chars[i]);
        i += 1;
    }

    let trimmed = repaired.trim_end();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.to_string()
}

fn stage_d_extract_fields(value: &Value) -> LlmAnalysis {
    let obj = value.as_object();

    let summary = obj
        .and_then(|o| o.get("summary"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let category = obj
        .and_then(|o| o.get("category"))
        .and_then(Value::as_str)
        .unwrap_or("Other")
        .to_string();
    let tags = obj
        .and_then(|o| o.get("tags"))
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let safety_score = obj.and_then(|o| o.get("safety_score")).and_then(Value::as_f64);
    let is_safe = obj
        .and_then(|o| o.get("is_safe"))
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let safety_reasons = obj
        .and_then(|o| o.get("safety_reasons"))
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let alias_suggestions = obj
        .and_then(|o| o.get("alias_suggestions").or_else(|| o.get("aliasSuggestions")))
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    LlmAnalysis {
        summary,
        category,
        tags,
        safety_score: safety_score.unwrap_or(0.8),
        is_safe,
        safety_reasons,
        alias_suggestions,
    }
}

fn stage_e_regex_fallback(raw: &str) -> LlmAnalysis {
    let mut fields = std::collections::HashMap::new();
    for cap in FIELD_DOUBLE.captures_iter(raw) {
        fields.entry(cap[1].to_string()).or_insert_with(|| cap[2].to_string());
    }
    for cap in FIELD_SINGLE.captures_iter(raw) {
        fields.entry(cap[1].to_string()).or_insert_with(|| cap[2].to_string());
    }
    for cap in FIELD_BARE.captures_iter(raw) {
        fields
            .entry(cap[1].to_string())
            .or_insert_with(|| cap[2].trim().trim_matches('"').to_string());
    }

    let mut arrays: std::collections::HashMap<String, Vec<String>> = std::collections::HashMap::new();
    for cap in ARRAY_FIELD.captures_iter(raw) {
        let items = cap[2]
            .split(',')
            .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|s| !s.is_empty())
            .collect();
        arrays.insert(cap[1].to_string(), items);
    }

    LlmAnalysis {
        summary: fields.get("summary").cloned().unwrap_or_default(),
        category: fields.get("category").cloned().unwrap_or_else(|| "Other".into()),
        tags: arrays.get("tags").cloned().unwrap_or_default(),
        safety_score: fields
            .get("safety_score")
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.8),
        is_safe: fields
            .get("is_safe")
            .map(|s| s.trim() == "true")
            .unwrap_or(true),
        safety_reasons: Vec::new(),
        alias_suggestions: arrays.get("aliasSuggestions").cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let raw = r#"{"summary": "A test site that does things well.", "category": "Technology", "tags": ["a","b"], "safety_score": 0.9, "is_safe": true, "safety_reasons": [], "alias_suggestions": ["test-site"]}"#;
        let out = parse_response(raw);
        assert_eq!(out.category, "Technology");
        assert_eq!(out.tags, vec!["a", "b"]);
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "```json\n{\"summary\": \"Fenced content example here.\", \"category\": \"News\"}\n```";
        let out = parse_response(raw);
        assert_eq!(out.category, "News");
    }

    #[test]
    fn repairs_unbalanced_braces_and_trailing_comma() {
        let raw = r#"{"summary": "Missing closing brace example.", "category": "Business","#;
        let out = parse_response(raw);
        assert_eq!(out.category, "Business");
    }

    #[test]
    fn falls_back_to_regex_extraction_on_garbage() {
        let raw = "summary: A garbage non-json blob about finance\ncategory: Finance";
        let out = parse_response(raw);
        assert_eq!(out.category, "Finance");
    }

    #[test]
    fn stage_c_strips_dangling_trailing_quote() {
        let repaired = stage_c_repair(r#"{"category": "Business"}""#);
        assert_eq!(repaired, r#"{"category": "Business"}"#);
    }
}
