//! Field-level validation and sanitization applied after parsing, per
//! spec.md §4.10's "Validation and sanitization" rules.

use crate::domain::CATEGORY_TAXONOMY;

const PLACEHOLDER_SUMMARIES: &[&str] = &["brief description", "no summary available"];
const MAX_SUMMARY_LEN: usize = 500;
const MAX_TAGS: usize = 10;
const MAX_SAFETY_REASONS: usize = 5;
const MAX_ALIAS_SUGGESTIONS: usize = 5;

pub fn sanitize_category(raw: &str) -> String {
    let trimmed = raw.trim();
    for candidate in CATEGORY_TAXONOMY {
        if candidate.eq_ignore_ascii_case(trimmed) {
            return (*candidate).to_string();
        }
    }

    let lower = trimmed.to_lowercase();
    let fuzzy: &[(&str, &str)] = &[
        ("tech", "Technology"),
        ("news", "News"),
        ("entertain", "Entertainment"),
        ("educat", "Education"),
        ("business", "Business"),
        ("social", "Social"),
        ("shop", "Shopping"),
        ("health", "Health"),
        ("travel", "Travel"),
        ("financ", "Finance"),
        ("sport", "Sports"),
    ];
    for (needle, category) in fuzzy {
        if lower.contains(needle) {
            return (*category).to_string();
        }
    }

    "Other".to_string()
}

pub fn clamp_safety_score(raw: Option<f64>) -> f64 {
    match raw {
        Some(score) if score.is_finite() => score.clamp(0.0, 1.0),
        _ => 0.8,
    }
}

pub fn sanitize_summary(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_control() || *c == ' ').collect();
    let trimmed = cleaned.trim();

    if trimmed.len() < 10 || PLACEHOLDER_SUMMARIES.contains(&trimmed.to_lowercase().as_str()) {
        return String::new();
    }

    if trimmed.chars().count() > MAX_SUMMARY_LEN {
        trimmed.chars().take(MAX_SUMMARY_LEN).collect()
    } else {
        trimmed.to_string()
    }
}

pub fn sanitize_list(raw: Vec<String>, cap: usize) -> Vec<String> {
    raw.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(cap)
        .collect()
}

pub fn sanitize_tags(raw: Vec<String>) -> Vec<String> {
    sanitize_list(raw, MAX_TAGS)
}

pub fn sanitize_safety_reasons(raw: Vec<String>) -> Vec<String> {
    sanitize_list(raw, MAX_SAFETY_REASONS)
}

/// lowercase, whitespace runs → `-`, strip disallowed chars, collapse `-`
/// runs, trim leading/trailing `-`, filter to 3–20 chars, dedupe, cap at 5.
pub fn sanitize_alias_suggestions(raw: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for candidate in raw {
        let lower = candidate.to_lowercase();
        let whitespace_collapsed: String = lower
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        let filtered: String = whitespace_collapsed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();

        let mut collapsed = String::with_capacity(filtered.len());
        let mut prev_dash = false;
        for c in filtered.chars() {
            if c == '-' {
                if !prev_dash {
                    collapsed.push(c);
                }
                prev_dash = true;
            } else {
                collapsed.push(c);
                prev_dash = false;
            }
        }
        let trimmed = collapsed.trim_matches('-').to_string();

        if trimmed.len() < 3 || trimmed.len() > 20 {
            continue;
        }
        if seen.insert(trimmed.clone()) {
            out.push(trimmed);
        }
        if out.len() >= MAX_ALIAS_SUGGESTIONS {
            break;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_exact_match_is_case_insensitive() {
        assert_eq!(sanitize_category("technology"), "Technology");
        assert_eq!(sanitize_category("NEWS"), "News");
    }

    #[test]
    fn category_fuzzy_match() {
        assert_eq!(sanitize_category("tech stuff"), "Technology");
        assert_eq!(sanitize_category("sporty content"), "Sports");
    }

    #[test]
    fn category_unknown_falls_back_to_other() {
        assert_eq!(sanitize_category("gibberish"), "Other");
    }

    #[test]
    fn safety_score_clamps_and_defaults() {
        assert_eq!(clamp_safety_score(Some(1.5)), 1.0);
        assert_eq!(clamp_safety_score(Some(-0.5)), 0.0);
        assert_eq!(clamp_safety_score(None), 0.8);
        assert_eq!(clamp_safety_score(Some(f64::NAN)), 0.8);
    }

    #[test]
    fn summary_rejects_placeholders_and_short_strings() {
        assert_eq!(sanitize_summary("Brief description"), "");
        assert_eq!(sanitize_summary("short"), "");
        assert_eq!(sanitize_summary("A properly long summary sentence."), "A properly long summary sentence.");
    }

    #[test]
    fn summary_caps_at_500_chars() {
        let long = "a".repeat(600);
        assert_eq!(sanitize_summary(&long).len(), 500);
    }

    #[test]
    fn alias_suggestions_sanitize_and_dedupe() {
        let raw = vec![
            "My Cool Link!".to_string(),
            "my-cool-link".to_string(),
            "ab".to_string(),
            "--leading-dash".to_string(),
        ];
        let out = sanitize_alias_suggestions(raw);
        assert_eq!(out, vec!["my-cool-link".to_string(), "leading-dash".to_string()]);
    }
}
