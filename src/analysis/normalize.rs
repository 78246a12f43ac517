//! Turns free-form model output into an [`AnalysisResult`].
//!
//! Normalization is total: any text yields a result. Output that holds no
//! parseable JSON object degrades to using the raw text as the description.

use serde_json::{Map, Value};
use tracing::debug;

use super::types::{AnalysisResult, RawModelResponse, DEFAULT_CONFIDENCE, PLACEHOLDER_DESCRIPTION};

pub fn normalize(raw: &RawModelResponse) -> AnalysisResult {
    let text = raw.as_str();

    let object = match extract_json_object(text).map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(map))) => map,
        Some(Ok(_)) | Some(Err(_)) | None => {
            debug!(len = text.len(), "model output has no usable JSON object");
            return AnalysisResult::degraded(text);
        }
    };

    AnalysisResult {
        description: description_of(&object),
        tags: tags_of(object.get("tags")),
        confidence: confidence_of(object.get("confidence")),
    }
}

/// Return the first balanced `{ ... }` span in `text`.
///
/// Braces inside JSON string literals are ignored. Returns `None` when no
/// `{` appears or the first one is never closed.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn description_of(object: &Map<String, Value>) -> String {
    ["analysis", "description"]
        .iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(PLACEHOLDER_DESCRIPTION)
        .to_string()
}

fn tags_of(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(Value::String(s)) => split_tags(s),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => split_tags(&v.to_string()),
        _ => Vec::new(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn split_tags(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

// TODO: surface an explicit "unparsed confidence" flag instead of silently using 0.8.
fn confidence_of(value: Option<&Value>) -> f64 {
    let parsed = match value {
        // Parsed from the literal so overflowing values like 1e999 clamp
        // instead of being dropped.
        Some(Value::Number(n)) => n.to_string().parse::<f64>().ok(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(c) if !c.is_nan() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(text: &str) -> AnalysisResult {
        normalize(&RawModelResponse(text.to_string()))
    }

    #[test]
    fn test_extract_plain_object() {
        assert_eq!(extract_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_extract_embedded_and_nested() {
        let text = r#"Sure! {"a":{"b":2}} and then {"c":3}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a":{"b":2}}"#));
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"{"analysis":"a } brace and \" quote {","tags":[]} trailing"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"analysis":"a } brace and \" quote {","tags":[]}"#)
        );
    }

    #[test]
    fn test_extract_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object(r#"{"unterminated": 1"#), None);
        assert_eq!(extract_json_object("} {"), None);
    }

    #[test]
    fn test_total_over_odd_inputs() {
        for text in [
            "",
            "   ",
            "A photo of a cat.",
            r#"{"analysis":"x"}"#,
            "Here you go: {broken json}",
            "{{{{",
            "}}}}",
            "[1,2,3]",
            "ünïcödé {\"analysis\": \"é\"}",
        ] {
            let result = run(text);
            assert!(!result.description.is_empty());
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }

    #[test]
    fn test_degraded_uses_raw_text() {
        let result = run("A bowl of fruit on a table.");
        assert_eq!(result.description, "A bowl of fruit on a table.");
        assert!(result.tags.is_empty());
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_degraded_on_malformed_json() {
        let text = "Result: {analysis: unquoted}";
        let result = run(text);
        assert_eq!(result.description, text);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_empty_text_gets_placeholder() {
        assert_eq!(run("").description, PLACEHOLDER_DESCRIPTION);
    }

    #[test]
    fn test_description_fallbacks() {
        assert_eq!(run(r#"{"description":"old shape"}"#).description, "old shape");
        assert_eq!(
            run(r#"{"analysis":"","description":"second"}"#).description,
            "second"
        );
        assert_eq!(run(r#"{"tags":["a"]}"#).description, PLACEHOLDER_DESCRIPTION);
    }

    #[test]
    fn test_confidence_clamping() {
        let cases = [
            ("-5", 0.0),
            ("0", 0.0),
            ("0.5", 0.5),
            ("1", 1.0),
            ("5", 1.0),
            ("\"abc\"", 0.8),
            ("null", 0.8),
            ("\"0.25\"", 0.25),
            ("true", 0.8),
        ];
        for (input, expected) in cases {
            let text = format!(r#"{{"analysis":"x","confidence":{}}}"#, input);
            assert_eq!(run(&text).confidence, expected, "input {}", input);
        }
        assert_eq!(run(r#"{"analysis":"x"}"#).confidence, 0.8);
    }

    #[test]
    fn test_overflowing_confidence_keeps_other_fields() {
        let result = run(r#"{"analysis":"a cat","tags":["cat"],"confidence":1e999}"#);
        assert_eq!(result.description, "a cat");
        assert_eq!(result.tags, vec!["cat"]);
        assert_eq!(result.confidence, 1.0);

        let result = run(r#"{"analysis":"a cat","confidence":-1e999}"#);
        assert_eq!(result.description, "a cat");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_tags_from_string() {
        let result = run(r#"{"analysis":"x","tags":"cat, dog , bird"}"#);
        assert_eq!(result.tags, vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn test_tags_from_array_keep_order() {
        let result = run(r#"{"analysis":"x","tags":["x","y"]}"#);
        assert_eq!(result.tags, vec!["x", "y"]);
    }

    #[test]
    fn test_tags_absent() {
        assert!(run(r#"{"analysis":"x"}"#).tags.is_empty());
        assert!(run(r#"{"analysis":"x","tags":null}"#).tags.is_empty());
    }

    proptest! {
        #[test]
        fn prop_normalize_is_total(text in any::<String>()) {
            let result = run(&text);
            prop_assert!(!result.description.is_empty());
            prop_assert!((0.0..=1.0).contains(&result.confidence));
        }

        #[test]
        fn prop_confidence_always_clamped(value in any::<f64>()) {
            let text = format!(r#"{{"analysis":"x","confidence":"{}"}}"#, value);
            let confidence = run(&text).confidence;
            prop_assert!((0.0..=1.0).contains(&confidence));
        }
    }

    #[test]
    fn test_embedded_json_with_prose() {
        let result = run(r#"Sure! {"analysis":"a dog","tags":[],"confidence":1.4}"#);
        assert_eq!(result.description, "a dog");
        assert!(result.tags.is_empty());
        assert_eq!(result.confidence, 1.0);
    }
}
