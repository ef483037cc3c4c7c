use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("valid code fence pattern"));

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("valid trailing comma pattern"));

/// First key present on `value` with a non-null value.
pub fn first_present<'a>(value: &'a JsonValue, keys: &[&str]) -> Option<&'a JsonValue> {
    let map = value.as_object()?;
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

pub fn first_string(value: &JsonValue, keys: &[&str]) -> Option<String> {
    let map = value.as_object()?;
    keys.iter()
        .filter_map(|k| map.get(*k))
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Accepts JSON numbers and numeric strings.
pub fn lenient_f64(value: &JsonValue) -> Option<f64> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

pub fn lenient_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        JsonValue::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

/// Strings, numbers, or `{text|label|value}` objects, in order.
pub fn string_list(value: &JsonValue) -> Option<Vec<String>> {
    let items = value.as_array()?;
    let list: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            JsonValue::String(s) => Some(s.trim().to_string()),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Object(_) => first_string(item, &["text", "label", "value", "option"]),
            _ => None,
        })
        .collect();
    (!list.is_empty()).then_some(list)
}

/// Parses a JSON value that may have been stored as serialized text.
pub fn decode_stored(value: &JsonValue) -> Option<JsonValue> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(text) => serde_json::from_str(text).ok(),
        other => Some(other.clone()),
    }
}

/// Removes Markdown code fences, keeping the fenced body.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").into_owned()
}

/// Locates the first balanced top-level `{...}` span, string-aware.
pub fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let candidate = &text[start..];
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (i, ch) in candidate.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if ch == '\\' && in_string {
            escape = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        if ch == '{' {
            depth += 1;
        } else if ch == '}' {
            depth -= 1;
            if depth == 0 {
                return Some(&candidate[..=i]);
            }
        }
    }
    None
}

pub fn strip_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

/// Fence stripping, span extraction, parse, then one trailing-comma repair.
pub fn parse_model_json(text: &str) -> Option<JsonValue> {
    let unfenced = strip_code_fences(text);
    let span = first_object_span(&unfenced)?;
    match serde_json::from_str::<JsonValue>(span) {
        Ok(value) => Some(value),
        Err(first_err) => {
            tracing::debug!(error = %first_err, "Model JSON invalid, attempting repair");
            serde_json::from_str::<JsonValue>(&strip_trailing_commas(span)).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_present_skips_nulls() {
        let v = json!({"answer": null, "response": "hi"});
        assert_eq!(first_present(&v, &["answer", "response"]), Some(&json!("hi")));
        assert_eq!(first_present(&json!("x"), &["answer"]), None);
    }

    #[test]
    fn lenient_parsers() {
        assert_eq!(lenient_f64(&json!("85")), Some(85.0));
        assert_eq!(lenient_f64(&json!("n/a")), None);
        assert_eq!(lenient_bool(&json!("true")), Some(true));
        assert_eq!(lenient_bool(&json!(0)), Some(false));
    }

    #[test]
    fn extracts_fenced_object_with_prose() {
        let text = "Here you go:\n```json\n{\"a\": {\"b\": \"}\"}}\n```\nThanks";
        assert_eq!(parse_model_json(text), Some(json!({"a": {"b": "}"}})));
    }

    #[test]
    fn repairs_trailing_commas_once() {
        let text = r#"{"strengths": ["x", "y",], "n": 1,}"#;
        assert_eq!(parse_model_json(text), Some(json!({"strengths": ["x", "y"], "n": 1})));
        assert_eq!(parse_model_json("{\"a\": tru}"), None);
        assert_eq!(parse_model_json("no json here"), None);
    }
}
