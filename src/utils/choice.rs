//! Multiple-choice token handling shared by the normalizer, the question
//! resolver and the MCQ scorer.
//!
//! Stored choice values come in three flavours: 1-based numeric strings
//! (`"2"`), letter tokens (`"b"`), and JSON integers which are 0-based
//! option indices. Everything is converted to a token string first.

use serde_json::Value as JsonValue;

const LETTER_TOKENS: &[char] = &['a', 'b', 'c', 'd', 'e'];

/// Converts a stored choice value into a token string.
pub fn token_from_json(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        JsonValue::Number(n) => n.as_u64().map(|idx| (idx + 1).to_string()),
        _ => None,
    }
}

/// Resolves a token against an option list: 1-based number, letter `a`-`e`,
/// or the option text itself.
pub fn option_position(token: &str, options: &[String]) -> Option<usize> {
    let token = token.trim();
    let idx = if token.chars().all(|c| c.is_ascii_digit()) && !token.is_empty() {
        token.parse::<usize>().ok()?.checked_sub(1)?
    } else if let Some(letter) = single_letter(token) {
        LETTER_TOKENS.iter().position(|c| *c == letter)?
    } else {
        return options
            .iter()
            .position(|o| o.trim().eq_ignore_ascii_case(token));
    };
    (idx < options.len()).then_some(idx)
}

/// Renders `"<token>. <option text>"`, or `None` when the token does not
/// resolve.
pub fn render(token: &str, options: &[String]) -> Option<String> {
    let idx = option_position(token, options)?;
    let token = token.trim();
    let shown = if is_token_syntax(token) {
        token.to_string()
    } else {
        position_token(idx)
    };
    Some(format!("{}. {}", shown, options[idx]))
}

/// Comparison key for a choice, ignoring case and any rendered suffix.
pub fn choice_key(value: &str, options: Option<&[String]>) -> String {
    let head = token_head(value);
    if let Some(idx) = token_index(head) {
        return format!("#{}", idx);
    }
    if let Some(idx) = options.and_then(|opts| {
        opts.iter()
            .position(|o| o.trim().eq_ignore_ascii_case(value.trim()) || o.trim().eq_ignore_ascii_case(head))
    }) {
        return format!("#{}", idx);
    }
    head.to_lowercase()
}

fn token_head(value: &str) -> &str {
    let trimmed = value.trim();
    match trimmed.split_once(". ") {
        Some((head, _)) if is_token_syntax(head.trim()) => head.trim(),
        _ => trimmed.trim_end_matches('.'),
    }
}

fn token_index(token: &str) -> Option<usize> {
    if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
        return token.parse::<usize>().ok()?.checked_sub(1);
    }
    single_letter(token).map(|c| (c as u8 - b'a') as usize)
}

fn is_token_syntax(token: &str) -> bool {
    token_index(token).is_some()
}

fn single_letter(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

fn position_token(idx: usize) -> String {
    LETTER_TOKENS
        .get(idx)
        .map(|c| c.to_string())
        .unwrap_or_else(|| (idx + 1).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts() -> Vec<String> {
        vec!["Paris".into(), "Berlin".into(), "Rome".into()]
    }

    #[test]
    fn integer_values_are_zero_based() {
        assert_eq!(token_from_json(&json!(0)), Some("1".to_string()));
        assert_eq!(token_from_json(&json!(" c ")), Some("c".to_string()));
        assert_eq!(token_from_json(&json!(null)), None);
    }

    #[test]
    fn renders_numeric_and_letter_tokens() {
        assert_eq!(render("2", &opts()), Some("2. Berlin".to_string()));
        assert_eq!(render("c", &opts()), Some("c. Rome".to_string()));
        assert_eq!(render("rome", &opts()), Some("c. Rome".to_string()));
    }

    #[test]
    fn unresolvable_tokens_do_not_render() {
        assert_eq!(render("4", &opts()), None);
        assert_eq!(render("0", &opts()), None);
        assert_eq!(render("z", &opts()), None);
        assert_eq!(render("Madrid", &opts()), None);
    }

    #[test]
    fn keys_ignore_case_and_rendered_suffix() {
        assert_eq!(choice_key("b", None), choice_key("B", None));
        assert_eq!(choice_key("b. Berlin", None), choice_key("B", None));
        assert_eq!(choice_key("2", None), choice_key("b", None));
        assert_ne!(choice_key("b", None), choice_key("c", None));
        assert_eq!(choice_key("Berlin", Some(&opts())), choice_key("b", None));
    }
}
