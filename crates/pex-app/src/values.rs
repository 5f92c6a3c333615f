// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Turning command-line tokens into JSON values for `pex config KEY VALUE...`.

use serde_json::{Number, Value};

/// Value to store for the given tokens, or `None` when there are none (the
/// command then only shows the current value).
///
/// A single `none`/`null` clears the option, a single token is coerced on its
/// own, and several tokens become a list.
pub fn coerce_values(tokens: &[String]) -> Option<Value> {
    match tokens {
        [] => None,
        [single] if matches!(single.to_lowercase().as_str(), "none" | "null") => Some(Value::Null),
        [single] => Some(coerce_token(single)),
        many => Some(Value::Array(many.iter().map(|t| coerce_token(t)).collect())),
    }
}

/// JSON literal if the token looks like one, else integer, else float, else
/// plain string.
pub fn coerce_token(token: &str) -> Value {
    let trimmed = token.trim();

    if looks_like_json(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return value;
        }
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(float) = trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
    {
        return Value::Number(float);
    }
    Value::String(token.to_string())
}

fn looks_like_json(token: &str) -> bool {
    matches!(token.to_lowercase().as_str(), "true" | "false" | "null")
        || token.starts_with(['[', '{', '"'])
        || token.starts_with(|c: char| c.is_ascii_digit())
        || token.starts_with("-1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_tokens_means_read_only() {
        assert_eq!(coerce_values(&[]), None);
    }

    #[test]
    fn none_and_null_clear_the_option() {
        assert_eq!(coerce_values(&tokens(&["None"])), Some(Value::Null));
        assert_eq!(coerce_values(&tokens(&["null"])), Some(Value::Null));
    }

    #[test]
    fn scalars() {
        assert_eq!(coerce_token("true"), json!(true));
        assert_eq!(coerce_token("62"), json!(62));
        assert_eq!(coerce_token("-5"), json!(-5));
        assert_eq!(coerce_token("10.5"), json!(10.5));
        assert_eq!(coerce_token("Zebra GK420d"), json!("Zebra GK420d"));
    }

    #[test]
    fn json_literals_are_parsed() {
        assert_eq!(coerce_token("[62, 29]"), json!([62, 29]));
        assert_eq!(coerce_token(r#"{"label": "Zebra"}"#), json!({"label": "Zebra"}));
        assert_eq!(coerce_token(r#""-n""#), json!("-n"));
    }

    #[test]
    fn broken_json_stays_a_string() {
        assert_eq!(coerce_token("[62, 29"), json!("[62, 29"));
        assert_eq!(coerce_token("4x6"), json!("4x6"));
    }

    #[test]
    fn several_tokens_become_a_list() {
        let value = coerce_values(&tokens(&["62", "29", "Address label"]));
        assert_eq!(value, Some(json!([62, 29, "Address label"])));
    }
}
