// Secret redaction for log messages and structured log fields

use serde_json::{Map, Value};

const REDACTED: &str = "[REDACTED]";

/// Key fragments that mark a field as sensitive regardless of its value.
const SENSITIVE_KEYS: &[&str] = &[
    "contentful_management_access_token",
    "accesstoken",
    "access_token",
    "token",
    "password",
    "secret",
    "apikey",
    "api_key",
    "authorization",
];

/// Show only the last four characters of a token.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// Masks known secret values wherever they appear.
#[derive(Clone, Default)]
pub struct SecretRedactor {
    secrets: Vec<String>,
}

impl SecretRedactor {
    pub fn new<'a>(secrets: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            secrets: secrets
                .into_iter()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), REDACTED))
    }

    /// Redact every string inside a JSON value, and mask fields whose key
    /// looks sensitive.
    pub fn redact_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.redact(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.redact_value(v)).collect()),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, val) in map {
                    let redacted = match val {
                        Value::String(s) if is_sensitive_key(key) => Value::String(mask_token(s)),
                        other => self.redact_value(other),
                    };
                    out.insert(key.clone(), redacted);
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("cfpat-abcdef1234"), "****1234");
        assert_eq!(mask_token("abc"), "****");
        assert_eq!(mask_token(""), "****");
    }

    #[test]
    fn test_redact_message() {
        let redactor = SecretRedactor::new(["s3cret-token"]);
        assert_eq!(
            redactor.redact("auth with s3cret-token failed (s3cret-token)"),
            "auth with [REDACTED] failed ([REDACTED])"
        );
    }

    #[test]
    fn test_empty_secret_ignored() {
        let redactor = SecretRedactor::new([""]);
        assert_eq!(redactor.redact("nothing to hide"), "nothing to hide");
    }

    #[test]
    fn test_redact_nested_value() {
        let redactor = SecretRedactor::new(["s3cret-token"]);
        let value = json!({
            "message": "header Bearer s3cret-token",
            "nested": { "items": ["s3cret-token", 1, true] },
            "apiKey": "key-00001234",
            "count": 3
        });

        let out = redactor.redact_value(&value);
        assert_eq!(out["message"], "header Bearer [REDACTED]");
        assert_eq!(out["nested"]["items"][0], "[REDACTED]");
        assert_eq!(out["nested"]["items"][1], 1);
        assert_eq!(out["apiKey"], "****1234");
        assert_eq!(out["count"], 3);
    }
}
