//! Redaction of secret-looking argument values.
//!
//! Arguments leave the process in two places: the risk reviewer call and
//! persisted records. Both go through [`redact_arguments`] first.

use serde_json::{Map, Value};

/// Placeholder written in place of a redacted value.
pub const REDACTED: &str = "[REDACTED]";

/// Key fragments that mark a value as secret (matched case-insensitively).
const SECRET_KEY_FRAGMENTS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "authorization",
    "credential",
    "private_key",
    "cookie",
    "session",
];

/// Secret values shorter than this are not scrubbed from free text; they would
/// match too much unrelated content.
const MIN_SCRUB_LEN: usize = 4;

/// Redacted copy of an argument map plus the secret string values removed from it.
#[derive(Debug, Clone, Default)]
pub struct RedactedArguments {
    /// Argument map with secret values replaced by [`REDACTED`].
    pub arguments: Map<String, Value>,
    /// The string values that were removed, for scrubbing free text later.
    pub secrets: Vec<String>,
}

/// Whether an argument key names a secret.
#[must_use]
pub fn is_secret_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase().replace('-', "_");
    SECRET_KEY_FRAGMENTS.iter().any(|frag| lower.contains(frag))
}

/// Recursively redact secret-looking keys in an argument map.
#[must_use]
pub fn redact_arguments(arguments: &Map<String, Value>) -> RedactedArguments {
    let mut secrets = Vec::new();
    let arguments = redact_map(arguments, &mut secrets);
    RedactedArguments { arguments, secrets }
}

fn redact_map(map: &Map<String, Value>, secrets: &mut Vec<String>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let value = if is_secret_key(key) {
                collect_strings(value, secrets);
                Value::String(REDACTED.to_string())
            } else {
                redact_value(value, secrets)
            };
            (key.clone(), value)
        })
        .collect()
}

fn redact_value(value: &Value, secrets: &mut Vec<String>) -> Value {
    match value {
        Value::Object(map) => Value::Object(redact_map(map, secrets)),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_value(v, secrets)).collect()),
        other => other.clone(),
    }
}

fn collect_strings(value: &Value, secrets: &mut Vec<String>) {
    match value {
        Value::String(s) if s.len() >= MIN_SCRUB_LEN => secrets.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, secrets)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, secrets)),
        _ => {},
    }
}

/// Replace every occurrence of the given secret values in `text`.
#[must_use]
pub fn scrub_text(text: &str, secrets: &[String]) -> String {
    secrets
        .iter()
        .filter(|s| s.len() >= MIN_SCRUB_LEN)
        .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), REDACTED))
}
