//! Path allowlist patterns.
//!
//! Two wildcards are supported:
//!
//! - `*` matches any run of characters, including `/` (so it can span segments)
//! - `{name}` matches exactly one non-empty path segment
//!
//! Everything else matches literally. Patterns are compiled to an anchored
//! regular expression once, when the configuration is loaded.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfigError, ConfigResult};

/// A compiled path allowlist pattern.
///
/// # Example
///
/// ```
/// use warden_config::PathPattern;
///
/// let pattern = PathPattern::new("/orders/{id}/items/*").unwrap();
/// assert!(pattern.matches("/orders/42/items/7/notes"));
/// assert!(!pattern.matches("/orders/42/7/items/1"));
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern {
    raw: String,
    regex: Regex,
}

impl PathPattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if the pattern does not start
    /// with `/` or `*`, has an unbalanced or empty `{}` placeholder, or uses
    /// a placeholder name with characters other than ASCII alphanumerics and `_`.
    pub fn new(raw: impl Into<String>) -> ConfigResult<Self> {
        let raw = raw.into();
        let regex = compile(&raw)?;
        Ok(Self { raw, regex })
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether a request path matches this pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

fn invalid(raw: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidPattern {
        pattern: raw.to_string(),
        message: message.into(),
    }
}

fn compile(raw: &str) -> ConfigResult<Regex> {
    if !(raw.starts_with('/') || raw.starts_with('*')) {
        return Err(invalid(raw, "pattern must start with '/' or '*'"));
    }

    let mut expr = String::with_capacity(raw.len().saturating_mul(2));
    expr.push('^');

    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => expr.push_str(".*"),
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(invalid(raw, "unclosed '{' placeholder"));
                }
                if name.is_empty() {
                    return Err(invalid(raw, "empty '{}' placeholder"));
                }
                if !name.chars().all(|n| n.is_ascii_alphanumeric() || n == '_') {
                    return Err(invalid(raw, format!("invalid placeholder name '{name}'")));
                }
                expr.push_str("[^/]+");
            },
            '}' => return Err(invalid(raw, "unmatched '}'")),
            other => {
                let mut buf = [0u8; 4];
                expr.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            },
        }
    }

    expr.push('$');
    Regex::new(&expr).map_err(|e| invalid(raw, e.to_string()))
}

impl TryFrom<String> for PathPattern {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PathPattern> for String {
    fn from(value: PathPattern) -> Self {
        value.raw
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PathPattern {}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.raw).finish()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
