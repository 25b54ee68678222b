//! Secret redaction for log output
//!
//! The filter is handed to each client rather than living in a global, so the
//! set of redacted field names can grow with the credentials in use.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use url::Url;

use crate::constants::{FORBIDDEN_KEYS, REDACTED};

/// Redacts values stored under sensitive field names.
///
/// Key comparison is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFilter {
    forbidden_keys: BTreeSet<String>,
}

impl Default for SecretFilter {
    fn default() -> Self {
        Self::new(FORBIDDEN_KEYS)
    }
}

impl SecretFilter {
    /// Create a filter for the given field names.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            forbidden_keys: keys
                .into_iter()
                .map(|k| k.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Add one more field name.
    pub fn forbid(&mut self, key: &str) {
        if !key.is_empty() {
            self.forbidden_keys.insert(key.to_ascii_lowercase());
        }
    }

    pub fn is_forbidden(&self, key: &str) -> bool {
        self.forbidden_keys.contains(&key.to_ascii_lowercase())
    }

    /// Copy of `value` with every forbidden field replaced, at any depth.
    pub fn filter_secrets(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| {
                        let v = if self.is_forbidden(k) {
                            Value::String(REDACTED.to_string())
                        } else {
                            self.filter_secrets(v)
                        };
                        (k.clone(), v)
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.filter_secrets(v)).collect()),
            other => other.clone(),
        }
    }

    /// Redacted rendering of a flat map, for log lines.
    pub fn filter_map(&self, map: &BTreeMap<String, Value>) -> String {
        let filtered: serde_json::Map<String, Value> = map
            .iter()
            .map(|(k, v)| {
                let v = if self.is_forbidden(k) {
                    Value::String(REDACTED.to_string())
                } else {
                    self.filter_secrets(v)
                };
                (k.clone(), v)
            })
            .collect();
        Value::Object(filtered).to_string()
    }

    /// URL for log lines: query string, fragment and userinfo dropped.
    ///
    /// Query parameters are logged separately through [`Self::filter_map`].
    pub fn filter_url(&self, url: &str) -> String {
        match Url::parse(url) {
            Ok(mut parsed) => {
                parsed.set_query(None);
                parsed.set_fragment(None);
                let _ = parsed.set_username("");
                let _ = parsed.set_password(None);
                parsed.to_string()
            }
            Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
        }
    }
}
