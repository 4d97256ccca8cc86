//! Response shaping applied to handler results before they are enveloped.
//!
//! Only structured values (objects and arrays) are rewritten. Primitives,
//! `null` and binary replies go out untouched.

use serde::Deserialize;
use serde_json::Value;

/// Structural transform applied to successful results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResponseTransform {
    /// Object keys starting with any of these prefixes are removed.
    pub exclude_prefixes: Vec<String>,
    /// Object entries whose value is `null` are removed.
    pub skip_nulls: bool,
}

impl ResponseTransform {
    /// The identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop object keys starting with `prefix`.
    pub fn exclude_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.exclude_prefixes.push(prefix.into());
        self
    }

    /// Drop object entries whose value is `null`.
    pub fn skip_nulls(mut self, enable: bool) -> Self {
        self.skip_nulls = enable;
        self
    }

    /// Whether `apply` returns its input unchanged.
    pub fn is_identity(&self) -> bool {
        self.exclude_prefixes.is_empty() && !self.skip_nulls
    }

    /// Rewrite `value` into its plain response form.
    pub fn apply(&self, value: Value) -> Value {
        if self.is_identity() {
            return value;
        }
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .filter(|(key, _)| !self.excluded(key))
                    .filter(|(_, v)| !(self.skip_nulls && v.is_null()))
                    .map(|(key, v)| (key, self.apply(v)))
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.apply(item)).collect())
            }
            primitive => primitive,
        }
    }

    fn excluded(&self, key: &str) -> bool {
        self.exclude_prefixes
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()))
    }
}
