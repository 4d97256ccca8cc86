//! Injected transform and validation capabilities.
//!
//! The resolver only sees the [`Coercer`] and [`Validator`] traits. A shape
//! is an opaque name declared on a parameter (`TargetType::Object`); what it
//! means is up to the capability. [`ShapeRules`] is a small field-rule
//! validator for callers that don't bring their own.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoercionError;

/// One failed constraint reported by a validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub property: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Violation {
    /// A violation without the offending value.
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Attach the offending value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// Options forwarded to the transform capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Drop properties the shape doesn't know about.
    pub exclude_extraneous: bool,
    pub groups: Vec<String>,
}

/// Options forwarded to the validation capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Don't report missing properties, only malformed ones.
    pub skip_missing_properties: bool,
    pub groups: Vec<String>,
}

/// Maps structured data into a declared shape.
pub trait Coercer: Send + Sync {
    fn coerce(
        &self,
        value: Value,
        shape: &str,
        options: &TransformOptions,
    ) -> Result<Value, CoercionError>;
}

impl<F> Coercer for F
where
    F: Fn(Value, &str, &TransformOptions) -> Result<Value, CoercionError> + Send + Sync,
{
    fn coerce(
        &self,
        value: Value,
        shape: &str,
        options: &TransformOptions,
    ) -> Result<Value, CoercionError> {
        self(value, shape, options)
    }
}

/// Checks a shaped value and reports every violation found.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(
        &self,
        value: &Value,
        shape: &str,
        options: &ValidationOptions,
    ) -> Vec<Violation>;
}

/// Capability that accepts everything unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Coercer for PassThrough {
    fn coerce(
        &self,
        value: Value,
        _shape: &str,
        _options: &TransformOptions,
    ) -> Result<Value, CoercionError> {
        Ok(value)
    }
}

#[async_trait]
impl Validator for PassThrough {
    async fn validate(
        &self,
        _value: &Value,
        _shape: &str,
        _options: &ValidationOptions,
    ) -> Vec<Violation> {
        Vec::new()
    }
}

/// Adapts a synchronous closure into a [`Validator`].
pub struct FnValidator<F>(pub F);

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: Fn(&Value, &str) -> Vec<Violation> + Send + Sync,
{
    async fn validate(
        &self,
        value: &Value,
        shape: &str,
        _options: &ValidationOptions,
    ) -> Vec<Violation> {
        (self.0)(value, shape)
    }
}

/// JSON type expected for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Any,
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::Any => true,
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            FieldKind::Any => "any",
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

/// Field-rule validator keyed by shape name.
///
/// Objects are checked field by field; arrays are checked element-wise with
/// the element index prefixed to the property path. Unknown shapes pass.
#[derive(Debug, Clone, Default)]
pub struct ShapeRules {
    shapes: HashMap<String, Vec<FieldRule>>,
}

impl ShapeRules {
    /// An empty rule set; every shape passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field rule to `shape`.
    pub fn field(mut self, shape: &str, name: &str, kind: FieldKind, required: bool) -> Self {
        self.shapes
            .entry(shape.to_string())
            .or_default()
            .push(FieldRule {
                name: name.to_string(),
                kind,
                required,
            });
        self
    }

    fn check(
        &self,
        rules: &[FieldRule],
        value: &Value,
        prefix: &str,
        options: &ValidationOptions,
        out: &mut Vec<Violation>,
    ) {
        let Some(object) = value.as_object() else {
            out.push(
                Violation::new(prefix.trim_end_matches('.'), "must be an object")
                    .with_value(value.clone()),
            );
            return;
        };

        for rule in rules {
            let property = format!("{}{}", prefix, rule.name);
            match object.get(&rule.name) {
                None | Some(Value::Null) => {
                    if rule.required && !options.skip_missing_properties {
                        out.push(Violation::new(property, "is required"));
                    }
                }
                Some(field) if !rule.kind.matches(field) => {
                    out.push(
                        Violation::new(property, format!("must be of type {}", rule.kind.as_str()))
                            .with_value(field.clone()),
                    );
                }
                Some(_) => {}
            }
        }
    }
}

#[async_trait]
impl Validator for ShapeRules {
    async fn validate(
        &self,
        value: &Value,
        shape: &str,
        options: &ValidationOptions,
    ) -> Vec<Violation> {
        let Some(rules) = self.shapes.get(shape) else {
            return Vec::new();
        };

        let mut violations = Vec::new();
        match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.check(rules, item, &format!("{}.", i), options, &mut violations);
                }
            }
            other => self.check(rules, other, "", options, &mut violations),
        }
        violations
    }
}
