//! Per-parameter value pipeline.
//!
//! Each parameter goes through extract → coerce → parse → transform →
//! validate → require-check, stopping at the first failure. All parameters
//! of a call are resolved concurrently; when several fail, the one with the
//! lowest index is reported.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use futures::future::join_all;
use serde_json::{Number, Value};

use crate::capability::{Coercer, TransformOptions, ValidationOptions, Validator};
use crate::config::DispatchOptions;
use crate::descriptor::{ParamDescriptor, ParamSource, TargetType, ValidateMode};
use crate::error::{Result, RpcError};
use crate::handler::Args;

/// The parts of a request envelope parameters are read from.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub id: Option<Value>,
    pub method: String,
    pub params: Value,
}

/// Largest timestamp magnitude accepted for a date: 100,000,000 days.
const MAX_TIMESTAMP_MILLIS: u64 = 8_640_000_000_000_000;

/// Resolves declared parameters against a request.
#[derive(Clone, Default)]
pub struct ParamResolver {
    coercer: Option<Arc<dyn Coercer>>,
    validator: Option<Arc<dyn Validator>>,
    enable_validation: bool,
    validation_options: ValidationOptions,
    use_transformer: bool,
    transform_options: TransformOptions,
}

impl ParamResolver {
    /// Create a resolver with no capabilities, taking toggles and global
    /// capability options from `options`.
    pub fn new(options: &DispatchOptions) -> Self {
        Self {
            coercer: None,
            validator: None,
            enable_validation: options.enable_validation,
            validation_options: options.validation_options.clone(),
            use_transformer: options.use_transformer,
            transform_options: options.transform_options.clone(),
        }
    }

    /// Install the transform capability.
    pub fn with_coercer(mut self, coercer: Arc<dyn Coercer>) -> Self {
        self.coercer = Some(coercer);
        self
    }

    /// Install the validation capability.
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Resolve every parameter concurrently and collect them in index order.
    ///
    /// `params` must be sorted by index, as registry descriptors are.
    pub async fn resolve_all(&self, ctx: &RequestContext, params: &[ParamDescriptor]) -> Result<Args> {
        let settled = join_all(params.iter().map(|param| self.handle(ctx, param))).await;

        let mut values = Vec::with_capacity(settled.len());
        for result in settled {
            values.push(result?);
        }
        Ok(Args::new(values))
    }

    /// Resolve one parameter. `Ok(None)` means the value is undefined.
    pub async fn handle(&self, ctx: &RequestContext, param: &ParamDescriptor) -> Result<Option<Value>> {
        let value = extract(ctx, param);
        let value = self.normalize(value, param).await?;
        require_check(value, param)
    }

    async fn normalize(&self, value: Option<Value>, param: &ParamDescriptor) -> Result<Option<Value>> {
        let value = match value {
            None => return Ok(None),
            Some(Value::Null) => return Ok(Some(Value::Null)),
            Some(value) => value,
        };

        match &param.target {
            TargetType::Number => coerce_number(value, param),
            TargetType::String => Ok(Some(value)),
            TargetType::Boolean => Ok(Some(Value::Bool(coerce_bool(&value)))),
            TargetType::Date => coerce_date(&value, param).map(Some),
            TargetType::Any | TargetType::Object { .. } => {
                let structured = matches!(param.target, TargetType::Object { .. });
                if is_truthy(&value) && (param.parse || structured) {
                    let value = parse_value(value, param)?;
                    let value = self.transform_value(value, param)?;
                    let value = self.validate_value(value, param).await?;
                    Ok(Some(value))
                } else {
                    Ok(Some(value))
                }
            }
        }
    }

    fn transform_value(&self, value: Value, param: &ParamDescriptor) -> Result<Value> {
        let (Some(coercer), Some(shape)) = (&self.coercer, param.target.shape_name()) else {
            return Ok(value);
        };
        if !self.use_transformer {
            return Ok(value);
        }

        let options = param.transform.as_ref().unwrap_or(&self.transform_options);
        coercer.coerce(value, shape, options).map_err(|e| {
            RpcError::invalid_param(
                param.name(),
                format!("Parameter \"{}\" could not be transformed: {}", param.name(), e),
            )
        })
    }

    async fn validate_value(&self, value: Value, param: &ParamDescriptor) -> Result<Value> {
        let options: &ValidationOptions = match &param.validate {
            ValidateMode::Enabled(options) => options,
            ValidateMode::Disabled => return Ok(value),
            ValidateMode::Inherit if self.enable_validation => &self.validation_options,
            ValidateMode::Inherit => return Ok(value),
        };

        let (Some(validator), Some(shape)) = (&self.validator, param.target.shape_name()) else {
            return Ok(value);
        };
        if !(value.is_object() || value.is_array()) {
            return Ok(value);
        }

        let violations = validator.validate(&value, shape, options).await;
        if violations.is_empty() {
            Ok(value)
        } else {
            Err(RpcError::InvalidParams {
                message: format!(
                    "Invalid {}, check 'errors' property for more info.",
                    param.kind()
                ),
                param: Some(param.name().to_string()),
                violations,
            })
        }
    }
}

fn extract(ctx: &RequestContext, param: &ParamDescriptor) -> Option<Value> {
    match &param.source {
        ParamSource::Params => Some(ctx.params.clone()),
        ParamSource::Named(name) => ctx.params.as_object().and_then(|m| m.get(name)).cloned(),
        ParamSource::RequestId => ctx.id.clone(),
        ParamSource::MethodName => Some(Value::String(ctx.method.clone())),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_number(value: Value, param: &ParamDescriptor) -> Result<Option<Value>> {
    let invalid = || {
        RpcError::invalid_param(
            param.name(),
            format!("Parameter \"{}\" is not a valid number", param.name()),
        )
    };

    match value {
        Value::Number(_) => Ok(Some(value)),
        Value::Bool(b) => Ok(Some(Value::from(u8::from(b)))),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => {
            let s = s.trim();
            // whitespace-only counts as zero; only "" is undefined
            if s.is_empty() {
                return Ok(Some(Value::from(0)));
            }
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Some(Value::from(i)));
            }
            s.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(|n| Some(Value::Number(n)))
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::String(s) if s == "true" || s == "1" => true,
        Value::String(s) if s == "false" || s == "0" => false,
        other => is_truthy(other),
    }
}

fn coerce_date(value: &Value, param: &ParamDescriptor) -> Result<Value> {
    let parsed = match value {
        Value::String(s) => parse_date(s),
        Value::Number(n) => timestamp_millis(n).and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    };

    parsed
        .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
        .ok_or_else(|| {
            RpcError::invalid_request(format!(
                "{} is invalid! It can't be parsed to date.",
                param.name()
            ))
        })
}

/// Millisecond timestamp of a JSON number, truncating fractions toward zero.
fn timestamp_millis(n: &Number) -> Option<i64> {
    let millis = match n.as_i64() {
        Some(millis) => millis,
        None => {
            let f = n.as_f64().filter(|f| f.is_finite())?;
            if f.abs() > MAX_TIMESTAMP_MILLIS as f64 {
                return None;
            }
            f.trunc() as i64
        }
    };
    (millis.unsigned_abs() <= MAX_TIMESTAMP_MILLIS).then_some(millis)
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_value(value: Value, param: &ParamDescriptor) -> Result<Value> {
    match value {
        Value::String(s) => serde_json::from_str(&s).map_err(|e| {
            RpcError::parse(format!(
                "Parameter \"{}\" could not be parsed: {}",
                param.name(),
                e
            ))
        }),
        other => Ok(other),
    }
}

fn require_check(value: Option<Value>, param: &ParamDescriptor) -> Result<Option<Value>> {
    if !param.required {
        return Ok(value);
    }

    let empty = match &value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    };

    if param.is_params_bag() {
        let empty_struct = match &value {
            Some(Value::Object(map)) => map.is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            _ => false,
        };
        if empty || empty_struct {
            return Err(RpcError::invalid_param(param.name(), "Params empty"));
        }
    } else if empty {
        return Err(RpcError::invalid_param(
            param.name(),
            format!("Parameter \"{}\" is required", param.name()),
        ));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{FieldKind, ShapeRules, TransformOptions, Violation};
    use crate::error::CoercionError;
    use serde_json::json;

    fn param(source: ParamSource, target: TargetType, required: bool) -> ParamDescriptor {
        ParamDescriptor {
            index: 0,
            source,
            target,
            required,
            parse: false,
            validate: ValidateMode::Inherit,
            transform: None,
        }
    }

    fn named(name: &str, target: TargetType) -> ParamDescriptor {
        param(ParamSource::Named(name.into()), target, false)
    }

    fn ctx(params: Value) -> RequestContext {
        RequestContext {
            id: Some(json!(9)),
            method: "math.add".into(),
            params,
        }
    }

    fn resolver() -> ParamResolver {
        ParamResolver::new(&DispatchOptions::default())
    }

    #[tokio::test]
    async fn test_extract_sources() {
        let r = resolver();
        let c = ctx(json!({"a": 1}));
        assert_eq!(
            r.handle(&c, &param(ParamSource::Params, TargetType::Any, false)).await.unwrap(),
            Some(json!({"a": 1}))
        );
        assert_eq!(r.handle(&c, &named("a", TargetType::Any)).await.unwrap(), Some(json!(1)));
        assert_eq!(r.handle(&c, &named("missing", TargetType::Any)).await.unwrap(), None);
        assert_eq!(
            r.handle(&c, &param(ParamSource::RequestId, TargetType::Any, false)).await.unwrap(),
            Some(json!(9))
        );
        assert_eq!(
            r.handle(&c, &param(ParamSource::MethodName, TargetType::Any, false)).await.unwrap(),
            Some(json!("math.add"))
        );
    }

    #[tokio::test]
    async fn test_named_param_against_array_params_is_undefined() {
        let value = resolver().handle(&ctx(json!([1, 2])), &named("a", TargetType::Any)).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_number_coercion() {
        let r = resolver();
        let p = named("n", TargetType::Number);
        assert_eq!(r.handle(&ctx(json!({"n": "42"})), &p).await.unwrap(), Some(json!(42)));
        assert_eq!(r.handle(&ctx(json!({"n": "2.5"})), &p).await.unwrap(), Some(json!(2.5)));
        assert_eq!(r.handle(&ctx(json!({"n": ""})), &p).await.unwrap(), None);
        assert_eq!(r.handle(&ctx(json!({"n": true})), &p).await.unwrap(), Some(json!(1)));
        assert_eq!(r.handle(&ctx(json!({"n": 7})), &p).await.unwrap(), Some(json!(7)));

        let err = r.handle(&ctx(json!({"n": "abc"})), &p).await.unwrap_err();
        assert_eq!(err.code(), -32602);
    }

    #[tokio::test]
    async fn test_blank_number_string_is_zero() {
        let r = resolver();
        let p = ParamDescriptor {
            required: true,
            ..named("n", TargetType::Number)
        };
        assert_eq!(r.handle(&ctx(json!({"n": "   "})), &p).await.unwrap(), Some(json!(0)));
        assert_eq!(r.handle(&ctx(json!({"n": "\t\n"})), &p).await.unwrap(), Some(json!(0)));
    }

    #[tokio::test]
    async fn test_boolean_coercion() {
        let r = resolver();
        let p = named("b", TargetType::Boolean);
        for (raw, expected) in [
            (json!("true"), true),
            (json!("1"), true),
            (json!("false"), false),
            (json!("0"), false),
            (json!(""), false),
            (json!("yes"), true),
            (json!(0), false),
            (json!(3), true),
            (json!({}), true),
        ] {
            assert_eq!(
                r.handle(&ctx(json!({ "b": raw })), &p).await.unwrap(),
                Some(Value::Bool(expected)),
                "coercing {}",
                raw
            );
        }
    }

    #[tokio::test]
    async fn test_date_coercion() {
        let r = resolver();
        let p = named("when", TargetType::Date);
        assert_eq!(
            r.handle(&ctx(json!({"when": "2024-03-01T10:00:00+02:00"})), &p).await.unwrap(),
            Some(json!("2024-03-01T08:00:00.000Z"))
        );
        assert_eq!(
            r.handle(&ctx(json!({"when": "2024-03-01"})), &p).await.unwrap(),
            Some(json!("2024-03-01T00:00:00.000Z"))
        );
        assert_eq!(
            r.handle(&ctx(json!({"when": 0})), &p).await.unwrap(),
            Some(json!("1970-01-01T00:00:00.000Z"))
        );

        let err = r.handle(&ctx(json!({"when": "not a date"})), &p).await.unwrap_err();
        assert_eq!(err.code(), -32600);
        assert_eq!(err.to_string(), "when is invalid! It can't be parsed to date.");
    }

    #[tokio::test]
    async fn test_naive_datetime_is_utc() {
        let value = resolver()
            .handle(&ctx(json!({"when": "2024-03-01T10:30:15"})), &named("when", TargetType::Date))
            .await
            .unwrap();
        assert_eq!(value, Some(json!("2024-03-01T10:30:15.000Z")));
    }

    #[tokio::test]
    async fn test_float_timestamps_are_truncated() {
        let r = resolver();
        let p = named("when", TargetType::Date);
        for raw in [json!(1.7e12), json!(1700000000000.0), json!(1700000000000.9)] {
            assert_eq!(
                r.handle(&ctx(json!({ "when": raw })), &p).await.unwrap(),
                Some(json!("2023-11-14T22:13:20.000Z")),
                "timestamp {}",
                raw
            );
        }
        assert_eq!(
            r.handle(&ctx(json!({"when": -1.5})), &p).await.unwrap(),
            Some(json!("1969-12-31T23:59:59.999Z"))
        );

        for raw in [json!(1e20), json!(-9e15), json!(u64::MAX)] {
            let err = r.handle(&ctx(json!({ "when": raw })), &p).await.unwrap_err();
            assert_eq!(err.code(), -32600, "timestamp {}", raw);
        }
    }

    #[tokio::test]
    async fn test_string_and_null_pass_through() {
        let r = resolver();
        assert_eq!(
            r.handle(&ctx(json!({"s": 5})), &named("s", TargetType::String)).await.unwrap(),
            Some(json!(5))
        );
        assert_eq!(
            r.handle(&ctx(json!({"n": null})), &named("n", TargetType::Number)).await.unwrap(),
            Some(Value::Null)
        );
    }

    #[tokio::test]
    async fn test_object_target_parses_encoded_string() {
        let value = resolver()
            .handle(&ctx(json!({"o": "{\"x\": 1}"})), &named("o", TargetType::object()))
            .await
            .unwrap();
        assert_eq!(value, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_unparseable_string_is_parse_error() {
        let err = resolver()
            .handle(&ctx(json!({"o": "{oops"})), &named("o", TargetType::object()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32700);
    }

    #[tokio::test]
    async fn test_any_target_only_parses_when_requested() {
        let r = resolver();
        let plain = named("o", TargetType::Any);
        assert_eq!(
            r.handle(&ctx(json!({"o": "[1]"})), &plain).await.unwrap(),
            Some(json!("[1]"))
        );
        let parsed = ParamDescriptor { parse: true, ..plain };
        assert_eq!(
            r.handle(&ctx(json!({"o": "[1]"})), &parsed).await.unwrap(),
            Some(json!([1]))
        );
    }

    #[tokio::test]
    async fn test_transform_runs_for_shaped_params() {
        let coercer = |value: Value, shape: &str, _opts: &TransformOptions| {
            let mut value = value;
            value["kind"] = Value::String(shape.to_string());
            Ok::<_, CoercionError>(value)
        };
        let r = resolver().with_coercer(Arc::new(coercer));
        let value = r
            .handle(&ctx(json!({"u": {"name": "a"}})), &named("u", TargetType::shape("User")))
            .await
            .unwrap();
        assert_eq!(value, Some(json!({"name": "a", "kind": "User"})));
    }

    #[tokio::test]
    async fn test_transform_failure_is_invalid_params() {
        let coercer = |_value: Value, _shape: &str, _opts: &TransformOptions| {
            Err::<Value, _>(CoercionError::new("no"))
        };
        let err = resolver()
            .with_coercer(Arc::new(coercer))
            .handle(&ctx(json!({"u": {}})), &named("u", TargetType::shape("User")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32602);
    }

    #[tokio::test]
    async fn test_transformer_can_be_disabled() {
        let coercer = |_value: Value, _shape: &str, _opts: &TransformOptions| {
            Err::<Value, _>(CoercionError::new("should not run"))
        };
        let r = ParamResolver::new(&DispatchOptions::default().use_transformer(false))
            .with_coercer(Arc::new(coercer));
        let value = r
            .handle(&ctx(json!({"u": {"name": "a"}})), &named("u", TargetType::shape("User")))
            .await
            .unwrap();
        assert_eq!(value, Some(json!({"name": "a"})));
    }

    #[tokio::test]
    async fn test_transform_options_fall_back_to_global() {
        let coercer = |mut value: Value, _shape: &str, opts: &TransformOptions| {
            value["exclude_extraneous"] = Value::Bool(opts.exclude_extraneous);
            Ok::<_, CoercionError>(value)
        };
        let global = TransformOptions {
            exclude_extraneous: true,
            ..Default::default()
        };
        let r = ParamResolver::new(&DispatchOptions::default().transform_options(global))
            .with_coercer(Arc::new(coercer));
        let request = ctx(json!({"u": {}}));

        let inherited = named("u", TargetType::shape("User"));
        assert_eq!(
            r.handle(&request, &inherited).await.unwrap(),
            Some(json!({"exclude_extraneous": true}))
        );

        let own = ParamDescriptor {
            transform: Some(TransformOptions::default()),
            ..inherited
        };
        assert_eq!(
            r.handle(&request, &own).await.unwrap(),
            Some(json!({"exclude_extraneous": false}))
        );
    }

    fn user_rules() -> Arc<ShapeRules> {
        Arc::new(ShapeRules::new().field("User", "name", FieldKind::String, true))
    }

    #[tokio::test]
    async fn test_validation_failure_carries_violations() {
        let err = resolver()
            .with_validator(user_rules())
            .handle(&ctx(json!({"u": {"name": 3}})), &named("u", TargetType::shape("User")))
            .await
            .unwrap_err();
        match err {
            RpcError::InvalidParams {
                message,
                param,
                violations,
            } => {
                assert_eq!(message, "Invalid param, check 'errors' property for more info.");
                assert_eq!(param.as_deref(), Some("u"));
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].property, "name");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validation_toggles() {
        let bad = ctx(json!({"u": {}}));
        let shaped = named("u", TargetType::shape("User"));

        let disabled_globally = ParamResolver::new(&DispatchOptions::default().enable_validation(false))
            .with_validator(user_rules());
        assert!(disabled_globally.handle(&bad, &shaped).await.is_ok());

        let opted_in = ParamDescriptor {
            validate: ValidateMode::Enabled(ValidationOptions::default()),
            ..shaped.clone()
        };
        assert!(disabled_globally.handle(&bad, &opted_in).await.is_err());

        let opted_out = ParamDescriptor {
            validate: ValidateMode::Disabled,
            ..shaped
        };
        assert!(resolver().with_validator(user_rules()).handle(&bad, &opted_out).await.is_ok());
    }

    #[tokio::test]
    async fn test_validation_options_fall_back_to_global() {
        let lenient = ValidationOptions {
            skip_missing_properties: true,
            ..Default::default()
        };
        let r = ParamResolver::new(&DispatchOptions::default().validation_options(lenient))
            .with_validator(user_rules());
        let missing_name = ctx(json!({"u": {}}));

        let inherited = named("u", TargetType::shape("User"));
        assert!(r.handle(&missing_name, &inherited).await.is_ok());

        let strict = ParamDescriptor {
            validate: ValidateMode::Enabled(ValidationOptions::default()),
            ..inherited
        };
        assert!(r.handle(&missing_name, &strict).await.is_err());
    }

    #[tokio::test]
    async fn test_validation_skipped_for_unshaped_values() {
        let always_fails = Arc::new(crate::capability::FnValidator(|_: &Value, _: &str| {
            vec![Violation::new("x", "bad")]
        }));
        let r = resolver().with_validator(always_fails);
        assert!(r.handle(&ctx(json!({"o": {"a": 1}})), &named("o", TargetType::object())).await.is_ok());
        assert!(r.handle(&ctx(json!({"o": 5})), &named("o", TargetType::shape("S"))).await.is_ok());
    }

    #[tokio::test]
    async fn test_required_params_bag() {
        let r = resolver();
        let bag = param(ParamSource::Params, TargetType::Any, true);
        for empty in [json!({}), json!([]), Value::Null] {
            let err = r.handle(&ctx(empty), &bag).await.unwrap_err();
            assert_eq!(err.to_string(), "Params empty");
            assert_eq!(err.code(), -32602);
        }
        assert!(r.handle(&ctx(json!([1])), &bag).await.is_ok());
    }

    #[tokio::test]
    async fn test_required_named_param() {
        let r = resolver();
        let p = ParamDescriptor {
            required: true,
            ..named("a", TargetType::Any)
        };
        for params in [json!({}), json!({"a": ""}), json!({"a": null})] {
            let err = r.handle(&ctx(params), &p).await.unwrap_err();
            assert_eq!(err.to_string(), "Parameter \"a\" is required");
        }
        assert_eq!(r.handle(&ctx(json!({"a": {}})), &p).await.unwrap(), Some(json!({})));
    }

    #[tokio::test]
    async fn test_required_check_runs_after_number_coercion() {
        let p = ParamDescriptor {
            required: true,
            ..named("n", TargetType::Number)
        };
        let err = resolver().handle(&ctx(json!({"n": ""})), &p).await.unwrap_err();
        assert_eq!(err.code(), -32602);
    }

    #[tokio::test]
    async fn test_resolve_all_reports_lowest_index_failure() {
        let params = vec![
            ParamDescriptor {
                index: 0,
                ..named("ok", TargetType::Any)
            },
            ParamDescriptor {
                index: 1,
                ..named("when", TargetType::Date)
            },
            ParamDescriptor {
                index: 2,
                required: true,
                ..named("missing", TargetType::Any)
            },
        ];
        let err = resolver()
            .resolve_all(&ctx(json!({"ok": 1, "when": "garbage"})), &params)
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32600);

        let args = resolver()
            .resolve_all(&ctx(json!({"ok": 1, "when": 0, "missing": "x"})), &params)
            .await
            .unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args.get(2), Some(&json!("x")));
    }
}
