//! Dispatch of a single request envelope.
//!
//! Shape checks (first match wins):
//! 1. not an object → ParseError
//! 2. `params` missing or not structured → InvalidRequestError
//! 3. `method` missing or unknown → MethodNotFoundError
//! 4. `params` is `[]` or `{}` → InvalidParamsError
//!
//! After that the parameters are resolved, the handler is invoked, deferred
//! results are awaited level by level and the settled reply is enveloped.
//! Every failure becomes an error envelope; notifications produce nothing.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::cancel::CancellationToken;
use crate::capability::{Coercer, Validator};
use crate::config::DispatchOptions;
use crate::descriptor::MethodDescriptor;
use crate::envelope::ResponseEnvelope;
use crate::error::{Result, RpcError};
use crate::handler::{CallContext, HandlerFuture, Outcome, Reply};
use crate::registry::Registry;
use crate::resolver::{ParamResolver, RequestContext};

/// What dispatching one envelope produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Response(ResponseEnvelope),
    /// Binary reply handed to the transport untransformed.
    Binary { id: Option<Value>, payload: Bytes },
    /// The handler produced no value; the transport decides what to send.
    NoContent { id: Option<Value> },
    /// Notification: nothing is emitted.
    Suppressed,
}

impl Dispatched {
    /// Whether nothing should be emitted for this request.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Dispatched::Suppressed)
    }

    /// The response envelope, if this is a plain JSON response.
    pub fn envelope(&self) -> Option<&ResponseEnvelope> {
        match self {
            Dispatched::Response(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// Envelope form used inside batches.
    ///
    /// Binary payloads become a byte array result and no-content becomes a
    /// `null` result, so every emitted item keeps its slot.
    pub fn into_envelope(self) -> Option<ResponseEnvelope> {
        match self {
            Dispatched::Response(envelope) => Some(envelope),
            Dispatched::Binary { id, payload } => Some(ResponseEnvelope::success(
                id,
                Value::Array(payload.iter().map(|b| Value::from(*b)).collect()),
            )),
            Dispatched::NoContent { id } => Some(ResponseEnvelope::success(id, Value::Null)),
            Dispatched::Suppressed => None,
        }
    }
}

/// Matches envelopes to registered methods and runs them.
pub struct Dispatcher {
    registry: Arc<Registry>,
    resolver: ParamResolver,
    options: DispatchOptions,
}

impl Dispatcher {
    /// Create a dispatcher over a built registry.
    pub fn new(registry: Arc<Registry>, options: DispatchOptions) -> Self {
        Self {
            resolver: ParamResolver::new(&options),
            registry,
            options,
        }
    }

    /// Install the transform capability used for shaped parameters.
    pub fn with_coercer(mut self, coercer: Arc<dyn Coercer>) -> Self {
        self.resolver = self.resolver.with_coercer(coercer);
        self
    }

    /// Install the validation capability used for shaped parameters.
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.resolver = self.resolver.with_validator(validator);
        self
    }

    /// The registry requests are matched against.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Options this dispatcher was created with.
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Dispatch one decoded envelope.
    pub async fn execute(&self, envelope: &Value) -> Dispatched {
        self.execute_with(envelope, CancellationToken::new()).await
    }

    /// Dispatch one decoded envelope with a caller-owned cancellation token.
    pub async fn execute_with(&self, envelope: &Value, cancel: CancellationToken) -> Dispatched {
        self.execute_matched(envelope, None, cancel).await
    }

    /// Dispatch one decoded envelope against a method the transport already
    /// matched. With `Some`, the registry lookup is skipped; every shape check
    /// still applies.
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use rpc_dispatch::{
    ///     sync_fn, Args, CancellationToken, DispatchOptions, Dispatcher, MethodDecl, ParamDecl,
    ///     Registry, TargetType,
    /// };
    /// use serde_json::json;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let registry = Registry::builder()
    ///     .method(
    ///         MethodDecl::new("math", "neg", sync_fn(|args: Args| {
    ///             let n: i64 = args.parse(0)?;
    ///             Ok(json!(-n))
    ///         }))
    ///         .param(ParamDecl::named("n").target(TargetType::Number)),
    ///     )
    ///     .build()
    ///     .unwrap();
    /// let dispatcher = Dispatcher::new(Arc::new(registry), DispatchOptions::default());
    ///
    /// // e.g. a transport that routes `/math/neg` by path
    /// let neg = dispatcher.registry().get("math.neg").cloned();
    /// let request = json!({"jsonrpc": "2.0", "id": 1, "method": "/math/neg", "params": {"n": "4"}});
    /// let out = dispatcher
    ///     .execute_matched(&request, neg, CancellationToken::new())
    ///     .await;
    /// assert_eq!(out.envelope().unwrap().result(), Some(&json!(-4)));
    /// # }
    /// ```
    pub async fn execute_matched(
        &self,
        envelope: &Value,
        matched: Option<Arc<MethodDescriptor>>,
        cancel: CancellationToken,
    ) -> Dispatched {
        let Some(object) = envelope.as_object() else {
            warn!("Rejecting non-object request envelope");
            return self.emit_error(None, RpcError::parse("Parse error: request must be a JSON object"));
        };

        // An id of the wrong type can't be echoed or trusted to mark a notification.
        let id = match object.get("id") {
            None => None,
            Some(id @ (Value::String(_) | Value::Number(_) | Value::Null)) => Some(id.clone()),
            Some(_) => {
                return self.emit_error(
                    None,
                    RpcError::invalid_request("Invalid request: id must be a string, number or null"),
                );
            }
        };

        let (method, ctx) = match self.match_method(object, id.clone(), matched) {
            Ok(matched) => matched,
            Err(err) => return self.finish_error(id, err),
        };

        debug!("RPC call: {}", method.full_name);

        match self.invoke(&method, ctx, cancel).await {
            Ok(reply) => self.finish_reply(id, reply, &method),
            Err(err) => self.finish_error(id, err),
        }
    }

    fn match_method(
        &self,
        object: &Map<String, Value>,
        id: Option<Value>,
        matched: Option<Arc<MethodDescriptor>>,
    ) -> Result<(Arc<MethodDescriptor>, RequestContext)> {
        let params = match object.get("params") {
            Some(params @ (Value::Array(_) | Value::Object(_))) => params.clone(),
            _ => {
                return Err(RpcError::invalid_request(
                    "Invalid request: params must be an array or object",
                ))
            }
        };

        let name = match object.get("method") {
            None => return Err(RpcError::method_not_found("")),
            Some(Value::String(name)) => name,
            Some(_) => {
                return Err(RpcError::invalid_request(
                    "Invalid request: method must be a string",
                ))
            }
        };

        let method = match matched.or_else(|| self.registry.get(name).cloned()) {
            Some(method) => method,
            None => {
                warn!("Method not found: {}", name);
                return Err(RpcError::method_not_found(name.as_str()));
            }
        };

        if self.options.reject_empty_params && is_empty_params(&params) {
            return Err(RpcError::invalid_params("Params empty"));
        }

        Ok((
            method,
            RequestContext {
                id,
                method: name.clone(),
                params,
            },
        ))
    }

    async fn invoke(
        &self,
        method: &MethodDescriptor,
        ctx: RequestContext,
        cancel: CancellationToken,
    ) -> Result<Reply> {
        let args = AssertUnwindSafe(self.resolver.resolve_all(&ctx, &method.params))
            .catch_unwind()
            .await
            .map_err(|panic| panicked(&method.full_name, panic))??;
        cancel.check()?;

        let call = CallContext {
            id: ctx.id,
            method: ctx.method,
            cancel: cancel.clone(),
        };
        let handler = method.handler.clone();
        let future = std::panic::catch_unwind(AssertUnwindSafe(move || handler.call(args, call)))
            .map_err(|panic| panicked(&method.full_name, panic))?;

        let outcome = guard(future, &method.full_name).await?;
        self.settle(outcome, &cancel, &method.full_name).await
    }

    /// Await deferred outcomes one level at a time, up to `max_unwrap_depth`.
    async fn settle(&self, outcome: Outcome, cancel: &CancellationToken, method: &str) -> Result<Reply> {
        let mut outcome = outcome;
        let mut depth = 0;
        loop {
            match outcome {
                Outcome::Ready(reply) => return Ok(reply),
                Outcome::Deferred(next) => {
                    if depth >= self.options.max_unwrap_depth {
                        return Err(RpcError::internal(format!(
                            "Result of {} is still pending after {} levels",
                            method, self.options.max_unwrap_depth
                        )));
                    }
                    depth += 1;
                    cancel.check()?;
                    outcome = guard(next, method).await?;
                }
            }
        }
    }

    fn finish_reply(&self, id: Option<Value>, reply: Reply, method: &MethodDescriptor) -> Dispatched {
        if id.is_none() {
            debug!("Notification {} completed", method.full_name);
            return Dispatched::Suppressed;
        }

        match reply {
            Reply::Json(value) => {
                let transform = method
                    .response_transform
                    .as_ref()
                    .unwrap_or(&self.options.response_transform);
                Dispatched::Response(ResponseEnvelope::success(id, transform.apply(value)))
            }
            Reply::Binary(payload) => Dispatched::Binary { id, payload },
            Reply::NoContent => Dispatched::NoContent { id },
        }
    }

    fn finish_error(&self, id: Option<Value>, err: RpcError) -> Dispatched {
        if id.is_none() {
            debug!("Suppressing error for notification: {}", err);
            return Dispatched::Suppressed;
        }
        self.emit_error(id, err)
    }

    fn emit_error(&self, id: Option<Value>, err: RpcError) -> Dispatched {
        if err.is_server_fault() {
            error!("RPC error ({}): {}", err.code(), err);
        } else {
            debug!("RPC error ({}): {}", err.code(), err);
        }
        Dispatched::Response(ResponseEnvelope::from_rpc_error(
            id,
            &err,
            self.options.development,
        ))
    }
}

fn is_empty_params(params: &Value) -> bool {
    match params {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Await a handler future, turning a panic into an internal error.
async fn guard(future: HandlerFuture, method: &str) -> Result<Outcome> {
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(panicked(method, panic)),
    }
}

fn panicked(method: &str, panic: Box<dyn Any + Send>) -> RpcError {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    RpcError::internal(format!("Call to {} panicked: {}", method, detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MethodDecl, ParamDecl};
    use crate::handler::{handler_fn, sync_fn, Args};
    use crate::transform::ResponseTransform;
    use serde_json::json;

    fn nested(levels: usize) -> Outcome {
        if levels == 0 {
            Outcome::from(json!(1))
        } else {
            Outcome::deferred(async move { Ok::<_, RpcError>(nested(levels - 1)) })
        }
    }

    fn dispatcher(options: DispatchOptions) -> Dispatcher {
        let registry = Registry::builder()
            .method(
                MethodDecl::new(
                    "math",
                    "add",
                    sync_fn(|args: Args| {
                        let nums: Vec<f64> = args.parse(0)?;
                        Ok(json!(nums.iter().sum::<f64>() as i64))
                    }),
                )
                .param(ParamDecl::params().required(true)),
            )
            .method(
                MethodDecl::new("util", "nothing", sync_fn(|_args: Args| Ok(())))
                    .param(ParamDecl::params()),
            )
            .method(
                MethodDecl::new(
                    "util",
                    "bytes",
                    sync_fn(|_args: Args| Ok(Bytes::from_static(b"\x01\x02"))),
                )
                .param(ParamDecl::params()),
            )
            .method(
                MethodDecl::new(
                    "util",
                    "record",
                    sync_fn(|_args: Args| Ok(json!({"name": "a", "_secret": "x"}))),
                )
                .param(ParamDecl::params())
                .response_transform(ResponseTransform::new().exclude_prefix("_")),
            )
            .method(
                MethodDecl::new(
                    "util",
                    "boom",
                    sync_fn(|_args: Args| -> Result<Value> { panic!("kaboom") }),
                )
                .param(ParamDecl::params()),
            )
            .method(
                MethodDecl::new(
                    "util",
                    "forever",
                    handler_fn(|_args: Args, _ctx: CallContext| async move {
                        Ok::<_, RpcError>(nested(2))
                    }),
                )
                .param(ParamDecl::params()),
            )
            .build()
            .unwrap();
        Dispatcher::new(Arc::new(registry), options)
    }

    fn error_code(d: &Dispatched) -> i32 {
        d.envelope().and_then(|e| e.error_object()).map(|e| e.code).unwrap()
    }

    #[tokio::test]
    async fn test_sums_params() {
        let d = dispatcher(DispatchOptions::default())
            .execute(&json!({"jsonrpc": "2.0", "id": 1, "method": "math.add", "params": [2, 3]}))
            .await;
        assert_eq!(
            serde_json::to_value(d.envelope().unwrap()).unwrap(),
            json!({"jsonrpc": "2.0", "id": 1, "result": 5})
        );
    }

    #[tokio::test]
    async fn test_shape_checks_in_order() {
        let d = dispatcher(DispatchOptions::default());

        let non_object = d.execute(&json!("hello")).await;
        assert_eq!(error_code(&non_object), -32700);
        assert_eq!(non_object.envelope().unwrap().id, Value::Null);

        // params missing wins over unknown method
        assert_eq!(error_code(&d.execute(&json!({"id": 1, "method": "nope"})).await), -32600);
        assert_eq!(error_code(&d.execute(&json!({"id": 1, "method": "x", "params": 3})).await), -32600);
        assert_eq!(error_code(&d.execute(&json!({"id": 1, "params": [1]})).await), -32601);
        assert_eq!(error_code(&d.execute(&json!({"id": 1, "method": 5, "params": [1]})).await), -32600);
        assert_eq!(error_code(&d.execute(&json!({"id": 1, "method": "nope", "params": []})).await), -32601);
        assert_eq!(error_code(&d.execute(&json!({"id": 1, "method": "math.add", "params": {}})).await), -32602);
    }

    #[tokio::test]
    async fn test_unknown_method_echoes_id() {
        let d = dispatcher(DispatchOptions::default())
            .execute(&json!({"jsonrpc": "2.0", "id": "abc", "method": "math.nope", "params": [1]}))
            .await;
        let envelope = d.envelope().unwrap();
        assert_eq!(envelope.id, json!("abc"));
        assert_eq!(envelope.error_object().unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_invalid_id_type_is_invalid_request_with_null_id() {
        let d = dispatcher(DispatchOptions::default())
            .execute(&json!({"id": [1], "method": "math.add", "params": [1]}))
            .await;
        assert_eq!(error_code(&d), -32600);
        assert_eq!(d.envelope().unwrap().id, Value::Null);
    }

    #[tokio::test]
    async fn test_notifications_are_suppressed() {
        let d = dispatcher(DispatchOptions::default());
        assert!(d.execute(&json!({"method": "math.add", "params": [1, 1]})).await.is_suppressed());
        assert!(d.execute(&json!({"method": "math.nope", "params": [1]})).await.is_suppressed());
        assert!(d.execute(&json!({"method": "math.add"})).await.is_suppressed());
    }

    #[tokio::test]
    async fn test_empty_params_rejection_can_be_disabled() {
        let d = dispatcher(DispatchOptions::default().reject_empty_params(false));
        let out = d.execute(&json!({"id": 1, "method": "util.nothing", "params": []})).await;
        assert_eq!(out, Dispatched::NoContent { id: Some(json!(1)) });

        // the required params bag still catches it
        let out = d.execute(&json!({"id": 2, "method": "math.add", "params": []})).await;
        assert_eq!(out.envelope().unwrap().error_object().unwrap().message, "Params empty");
    }

    #[tokio::test]
    async fn test_binary_and_transform() {
        let d = dispatcher(DispatchOptions::default());
        let out = d.execute(&json!({"id": 1, "method": "util.bytes", "params": [0]})).await;
        assert_eq!(
            out,
            Dispatched::Binary {
                id: Some(json!(1)),
                payload: Bytes::from_static(b"\x01\x02")
            }
        );
        assert_eq!(out.into_envelope().unwrap().result(), Some(&json!([1, 2])));

        let out = d.execute(&json!({"id": 2, "method": "util.record", "params": [0]})).await;
        assert_eq!(out.envelope().unwrap().result(), Some(&json!({"name": "a"})));
    }

    #[tokio::test]
    async fn test_panicking_handler_is_internal_error() {
        let out = dispatcher(DispatchOptions::default().development(false))
            .execute(&json!({"id": 1, "method": "util.boom", "params": [0]}))
            .await;
        let err = out.envelope().unwrap().error_object().unwrap().clone();
        assert_eq!(err.code, -32603);
        assert!(err.message.contains("kaboom"));
        assert!(err.data.is_none());
    }

    #[tokio::test]
    async fn test_unwrap_depth_is_bounded() {
        let shallow = dispatcher(DispatchOptions::default().max_unwrap_depth(1));
        let out = shallow
            .execute(&json!({"id": 1, "method": "util.forever", "params": [0]}))
            .await;
        assert_eq!(error_code(&out), -32603);

        let deep = dispatcher(DispatchOptions::default());
        let out = deep
            .execute(&json!({"id": 1, "method": "util.forever", "params": [0]}))
            .await;
        assert_eq!(out.envelope().unwrap().result(), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_cancelled_before_invoke() {
        let token = CancellationToken::new();
        token.cancel();
        let out = dispatcher(DispatchOptions::default())
            .execute_with(&json!({"id": 1, "method": "math.add", "params": [1]}), token)
            .await;
        assert_eq!(error_code(&out), -32000);
    }

    #[tokio::test]
    async fn test_pre_matched_method_skips_lookup() {
        let d = dispatcher(DispatchOptions::default());
        let add = d.registry().get("math.add").cloned();

        let out = d
            .execute_matched(
                &json!({"id": 1, "method": "sum", "params": [2, 3]}),
                add.clone(),
                CancellationToken::new(),
            )
            .await;
        assert_eq!(out.envelope().unwrap().result(), Some(&json!(5)));

        // shape checks still run before the matched method is used
        let out = d
            .execute_matched(&json!({"id": 2, "method": "sum"}), add, CancellationToken::new())
            .await;
        assert_eq!(error_code(&out), -32600);

        let out = d
            .execute_matched(
                &json!({"id": 3, "method": "sum", "params": [1]}),
                None,
                CancellationToken::new(),
            )
            .await;
        assert_eq!(error_code(&out), -32601);
    }

    #[tokio::test]
    async fn test_development_flag_controls_stack() {
        let request = json!({"id": 1, "method": "math.add", "params": ["x"]});

        let dev = dispatcher(DispatchOptions::default().development(true)).execute(&request).await;
        let data = dev.envelope().unwrap().error_object().unwrap().data.clone().unwrap();
        assert_eq!(data["name"], "InvalidParamsError");
        assert!(data["stack"].is_string());

        let prod = dispatcher(DispatchOptions::default().development(false)).execute(&request).await;
        assert!(prod.envelope().unwrap().error_object().unwrap().data.is_none());
    }
}
