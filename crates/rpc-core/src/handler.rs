//! Handler contract: what a registered method is called with and what it
//! may return.
//!
//! A handler receives the resolved arguments ordered by parameter index and
//! returns an [`Outcome`]. An outcome is either settled ([`Reply`]) or
//! deferred, i.e. another future producing an outcome. The dispatcher
//! awaits deferred outcomes one level at a time.

use std::fmt;
use std::future::Future;

use bytes::Bytes;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::cancel::CancellationToken;
use crate::error::{Result, RpcError};

/// Settled handler result.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json(Value),
    /// Raw bytes for the transport; never reshaped.
    Binary(Bytes),
    /// The handler produced nothing (not the same as `null`).
    NoContent,
}

/// Handler result, possibly still pending.
pub enum Outcome {
    Ready(Reply),
    Deferred(BoxFuture<'static, Result<Outcome>>),
}

impl Outcome {
    /// Wrap a future whose output is another outcome.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Outcome>> + Send + 'static,
    {
        Outcome::Deferred(Box::pin(future))
    }

    /// Serialize a typed value into a JSON reply.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Outcome::Ready(Reply::Json(serde_json::to_value(value)?)))
    }

    /// Ready outcome with no value.
    pub fn no_content() -> Self {
        Outcome::Ready(Reply::NoContent)
    }

    /// Whether the outcome still has to be awaited.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Outcome::Deferred(_))
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ready(reply) => f.debug_tuple("Ready").field(reply).finish(),
            Outcome::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Reply> for Outcome {
    fn from(reply: Reply) -> Self {
        Outcome::Ready(reply)
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Ready(Reply::Json(value))
    }
}

impl From<Bytes> for Outcome {
    fn from(bytes: Bytes) -> Self {
        Outcome::Ready(Reply::Binary(bytes))
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::no_content()
    }
}

/// Resolved arguments, ordered by parameter index.
///
/// `None` marks an undefined argument, `Some(Value::Null)` an explicit null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Option<Value>>,
}

impl Args {
    /// Arguments in parameter-index order.
    pub fn new(values: Vec<Option<Value>>) -> Self {
        Self { values }
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the method declares no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Argument `index`, or `None` if undefined.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Whether argument `index` resolved to undefined.
    pub fn is_undefined(&self, index: usize) -> bool {
        self.get(index).is_none()
    }

    /// Deserialize argument `index` into `T`; undefined reads as `null`.
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let value = self.get(index).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            RpcError::invalid_params(format!("Argument {} is invalid: {}", index, e))
        })
    }

    /// All arguments with undefined ones replaced by `null`.
    pub fn into_values(self) -> Vec<Value> {
        self.values
            .into_iter()
            .map(|v| v.unwrap_or(Value::Null))
            .collect()
    }
}

/// Per-call context passed alongside the arguments.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub id: Option<Value>,
    pub method: String,
    pub cancel: CancellationToken,
}

impl CallContext {
    /// Whether the caller expects no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

pub type HandlerFuture = BoxFuture<'static, Result<Outcome>>;

/// A callable bound to a method at registration time.
pub trait Handler: Send + Sync {
    fn call(&self, args: Args, ctx: CallContext) -> HandlerFuture;
}

/// Async closure adapter, see [`handler_fn`].
pub struct FnHandler<F>(F);

/// Wrap an async closure `(Args, CallContext) -> Result<impl Into<Outcome>>`.
pub fn handler_fn<F, Fut, R>(f: F) -> FnHandler<F>
where
    F: Fn(Args, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Into<Outcome>,
{
    FnHandler(f)
}

impl<F, Fut, R> Handler for FnHandler<F>
where
    F: Fn(Args, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Into<Outcome>,
{
    fn call(&self, args: Args, ctx: CallContext) -> HandlerFuture {
        let fut = (self.0)(args, ctx);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

/// Synchronous closure adapter, see [`sync_fn`].
pub struct SyncHandler<F>(F);

/// Wrap a plain closure `Args -> Result<impl Into<Outcome>>`.
pub fn sync_fn<F, R>(f: F) -> SyncHandler<F>
where
    F: Fn(Args) -> Result<R> + Send + Sync + 'static,
    R: Into<Outcome>,
{
    SyncHandler(f)
}

impl<F, R> Handler for SyncHandler<F>
where
    F: Fn(Args) -> Result<R> + Send + Sync + 'static,
    R: Into<Outcome>,
{
    fn call(&self, args: Args, _ctx: CallContext) -> HandlerFuture {
        let result = (self.0)(args).map(Into::into);
        Box::pin(async move { result })
    }
}
