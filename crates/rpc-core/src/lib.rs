//! RPC Dispatch - transport-agnostic JSON-RPC 2.0 method dispatch.
//!
//! Methods are declared once at startup with per-parameter metadata and
//! collected into an immutable [`Registry`]. A [`Dispatcher`] matches
//! incoming envelopes against it, resolves and coerces parameters, invokes
//! the handler and turns every outcome, including failures, into a protocol
//! response. Transports plug in through the [`Driver`] trait.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rpc_dispatch::{sync_fn, Args, DispatchOptions, Dispatcher, MethodDecl, ParamDecl, Registry};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Registry::builder()
//!         .method(
//!             MethodDecl::new("math", "add", sync_fn(|args: Args| {
//!                 let nums: Vec<i64> = args.parse(0)?;
//!                 Ok(json!(nums.iter().sum::<i64>()))
//!             }))
//!             .param(ParamDecl::params().required(true)),
//!         )
//!         .build()
//!         .unwrap();
//!
//!     let dispatcher = Dispatcher::new(Arc::new(registry), DispatchOptions::default());
//!     let out = dispatcher
//!         .handle(&json!({"jsonrpc": "2.0", "id": 1, "method": "math.add", "params": [2, 3]}))
//!         .await
//!         .and_then(|out| out.into_json());
//!
//!     assert_eq!(out, Some(json!({"jsonrpc": "2.0", "id": 1, "result": 5})));
//! }
//! ```

pub mod batch;
pub mod cancel;
pub mod capability;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod driver;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod registry;
pub mod resolver;
pub mod transform;

// Re-export commonly used types
pub use batch::Output;
pub use cancel::{CancellationToken, CancelledError};
pub use capability::{
    Coercer, FieldKind, FnValidator, PassThrough, ShapeRules, TransformOptions, ValidationOptions,
    Validator, Violation,
};
pub use config::{DispatchConfig, DispatchOptions};
pub use descriptor::{
    MethodDecl, MethodDescriptor, ParamDecl, ParamDescriptor, ParamSource, TargetType,
    ValidateMode,
};
pub use dispatcher::{Dispatched, Dispatcher};
pub use driver::{attach, encode, Driver, Encoded, Entrypoint};
pub use envelope::{ErrorObject, RequestEnvelope, ResponseBody, ResponseEnvelope};
pub use error::{code, CoercionError, RegistryError, Result, RpcError};
pub use handler::{handler_fn, sync_fn, Args, CallContext, Handler, Outcome, Reply};
pub use registry::{Registry, RegistryBuilder};
pub use resolver::{ParamResolver, RequestContext};
pub use transform::ResponseTransform;
