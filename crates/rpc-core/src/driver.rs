//! Transport seam.
//!
//! A [`Driver`] owns the wire. At startup it receives every registered
//! method and an [`Entrypoint`]; per request it decodes the body, calls the
//! entrypoint and writes back whatever comes out.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tracing::warn;

use crate::batch::Output;
use crate::cancel::CancellationToken;
use crate::descriptor::MethodDescriptor;
use crate::dispatcher::{Dispatched, Dispatcher};
use crate::envelope::ResponseEnvelope;
use crate::error::RpcError;

/// Transport adapter bound to a dispatcher at startup.
pub trait Driver {
    type Error;

    /// Called once with all registered methods and the dispatch entrypoint.
    fn register(
        &mut self,
        methods: Vec<Arc<MethodDescriptor>>,
        entry: Entrypoint,
    ) -> Result<(), Self::Error>;
}

/// Hand the dispatcher's registry and entrypoint to a driver.
pub fn attach<D: Driver>(dispatcher: Arc<Dispatcher>, driver: &mut D) -> Result<(), D::Error> {
    let methods = dispatcher.registry().descriptors().cloned().collect();
    driver.register(methods, Entrypoint::new(dispatcher))
}

/// Per-request entry into the dispatcher.
#[derive(Clone)]
pub struct Entrypoint {
    dispatcher: Arc<Dispatcher>,
}

impl Entrypoint {
    /// Wrap a shared dispatcher.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// The dispatcher behind this entrypoint.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Dispatch a decoded body. A transport-level decode error short-circuits
    /// into an error response with a null id.
    pub async fn handle(&self, decode_error: Option<RpcError>, body: Value) -> Option<Output> {
        self.handle_with(decode_error, body, CancellationToken::new()).await
    }

    /// Dispatch a decoded body with a caller-owned cancellation token.
    pub async fn handle_with(
        &self,
        decode_error: Option<RpcError>,
        body: Value,
        cancel: CancellationToken,
    ) -> Option<Output> {
        self.handle_matched(decode_error, body, None, cancel).await
    }

    /// Dispatch a decoded body together with the method the transport
    /// matched for it, if any. A matched method skips the registry lookup for
    /// a single envelope.
    pub async fn handle_matched(
        &self,
        decode_error: Option<RpcError>,
        body: Value,
        matched: Option<Arc<MethodDescriptor>>,
        cancel: CancellationToken,
    ) -> Option<Output> {
        if let Some(err) = decode_error {
            return Some(Output::Single(Dispatched::Response(
                ResponseEnvelope::from_rpc_error(None, &err, self.dispatcher.options().development),
            )));
        }
        self.dispatcher.handle_matched(&body, matched, cancel).await
    }

    /// Decode raw bytes as JSON and dispatch them.
    pub async fn handle_bytes(&self, body: &[u8]) -> Option<Output> {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => self.handle(None, value).await,
            Err(e) => {
                warn!("Failed to decode request body: {}", e);
                self.handle(Some(RpcError::parse(format!("Parse error: {}", e))), Value::Null)
                    .await
            }
        }
    }
}

/// Wire-ready form of an [`Output`].
#[derive(Debug, Clone, PartialEq)]
pub enum Encoded {
    Json(Bytes),
    Binary(Bytes),
    /// Nothing to write back.
    Empty,
}

/// Serialize a dispatch output for a byte-oriented transport.
pub fn encode(output: Option<Output>) -> Result<Encoded, serde_json::Error> {
    match output {
        None => Ok(Encoded::Empty),
        Some(Output::Single(Dispatched::Suppressed | Dispatched::NoContent { .. })) => {
            Ok(Encoded::Empty)
        }
        Some(Output::Single(Dispatched::Binary { payload, .. })) => Ok(Encoded::Binary(payload)),
        Some(Output::Single(Dispatched::Response(envelope))) => {
            Ok(Encoded::Json(Bytes::from(serde_json::to_vec(&envelope)?)))
        }
        Some(Output::Batch(envelopes)) => Ok(Encoded::Json(Bytes::from(serde_json::to_vec(&envelopes)?))),
    }
}
