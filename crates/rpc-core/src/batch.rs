//! Single-or-batch entry on top of [`Dispatcher`].

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::descriptor::MethodDescriptor;
use crate::dispatcher::{Dispatched, Dispatcher};
use crate::envelope::ResponseEnvelope;
use crate::error::RpcError;

/// What a decoded request body produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Single(Dispatched),
    /// Responses in request order, notifications omitted.
    Batch(Vec<ResponseEnvelope>),
}

impl Output {
    /// JSON form of the output. A single binary or no-content reply is
    /// rendered the same way it would be inside a batch.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Output::Single(dispatched) => dispatched
                .into_envelope()
                .map(|envelope| envelope.to_value()),
            Output::Batch(envelopes) => Some(Value::Array(
                envelopes.iter().map(ResponseEnvelope::to_value).collect(),
            )),
        }
    }
}

impl Dispatcher {
    /// Dispatch a decoded body: a single envelope or a batch.
    ///
    /// Returns `None` when nothing should be emitted.
    pub async fn handle(&self, body: &Value) -> Option<Output> {
        self.handle_with(body, CancellationToken::new()).await
    }

    /// Dispatch a decoded body with a caller-owned cancellation token.
    pub async fn handle_with(&self, body: &Value, cancel: CancellationToken) -> Option<Output> {
        self.handle_matched(body, None, cancel).await
    }

    /// Dispatch a decoded body against a method the transport already matched.
    ///
    /// `matched` applies to a single envelope only; batch items are always
    /// matched through the registry.
    pub async fn handle_matched(
        &self,
        body: &Value,
        matched: Option<Arc<MethodDescriptor>>,
        cancel: CancellationToken,
    ) -> Option<Output> {
        match body {
            Value::Array(items) if items.is_empty() => {
                Some(Output::Single(Dispatched::Response(ResponseEnvelope::from_rpc_error(
                    None,
                    &RpcError::invalid_request("Invalid request: empty batch"),
                    self.options().development,
                ))))
            }
            Value::Array(items) => {
                debug!("RPC batch of {} requests", items.len());
                let mut responses = Vec::with_capacity(items.len());
                // Items run in order; one failing item never affects the others.
                for item in items {
                    if let Some(envelope) = self.execute_with(item, cancel.clone()).await.into_envelope() {
                        responses.push(envelope);
                    }
                }
                if responses.is_empty() {
                    None
                } else {
                    Some(Output::Batch(responses))
                }
            }
            single => match self.execute_matched(single, matched, cancel).await {
                Dispatched::Suppressed => None,
                dispatched => Some(Output::Single(dispatched)),
            },
        }
    }
}
