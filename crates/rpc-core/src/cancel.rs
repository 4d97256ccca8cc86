//! Cancellation token handed to handlers through the call context.
//!
//! The dispatcher never cancels on its own. Transports (or handlers that
//! spawn work) may cancel a request's token; the dispatcher observes it
//! before invoking the handler and between deferred-result steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::RpcError;

/// A cancellation token for cooperative cancellation of a single call.
///
/// Clones share state: cancelling any clone cancels them all.
///
/// # Example
///
/// ```
/// use rpc_dispatch::CancellationToken;
///
/// let token = CancellationToken::new();
/// let seen_by_handler = token.clone();
///
/// token.cancel();
/// assert!(seen_by_handler.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Err(CancelledError)` once cancellation has been requested.
    pub fn check(&self) -> Result<(), CancelledError> {
        if self.is_cancelled() {
            Err(CancelledError)
        } else {
            Ok(())
        }
    }
}

/// Error returned when a call is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelledError;

impl std::fmt::Display for CancelledError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Request cancelled")
    }
}

impl std::error::Error for CancelledError {}

impl From<CancelledError> for RpcError {
    fn from(err: CancelledError) -> Self {
        RpcError::server(err.to_string())
    }
}
