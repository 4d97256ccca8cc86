//! Error types for the dispatch engine.
//!
//! `RpcError` is the fixed protocol taxonomy every failure is mapped into
//! before it reaches a transport. `RegistryError` covers build-time problems
//! with method declarations, and `CoercionError` is what an injected
//! transform capability reports.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::capability::Violation;
use crate::envelope::ErrorObject;

/// Standard JSON-RPC 2.0 error codes.
pub mod code {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const SERVER_ERROR: i32 = -32000;
}

/// Protocol-level error raised while dispatching a request.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{message}")]
    Parse { message: String },

    #[error("{message}")]
    InvalidRequest { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("{message}")]
    InvalidParams {
        message: String,
        /// Name of the parameter that failed, when known.
        param: Option<String>,
        /// Structured violations reported by the validator.
        violations: Vec<Violation>,
    },

    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{message}")]
    Server { message: String },

    /// Handler-defined error with its own code (usually -32000..-32099).
    #[error("{message}")]
    Application {
        code: i32,
        message: String,
        data: Option<Value>,
    },
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, RpcError>;

impl RpcError {
    /// ParseError (-32700).
    pub fn parse(message: impl Into<String>) -> Self {
        RpcError::Parse {
            message: message.into(),
        }
    }

    /// InvalidRequestError (-32600).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        RpcError::InvalidRequest {
            message: message.into(),
        }
    }

    /// MethodNotFoundError (-32601) for `method`.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        RpcError::MethodNotFound {
            method: method.into(),
        }
    }

    /// InvalidParamsError (-32602) not tied to one parameter.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        RpcError::InvalidParams {
            message: message.into(),
            param: None,
            violations: Vec::new(),
        }
    }

    /// Invalid-params error attributed to a single parameter.
    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        RpcError::InvalidParams {
            message: message.into(),
            param: Some(param.into()),
            violations: Vec::new(),
        }
    }

    /// InternalError (-32603) without a source.
    pub fn internal(message: impl Into<String>) -> Self {
        RpcError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// ServerError (-32000).
    pub fn server(message: impl Into<String>) -> Self {
        RpcError::Server {
            message: message.into(),
        }
    }

    /// Handler-defined error with its own code, e.g. in -32000..-32099.
    pub fn application(code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        RpcError::Application {
            code,
            message: message.into(),
            data,
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// - -32700: Parse error
    /// - -32600: Invalid Request
    /// - -32601: Method not found
    /// - -32602: Invalid params
    /// - -32603: Internal error
    /// - -32000: Server error (fallback)
    pub fn code(&self) -> i32 {
        match self {
            RpcError::Parse { .. } => code::PARSE_ERROR,
            RpcError::InvalidRequest { .. } => code::INVALID_REQUEST,
            RpcError::MethodNotFound { .. } => code::METHOD_NOT_FOUND,
            RpcError::InvalidParams { .. } => code::INVALID_PARAMS,
            RpcError::Internal { .. } => code::INTERNAL_ERROR,
            RpcError::Server { .. } => code::SERVER_ERROR,
            RpcError::Application { code, .. } => *code,
        }
    }

    /// Name of the error kind, reported in `error.data.name` in development mode.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RpcError::Parse { .. } => "ParseError",
            RpcError::InvalidRequest { .. } => "InvalidRequestError",
            RpcError::MethodNotFound { .. } => "MethodNotFoundError",
            RpcError::InvalidParams { .. } => "InvalidParamsError",
            RpcError::Internal { .. } => "InternalError",
            RpcError::Server { .. } => "ServerError",
            RpcError::Application { .. } => "RpcError",
        }
    }

    /// Whether this is a failure of the server rather than of the caller.
    pub fn is_server_fault(&self) -> bool {
        matches!(self, RpcError::Internal { .. } | RpcError::Server { .. })
    }

    /// Render as a protocol error object.
    ///
    /// With `development` set, `data` also carries the kind name and a
    /// `stack` built from the error and its source chain.
    pub fn to_error_object(&self, development: bool) -> ErrorObject {
        let mut data = Map::new();

        match self {
            RpcError::InvalidParams {
                param, violations, ..
            } => {
                if let Some(param) = param {
                    data.insert("param".into(), Value::String(param.clone()));
                }
                if !violations.is_empty() {
                    data.insert("errors".into(), json!(violations));
                }
            }
            RpcError::Application {
                data: Some(Value::Object(extra)),
                ..
            } => {
                data.extend(extra.clone());
            }
            RpcError::Application {
                data: Some(other), ..
            } => {
                data.insert("value".into(), other.clone());
            }
            _ => {}
        }

        if development {
            data.insert("name".into(), Value::String(self.kind_name().into()));
            data.insert("stack".into(), Value::String(self.stack()));
        }

        ErrorObject {
            code: self.code(),
            message: self.to_string(),
            data: if data.is_empty() {
                None
            } else {
                Some(Value::Object(data))
            },
        }
    }

    fn stack(&self) -> String {
        let mut previous = self.to_string();
        let mut lines = vec![format!("{}: {}", self.kind_name(), previous)];
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let text = cause.to_string();
            // a wrapped anyhow error displays the same message as its wrapper
            if text != previous {
                lines.push(format!("    caused by: {}", text));
            }
            previous = text;
            source = cause.source();
        }
        lines.join("\n")
    }
}

impl From<anyhow::Error> for RpcError {
    fn from(err: anyhow::Error) -> Self {
        RpcError::Internal {
            message: err.to_string(),
            source: Some(err.into()),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Internal {
            message: format!("JSON error: {}", err),
            source: Some(err.into()),
        }
    }
}

/// Error raised while building the method registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Method name must not be empty (namespace {namespace:?})")]
    EmptyMethodName { namespace: String },

    #[error("Method {full_name} is registered more than once")]
    DuplicateMethod { full_name: String },

    #[error("Method {full_name} declares parameter index {index} more than once")]
    DuplicateParamIndex { full_name: String, index: usize },

    #[error("Method {full_name} has non-contiguous parameter indices: expected {expected}, found {found}")]
    NonContiguousParams {
        full_name: String,
        expected: usize,
        found: usize,
    },
}

/// Error reported by a transform capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct CoercionError {
    pub message: String,
}

impl CoercionError {
    /// Error with a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
