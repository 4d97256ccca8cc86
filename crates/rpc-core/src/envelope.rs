//! JSON-RPC 2.0 envelope types.
//!
//! ```text
//! request:  { "jsonrpc": "2.0", "id": 1, "method": "math.add", "params": [2, 3] }
//! success:  { "jsonrpc": "2.0", "id": 1, "result": 5 }
//! failure:  { "jsonrpc": "2.0", "id": 1, "error": { "code": -32602, "message": "..." } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DispatchConfig;
use crate::error::RpcError;

/// JSON-RPC 2.0 request. A missing `id` makes it a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RequestEnvelope {
    /// A call expecting a response.
    pub fn new(method: impl Into<String>, params: Value, id: impl Into<Value>) -> Self {
        Self {
            jsonrpc: DispatchConfig::PROTOCOL_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params: Some(params),
        }
    }

    /// A call without an id.
    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: DispatchConfig::PROTOCOL_VERSION.to_string(),
            id: None,
            method: method.into(),
            params: Some(params),
        }
    }

    /// Whether no response is expected.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Raw JSON form, as a transport would hand it to the dispatcher.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// JSON-RPC 2.0 response. Carries exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(flatten)]
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseBody {
    Result(Value),
    Error(ErrorObject),
}

impl ResponseEnvelope {
    /// Success envelope echoing `id` (`null` when absent).
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: DispatchConfig::PROTOCOL_VERSION.to_string(),
            id: id.unwrap_or(Value::Null),
            body: ResponseBody::Result(result),
        }
    }

    /// Error envelope echoing `id` (`null` when absent).
    pub fn error(id: Option<Value>, error: ErrorObject) -> Self {
        Self {
            jsonrpc: DispatchConfig::PROTOCOL_VERSION.to_string(),
            id: id.unwrap_or(Value::Null),
            body: ResponseBody::Error(error),
        }
    }

    /// Error envelope rendered from an [`RpcError`].
    pub fn from_rpc_error(id: Option<Value>, err: &RpcError, development: bool) -> Self {
        Self::error(id, err.to_error_object(development))
    }

    /// The result, if this is a success.
    pub fn result(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Result(value) => Some(value),
            ResponseBody::Error(_) => None,
        }
    }

    /// The error object, if this is a failure.
    pub fn error_object(&self) -> Option<&ErrorObject> {
        match &self.body {
            ResponseBody::Result(_) => None,
            ResponseBody::Error(err) => Some(err),
        }
    }

    /// Whether this envelope carries an error.
    pub fn is_error(&self) -> bool {
        matches!(self.body, ResponseBody::Error(_))
    }

    /// JSON form of the envelope.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
