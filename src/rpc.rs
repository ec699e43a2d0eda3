//! JSON-RPC 2.0 wire types spoken by the media server.
//!
//! Every request carries the fixed id `"XBMCMD"`: the client is strictly
//! sequential, so there is never more than one reply to correlate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version marker sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request id sent with every request.
pub const REQUEST_ID: &str = "XBMCMD";

/// An outbound JSON-RPC request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub jsonrpc: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Map<String, Value>>) -> Self {
        Self {
            method: method.into(),
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: REQUEST_ID.to_string(),
            params,
        }
    }
}

/// A parsed JSON-RPC reply. Exactly one of `result`/`error` is expected, but
/// both are optional so a sloppy server does not turn into a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorData>,
}

impl RpcResponse {
    #[cfg(test)]
    pub(crate) fn success(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn failure(error: RpcErrorData) -> Self {
        Self {
            result: None,
            error: Some(error),
        }
    }

    /// Split into the `result` value or the server's `error` object.
    ///
    /// A reply with neither field yields `Value::Null` as its result.
    pub fn into_result(self) -> Result<Value, RpcErrorData> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// The `error` member of a JSON-RPC reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct RpcErrorData {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[cfg(test)]
impl RpcErrorData {
    pub(crate) fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}
