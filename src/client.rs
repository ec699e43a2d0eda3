//! HTTP transport for the media server's JSON-RPC endpoint.
//!
//! [`HttpTransport`] wraps `reqwest::Client` and POSTs each [`RpcRequest`] as
//! `application/json` to the configured endpoint. The reply body is parsed
//! into an [`RpcResponse`] and returned as-is: an RPC-level `error` member is
//! *not* a transport failure, the caller decides what it means.
//!
//! ## Error handling
//!
//! Connection failures, non-2xx statuses and bodies that are not JSON-RPC
//! replies all surface as [`TransportError`]. For non-2xx responses the body is
//! searched for an `error.message` field; if there is none the raw body is
//! used as the message.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::rpc::{RpcRequest, RpcResponse};

/// Something that can carry a JSON-RPC request to the server.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse, TransportError>;
}

/// Optional HTTP basic-auth credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

/// JSON-RPC over HTTP POST.
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    /// Create a transport for the endpoint at `url`.
    ///
    /// With `timeout` unset the request timeout is left to reqwest's default.
    pub fn new(
        url: impl Into<String>,
        credentials: Option<Credentials>,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder.build().map_err(TransportError::Request)?;
        Ok(Self {
            http,
            url: url.into(),
            credentials,
        })
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parse an HTTP response into an [`RpcResponse`], or a [`TransportError`]
    /// describing why it isn't one.
    async fn handle_response(resp: reqwest::Response) -> Result<RpcResponse, TransportError> {
        let status = resp.status();
        let body = resp.text().await.map_err(TransportError::Request)?;
        debug!(status = status.as_u16(), bytes = body.len(), "response");

        if status.is_success() {
            parse_body(&body)
        } else {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or(body);
            Err(TransportError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse, TransportError> {
        debug!(method = %request.method, params = ?request.params, "request");
        let body = serde_json::to_vec(request)?;
        let mut builder = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(c) = &self.credentials {
            builder = builder.basic_auth(&c.username, c.password.as_ref());
        }
        let resp = builder.send().await.map_err(TransportError::Request)?;
        Self::handle_response(resp).await
    }
}

/// Parse a 2xx body. It must be a JSON object; anything else is a protocol
/// error rather than an empty reply.
pub fn parse_body(body: &str) -> Result<RpcResponse, TransportError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| TransportError::Protocol(format!("invalid JSON from server: {e}")))?;
    if !value.is_object() {
        return Err(TransportError::Protocol(format!(
            "expected a JSON-RPC object, got {value}"
        )));
    }
    serde_json::from_value(value)
        .map_err(|e| TransportError::Protocol(format!("malformed JSON-RPC reply: {e}")))
}

/// Errors returned by [`Transport::send`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, timeout, DNS failure and the like.
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),
    /// The server answered with a non-2xx status.
    #[error("server error (HTTP {status}): {message}")]
    Status { status: u16, message: String },
    /// The body was not a JSON-RPC reply.
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}
