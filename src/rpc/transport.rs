//! Transport contract and the error taxonomy of the RPC layer.

use async_trait::async_trait;
use thiserror::Error;

use super::mapping::MappingError;
use super::value::Value;

/// Contract that abstracts the underlying connection used for XML-RPC calls.
///
/// Implementations own whatever connection state they need and release it in
/// [`RpcTransport::close`]. Calls after `close` must fail with
/// [`TransportError::Closed`].
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError>;

    async fn close(&self);
}

/// Failures reaching the remote endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http transport error: {0}")]
    Http(String),
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("connection already closed")]
    Closed,
}

/// Well-formed transport exchange carrying an unusable RPC payload.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("remote fault {code}: {message}")]
    Fault { code: i64, message: String },
    #[error("malformed xml-rpc document: {0}")]
    Malformed(String),
    #[error("response mapping failed: {0}")]
    Mapping(#[from] MappingError),
}

/// Error surfaced by a single RPC call.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl RpcError {
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Transport(_))
    }
}
