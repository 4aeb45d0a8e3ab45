//! Rate-limited RPC client shared by every session operation.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::limiter::FixedRateLimiter;
use super::mapping::{FromWire, ToWire};
use super::transport::{ProtocolError, RpcError, RpcTransport, TransportError};
use super::value::Value;

/// Wraps a transport with a fixed-rate throttle and typed request/response
/// mapping. Owns the transport for the lifetime of a run.
pub struct RateLimitedClient {
    transport: Arc<dyn RpcTransport>,
    limiter: FixedRateLimiter,
    closed: AtomicBool,
}

impl RateLimitedClient {
    pub fn new(transport: Arc<dyn RpcTransport>, ceiling: NonZeroU32) -> Self {
        Self::with_limiter(transport, FixedRateLimiter::per_second(ceiling))
    }

    pub fn with_limiter(transport: Arc<dyn RpcTransport>, limiter: FixedRateLimiter) -> Self {
        Self {
            transport,
            limiter,
            closed: AtomicBool::new(false),
        }
    }

    /// Sends `request` as the single parameter of `method`.
    pub async fn call<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp, RpcError>
    where
        Req: ToWire + Sync,
        Resp: FromWire,
    {
        let param = request.to_wire().map_err(ProtocolError::from)?;
        let value = self.invoke(method, vec![param]).await?;
        Ok(Resp::from_wire(&value).map_err(ProtocolError::from)?)
    }

    /// Calls a method that takes no parameters.
    pub async fn call_without_params<Resp>(&self, method: &str) -> Result<Resp, RpcError>
    where
        Resp: FromWire,
    {
        let value = self.invoke(method, Vec::new()).await?;
        Ok(Resp::from_wire(&value).map_err(ProtocolError::from)?)
    }

    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        if self.is_closed() {
            return Err(TransportError::Closed.into());
        }

        self.limiter.acquire().await;
        log::debug!("calling {method}");

        self.transport.call(method, &params).await.inspect_err(|err| {
            log::debug!("{method} failed: {err}");
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Releases the transport. Only the first call reaches the transport.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.transport.close().await;
    }
}
