//! Reqwest-based implementation of the `RpcTransport` trait.
//!
//! Posts encoded `methodCall` documents to a single HTTPS endpoint and hands
//! the response body to the decoder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use url::Url;

use super::codec::{decode_response, encode_call};
use super::transport::{ProtocolError, RpcError, RpcTransport, TransportError};
use super::value::Value;

const XML_CONTENT_TYPE: &str = "text/xml";

/// Reqwest-backed XML-RPC transport bound to one endpoint.
pub struct ReqwestTransport {
    client: Client,
    endpoint: Url,
    closed: AtomicBool,
}

impl ReqwestTransport {
    /// Creates a transport with its own connection pool.
    pub fn new(
        endpoint: Url,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|err| TransportError::Http(format!("invalid user agent: {err}")))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Http(err.to_string()))?;

        Ok(Self::from_client(client, endpoint))
    }

    /// Wrap an existing reqwest client. The client is expected to send the
    /// `text/xml` content type on its own.
    pub fn from_client(client: Client, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            closed: AtomicBool::new(false),
        }
    }

    async fn post(&self, body: String) -> Result<Bytes, TransportError> {
        let response = self
            .client
            .post(self.endpoint.as_str())
            .body(body)
            .send()
            .await
            .map_err(|err| TransportError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|err| TransportError::Http(err.to_string()))
    }
}

#[async_trait]
impl RpcTransport for ReqwestTransport {
    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed.into());
        }

        let request = encode_call(method, params);
        log::trace!("-> {} {}\n{}", method, self.endpoint, request);

        let body = self.post(request).await?;
        let text = String::from_utf8(body.to_vec()).map_err(|err| {
            ProtocolError::Malformed(format!("response is not valid utf-8: {err}"))
        })?;
        log::trace!("<- {}\n{}", method, text);

        Ok(decode_response(&text)?)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            log::debug!("closed xml-rpc transport for {}", self.endpoint);
        }
    }
}
