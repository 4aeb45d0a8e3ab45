//! Single-use challenges issued by the remote service.

use thiserror::Error;

use crate::rpc::{
    FieldSpec, FromWire, MappingError, RateLimitedClient, RpcError, StructReader, Value, WireShape,
};

use super::hasher::{AuthResponse, derive_response};
use super::identity::Identity;

pub const GET_CHALLENGE_METHOD: &str = "LJ.XMLRPC.getchallenge";

/// Server-issued challenge. Consumed by exactly one authenticated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub token: String,
    pub auth_scheme: String,
    pub expire_time: Option<i64>,
    pub server_time: Option<i64>,
}

impl WireShape for Challenge {
    const SHAPE: &'static str = "Challenge";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("token", "challenge"),
        FieldSpec::new("auth_scheme", "auth_scheme"),
        FieldSpec::new("expire_time", "expire_time"),
        FieldSpec::new("server_time", "server_time"),
    ];
}

impl FromWire for Challenge {
    fn from_wire(value: &Value) -> Result<Self, MappingError> {
        let reader = StructReader::<Self>::new(value)?;
        Ok(Self {
            token: reader.required("token")?,
            auth_scheme: reader.optional("auth_scheme")?.unwrap_or_default(),
            expire_time: reader.optional("expire_time")?,
            server_time: reader.optional("server_time")?,
        })
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication challenge unavailable: {0}")]
    ChallengeUnavailable(#[source] RpcError),
}

/// Challenge token paired with the response derived from it.
#[derive(Debug, Clone)]
pub struct AuthProof {
    pub username: String,
    pub challenge: String,
    pub response: AuthResponse,
}

/// Fetches challenges through the shared rate-limited client.
pub struct ChallengeProvider<'a> {
    client: &'a RateLimitedClient,
}

impl<'a> ChallengeProvider<'a> {
    pub fn new(client: &'a RateLimitedClient) -> Self {
        Self { client }
    }

    /// One round-trip, one limiter slot. No retry on failure.
    pub async fn obtain(&self) -> Result<Challenge, AuthError> {
        self.client
            .call_without_params(GET_CHALLENGE_METHOD)
            .await
            .map_err(AuthError::ChallengeUnavailable)
    }

    /// Obtains a fresh challenge and answers it for `identity`.
    pub async fn authenticate(&self, identity: &Identity) -> Result<AuthProof, AuthError> {
        let challenge = self.obtain().await?;
        let response = derive_response(&challenge, identity.secret());
        Ok(AuthProof {
            username: identity.account().to_string(),
            challenge: challenge.token,
            response,
        })
    }
}
