//! Challenge-response digest.
//!
//! The remote service verifies `hex(md5(challenge ++ hex(md5(password))))`.
//! The intermediate digest is concatenated as lowercase hex text, not as raw
//! bytes. This scheme is fixed by the remote API.

use std::fmt;

use super::challenge::Challenge;
use super::identity::Secret;

/// Client-computed proof for one challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthResponse(String);

impl AuthResponse {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthResponse").field(&"<redacted>").finish()
    }
}

/// Derives the response for `challenge` from `secret`.
pub fn derive_response(challenge: &Challenge, secret: &Secret) -> AuthResponse {
    let secret_digest = format!("{:x}", md5::compute(secret.expose().as_bytes()));
    let mut material = String::with_capacity(challenge.token.len() + secret_digest.len());
    material.push_str(&challenge.token);
    material.push_str(&secret_digest);
    AuthResponse(format!("{:x}", md5::compute(material.as_bytes())))
}
