//! Challenge-response authentication.

pub mod challenge;
pub mod hasher;
pub mod identity;

pub use challenge::{AuthError, AuthProof, Challenge, ChallengeProvider, GET_CHALLENGE_METHOD};
pub use hasher::{AuthResponse, derive_response};
pub use identity::{Identity, Secret};
