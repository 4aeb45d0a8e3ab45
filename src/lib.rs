//! # ljmigrate
//!
//! One-off migration of a LiveJournal account: every entry whose body links
//! to the decommissioned S3 bucket is rewritten to point at the new media
//! domain.
//!
//! ## Features
//!
//! - Challenge-response authentication, a fresh challenge for every call
//! - Fixed-rate throttling of all XML-RPC traffic (4 calls per second)
//! - Oldest-first walk over the journal, tolerant of per-entry failures
//! - Dry-run mode and a JSON run report
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ljmigrate::{Identity, MigrationConfig, Migrator, ReqwestTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MigrationConfig::builder().dry_run(true).build()?;
//!     let transport = ReqwestTransport::new(
//!         config.endpoint.clone(),
//!         &config.user_agent,
//!         config.request_timeout,
//!     )?;
//!     let identity = Identity::new("username", "password");
//!
//!     let report = Migrator::new(config)?
//!         .run(Arc::new(transport), &identity)
//!         .await?;
//!     println!("rewrote {} entries", report.entries_rewritten);
//!     Ok(())
//! }
//! ```

mod migrator;

pub mod auth;
pub mod config;
pub mod rewrite;
pub mod rpc;
pub mod session;

pub use crate::migrator::{
    FailedEntry,
    MigrationError,
    MigrationReport,
    MigrationResult,
    Migrator,
    processing_order,
};

pub use crate::auth::{
    AuthError,
    AuthProof,
    AuthResponse,
    Challenge,
    ChallengeProvider,
    Identity,
    Secret,
    derive_response,
};

pub use crate::config::{ConfigError, MigrationConfig, MigrationConfigBuilder};

pub use crate::rewrite::RewriteRule;

pub use crate::rpc::{
    FixedRateLimiter,
    ProtocolError,
    RateLimitedClient,
    ReqwestTransport,
    RpcError,
    RpcTransport,
    TransportError,
    Value,
};

pub use crate::session::{
    CallFailure,
    DayCount,
    EditResult,
    Entry,
    LoginOutcome,
    Session,
    SessionError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
