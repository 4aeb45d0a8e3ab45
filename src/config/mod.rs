//! Run configuration.
//!
//! [`MigrationConfig`] carries every tunable of a run: endpoint, call rate,
//! pacing between edits and days, the rewrite rule, and dry-run mode. Build it
//! with [`MigrationConfigBuilder`] or start from `Default`.

use std::num::NonZeroU32;
use std::time::Duration;

use once_cell::sync::Lazy;
use thiserror::Error;
use url::Url;

use crate::rewrite::RewriteRule;

pub const DEFAULT_ENDPOINT: &str = "https://www.livejournal.com/interface/xmlrpc";
/// Remote usage policy ceiling, calls per second.
pub const DEFAULT_CALLS_PER_SECOND: u32 = 4;
const DEFAULT_RATE: NonZeroU32 = match NonZeroU32::new(DEFAULT_CALLS_PER_SECOND) {
    Some(rate) => rate,
    None => panic!("default call rate must be non-zero"),
};
pub const DEFAULT_EDIT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_DAY_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static DEFAULT_ENDPOINT_URL: Lazy<Url> =
    Lazy::new(|| Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid url"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid endpoint url: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("endpoint must use http or https, got '{0}'")]
    EndpointScheme(String),
    #[error("call rate must be at least one per second")]
    ZeroRate,
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub endpoint: Url,
    pub calls_per_second: NonZeroU32,
    pub edit_delay: Duration,
    pub day_delay: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub rewrite: RewriteRule,
    pub dry_run: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT_URL.clone(),
            calls_per_second: DEFAULT_RATE,
            edit_delay: DEFAULT_EDIT_DELAY,
            day_delay: DEFAULT_DAY_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: format!("ljmigrate/{}", crate::VERSION),
            rewrite: RewriteRule::default(),
            dry_run: false,
        }
    }
}

impl MigrationConfig {
    pub fn builder() -> MigrationConfigBuilder {
        MigrationConfigBuilder::new()
    }
}

/// Fluent builder for [`MigrationConfig`].
pub struct MigrationConfigBuilder {
    config: MigrationConfig,
    endpoint: Option<String>,
    calls_per_second: Option<u32>,
}

impl MigrationConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: MigrationConfig::default(),
            endpoint: None,
            calls_per_second: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_calls_per_second(mut self, rate: u32) -> Self {
        self.calls_per_second = Some(rate);
        self
    }

    pub fn with_edit_delay(mut self, delay: Duration) -> Self {
        self.config.edit_delay = delay;
        self
    }

    pub fn with_day_delay(mut self, delay: Duration) -> Self {
        self.config.day_delay = delay;
        self
    }

    /// Disables both edit and day pauses. The rate limiter still applies.
    pub fn without_pauses(self) -> Self {
        self.with_edit_delay(Duration::ZERO)
            .with_day_delay(Duration::ZERO)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn with_rewrite_rule(mut self, rule: RewriteRule) -> Self {
        self.config.rewrite = rule;
        self
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.config.dry_run = enabled;
        self
    }

    pub fn build(mut self) -> Result<MigrationConfig, ConfigError> {
        if let Some(raw) = self.endpoint {
            let endpoint = Url::parse(&raw)?;
            if !matches!(endpoint.scheme(), "http" | "https") {
                return Err(ConfigError::EndpointScheme(endpoint.scheme().to_string()));
            }
            self.config.endpoint = endpoint;
        }

        if let Some(rate) = self.calls_per_second {
            self.config.calls_per_second = NonZeroU32::new(rate).ok_or(ConfigError::ZeroRate)?;
        }

        Ok(self.config)
    }
}

impl Default for MigrationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
