//! Migration driver.
//!
//! Logs in, walks the journal day by day from the oldest entry forward, and
//! rewrites legacy media links through the session façade. Login and the
//! day listing are fatal; failures on a single day or entry are recorded and
//! the walk continues.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::sleep;

use crate::auth::Identity;
use crate::config::MigrationConfig;
use crate::rpc::{MappingError, RateLimitedClient, RpcTransport};
use crate::session::{DayCount, Entry, Session, SessionError, validate_wire_mappings};

pub type MigrationResult<T> = Result<T, MigrationError>;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("account {account} is not validated{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    NotValidated {
        account: String,
        message: Option<String>,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("invalid wire mapping: {0}")]
    Mapping(#[from] MappingError),
}

/// Entry that could not be updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub day: String,
    pub item_id: Option<i64>,
    pub reason: String,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub days_total: usize,
    pub days_processed: usize,
    pub days_failed: Vec<String>,
    pub entries_examined: usize,
    pub entries_rewritten: usize,
    pub entries_unchanged: usize,
    pub failed_entries: Vec<FailedEntry>,
    /// Days in the order they were walked.
    pub processed_order: Vec<String>,
}

impl MigrationReport {
    pub fn has_failures(&self) -> bool {
        !self.days_failed.is_empty() || !self.failed_entries.is_empty()
    }
}

/// Reverses the server's newest-first listing.
pub fn processing_order(mut days: Vec<DayCount>) -> Vec<DayCount> {
    days.reverse();
    days
}

pub struct Migrator {
    config: MigrationConfig,
}

impl Migrator {
    /// Fails when a request or response mapping table is inconsistent.
    pub fn new(config: MigrationConfig) -> MigrationResult<Self> {
        validate_wire_mappings()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Runs the migration over `transport`, which is closed exactly once
    /// before this returns, on success and on failure alike.
    pub async fn run(
        &self,
        transport: Arc<dyn RpcTransport>,
        identity: &Identity,
    ) -> MigrationResult<MigrationReport> {
        let client = RateLimitedClient::new(transport, self.config.calls_per_second);
        let outcome = self.migrate(&client, identity).await;
        client.close().await;
        outcome
    }

    async fn migrate(
        &self,
        client: &RateLimitedClient,
        identity: &Identity,
    ) -> MigrationResult<MigrationReport> {
        let session = Session::new(client);

        let login = session.login(identity).await?;
        if login.is_rejected() {
            return Err(MigrationError::NotValidated {
                account: identity.account().to_string(),
                message: login.message,
            });
        }
        log::info!(
            "logged in as {} (userid {}, {})",
            identity.account(),
            login.user_id,
            login.full_name
        );
        if let Some(message) = login.message.as_deref() {
            log::info!("server message: {message}");
        }

        let days = processing_order(session.list_day_counts(identity).await?);
        let mut report = MigrationReport {
            dry_run: self.config.dry_run,
            days_total: days.len(),
            ..MigrationReport::default()
        };
        log::info!("{} days with entries", days.len());

        for (index, day) in days.iter().enumerate() {
            if index > 0 {
                pause(self.config.day_delay).await;
            }
            report.processed_order.push(day.date.clone());
            log::info!("{}: {} entries", day.date, day.count);

            let entries = match session.list_events(identity, &day.date).await {
                Ok(entries) => entries,
                Err(err) => {
                    log::error!("cannot download entries for {}: {err}", day.date);
                    report.days_failed.push(day.date.clone());
                    report.failed_entries.push(FailedEntry {
                        day: day.date.clone(),
                        item_id: None,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            for entry in &entries {
                self.migrate_entry(&session, identity, &day.date, entry, &mut report)
                    .await;
            }
            report.days_processed += 1;
        }

        Ok(report)
    }

    async fn migrate_entry(
        &self,
        session: &Session<'_>,
        identity: &Identity,
        day: &str,
        entry: &Entry,
        report: &mut MigrationReport,
    ) {
        report.entries_examined += 1;

        let Some(body) = self.config.rewrite.rewrite_bytes(&entry.body) else {
            log::debug!("no legacy links in {} '{}'", entry.item_id, entry.subject_text());
            report.entries_unchanged += 1;
            return;
        };

        if self.config.dry_run {
            log::info!("would edit entry {} '{}'", entry.item_id, entry.subject_text());
            report.entries_rewritten += 1;
            return;
        }

        log::info!("editing entry {} '{}'", entry.item_id, entry.subject_text());
        match session
            .edit_entry(
                identity,
                entry.item_id,
                &body,
                &entry.subject,
                entry.security.as_deref(),
                entry.allow_mask,
            )
            .await
        {
            Ok(result) => {
                log::info!(
                    "entry {} updated (anum {}) {}",
                    result.item_id,
                    result.anum,
                    result.url
                );
                report.entries_rewritten += 1;
                pause(self.config.edit_delay).await;
            }
            Err(err) => {
                log::error!("cannot update entry {} on {day}: {err}", entry.item_id);
                report.failed_entries.push(FailedEntry {
                    day: day.to_string(),
                    item_id: Some(entry.item_id),
                    reason: err.to_string(),
                });
            }
        }
    }
}

async fn pause(delay: Duration) {
    if delay > Duration::ZERO {
        sleep(delay).await;
    }
}
