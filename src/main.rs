//! ljmigrate CLI
//!
//! Rewrites legacy S3 media links in every entry of one LiveJournal account.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ljmigrate::config::{DEFAULT_CALLS_PER_SECOND, DEFAULT_ENDPOINT};
use ljmigrate::{Identity, MigrationConfig, Migrator, ReqwestTransport};

#[derive(Parser)]
#[command(name = "ljmigrate")]
#[command(about = "Rewrite legacy media links in a LiveJournal account", long_about = None)]
#[command(version)]
struct Cli {
    /// Login to LiveJournal
    #[arg(short, long, default_value = "username")]
    login: String,

    /// User password to LiveJournal
    #[arg(short, long, env = "LJ_PASSWORD", default_value = "password", hide_env_values = true)]
    password: String,

    /// XML-RPC endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Maximum calls per second
    #[arg(long, default_value_t = DEFAULT_CALLS_PER_SECOND)]
    rate: u32,

    /// Pause after each successful edit, in seconds
    #[arg(long, default_value_t = 5)]
    edit_delay_secs: u64,

    /// Pause between days, in seconds
    #[arg(long, default_value_t = 5)]
    day_delay_secs: u64,

    /// Report what would change without editing anything
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match MigrationConfig::builder()
        .with_endpoint(cli.endpoint)
        .with_calls_per_second(cli.rate)
        .with_edit_delay(Duration::from_secs(cli.edit_delay_secs))
        .with_day_delay(Duration::from_secs(cli.day_delay_secs))
        .dry_run(cli.dry_run)
        .build()
    {
        Ok(config) => config,
        Err(err) => {
            log::error!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let transport = match ReqwestTransport::new(
        config.endpoint.clone(),
        &config.user_agent,
        config.request_timeout,
    ) {
        Ok(transport) => Arc::new(transport),
        Err(err) => {
            log::error!("cannot create the client: {err}");
            return ExitCode::FAILURE;
        }
    };

    let migrator = match Migrator::new(config) {
        Ok(migrator) => migrator,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let identity = Identity::new(cli.login, cli.password);
    log::info!("logging in to {} as {}", migrator.config().endpoint, identity.account());

    match migrator.run(transport, &identity).await {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => log::info!("migration finished\n{json}"),
                Err(err) => log::warn!("cannot render report: {err}"),
            }
            if report.has_failures() {
                log::warn!(
                    "{} days and {} entries failed; rerun to retry them",
                    report.days_failed.len(),
                    report.failed_entries.len()
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("migration aborted: {err}");
            ExitCode::FAILURE
        }
    }
}
