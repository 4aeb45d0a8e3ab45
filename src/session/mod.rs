//! Session façade over the journal API.
//!
//! Each operation authenticates on its own: it fetches a fresh challenge,
//! answers it, and sends the request through the shared rate-limited client.
//! Nothing is cached between operations, so a challenge is never reused.

pub mod types;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::auth::{AuthError, ChallengeProvider, Identity};
use crate::rpc::{RateLimitedClient, RpcError};

pub use types::{
    DayCount, DayCountsRequest, DayCountsResponse, EditRequest, EditResult, Entry, EventsRequest,
    EventsResponse, LoginOutcome, LoginRequest, validate_wire_mappings,
};

pub const LOGIN_METHOD: &str = "LJ.XMLRPC.login";
pub const DAY_COUNTS_METHOD: &str = "LJ.XMLRPC.getdaycounts";
pub const EVENTS_METHOD: &str = "LJ.XMLRPC.getevents";
pub const EDIT_METHOD: &str = "LJ.XMLRPC.editevent";

/// Why a single authenticated call failed.
#[derive(Debug, Error)]
pub enum CallFailure {
    #[error(transparent)]
    Authentication(#[from] AuthError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("login failed ({method}): {source}")]
    LoginFailed {
        method: &'static str,
        #[source]
        source: CallFailure,
    },
    #[error("listing days failed ({method}): {source}")]
    ListDaysFailed {
        method: &'static str,
        #[source]
        source: CallFailure,
    },
    #[error("listing entries for {day} failed ({method}): {source}")]
    ListEventsFailed {
        method: &'static str,
        day: String,
        #[source]
        source: CallFailure,
    },
    #[error("editing entry {item_id} failed ({method}): {source}")]
    EditFailed {
        method: &'static str,
        item_id: i64,
        #[source]
        source: CallFailure,
    },
    #[error("invalid day key '{day}': {reason}")]
    InvalidDate { day: String, reason: String },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// The four journal operations used by the migration.
pub struct Session<'a> {
    client: &'a RateLimitedClient,
    challenges: ChallengeProvider<'a>,
}

impl<'a> Session<'a> {
    pub fn new(client: &'a RateLimitedClient) -> Self {
        Self {
            client,
            challenges: ChallengeProvider::new(client),
        }
    }

    pub async fn login(&self, identity: &Identity) -> SessionResult<LoginOutcome> {
        let attempt = async {
            let auth = self.challenges.authenticate(identity).await?;
            let outcome: LoginOutcome = self
                .client
                .call(LOGIN_METHOD, &LoginRequest { auth })
                .await?;
            Ok::<_, CallFailure>(outcome)
        };

        attempt.await.map_err(|source| SessionError::LoginFailed {
            method: LOGIN_METHOD,
            source,
        })
    }

    /// Day counts in server order (newest first).
    pub async fn list_day_counts(&self, identity: &Identity) -> SessionResult<Vec<DayCount>> {
        let attempt = async {
            let auth = self.challenges.authenticate(identity).await?;
            let response: DayCountsResponse = self
                .client
                .call(DAY_COUNTS_METHOD, &DayCountsRequest { auth })
                .await?;
            Ok::<_, CallFailure>(response.day_counts)
        };

        attempt
            .await
            .map_err(|source| SessionError::ListDaysFailed {
                method: DAY_COUNTS_METHOD,
                source,
            })
    }

    /// Entries posted on `date` (`YYYY-MM-DD`).
    pub async fn list_events(&self, identity: &Identity, date: &str) -> SessionResult<Vec<Entry>> {
        let day = parse_day(date)?;

        let attempt = async {
            let auth = self.challenges.authenticate(identity).await?;
            let request = EventsRequest {
                auth,
                year: format!("{:04}", day.year()),
                month: format!("{:02}", day.month()),
                day: format!("{:02}", day.day()),
            };
            let response: EventsResponse = self.client.call(EVENTS_METHOD, &request).await?;
            Ok::<_, CallFailure>(response.events)
        };

        attempt
            .await
            .map_err(|source| SessionError::ListEventsFailed {
                method: EVENTS_METHOD,
                day: date.to_string(),
                source,
            })
    }

    /// Replaces the body of entry `item_id`, sending back its subject,
    /// security level, and group mask unchanged.
    pub async fn edit_entry(
        &self,
        identity: &Identity,
        item_id: i64,
        new_body: &[u8],
        subject: &[u8],
        security: Option<&str>,
        allow_mask: Option<i64>,
    ) -> SessionResult<EditResult> {
        let attempt = async {
            let auth = self.challenges.authenticate(identity).await?;
            let request = EditRequest {
                auth,
                item_id,
                body: normalize_line_endings(new_body),
                subject: subject.to_vec(),
                security: security.map(str::to_string),
                allow_mask,
            };
            let result: EditResult = self.client.call(EDIT_METHOD, &request).await?;
            Ok::<_, CallFailure>(result)
        };

        attempt.await.map_err(|source| SessionError::EditFailed {
            method: EDIT_METHOD,
            item_id,
            source,
        })
    }
}

fn parse_day(date: &str) -> SessionResult<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|err| SessionError::InvalidDate {
        day: date.to_string(),
        reason: err.to_string(),
    })
}

/// Converts `\r\n` and lone `\r` to `\n`.
pub fn normalize_line_endings(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut bytes = text.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        if byte == b'\r' {
            bytes.next_if_eq(&b'\n');
            out.push(b'\n');
        } else {
            out.push(byte);
        }
    }
    out
}
