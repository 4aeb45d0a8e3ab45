//! Request and response shapes of the journal API, each with its declared
//! wire mapping.

use std::borrow::Cow;

use once_cell::sync::Lazy;

use crate::auth::{AuthProof, Challenge};
use crate::rpc::{
    FieldSpec, FromWire, MappingError, StructReader, StructWriter, ToWire, Value, WireShape,
    validate_shape,
};

pub const AUTH_METHOD: &str = "challenge";
pub const PROTOCOL_VERSION: i64 = 1;
pub const UNIX_LINE_ENDINGS: &str = "unix";
pub const SELECT_BY_DAY: &str = "day";

const AUTH_FIELDS: [FieldSpec; 5] = [
    FieldSpec::new("username", "username"),
    FieldSpec::new("auth_method", "auth_method"),
    FieldSpec::new("auth_challenge", "auth_challenge"),
    FieldSpec::new("auth_response", "auth_response"),
    FieldSpec::new("version", "ver"),
];

fn write_auth<S: WireShape>(auth: &AuthProof) -> Result<StructWriter<S>, MappingError> {
    StructWriter::<S>::new()
        .put("username", auth.username.as_str())?
        .put("auth_method", AUTH_METHOD)?
        .put("auth_challenge", auth.challenge.as_str())?
        .put("auth_response", auth.response.as_str())?
        .put("version", PROTOCOL_VERSION)
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub auth: AuthProof,
}

impl WireShape for LoginRequest {
    const SHAPE: &'static str = "LoginRequest";
    const FIELDS: &'static [FieldSpec] = &AUTH_FIELDS;
}

impl ToWire for LoginRequest {
    fn to_wire(&self) -> Result<Value, MappingError> {
        Ok(write_auth::<Self>(&self.auth)?.finish())
    }
}

/// Result of a login call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    /// `None` when the server does not report validation status.
    pub validated: Option<bool>,
    pub message: Option<String>,
}

impl LoginOutcome {
    /// Only an explicit "not validated" answer counts as a rejection.
    pub fn is_rejected(&self) -> bool {
        self.validated == Some(false)
    }
}

impl WireShape for LoginOutcome {
    const SHAPE: &'static str = "LoginOutcome";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("user_id", "userid"),
        FieldSpec::new("username", "username"),
        FieldSpec::new("full_name", "fullname"),
        FieldSpec::new("validated", "is_validated"),
        FieldSpec::new("message", "message"),
    ];
}

impl FromWire for LoginOutcome {
    fn from_wire(value: &Value) -> Result<Self, MappingError> {
        let reader = StructReader::<Self>::new(value)?;
        Ok(Self {
            user_id: reader.optional("user_id")?.unwrap_or_default(),
            username: reader.optional("username")?.unwrap_or_default(),
            full_name: reader.optional("full_name")?.unwrap_or_default(),
            validated: reader.optional("validated")?,
            message: reader.optional("message")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DayCountsRequest {
    pub auth: AuthProof,
}

impl WireShape for DayCountsRequest {
    const SHAPE: &'static str = "DayCountsRequest";
    const FIELDS: &'static [FieldSpec] = &AUTH_FIELDS;
}

impl ToWire for DayCountsRequest {
    fn to_wire(&self) -> Result<Value, MappingError> {
        Ok(write_auth::<Self>(&self.auth)?.finish())
    }
}

/// Number of entries posted on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCount {
    /// `YYYY-MM-DD`
    pub date: String,
    pub count: i64,
}

impl WireShape for DayCount {
    const SHAPE: &'static str = "DayCount";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("date", "date"),
        FieldSpec::new("count", "count"),
    ];
}

impl FromWire for DayCount {
    fn from_wire(value: &Value) -> Result<Self, MappingError> {
        let reader = StructReader::<Self>::new(value)?;
        Ok(Self {
            date: reader.required("date")?,
            count: reader.optional("count")?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DayCountsResponse {
    pub day_counts: Vec<DayCount>,
}

impl WireShape for DayCountsResponse {
    const SHAPE: &'static str = "DayCountsResponse";
    const FIELDS: &'static [FieldSpec] = &[FieldSpec::new("day_counts", "daycounts")];
}

impl FromWire for DayCountsResponse {
    fn from_wire(value: &Value) -> Result<Self, MappingError> {
        let reader = StructReader::<Self>::new(value)?;
        Ok(Self {
            day_counts: reader.list("day_counts")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EventsRequest {
    pub auth: AuthProof,
    pub year: String,
    pub month: String,
    pub day: String,
}

impl WireShape for EventsRequest {
    const SHAPE: &'static str = "EventsRequest";
    const FIELDS: &'static [FieldSpec] = &[
        AUTH_FIELDS[0],
        AUTH_FIELDS[1],
        AUTH_FIELDS[2],
        AUTH_FIELDS[3],
        AUTH_FIELDS[4],
        FieldSpec::new("select_type", "selecttype"),
        FieldSpec::new("year", "year"),
        FieldSpec::new("month", "month"),
        FieldSpec::new("day", "day"),
        FieldSpec::new("no_props", "noprops"),
    ];
}

impl ToWire for EventsRequest {
    fn to_wire(&self) -> Result<Value, MappingError> {
        Ok(write_auth::<Self>(&self.auth)?
            .put("select_type", SELECT_BY_DAY)?
            .put("year", self.year.as_str())?
            .put("month", self.month.as_str())?
            .put("day", self.day.as_str())?
            .put("no_props", 0_i64)?
            .finish())
    }
}

/// A published journal entry.
///
/// Subject and body are kept as the raw bytes the server sent; they are
/// usually UTF-8 but old entries may carry legacy encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub item_id: i64,
    pub event_time: Option<String>,
    /// `None` means the server default (public).
    pub security: Option<String>,
    /// Friend-group mask of a `usemask` entry.
    pub allow_mask: Option<i64>,
    pub subject: Vec<u8>,
    pub body: Vec<u8>,
    pub url: Option<String>,
    pub poster: Option<String>,
}

impl Entry {
    /// Subject for log output.
    pub fn subject_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.subject)
    }
}

impl WireShape for Entry {
    const SHAPE: &'static str = "Entry";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("item_id", "itemid"),
        FieldSpec::new("event_time", "eventtime"),
        FieldSpec::new("security", "security"),
        FieldSpec::new("allow_mask", "allowmask"),
        FieldSpec::new("subject", "subject"),
        FieldSpec::new("body", "event"),
        FieldSpec::new("url", "url"),
        FieldSpec::new("poster", "poster"),
    ];
}

impl FromWire for Entry {
    fn from_wire(value: &Value) -> Result<Self, MappingError> {
        let reader = StructReader::<Self>::new(value)?;
        Ok(Self {
            item_id: reader.required("item_id")?,
            event_time: reader.optional("event_time")?,
            security: reader.optional("security")?,
            allow_mask: reader.optional("allow_mask")?,
            subject: reader.optional("subject")?.unwrap_or_default(),
            body: reader.optional("body")?.unwrap_or_default(),
            url: reader.optional("url")?,
            poster: reader.optional("poster")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EventsResponse {
    pub events: Vec<Entry>,
}

impl WireShape for EventsResponse {
    const SHAPE: &'static str = "EventsResponse";
    const FIELDS: &'static [FieldSpec] = &[FieldSpec::new("events", "events")];
}

impl FromWire for EventsResponse {
    fn from_wire(value: &Value) -> Result<Self, MappingError> {
        let reader = StructReader::<Self>::new(value)?;
        Ok(Self {
            events: reader.list("events")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EditRequest {
    pub auth: AuthProof,
    pub item_id: i64,
    /// Already normalised to `\n` line endings.
    pub body: Vec<u8>,
    pub subject: Vec<u8>,
    pub security: Option<String>,
    pub allow_mask: Option<i64>,
}

impl WireShape for EditRequest {
    const SHAPE: &'static str = "EditRequest";
    const FIELDS: &'static [FieldSpec] = &[
        AUTH_FIELDS[0],
        AUTH_FIELDS[1],
        AUTH_FIELDS[2],
        AUTH_FIELDS[3],
        AUTH_FIELDS[4],
        FieldSpec::new("item_id", "itemid"),
        FieldSpec::new("body", "event"),
        FieldSpec::new("line_endings", "lineendings"),
        FieldSpec::new("subject", "subject"),
        FieldSpec::new("security", "security"),
        FieldSpec::new("allow_mask", "allowmask"),
    ];
}

impl ToWire for EditRequest {
    fn to_wire(&self) -> Result<Value, MappingError> {
        Ok(write_auth::<Self>(&self.auth)?
            .put("item_id", self.item_id)?
            .put("body", self.body.clone())?
            .put("line_endings", UNIX_LINE_ENDINGS)?
            .put("subject", text_value(&self.subject))?
            .put_opt("security", self.security.as_deref())?
            .put_opt("allow_mask", self.allow_mask)?
            .finish())
    }
}

/// Plain string when `bytes` are UTF-8, base64 otherwise.
fn text_value(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::from(text),
        Err(_) => Value::Base64(bytes.to_vec()),
    }
}

/// Server confirmation of an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditResult {
    pub item_id: i64,
    pub anum: i64,
    pub url: String,
}

impl WireShape for EditResult {
    const SHAPE: &'static str = "EditResult";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("item_id", "itemid"),
        FieldSpec::new("anum", "anum"),
        FieldSpec::new("url", "url"),
    ];
}

impl FromWire for EditResult {
    fn from_wire(value: &Value) -> Result<Self, MappingError> {
        let reader = StructReader::<Self>::new(value)?;
        Ok(Self {
            item_id: reader.required("item_id")?,
            anum: reader.optional("anum")?.unwrap_or_default(),
            url: reader.optional("url")?.unwrap_or_default(),
        })
    }
}

static WIRE_MAPPINGS: Lazy<Result<(), MappingError>> = Lazy::new(|| {
    validate_shape::<Challenge>()?;
    validate_shape::<LoginRequest>()?;
    validate_shape::<LoginOutcome>()?;
    validate_shape::<DayCountsRequest>()?;
    validate_shape::<DayCount>()?;
    validate_shape::<DayCountsResponse>()?;
    validate_shape::<EventsRequest>()?;
    validate_shape::<Entry>()?;
    validate_shape::<EventsResponse>()?;
    validate_shape::<EditRequest>()?;
    validate_shape::<EditResult>()
});

/// Validates every mapping table once per process.
pub fn validate_wire_mappings() -> Result<(), MappingError> {
    (*WIRE_MAPPINGS).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Challenge, Secret, derive_response};

    fn proof() -> AuthProof {
        let challenge = Challenge {
            token: "c0:1:2:60:xyz".into(),
            auth_scheme: "c0".into(),
            expire_time: None,
            server_time: None,
        };
        AuthProof {
            username: "reader".into(),
            challenge: challenge.token.clone(),
            response: derive_response(&challenge, &Secret::new("pw")),
        }
    }

    #[test]
    fn all_mapping_tables_are_valid() {
        assert_eq!(validate_wire_mappings(), Ok(()));
    }

    #[test]
    fn edit_request_carries_auth_and_round_tripped_metadata() {
        let auth = proof();
        let request = EditRequest {
            auth: auth.clone(),
            item_id: 77,
            body: b"line one\nline two".to_vec(),
            subject: b"Holiday".to_vec(),
            security: Some("usemask".into()),
            allow_mask: Some(6),
        };
        let value = request.to_wire().unwrap();

        assert_eq!(value.member("username"), Some(&Value::from("reader")));
        assert_eq!(value.member("auth_method"), Some(&Value::from("challenge")));
        assert_eq!(value.member("auth_challenge"), Some(&Value::from("c0:1:2:60:xyz")));
        assert_eq!(
            value.member("auth_response"),
            Some(&Value::from(auth.response.as_str()))
        );
        assert_eq!(value.member("ver"), Some(&Value::Int(1)));
        assert_eq!(value.member("itemid"), Some(&Value::Int(77)));
        assert_eq!(
            value.member("event"),
            Some(&Value::Base64(b"line one\nline two".to_vec()))
        );
        assert_eq!(value.member("lineendings"), Some(&Value::from("unix")));
        assert_eq!(value.member("subject"), Some(&Value::from("Holiday")));
        assert_eq!(value.member("security"), Some(&Value::from("usemask")));
        assert_eq!(value.member("allowmask"), Some(&Value::Int(6)));
    }

    #[test]
    fn edit_request_omits_absent_security() {
        let request = EditRequest {
            auth: proof(),
            item_id: 1,
            body: Vec::new(),
            subject: Vec::new(),
            security: None,
            allow_mask: None,
        };
        let value = request.to_wire().unwrap();
        assert_eq!(value.member("security"), None);
        assert_eq!(value.member("allowmask"), None);
        assert_eq!(value.member("subject"), Some(&Value::from("")));
    }

    #[test]
    fn entry_decoding_tolerates_schema_drift() {
        let value = Value::structure([
            ("itemid", Value::Int(5)),
            ("event", Value::Base64("tükör".as_bytes().to_vec())),
            ("anum", Value::Int(200)),
            ("props", Value::structure([("mood", Value::from("happy"))])),
        ]);
        let entry = Entry::from_wire(&value).unwrap();
        assert_eq!(entry.item_id, 5);
        assert_eq!(entry.body, "tükör".as_bytes());
        assert!(entry.subject.is_empty());
        assert_eq!(entry.security, None);
        assert_eq!(entry.allow_mask, None);
    }

    #[test]
    fn non_utf8_entry_survives_decode_and_edit_unchanged() {
        let mut raw_body = vec![0xe9, b't', 0xe9, b' '];
        raw_body.extend_from_slice(b"https://s3.eu-central-1.amazonaws.com/x.jpg");
        let raw_subject = vec![b'n', 0xf6, b'k'];
        let value = Value::structure([
            ("itemid", Value::Int(8)),
            ("subject", Value::Base64(raw_subject.clone())),
            ("event", Value::Base64(raw_body.clone())),
            ("security", Value::from("usemask")),
            ("allowmask", Value::Int(1)),
        ]);
        let entry = Entry::from_wire(&value).expect("raw bytes decode");
        assert_eq!(entry.body, raw_body);
        assert_eq!(entry.subject_text(), "n\u{fffd}k");

        let new_body = crate::rewrite::RewriteRule::default()
            .rewrite_bytes(&entry.body)
            .expect("legacy link present");
        let request = EditRequest {
            auth: proof(),
            item_id: entry.item_id,
            body: new_body,
            subject: entry.subject.clone(),
            security: entry.security.clone(),
            allow_mask: entry.allow_mask,
        };
        let wire = request.to_wire().unwrap();

        let mut expected = vec![0xe9, b't', 0xe9, b' '];
        expected.extend_from_slice(b"https://www.artyukh.hu/lj/x.jpg");
        assert_eq!(wire.member("event"), Some(&Value::Base64(expected)));
        assert_eq!(wire.member("subject"), Some(&Value::Base64(raw_subject)));
        assert_eq!(wire.member("allowmask"), Some(&Value::Int(1)));
    }

    #[test]
    fn login_rejection_requires_explicit_flag() {
        let mut outcome = LoginOutcome::from_wire(&Value::structure([
            ("userid", Value::Int(9)),
            ("fullname", Value::from("Reader")),
        ]))
        .unwrap();
        assert!(!outcome.is_rejected());

        outcome.validated = Some(false);
        assert!(outcome.is_rejected());
    }
}
