//! Declared field mapping between Rust shapes and XML-RPC struct members.
//!
//! Every request and response shape lists its `(field, wire name)` pairs in a
//! static table. Encoders and decoders go through [`StructWriter`] and
//! [`StructReader`], which resolve names only via that table; members the
//! server adds on its own are never looked at.

use std::collections::{BTreeMap, HashSet};
use std::marker::PhantomData;

use thiserror::Error;

use super::value::Value;

/// One row of a shape's mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: &'static str,
    pub wire: &'static str,
}

impl FieldSpec {
    pub const fn new(field: &'static str, wire: &'static str) -> Self {
        Self { field, wire }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("{shape}: field '{field}' is not declared in the mapping table")]
    UndeclaredField { shape: &'static str, field: String },
    #[error("{shape}: mapping table has an empty name for '{field}'")]
    EmptyName { shape: &'static str, field: &'static str },
    #[error("{shape}: field '{field}' is declared twice")]
    DuplicateField { shape: &'static str, field: &'static str },
    #[error("{shape}: wire name '{wire}' is used by more than one field")]
    DuplicateWireName { shape: &'static str, wire: &'static str },
    #[error("{shape}: expected a struct, got {found}")]
    NotAStruct { shape: &'static str, found: &'static str },
    #[error("{shape}: required member '{wire}' is missing")]
    MissingMember { shape: &'static str, wire: &'static str },
    #[error("{shape}: member '{wire}' has unexpected type {found}")]
    UnexpectedType {
        shape: &'static str,
        wire: &'static str,
        found: &'static str,
    },
}

/// A request or response struct with a declared mapping table.
pub trait WireShape {
    const SHAPE: &'static str;
    const FIELDS: &'static [FieldSpec];

    fn wire_name(field: &str) -> Result<&'static str, MappingError> {
        Self::FIELDS
            .iter()
            .find(|declared| declared.field == field)
            .map(|declared| declared.wire)
            .ok_or_else(|| MappingError::UndeclaredField {
                shape: Self::SHAPE,
                field: field.to_string(),
            })
    }
}

/// Shapes that can be sent as a request parameter.
pub trait ToWire: WireShape {
    fn to_wire(&self) -> Result<Value, MappingError>;
}

/// Shapes that can be read from a response value.
pub trait FromWire: WireShape + Sized {
    fn from_wire(value: &Value) -> Result<Self, MappingError>;
}

/// Checks a shape's table for empty and duplicate names.
pub fn validate_shape<S: WireShape>() -> Result<(), MappingError> {
    let mut fields = HashSet::new();
    let mut wires = HashSet::new();

    for declared in S::FIELDS {
        if declared.field.is_empty() || declared.wire.is_empty() {
            return Err(MappingError::EmptyName {
                shape: S::SHAPE,
                field: declared.field,
            });
        }
        if !fields.insert(declared.field) {
            return Err(MappingError::DuplicateField {
                shape: S::SHAPE,
                field: declared.field,
            });
        }
        if !wires.insert(declared.wire) {
            return Err(MappingError::DuplicateWireName {
                shape: S::SHAPE,
                wire: declared.wire,
            });
        }
    }

    Ok(())
}

/// Builds a struct value for shape `S`.
pub struct StructWriter<S> {
    members: BTreeMap<String, Value>,
    _shape: PhantomData<S>,
}

impl<S: WireShape> StructWriter<S> {
    pub fn new() -> Self {
        Self {
            members: BTreeMap::new(),
            _shape: PhantomData,
        }
    }

    pub fn put(mut self, field: &str, value: impl Into<Value>) -> Result<Self, MappingError> {
        let wire = S::wire_name(field)?;
        self.members.insert(wire.to_string(), value.into());
        Ok(self)
    }

    /// Like [`StructWriter::put`] but leaves the member out when `value` is `None`.
    pub fn put_opt<V: Into<Value>>(
        self,
        field: &str,
        value: Option<V>,
    ) -> Result<Self, MappingError> {
        match value {
            Some(value) => self.put(field, value),
            None => {
                S::wire_name(field)?;
                Ok(self)
            }
        }
    }

    pub fn finish(self) -> Value {
        Value::Struct(self.members)
    }
}

impl<S: WireShape> Default for StructWriter<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads declared members of shape `S` from a struct value.
pub struct StructReader<'a, S> {
    members: &'a BTreeMap<String, Value>,
    _shape: PhantomData<S>,
}

impl<'a, S: WireShape> StructReader<'a, S> {
    pub fn new(value: &'a Value) -> Result<Self, MappingError> {
        let members = value.as_struct().ok_or(MappingError::NotAStruct {
            shape: S::SHAPE,
            found: value.kind(),
        })?;
        Ok(Self {
            members,
            _shape: PhantomData,
        })
    }

    pub fn required<T: FromValue>(&self, field: &str) -> Result<T, MappingError> {
        let wire = S::wire_name(field)?;
        self.optional(field)?.ok_or(MappingError::MissingMember {
            shape: S::SHAPE,
            wire,
        })
    }

    /// Missing members and `nil` both read as `None`.
    pub fn optional<T: FromValue>(&self, field: &str) -> Result<Option<T>, MappingError> {
        let wire = S::wire_name(field)?;
        match self.members.get(wire) {
            None | Some(Value::Nil) => Ok(None),
            Some(value) => T::from_value(value)
                .map(Some)
                .ok_or(MappingError::UnexpectedType {
                    shape: S::SHAPE,
                    wire,
                    found: value.kind(),
                }),
        }
    }

    /// Decodes an array member into nested shapes. Missing arrays read as empty.
    pub fn list<T: FromWire>(&self, field: &str) -> Result<Vec<T>, MappingError> {
        let wire = S::wire_name(field)?;
        match self.members.get(wire) {
            None | Some(Value::Nil) => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(T::from_wire).collect(),
            Some(other) => Err(MappingError::UnexpectedType {
                shape: S::SHAPE,
                wire,
                found: other.kind(),
            }),
        }
    }
}

/// Scalar conversion used by [`StructReader`].
///
/// Conversions are lenient where the remote service is known to vary its
/// encoding (numbers sent as strings, text sent as base64).
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(number) => Some(*number),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(*flag),
            Value::Int(number) => Some(*number != 0),
            Value::String(text) => match text.trim() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) | Value::DateTime(text) => Some(text.clone()),
            Value::Base64(bytes) => String::from_utf8(bytes.clone()).ok(),
            Value::Int(number) => Some(number.to_string()),
            _ => None,
        }
    }
}

/// Raw bytes; text values are taken as their UTF-8 encoding.
impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Base64(bytes) => Some(bytes.clone()),
            Value::String(text) => Some(text.as_bytes().to_vec()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample;

    impl WireShape for Sample {
        const SHAPE: &'static str = "Sample";
        const FIELDS: &'static [FieldSpec] = &[
            FieldSpec::new("item_id", "itemid"),
            FieldSpec::new("body", "event"),
            FieldSpec::new("count", "count"),
        ];
    }

    struct Broken;

    impl WireShape for Broken {
        const SHAPE: &'static str = "Broken";
        const FIELDS: &'static [FieldSpec] = &[
            FieldSpec::new("subject", "subject"),
            FieldSpec::new("title", "subject"),
        ];
    }

    #[test]
    fn writer_uses_declared_wire_names() {
        let value = StructWriter::<Sample>::new()
            .put("item_id", 12)
            .and_then(|w| w.put_opt::<&str>("body", None))
            .map(StructWriter::finish)
            .expect("write");
        assert_eq!(value, Value::structure([("itemid", Value::Int(12))]));

        let err = StructWriter::<Sample>::new().put("subject", "x").err();
        assert!(matches!(err, Some(MappingError::UndeclaredField { .. })));
    }

    #[test]
    fn reader_ignores_unknown_members_and_tolerates_encodings() {
        let value = Value::structure([
            ("itemid", Value::from("12")),
            ("event", Value::Base64(b"text".to_vec())),
            ("new_server_field", Value::from(true)),
        ]);
        let reader = StructReader::<Sample>::new(&value).expect("reader");

        assert_eq!(reader.required::<i64>("item_id").unwrap(), 12);
        assert_eq!(reader.required::<String>("body").unwrap(), "text");
        assert_eq!(reader.optional::<i64>("count").unwrap(), None);
        assert!(matches!(
            reader.required::<i64>("count"),
            Err(MappingError::MissingMember { wire: "count", .. })
        ));
    }

    #[test]
    fn reader_rejects_wrong_types() {
        let value = Value::structure([("itemid", Value::Array(Vec::new()))]);
        let reader = StructReader::<Sample>::new(&value).unwrap();
        assert!(matches!(
            reader.required::<i64>("item_id"),
            Err(MappingError::UnexpectedType { found: "array", .. })
        ));
        assert!(StructReader::<Sample>::new(&Value::Nil).is_err());
    }

    #[test]
    fn base64_text_must_be_utf8_but_bytes_pass_through() {
        let raw = vec![0xe9, b't', 0xe9, b' ', b'x'];
        let value = Value::structure([("event", Value::Base64(raw.clone()))]);
        let reader = StructReader::<Sample>::new(&value).unwrap();

        assert!(matches!(
            reader.required::<String>("body"),
            Err(MappingError::UnexpectedType { found: "base64", .. })
        ));
        assert_eq!(reader.required::<Vec<u8>>("body").unwrap(), raw);
    }

    #[test]
    fn validation_flags_duplicate_wire_names() {
        assert!(validate_shape::<Sample>().is_ok());
        assert_eq!(
            validate_shape::<Broken>(),
            Err(MappingError::DuplicateWireName {
                shape: "Broken",
                wire: "subject"
            })
        );
    }
}
