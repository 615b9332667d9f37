//! Field access by semantic key name.
//!
//! Keys in server payloads are keywords, and the same logical key is decoded
//! into a fresh value for every entry, so lookups go by the keyword's
//! namespaced name (`workflow/status`) rather than by a key held elsewhere.

use super::value::{TransitMap, Value};
use crate::error::ExtractError;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Value under the keyword or symbol key called `name`.
pub fn field_by_name<'a>(map: &'a TransitMap, name: &str) -> Result<&'a Value, ExtractError> {
    map.get_by_name(name)
        .ok_or_else(|| ExtractError::FieldNotFound { name: name.to_string() })
}

fn unexpected(name: &str, expected: &'static str) -> ExtractError {
    ExtractError::UnexpectedType {
        name: name.to_string(),
        expected,
    }
}

pub fn map_field<'a>(map: &'a TransitMap, name: &str) -> Result<&'a TransitMap, ExtractError> {
    field_by_name(map, name)?
        .as_map()
        .ok_or_else(|| unexpected(name, "map"))
}

pub fn seq_field<'a>(map: &'a TransitMap, name: &str) -> Result<&'a [Value], ExtractError> {
    field_by_name(map, name)?
        .as_seq()
        .ok_or_else(|| unexpected(name, "sequence"))
}

/// Strings, plus keywords and symbols by name.
pub fn str_field<'a>(map: &'a TransitMap, name: &str) -> Result<&'a str, ExtractError> {
    let value = field_by_name(map, name)?;
    value
        .as_str()
        .or_else(|| value.tag_name())
        .ok_or_else(|| unexpected(name, "string"))
}

/// Accepts a native UUID or its string form.
pub fn uuid_field(map: &TransitMap, name: &str) -> Result<Uuid, ExtractError> {
    match field_by_name(map, name)? {
        Value::Uuid(uuid) => Ok(*uuid),
        Value::String(text) => Uuid::parse_str(text).map_err(|_| unexpected(name, "uuid")),
        _ => Err(unexpected(name, "uuid")),
    }
}

/// Accepts a native timestamp or an RFC 3339 string.
pub fn timestamp_field(map: &TransitMap, name: &str) -> Result<DateTime<Utc>, ExtractError> {
    match field_by_name(map, name)? {
        Value::Timestamp(timestamp) => Ok(*timestamp),
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(|_| unexpected(name, "timestamp")),
        _ => Err(unexpected(name, "timestamp")),
    }
}
