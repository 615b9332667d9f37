//! Transit JSON encoding.
//!
//! Output is uncached: every key is written in full. Readers accept this
//! form, and it keeps re-encoded server keys byte-identical to the source.

use super::read::MAP_MARKER;
use super::value::{TransitMap, Value};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value as Json;

/// Largest integer that survives a round trip through a JavaScript number.
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Encode a value as a Transit JSON document.
pub fn encode(value: &Value) -> String {
    to_json(value).to_string()
}

/// Encode a value into a JSON tree, ready to be embedded or serialized.
pub fn to_json(value: &Value) -> Json {
    if value.is_scalar() {
        // Top-level scalars travel inside a quote tag.
        return Json::Array(vec![Json::String("~#'".into()), emit(value, false)]);
    }
    emit(value, false)
}

fn emit(value: &Value, as_map_key: bool) -> Json {
    match value {
        Value::Null if as_map_key => Json::String("~_".into()),
        Value::Null => Json::Null,
        Value::Bool(flag) if as_map_key => Json::String(format!("~?{}", if *flag { 't' } else { 'f' })),
        Value::Bool(flag) => Json::Bool(*flag),
        Value::Int(int) if as_map_key || int.unsigned_abs() > MAX_SAFE_INTEGER as u64 => {
            Json::String(format!("~i{int}"))
        }
        Value::Int(int) => Json::from(*int),
        Value::Float(float) => float_json(*float, as_map_key),
        Value::String(text) => Json::String(escape(text)),
        Value::Keyword(keyword) => Json::String(format!("~:{}", keyword.name())),
        Value::Symbol(symbol) => Json::String(format!("~${}", symbol.name())),
        Value::Uuid(uuid) => Json::String(format!("~u{uuid}")),
        Value::Timestamp(timestamp) => Json::String(timestamp_string(timestamp)),
        Value::Array(items) => Json::Array(items.iter().map(|item| emit(item, false)).collect()),
        Value::List(items) => tagged("list", sequence(items)),
        Value::Set(items) => tagged("set", sequence(items)),
        Value::Map(map) => map_json(map),
        Value::Extension { tag, rep } => Json::String(format!("~{tag}{rep}")),
        Value::Tagged { tag, rep } => tagged(tag, emit(rep, false)),
    }
}

fn tagged(tag: &str, rep: Json) -> Json {
    Json::Array(vec![Json::String(format!("~#{tag}")), rep])
}

fn sequence(items: &[Value]) -> Json {
    Json::Array(items.iter().map(|item| emit(item, false)).collect())
}

/// Maps with scalar keys use the `^ ` array form; anything else needs `~#cmap`.
fn map_json(map: &TransitMap) -> Json {
    if map.keys().all(Value::is_scalar) {
        let mut items = Vec::with_capacity(map.len() * 2 + 1);
        items.push(Json::String(MAP_MARKER.into()));
        for (key, value) in map.iter() {
            items.push(emit(key, true));
            items.push(emit(value, false));
        }
        Json::Array(items)
    } else {
        let mut items = Vec::with_capacity(map.len() * 2);
        for (key, value) in map.iter() {
            items.push(emit(key, false));
            items.push(emit(value, false));
        }
        tagged("cmap", Json::Array(items))
    }
}

fn float_json(float: f64, as_map_key: bool) -> Json {
    if float.is_nan() {
        return Json::String("~zNaN".into());
    }
    if float.is_infinite() {
        let sign = if float.is_sign_negative() { "-" } else { "" };
        return Json::String(format!("~z{sign}INF"));
    }
    match serde_json::Number::from_f64(float) {
        Some(number) if !as_map_key => Json::Number(number),
        _ => Json::String(format!("~d{float:?}")),
    }
}

fn escape(text: &str) -> String {
    if text.starts_with(['~', '^', '`']) {
        format!("~{text}")
    } else {
        text.to_string()
    }
}

/// Millisecond timestamps use `~m`; anything finer keeps its precision as `~t`.
fn timestamp_string(timestamp: &DateTime<Utc>) -> String {
    if timestamp.timestamp_subsec_nanos() % 1_000_000 == 0 {
        format!("~m{}", timestamp.timestamp_millis())
    } else {
        format!("~t{}", timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}
