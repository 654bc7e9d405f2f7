//! Structured-text (JSON) codec.
//!
//! The text wire form of a message is a JSON object keyed by field wire
//! name. Per-kind renderings are fixed for interop: 64-bit integers and
//! decimals travel as decimal strings, timestamps as integer milliseconds,
//! enums as integer values, booleans and narrower numerics natively. Absent
//! nullable fields encode as explicit `null` so "unset" survives a
//! round-trip distinct from "set-to-default".
//!
//! Decoding is field-independent. In [`DecodeMode::Lenient`] a field that
//! cannot parse degrades to its slot default and decoding continues - one
//! bad field never aborts the message, and `decode({})` always succeeds
//! with a fully defaulted instance. [`DecodeMode::Strict`] instead reports
//! the first malformed present field with its path. Absent fields default
//! in both modes; absence is not an error.

use std::str::FromStr;
use std::sync::Arc;

use chrono::DateTime;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value as JsonValue};
use tracing::debug;

use crate::schema::{FieldKind, MapKeyKind, MessageDescriptor, ScalarKind};
use crate::value::{MapKey, MessageValue, Value};

use super::{CodecError, DecodeMode};

// ============================================================================
// Encoding
// ============================================================================

/// Encode a message into its JSON object form.
pub fn encode_message(msg: &MessageValue) -> JsonValue {
    let mut out = Map::with_capacity(msg.len());
    for (field, value) in msg.iter() {
        out.insert(field.name().to_string(), encode_value(value));
    }
    JsonValue::Object(out)
}

fn encode_value(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Int8(v) => JsonValue::from(*v),
        Value::Int16(v) => JsonValue::from(*v),
        Value::Int32(v) => JsonValue::from(*v),
        // 64-bit integers as decimal strings: JSON numbers lose precision
        // past 2^53
        Value::Int64(v) => JsonValue::String(v.to_string()),
        Value::Uint8(v) => JsonValue::from(*v),
        Value::Uint16(v) => JsonValue::from(*v),
        Value::Uint32(v) => JsonValue::from(*v),
        Value::Uint64(v) => JsonValue::String(v.to_string()),
        Value::Float32(v) => encode_float(f64::from(*v)),
        Value::Float64(v) => encode_float(*v),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::String(s) => JsonValue::String(s.to_string()),
        Value::Timestamp(ms) => JsonValue::from(*ms),
        Value::Decimal(d) => JsonValue::String(d.to_string()),
        Value::Enum(v) => JsonValue::from(*v),
        Value::Message(m) => encode_message(m),
        Value::List(items) => JsonValue::Array(items.iter().map(encode_value).collect()),
        Value::Map(entries) => {
            let mut out = Map::with_capacity(entries.len());
            for (key, value) in entries {
                out.insert(key.to_key_string(), encode_value(value));
            }
            JsonValue::Object(out)
        }
    }
}

// Non-finite floats have no JSON number form; they degrade to null and
// decode back as the field default.
fn encode_float(v: f64) -> JsonValue {
    Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number)
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a message from its JSON form.
///
/// Lenient mode never fails: any shape of input yields a constructed
/// instance. Strict mode fails on the first malformed present field.
pub fn decode_message(
    desc: &Arc<MessageDescriptor>,
    json: &JsonValue,
    mode: DecodeMode,
) -> Result<MessageValue, CodecError> {
    decode_object(desc, json, mode, "")
}

fn decode_object(
    desc: &Arc<MessageDescriptor>,
    json: &JsonValue,
    mode: DecodeMode,
    path: &str,
) -> Result<MessageValue, CodecError> {
    let mut msg = MessageValue::new(desc.clone());
    let object = match json {
        JsonValue::Object(object) => object,
        _ => {
            if mode == DecodeMode::Strict && !json.is_null() {
                return Err(CodecError::Field {
                    path: join_path(path, desc.name()),
                    reason: format!("expected object, found {}", json_shape(json)),
                });
            }
            // Non-object input decodes as an empty object: every slot keeps
            // its default.
            return Ok(msg);
        }
    };
    for (position, field) in desc.fields().iter().enumerate() {
        let field_path = join_path(path, field.name());
        let slot = match object.get(field.name()) {
            // Absent or explicit null: required slots take the schema
            // default, nullable slots stay absent. Not an error in any mode.
            None | Some(JsonValue::Null) => field.slot_default(),
            Some(present) => decode_kind(
                field.kind(),
                field.is_nullable(),
                present,
                mode,
                &field_path,
            )?,
        };
        msg.set_at(position, slot);
    }
    Ok(msg)
}

/// Decode one present (non-null) JSON value against a declared kind.
fn decode_kind(
    kind: &FieldKind,
    nullable: bool,
    json: &JsonValue,
    mode: DecodeMode,
    path: &str,
) -> Result<Value, CodecError> {
    match kind {
        FieldKind::Scalar(scalar) => match decode_scalar(*scalar, json) {
            Some(value) => Ok(value),
            None => fallback(
                kind,
                nullable,
                mode,
                path,
                format!("cannot parse {} as {scalar}", json_shape(json)),
            ),
        },
        FieldKind::Enum(desc) => {
            let numeric = coerce_i64(json).and_then(|v| i32::try_from(v).ok());
            match numeric {
                Some(v) => match desc.value_of(v) {
                    Ok(member) => Ok(Value::Enum(member.value)),
                    Err(err) => match mode {
                        DecodeMode::Lenient => {
                            debug!(field = path, %err, "enum value out of range; using default member");
                            Ok(if nullable {
                                Value::Null
                            } else {
                                Value::Enum(desc.default_member().value)
                            })
                        }
                        DecodeMode::Strict => Err(CodecError::Lookup {
                            path: path.to_string(),
                            source: err,
                        }),
                    },
                },
                None => fallback(
                    kind,
                    nullable,
                    mode,
                    path,
                    format!("cannot coerce {} to enum value", json_shape(json)),
                ),
            }
        }
        FieldKind::Message(desc) => match json {
            JsonValue::Object(_) => Ok(Value::Message(decode_object(desc, json, mode, path)?)),
            // Non-object input for a nested message is treated as absent.
            _ => fallback(
                kind,
                nullable,
                mode,
                path,
                format!("expected object, found {}", json_shape(json)),
            ),
        },
        FieldKind::List {
            element,
            element_nullable,
        } => match json {
            JsonValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{i}]");
                    let decoded = if item.is_null() {
                        // Null elements collapse to the element default for
                        // non-nullable element kinds and stay absent for
                        // nullable ones; length is preserved either way.
                        if *element_nullable {
                            Value::Null
                        } else {
                            element.default_value()
                        }
                    } else {
                        decode_kind(element, *element_nullable, item, mode, &item_path)?
                    };
                    out.push(decoded);
                }
                Ok(Value::List(out))
            }
            // Non-list input is never partially consumed: empty for
            // required slots, absent for nullable ones.
            _ => fallback(
                kind,
                nullable,
                mode,
                path,
                format!("expected array, found {}", json_shape(json)),
            ),
        },
        FieldKind::Map {
            key,
            value,
            value_nullable,
        } => match json {
            JsonValue::Object(entries) => {
                let mut out = std::collections::BTreeMap::new();
                for (raw_key, raw_value) in entries {
                    let entry_path = format!("{path}[{raw_key}]");
                    let Some(map_key) = decode_map_key(*key, raw_key) else {
                        match mode {
                            DecodeMode::Lenient => {
                                debug!(field = %entry_path, "unparseable map key; skipping entry");
                                continue;
                            }
                            DecodeMode::Strict => {
                                return Err(CodecError::Field {
                                    path: entry_path,
                                    reason: format!("cannot parse map key '{raw_key}'"),
                                })
                            }
                        }
                    };
                    let decoded = if raw_value.is_null() {
                        if *value_nullable {
                            Value::Null
                        } else {
                            value.default_value()
                        }
                    } else {
                        decode_kind(value, *value_nullable, raw_value, mode, &entry_path)?
                    };
                    out.insert(map_key, decoded);
                }
                Ok(Value::Map(out))
            }
            _ => fallback(
                kind,
                nullable,
                mode,
                path,
                format!("expected object, found {}", json_shape(json)),
            ),
        },
    }
}

/// The lenient/strict split for a field that failed to parse.
fn fallback(
    kind: &FieldKind,
    nullable: bool,
    mode: DecodeMode,
    path: &str,
    reason: String,
) -> Result<Value, CodecError> {
    match mode {
        DecodeMode::Lenient => {
            debug!(field = path, reason = %reason, "field failed to parse; using slot default");
            Ok(if nullable {
                Value::Null
            } else {
                kind.default_value()
            })
        }
        DecodeMode::Strict => Err(CodecError::Field {
            path: path.to_string(),
            reason,
        }),
    }
}

fn decode_scalar(kind: ScalarKind, json: &JsonValue) -> Option<Value> {
    match kind {
        ScalarKind::Int8 => coerce_i64(json).and_then(|v| i8::try_from(v).ok()).map(Value::Int8),
        ScalarKind::Int16 => coerce_i64(json)
            .and_then(|v| i16::try_from(v).ok())
            .map(Value::Int16),
        ScalarKind::Int32 => coerce_i64(json)
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::Int32),
        ScalarKind::Int64 => coerce_i64(json).map(Value::Int64),
        ScalarKind::Uint8 => coerce_u64(json).and_then(|v| u8::try_from(v).ok()).map(Value::Uint8),
        ScalarKind::Uint16 => coerce_u64(json)
            .and_then(|v| u16::try_from(v).ok())
            .map(Value::Uint16),
        ScalarKind::Uint32 => coerce_u64(json)
            .and_then(|v| u32::try_from(v).ok())
            .map(Value::Uint32),
        ScalarKind::Uint64 => coerce_u64(json).map(Value::Uint64),
        ScalarKind::Float32 => coerce_f64(json).map(|v| Value::Float32(v as f32)),
        ScalarKind::Float64 => coerce_f64(json).map(Value::Float64),
        ScalarKind::Bool => coerce_bool(json).map(Value::Bool),
        ScalarKind::String => match json {
            JsonValue::String(s) => Some(Value::string(s)),
            JsonValue::Number(n) => Some(Value::string(n.to_string())),
            JsonValue::Bool(b) => Some(Value::string(b.to_string())),
            _ => None,
        },
        ScalarKind::Timestamp => coerce_timestamp(json).map(Value::Timestamp),
        ScalarKind::Decimal => coerce_decimal(json).map(Value::Decimal),
    }
}

fn decode_map_key(kind: MapKeyKind, raw: &str) -> Option<MapKey> {
    match kind {
        MapKeyKind::Bool => match raw {
            "true" => Some(MapKey::Bool(true)),
            "false" => Some(MapKey::Bool(false)),
            _ => None,
        },
        MapKeyKind::Int => raw.parse::<i64>().ok().map(MapKey::Int),
        MapKeyKind::Uint => raw.parse::<u64>().ok().map(MapKey::Uint),
        MapKeyKind::String => Some(MapKey::string(raw)),
    }
}

// Best-effort numeric coercion: native numbers, numeric strings, and bools
// all count; fractional input truncates toward zero.
fn coerce_i64(json: &JsonValue) -> Option<i64> {
    match json {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        JsonValue::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        JsonValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn coerce_u64(json: &JsonValue) -> Option<u64> {
    match json {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.trunc() as u64)),
        JsonValue::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<u64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.trunc() as u64)
            })
        }
        JsonValue::Bool(b) => Some(u64::from(*b)),
        _ => None,
    }
}

fn coerce_f64(json: &JsonValue) -> Option<f64> {
    match json {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        JsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn coerce_bool(json: &JsonValue) -> Option<bool> {
    match json {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    }
}

// Accepts integer milliseconds, numeric strings, or RFC 3339 datetimes.
fn coerce_timestamp(json: &JsonValue) -> Option<i64> {
    match json {
        JsonValue::Number(_) => coerce_i64(json),
        JsonValue::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                DateTime::parse_from_rfc3339(trimmed)
                    .ok()
                    .map(|dt| dt.timestamp_millis())
            })
        }
        _ => None,
    }
}

fn coerce_decimal(json: &JsonValue) -> Option<Decimal> {
    let text = match json {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Number(n) => n.to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}

fn json_shape(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
