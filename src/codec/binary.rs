//! Compact binary codec.
//!
//! Tag/length layout keyed by each field's stable wire index, designed
//! around two invariants: exact round-trip for every representable value,
//! and self-describing field boundaries so a decoder can skip a wire index
//! it does not know without misaligning the rest of the message.
//!
//! Layout:
//!
//! ```text
//! field      := tag payload
//! tag        := varint( wire_index << 3 | wire_type )
//! wire_type  := 0 varint | 1 fixed64 | 2 length-delimited | 5 fixed32
//! ```
//!
//! Signed integers, enums, and timestamps are zigzag varints; unsigned
//! integers and bools plain varints; floats little-endian fixed-width;
//! strings, decimal strings, nested messages, lists, and maps
//! length-delimited. List and map blocks carry an element count followed by
//! the element payloads, with a presence byte per element/value when the
//! container's element type is nullable.
//!
//! Absent nullable fields are omitted entirely; required fields are always
//! written. An unknown wire index or a tag whose wire type contradicts the
//! descriptor is skipped, leaving the slot at its default - schema
//! evolution tolerance over strictness. Structural corruption (truncation,
//! overlong lengths, varint overflow) is an error: a misaligned stream is
//! not recoverable per field.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::schema::{FieldKind, MapKeyKind, MessageDescriptor, ScalarKind};
use crate::value::{MapKey, MessageValue, Value};

use super::CodecError;

const WT_VARINT: u8 = 0;
const WT_FIXED64: u8 = 1;
const WT_LEN: u8 = 2;
const WT_FIXED32: u8 = 5;

/// Guard rails for decoding untrusted payloads.
#[derive(Debug, Clone, Copy)]
pub struct BinaryLimits {
    /// Maximum accepted payload size in bytes
    pub max_len: usize,
    /// Maximum message/container nesting depth
    pub max_depth: usize,
}

impl Default for BinaryLimits {
    fn default() -> Self {
        Self {
            // 16 MB
            max_len: 16 * 1024 * 1024,
            max_depth: 32,
        }
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a message into its binary form.
pub fn encode_message(msg: &MessageValue) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    encode_fields(&mut buf, msg);
    buf
}

fn encode_fields(buf: &mut Vec<u8>, msg: &MessageValue) {
    for (field, value) in msg.iter() {
        if value.is_null() {
            // Absent nullable slot: no bytes on the wire.
            continue;
        }
        write_varint(
            buf,
            (u64::from(field.index()) << 3) | u64::from(wire_type_of(field.kind())),
        );
        encode_payload(buf, field.kind(), value);
    }
}

fn wire_type_of(kind: &FieldKind) -> u8 {
    match kind {
        FieldKind::Scalar(scalar) => match scalar {
            ScalarKind::Float32 => WT_FIXED32,
            ScalarKind::Float64 => WT_FIXED64,
            ScalarKind::String | ScalarKind::Decimal => WT_LEN,
            _ => WT_VARINT,
        },
        FieldKind::Enum(_) => WT_VARINT,
        FieldKind::Message(_) | FieldKind::List { .. } | FieldKind::Map { .. } => WT_LEN,
    }
}

// Payload encoding shared by tagged fields and container elements; every
// form is self-delimiting for its kind.
fn encode_payload(buf: &mut Vec<u8>, kind: &FieldKind, value: &Value) {
    match kind {
        FieldKind::Scalar(scalar) => encode_scalar(buf, *scalar, value),
        FieldKind::Enum(_) => {
            let v = value.as_i64().unwrap_or(0);
            write_varint(buf, zigzag_encode(v));
        }
        FieldKind::Message(desc) => {
            let nested = match value {
                Value::Message(m) => encode_message(m),
                _ => encode_message(&MessageValue::new(desc.clone())),
            };
            write_varint(buf, nested.len() as u64);
            buf.extend_from_slice(&nested);
        }
        FieldKind::List {
            element,
            element_nullable,
        } => {
            let empty = Vec::new();
            let items = value.as_list().unwrap_or(&empty);
            let mut block = Vec::with_capacity(items.len() * 4);
            write_varint(&mut block, items.len() as u64);
            for item in items {
                if *element_nullable {
                    block.push(u8::from(!item.is_null()));
                    if item.is_null() {
                        continue;
                    }
                }
                encode_payload(&mut block, element, item);
            }
            write_varint(buf, block.len() as u64);
            buf.extend_from_slice(&block);
        }
        FieldKind::Map {
            value: value_kind,
            value_nullable,
            ..
        } => {
            let empty = std::collections::BTreeMap::new();
            let entries = value.as_map().unwrap_or(&empty);
            let mut block = Vec::with_capacity(entries.len() * 8);
            write_varint(&mut block, entries.len() as u64);
            for (key, entry_value) in entries {
                encode_map_key(&mut block, key);
                if *value_nullable {
                    block.push(u8::from(!entry_value.is_null()));
                    if entry_value.is_null() {
                        continue;
                    }
                }
                encode_payload(&mut block, value_kind, entry_value);
            }
            write_varint(buf, block.len() as u64);
            buf.extend_from_slice(&block);
        }
    }
}

fn encode_scalar(buf: &mut Vec<u8>, kind: ScalarKind, value: &Value) {
    match kind {
        ScalarKind::Int8
        | ScalarKind::Int16
        | ScalarKind::Int32
        | ScalarKind::Int64
        | ScalarKind::Timestamp => {
            write_varint(buf, zigzag_encode(value.as_i64().unwrap_or(0)));
        }
        ScalarKind::Uint8 | ScalarKind::Uint16 | ScalarKind::Uint32 | ScalarKind::Uint64 => {
            write_varint(buf, value.as_u64().unwrap_or(0));
        }
        ScalarKind::Bool => {
            write_varint(buf, u64::from(value.as_bool().unwrap_or(false)));
        }
        ScalarKind::Float32 => {
            let v = value.as_f64().unwrap_or(0.0) as f32;
            buf.extend_from_slice(&v.to_le_bytes());
        }
        ScalarKind::Float64 => {
            let v = value.as_f64().unwrap_or(0.0);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        ScalarKind::String => {
            let s = value.as_str().unwrap_or("");
            write_varint(buf, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        ScalarKind::Decimal => {
            let text = match value {
                Value::Decimal(d) => d.to_string(),
                _ => Decimal::ZERO.to_string(),
            };
            write_varint(buf, text.len() as u64);
            buf.extend_from_slice(text.as_bytes());
        }
    }
}

fn encode_map_key(buf: &mut Vec<u8>, key: &MapKey) {
    match key {
        MapKey::Bool(b) => write_varint(buf, u64::from(*b)),
        MapKey::Int(v) => write_varint(buf, zigzag_encode(*v)),
        MapKey::Uint(v) => write_varint(buf, *v),
        MapKey::String(s) => {
            write_varint(buf, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
    }
}

fn write_varint(buf: &mut Vec<u8>, mut v: u64) {
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a message from its binary form with default limits.
pub fn decode_message(
    desc: &Arc<MessageDescriptor>,
    bytes: &[u8],
) -> Result<MessageValue, CodecError> {
    decode_message_with(desc, bytes, &BinaryLimits::default())
}

/// Decode a message from its binary form.
pub fn decode_message_with(
    desc: &Arc<MessageDescriptor>,
    bytes: &[u8],
    limits: &BinaryLimits,
) -> Result<MessageValue, CodecError> {
    if bytes.len() > limits.max_len {
        return Err(CodecError::SizeExceeded {
            len: bytes.len(),
            limit: limits.max_len,
        });
    }
    let mut reader = Reader::new(bytes);
    decode_struct(desc, &mut reader, limits, 0)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn read_byte(&mut self) -> Result<u8, CodecError> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or(CodecError::Truncated { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_varint(&mut self) -> Result<u64, CodecError> {
        let start = self.pos;
        let mut out: u64 = 0;
        for shift in (0..64).step_by(7) {
            let byte = self.read_byte()?;
            out |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(out);
            }
        }
        Err(CodecError::VarintOverflow { offset: start })
    }

    fn read_exact(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or(CodecError::Truncated { offset: self.pos })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_len_prefixed(&mut self) -> Result<&'a [u8], CodecError> {
        let offset = self.pos;
        let len = self.read_varint()?;
        let remaining = (self.buf.len() - self.pos) as u64;
        if len > remaining {
            return Err(CodecError::LengthOverrun { offset, len });
        }
        self.read_exact(len as usize)
    }

    fn skip(&mut self, wire_type: u8) -> Result<(), CodecError> {
        match wire_type {
            WT_VARINT => self.read_varint().map(|_| ()),
            WT_FIXED64 => self.read_exact(8).map(|_| ()),
            WT_FIXED32 => self.read_exact(4).map(|_| ()),
            WT_LEN => self.read_len_prefixed().map(|_| ()),
            other => Err(CodecError::InvalidWireType {
                wire_type: other,
                offset: self.pos,
            }),
        }
    }
}

fn decode_struct(
    desc: &Arc<MessageDescriptor>,
    reader: &mut Reader<'_>,
    limits: &BinaryLimits,
    depth: usize,
) -> Result<MessageValue, CodecError> {
    if depth >= limits.max_depth {
        return Err(CodecError::DepthExceeded {
            limit: limits.max_depth,
        });
    }
    let mut msg = MessageValue::new(desc.clone());
    while !reader.is_empty() {
        let tag = reader.read_varint()?;
        let wire_type = (tag & 0x07) as u8;
        let index = tag >> 3;
        let position = u16::try_from(index)
            .ok()
            .and_then(|index| desc.position_by_index(index));
        match position {
            Some(pos) => {
                let field = &desc.fields()[pos];
                if wire_type == wire_type_of(field.kind()) {
                    let value = decode_payload(reader, field.kind(), limits, depth)?;
                    msg.set_at(pos, value);
                } else {
                    // A peer with a different schema revision; leave the
                    // slot at its default rather than misreading bytes.
                    debug!(
                        message = desc.name(),
                        field = field.name(),
                        wire_type,
                        "wire type mismatch; skipping field"
                    );
                    reader.skip(wire_type)?;
                }
            }
            None => reader.skip(wire_type)?,
        }
    }
    Ok(msg)
}

fn decode_payload(
    reader: &mut Reader<'_>,
    kind: &FieldKind,
    limits: &BinaryLimits,
    depth: usize,
) -> Result<Value, CodecError> {
    match kind {
        FieldKind::Scalar(scalar) => decode_scalar(reader, *scalar),
        FieldKind::Enum(desc) => {
            let raw = zigzag_decode(reader.read_varint()?) as i32;
            match desc.value_of(raw) {
                Ok(member) => Ok(Value::Enum(member.value)),
                Err(err) => {
                    debug!(%err, "unknown enum value on the wire; using default member");
                    Ok(Value::Enum(desc.default_member().value))
                }
            }
        }
        FieldKind::Message(desc) => {
            let nested = reader.read_len_prefixed()?;
            let mut sub = Reader::new(nested);
            Ok(Value::Message(decode_struct(desc, &mut sub, limits, depth + 1)?))
        }
        FieldKind::List {
            element,
            element_nullable,
        } => {
            let block = reader.read_len_prefixed()?;
            let mut sub = Reader::new(block);
            let offset = sub.pos;
            let count = sub.read_varint()?;
            // Every element costs at least one byte; a larger count is a
            // forged header.
            if count > block.len() as u64 {
                return Err(CodecError::LengthOverrun { offset, len: count });
            }
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                if *element_nullable && sub.read_byte()? == 0 {
                    items.push(Value::Null);
                    continue;
                }
                items.push(decode_payload(&mut sub, element, limits, depth + 1)?);
            }
            Ok(Value::List(items))
        }
        FieldKind::Map {
            key,
            value,
            value_nullable,
        } => {
            let block = reader.read_len_prefixed()?;
            let mut sub = Reader::new(block);
            let offset = sub.pos;
            let count = sub.read_varint()?;
            if count > block.len() as u64 {
                return Err(CodecError::LengthOverrun { offset, len: count });
            }
            let mut entries = std::collections::BTreeMap::new();
            for _ in 0..count {
                let map_key = decode_map_key(&mut sub, *key)?;
                let entry_value = if *value_nullable && sub.read_byte()? == 0 {
                    Value::Null
                } else {
                    decode_payload(&mut sub, value, limits, depth + 1)?
                };
                entries.insert(map_key, entry_value);
            }
            Ok(Value::Map(entries))
        }
    }
}

fn decode_scalar(reader: &mut Reader<'_>, kind: ScalarKind) -> Result<Value, CodecError> {
    match kind {
        ScalarKind::Int8 => Ok(Value::Int8(zigzag_decode(reader.read_varint()?) as i8)),
        ScalarKind::Int16 => Ok(Value::Int16(zigzag_decode(reader.read_varint()?) as i16)),
        ScalarKind::Int32 => Ok(Value::Int32(zigzag_decode(reader.read_varint()?) as i32)),
        ScalarKind::Int64 => Ok(Value::Int64(zigzag_decode(reader.read_varint()?))),
        ScalarKind::Timestamp => Ok(Value::Timestamp(zigzag_decode(reader.read_varint()?))),
        ScalarKind::Uint8 => Ok(Value::Uint8(reader.read_varint()? as u8)),
        ScalarKind::Uint16 => Ok(Value::Uint16(reader.read_varint()? as u16)),
        ScalarKind::Uint32 => Ok(Value::Uint32(reader.read_varint()? as u32)),
        ScalarKind::Uint64 => Ok(Value::Uint64(reader.read_varint()?)),
        ScalarKind::Bool => Ok(Value::Bool(reader.read_varint()? != 0)),
        ScalarKind::Float32 => {
            let bytes = reader.read_exact(4)?;
            let mut arr = [0u8; 4];
            arr.copy_from_slice(bytes);
            Ok(Value::Float32(f32::from_le_bytes(arr)))
        }
        ScalarKind::Float64 => {
            let bytes = reader.read_exact(8)?;
            let mut arr = [0u8; 8];
            arr.copy_from_slice(bytes);
            Ok(Value::Float64(f64::from_le_bytes(arr)))
        }
        ScalarKind::String => {
            let offset = reader.pos;
            let bytes = reader.read_len_prefixed()?;
            std::str::from_utf8(bytes)
                .map(Value::string)
                .map_err(|_| CodecError::InvalidUtf8 { offset })
        }
        ScalarKind::Decimal => {
            let bytes = reader.read_len_prefixed()?;
            let parsed = std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| Decimal::from_str(s).ok());
            match parsed {
                Some(d) => Ok(Value::Decimal(d)),
                None => {
                    debug!("unparseable decimal payload; using zero");
                    Ok(Value::Decimal(Decimal::ZERO))
                }
            }
        }
    }
}

fn decode_map_key(reader: &mut Reader<'_>, kind: MapKeyKind) -> Result<MapKey, CodecError> {
    match kind {
        MapKeyKind::Bool => Ok(MapKey::Bool(reader.read_varint()? != 0)),
        MapKeyKind::Int => Ok(MapKey::Int(zigzag_decode(reader.read_varint()?))),
        MapKeyKind::Uint => Ok(MapKey::Uint(reader.read_varint()?)),
        MapKeyKind::String => {
            let offset = reader.pos;
            let bytes = reader.read_len_prefixed()?;
            std::str::from_utf8(bytes)
                .map(MapKey::string)
                .map_err(|_| CodecError::InvalidUtf8 { offset })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;

    #[test]
    fn test_varint_roundtrip() {
        for v in [0u64, 1, 127, 128, 300, u64::from(u32::MAX), u64::MAX] {
            let mut buf = Vec::new();
            write_varint(&mut buf, v);
            let mut reader = Reader::new(&buf);
            assert_eq!(reader.read_varint().unwrap(), v);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn test_zigzag_roundtrip() {
        for v in [0i64, 1, -1, 63, -64, i64::MAX, i64::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }

    #[test]
    fn test_zigzag_small_magnitudes_stay_small() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
    }

    #[test]
    fn test_truncated_varint_errors() {
        let mut reader = Reader::new(&[0x80]);
        assert!(matches!(
            reader.read_varint(),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn test_varint_overflow_errors() {
        let buf = [0xFF; 11];
        let mut reader = Reader::new(&buf);
        assert!(matches!(
            reader.read_varint(),
            Err(CodecError::VarintOverflow { .. })
        ));
    }

    #[test]
    fn test_unknown_field_skipped_without_misalignment() {
        let desc = MessageDescriptor::new(
            "M",
            vec![FieldDescriptor::required(
                "kept",
                1,
                FieldKind::Scalar(ScalarKind::Uint32),
            )],
        )
        .unwrap();

        // Unknown index 9 (varint), then unknown index 10 (length-delimited),
        // then the known field.
        let mut buf = Vec::new();
        write_varint(&mut buf, (9 << 3) | u64::from(WT_VARINT));
        write_varint(&mut buf, 12345);
        write_varint(&mut buf, (10 << 3) | u64::from(WT_LEN));
        write_varint(&mut buf, 3);
        buf.extend_from_slice(b"abc");
        write_varint(&mut buf, (1 << 3) | u64::from(WT_VARINT));
        write_varint(&mut buf, 42);

        let msg = decode_message(&desc, &buf).unwrap();
        assert_eq!(msg.get("kept"), Some(&Value::Uint32(42)));
    }

    #[test]
    fn test_wire_type_mismatch_leaves_default() {
        let desc = MessageDescriptor::new(
            "M",
            vec![FieldDescriptor::required(
                "s",
                0,
                FieldKind::Scalar(ScalarKind::String),
            )],
        )
        .unwrap();
        // Index 0 sent as varint although the schema says length-delimited.
        let mut buf = Vec::new();
        write_varint(&mut buf, u64::from(WT_VARINT));
        write_varint(&mut buf, 7);
        let msg = decode_message(&desc, &buf).unwrap();
        assert_eq!(msg.get("s"), Some(&Value::string("")));
    }

    #[test]
    fn test_forged_list_count_rejected() {
        let desc = MessageDescriptor::new(
            "M",
            vec![FieldDescriptor::required(
                "xs",
                0,
                FieldKind::list(FieldKind::Scalar(ScalarKind::Uint8)),
            )],
        )
        .unwrap();
        let mut buf = Vec::new();
        write_varint(&mut buf, u64::from(WT_LEN));
        // Block of 2 bytes claiming one million elements.
        write_varint(&mut buf, 2);
        buf.extend_from_slice(&[0xC0, 0x84]);
        assert!(decode_message(&desc, &buf).is_err());
    }

    #[test]
    fn test_depth_limit_enforced() {
        let leaf = MessageDescriptor::new("Leaf", vec![]).unwrap();
        let desc = MessageDescriptor::new(
            "Node",
            vec![FieldDescriptor::nullable(
                "child",
                0,
                FieldKind::Message(leaf.clone()),
            )],
        )
        .unwrap();
        let tight = BinaryLimits {
            max_len: 1024,
            max_depth: 1,
        };

        // A flat message fits within depth 1.
        let msg = MessageValue::new(desc.clone());
        let bytes = encode_message(&msg);
        assert!(decode_message_with(&desc, &bytes, &tight).is_ok());

        // One nested child exceeds it.
        let mut msg = MessageValue::new(desc.clone());
        msg.set("child", Value::Message(MessageValue::new(leaf)));
        let bytes = encode_message(&msg);
        assert!(matches!(
            decode_message_with(&desc, &bytes, &tight),
            Err(CodecError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn test_size_limit_enforced() {
        let desc = MessageDescriptor::new(
            "M",
            vec![FieldDescriptor::required(
                "s",
                0,
                FieldKind::Scalar(ScalarKind::String),
            )],
        )
        .unwrap();
        let mut msg = MessageValue::new(desc.clone());
        msg.set("s", Value::string("x".repeat(100)));
        let bytes = encode_message(&msg);
        let tight = BinaryLimits {
            max_len: 10,
            max_depth: 32,
        };
        assert!(matches!(
            decode_message_with(&desc, &bytes, &tight),
            Err(CodecError::SizeExceeded { .. })
        ));
    }
}
