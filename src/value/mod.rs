//! # Value Type System
//!
//! Dynamic values carried by message instances. A [`Value`] covers every
//! scalar kind a schema field can declare, plus containers (lists and maps)
//! and nested messages.
//!
//! ## Design Decisions
//!
//! - **Descriptor-driven**: values do not carry their own schema; a
//!   [`MessageValue`] is a positional slot vector aligned with its
//!   [`MessageDescriptor`](crate::schema::MessageDescriptor)
//! - **Null is a state, not a type**: `Value::Null` marks an absent nullable
//!   slot, distinct from any kind's default value
//! - **Value semantics**: everything is `Clone + PartialEq`, no identity, no
//!   shared mutable state; strings are `Arc<str>` for cheap cloning
//! - **Deterministic maps**: map keys are a restricted ordered subset
//!   ([`MapKey`]) stored in a `BTreeMap`, so encode order is stable
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wirebuf::value::{MessageValue, Value};
//!
//! let mut msg = MessageValue::new(descriptor.clone());
//! msg.set("user_id", Value::Int64(42));
//! assert_eq!(msg.get("user_id").and_then(Value::as_i64), Some(42));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::schema::MessageDescriptor;

/// Kind tag for a [`Value`], used in diagnostics and type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Null,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Bool,
    String,
    Timestamp,
    Decimal,
    Enum,
    Message,
    List,
    Map,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Null => "Null",
            DataKind::Int8 => "Int8",
            DataKind::Int16 => "Int16",
            DataKind::Int32 => "Int32",
            DataKind::Int64 => "Int64",
            DataKind::Uint8 => "Uint8",
            DataKind::Uint16 => "Uint16",
            DataKind::Uint32 => "Uint32",
            DataKind::Uint64 => "Uint64",
            DataKind::Float32 => "Float32",
            DataKind::Float64 => "Float64",
            DataKind::Bool => "Bool",
            DataKind::String => "String",
            DataKind::Timestamp => "Timestamp",
            DataKind::Decimal => "Decimal",
            DataKind::Enum => "Enum",
            DataKind::Message => "Message",
            DataKind::List => "List",
            DataKind::Map => "Map",
        };
        write!(f, "{name}")
    }
}

/// Key of a map-typed field.
///
/// A deliberately small, totally ordered subset of [`Value`]: map keys must
/// be hashable, orderable, and representable as JSON object keys. Integer
/// widths collapse to `i64`/`u64` here; the field's declared
/// [`MapKeyKind`](crate::schema::MapKeyKind) still bounds what decodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(Arc<str>),
}

impl MapKey {
    /// Convenience constructor for string keys.
    pub fn string(s: impl AsRef<str>) -> Self {
        MapKey::String(Arc::from(s.as_ref()))
    }

    /// Render the key as a JSON object key.
    pub fn to_key_string(&self) -> String {
        match self {
            MapKey::Bool(b) => b.to_string(),
            MapKey::Int(v) => v.to_string(),
            MapKey::Uint(v) => v.to_string(),
            MapKey::String(s) => s.to_string(),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(b) => write!(f, "{b}"),
            MapKey::Int(v) => write!(f, "{v}"),
            MapKey::Uint(v) => write!(f, "{v}"),
            MapKey::String(s) => write!(f, "\"{s}\""),
        }
    }
}

/// A dynamically-typed value held in a message slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent nullable slot. Preserved through codecs, never conflated with
    /// a kind's default value.
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    /// UTF-8 string (reference counted for efficient cloning)
    String(Arc<str>),
    /// Unix timestamp in milliseconds since epoch (1970-01-01 00:00:00 UTC)
    Timestamp(i64),
    /// Fixed-point decimal, carried as a decimal string on the text wire
    Decimal(Decimal),
    /// Enum member by integer value; the name never travels on the wire
    Enum(i32),
    /// Nested message instance
    Message(MessageValue),
    List(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
}

impl Value {
    /// Convenience constructor for string values.
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    /// Get the kind tag of this value.
    pub fn data_kind(&self) -> DataKind {
        match self {
            Value::Null => DataKind::Null,
            Value::Int8(_) => DataKind::Int8,
            Value::Int16(_) => DataKind::Int16,
            Value::Int32(_) => DataKind::Int32,
            Value::Int64(_) => DataKind::Int64,
            Value::Uint8(_) => DataKind::Uint8,
            Value::Uint16(_) => DataKind::Uint16,
            Value::Uint32(_) => DataKind::Uint32,
            Value::Uint64(_) => DataKind::Uint64,
            Value::Float32(_) => DataKind::Float32,
            Value::Float64(_) => DataKind::Float64,
            Value::Bool(_) => DataKind::Bool,
            Value::String(_) => DataKind::String,
            Value::Timestamp(_) => DataKind::Timestamp,
            Value::Decimal(_) => DataKind::Decimal,
            Value::Enum(_) => DataKind::Enum,
            Value::Message(_) => DataKind::Message,
            Value::List(_) => DataKind::List,
            Value::Map(_) => DataKind::Map,
        }
    }

    /// Check if this value is the absent marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as i64 (any integer width, timestamps and enums included).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::Uint8(v) => Some(i64::from(*v)),
            Value::Uint16(v) => Some(i64::from(*v)),
            Value::Uint32(v) => Some(i64::from(*v)),
            Value::Uint64(v) => i64::try_from(*v).ok(),
            Value::Timestamp(t) => Some(*t),
            Value::Enum(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Try to get as u64 (signed widths only when non-negative).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint8(v) => Some(u64::from(*v)),
            Value::Uint16(v) => Some(u64::from(*v)),
            Value::Uint32(v) => Some(u64::from(*v)),
            Value::Uint64(v) => Some(*v),
            Value::Int8(v) => u64::try_from(*v).ok(),
            Value::Int16(v) => u64::try_from(*v).ok(),
            Value::Int32(v) => u64::try_from(*v).ok(),
            Value::Int64(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            Value::Int8(v) => Some(f64::from(*v)),
            Value::Int16(v) => Some(f64::from(*v)),
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Uint8(v) => Some(f64::from(*v)),
            Value::Uint16(v) => Some(f64::from(*v)),
            Value::Uint32(v) => Some(f64::from(*v)),
            Value::Uint64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as a nested message.
    pub fn as_message(&self) -> Option<&MessageValue> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Try to get as a list slice.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as a map.
    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Uint8(v) => write!(f, "{v}"),
            Value::Uint16(v) => write!(f, "{v}"),
            Value::Uint32(v) => write!(f, "{v}"),
            Value::Uint64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Timestamp(t) => write!(f, "ts:{t}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Enum(v) => write!(f, "enum:{v}"),
            Value::Message(m) => write!(f, "{}", m),
            Value::List(items) => write!(f, "list[{}]", items.len()),
            Value::Map(entries) => write!(f, "map[{}]", entries.len()),
        }
    }
}

/// A message instance: slot values aligned positionally with the fields of
/// its descriptor.
///
/// Required slots always hold a concrete value (the kind default until
/// assigned); nullable slots hold `Value::Null` while unset. Instances are
/// plain values with no identity; clone freely.
#[derive(Debug, Clone)]
pub struct MessageValue {
    descriptor: Arc<MessageDescriptor>,
    slots: Vec<Value>,
}

impl MessageValue {
    /// Create a default-constructed instance: required slots take their
    /// kind's default, nullable slots start absent.
    pub fn new(descriptor: Arc<MessageDescriptor>) -> Self {
        let slots = descriptor
            .fields()
            .iter()
            .map(crate::schema::FieldDescriptor::slot_default)
            .collect();
        Self { descriptor, slots }
    }

    /// The schema descriptor this instance conforms to.
    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// Get a slot value by field wire name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.descriptor
            .field_position(name)
            .map(|pos| &self.slots[pos])
    }

    /// Get a slot value by field position.
    pub fn get_at(&self, position: usize) -> Option<&Value> {
        self.slots.get(position)
    }

    /// Get a slot value by name, substituting the field's kind default when
    /// the slot is absent. Mirrors generated accessor semantics: a nullable
    /// field reads as its default rather than null.
    pub fn get_or_default(&self, name: &str) -> Option<Value> {
        let pos = self.descriptor.field_position(name)?;
        let value = &self.slots[pos];
        if value.is_null() {
            Some(self.descriptor.fields()[pos].kind().default_value())
        } else {
            Some(value.clone())
        }
    }

    /// Set a slot value by field wire name. Returns false if the descriptor
    /// has no such field.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.descriptor.field_position(name) {
            Some(pos) => {
                self.slots[pos] = value;
                true
            }
            None => false,
        }
    }

    /// Set a slot value by field position.
    pub fn set_at(&mut self, position: usize, value: Value) -> bool {
        match self.slots.get_mut(position) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Reset a slot to its unset state: absent for nullable fields, the kind
    /// default for required fields.
    pub fn clear(&mut self, name: &str) -> bool {
        match self.descriptor.field_position(name) {
            Some(pos) => {
                self.slots[pos] = self.descriptor.fields()[pos].slot_default();
                true
            }
            None => false,
        }
    }

    /// Number of slots (equals the descriptor's field count).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the descriptor declares no fields.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate `(field, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&crate::schema::FieldDescriptor, &Value)> {
        self.descriptor.fields().iter().zip(self.slots.iter())
    }
}

impl PartialEq for MessageValue {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.name() == other.descriptor.name() && self.slots == other.slots
    }
}

impl fmt::Display for MessageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ ", self.descriptor.name())?;
        for (i, (field, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name(), value)?;
        }
        write!(f, " }}")
    }
}
