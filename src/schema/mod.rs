//! # Schema Descriptors
//!
//! Immutable descriptions of the message, enum, and service shapes a schema
//! declares. Descriptors are built once at process start, wrapped in `Arc`,
//! and never mutated afterwards; concurrent codec and dispatch calls share
//! them without locking.
//!
//! The field model is a closed tagged union ([`FieldKind`]) resolved when the
//! descriptor is constructed, so codecs dispatch on an enum rather than
//! re-interpreting schema text per call.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wirebuf::schema::{EnumDescriptor, FieldDescriptor, FieldKind, MessageDescriptor, ScalarKind};
//!
//! let status = EnumDescriptor::new("Status", vec![(0, "Enable"), (1, "Disabled")])?;
//! let info = MessageDescriptor::new(
//!     "Info",
//!     vec![
//!         FieldDescriptor::nullable("user_id", 0, FieldKind::Scalar(ScalarKind::Int64)),
//!         FieldDescriptor::required("status", 1, FieldKind::Enum(status.clone())),
//!     ],
//! )?;
//! ```

pub mod registry;

pub use registry::{SchemaRegistry, SchemaRegistryBuilder};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::value::{MessageValue, Value};

// ============================================================================
// Errors
// ============================================================================

/// Enum member lookup failure. Never substituted with a default by the
/// lookup APIs themselves; surfacing or recovering is the caller's policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum LookupError {
    /// No member carries the requested value
    #[error("enum '{enum_name}' has no member with value {value}")]
    ValueNotFound { enum_name: String, value: i32 },

    /// No member carries the requested name
    #[error("enum '{enum_name}' has no member named '{name}'")]
    NameNotFound { enum_name: String, name: String },
}

/// Invalid descriptor construction or registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("enum '{enum_name}' declares no members")]
    EmptyEnum { enum_name: String },

    #[error("enum '{enum_name}' declares value {value} twice")]
    DuplicateEnumValue { enum_name: String, value: i32 },

    #[error("enum '{enum_name}' declares member name '{name}' twice")]
    DuplicateEnumName { enum_name: String, name: String },

    #[error("message '{message}' declares field name '{name}' twice")]
    DuplicateFieldName { message: String, name: String },

    #[error("message '{message}' reuses wire index {index}")]
    DuplicateWireIndex { message: String, index: u16 },

    #[error("service '{service}' declares method name '{name}' twice")]
    DuplicateMethodName { service: String, name: String },

    #[error("service '{service}' reuses local method id {local_id}")]
    DuplicateLocalId { service: String, local_id: u32 },

    #[error("service '{service}' has no method named '{method}'")]
    UnknownMethod { service: String, method: String },

    #[error("'{name}' is already registered")]
    DuplicateRegistration { name: String },

    #[error("route '{path}' is already registered")]
    DuplicateRoute { path: String },
}

// ============================================================================
// Scalar and field kinds
// ============================================================================

/// The closed set of scalar kinds a field can declare.
///
/// Each kind has a zero/empty default, a JSON rendering rule (see
/// `codec::text`), and a binary rule (see `codec::binary`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
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
    /// Milliseconds since Unix epoch
    Timestamp,
    /// Decimal number, decimal-string wire form
    Decimal,
}

impl ScalarKind {
    /// The kind's zero/empty default value.
    pub fn default_value(self) -> Value {
        match self {
            ScalarKind::Int8 => Value::Int8(0),
            ScalarKind::Int16 => Value::Int16(0),
            ScalarKind::Int32 => Value::Int32(0),
            ScalarKind::Int64 => Value::Int64(0),
            ScalarKind::Uint8 => Value::Uint8(0),
            ScalarKind::Uint16 => Value::Uint16(0),
            ScalarKind::Uint32 => Value::Uint32(0),
            ScalarKind::Uint64 => Value::Uint64(0),
            ScalarKind::Float32 => Value::Float32(0.0),
            ScalarKind::Float64 => Value::Float64(0.0),
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::String => Value::string(""),
            ScalarKind::Timestamp => Value::Timestamp(0),
            ScalarKind::Decimal => Value::Decimal(Decimal::ZERO),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Int8 => "Int8",
            ScalarKind::Int16 => "Int16",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Int64 => "Int64",
            ScalarKind::Uint8 => "Uint8",
            ScalarKind::Uint16 => "Uint16",
            ScalarKind::Uint32 => "Uint32",
            ScalarKind::Uint64 => "Uint64",
            ScalarKind::Float32 => "Float32",
            ScalarKind::Float64 => "Float64",
            ScalarKind::Bool => "Bool",
            ScalarKind::String => "String",
            ScalarKind::Timestamp => "Timestamp",
            ScalarKind::Decimal => "Decimal",
        };
        write!(f, "{name}")
    }
}

/// Key kind of a map-typed field. Restricted to kinds that are hashable,
/// orderable, and representable as JSON object keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKeyKind {
    Bool,
    Int,
    Uint,
    String,
}

/// The declared kind of a field: scalar, enum, nested message, or container.
///
/// Container element/value nullability is part of the kind. Two list field
/// variants exist precisely so a decoded `null` element can either collapse
/// to the element default or stay absent.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Enum(Arc<EnumDescriptor>),
    Message(Arc<MessageDescriptor>),
    List {
        element: Box<FieldKind>,
        element_nullable: bool,
    },
    Map {
        key: MapKeyKind,
        value: Box<FieldKind>,
        value_nullable: bool,
    },
}

impl FieldKind {
    /// Shorthand for a non-nullable-element list.
    pub fn list(element: FieldKind) -> Self {
        FieldKind::List {
            element: Box::new(element),
            element_nullable: false,
        }
    }

    /// Shorthand for a nullable-element list.
    pub fn list_nullable(element: FieldKind) -> Self {
        FieldKind::List {
            element: Box::new(element),
            element_nullable: true,
        }
    }

    /// Shorthand for a non-nullable-value map.
    pub fn map(key: MapKeyKind, value: FieldKind) -> Self {
        FieldKind::Map {
            key,
            value: Box::new(value),
            value_nullable: false,
        }
    }

    /// Shorthand for a nullable-value map.
    pub fn map_nullable(key: MapKeyKind, value: FieldKind) -> Self {
        FieldKind::Map {
            key,
            value: Box::new(value),
            value_nullable: true,
        }
    }

    /// The kind's default value: scalar zero/empty, the enum's default
    /// member, a fresh default-constructed message, or an empty container.
    pub fn default_value(&self) -> Value {
        match self {
            FieldKind::Scalar(kind) => kind.default_value(),
            FieldKind::Enum(desc) => Value::Enum(desc.default_member().value),
            FieldKind::Message(desc) => Value::Message(MessageValue::new(desc.clone())),
            FieldKind::List { .. } => Value::List(Vec::new()),
            FieldKind::Map { .. } => Value::Map(std::collections::BTreeMap::new()),
        }
    }
}

// ============================================================================
// Field descriptor
// ============================================================================

/// One typed field of a message.
///
/// `index` is the stable wire index: assigned once at schema definition time,
/// unique within the message, never reused or reordered. It is the contract
/// for binary forward/backward compatibility and is independent of the
/// field's declaration position.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    index: u16,
    kind: FieldKind,
    nullable: bool,
}

impl FieldDescriptor {
    /// A required field: has a schema default, never absent after decode.
    pub fn required(name: impl Into<String>, index: u16, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            index,
            kind,
            nullable: false,
        }
    }

    /// A nullable field: absence is a distinct, preserved state.
    pub fn nullable(name: impl Into<String>, index: u16, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            index,
            kind,
            nullable: true,
        }
    }

    /// Field wire name (the JSON object key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable wire index (the binary tag).
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Declared kind.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether absence is preserved rather than defaulted.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The value an unset slot holds: `Null` for nullable fields, the kind
    /// default for required fields.
    pub fn slot_default(&self) -> Value {
        if self.nullable {
            Value::Null
        } else {
            self.kind.default_value()
        }
    }
}

// ============================================================================
// Enum descriptor
// ============================================================================

/// One named integer constant of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    pub value: i32,
    pub name: String,
}

impl fmt::Display for EnumMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A closed, immutable set of named integer constants.
///
/// Lookup failure is an error, never a silently substituted member. The wire
/// form is always the integer value; names exist for diagnostics and
/// interop tooling.
#[derive(Debug)]
pub struct EnumDescriptor {
    name: String,
    members: Vec<EnumMember>,
    default_position: usize,
}

impl EnumDescriptor {
    /// Build an enum descriptor from `(value, name)` pairs. Values and names
    /// must each be unique; the member set must be non-empty.
    pub fn new(
        name: impl Into<String>,
        members: Vec<(i32, &str)>,
    ) -> Result<Arc<Self>, SchemaError> {
        let name = name.into();
        if members.is_empty() {
            return Err(SchemaError::EmptyEnum { enum_name: name });
        }
        let mut seen_values = std::collections::HashSet::new();
        let mut seen_names = std::collections::HashSet::new();
        let mut out = Vec::with_capacity(members.len());
        let mut default_position = 0;
        for (position, (value, member_name)) in members.into_iter().enumerate() {
            if !seen_values.insert(value) {
                return Err(SchemaError::DuplicateEnumValue {
                    enum_name: name,
                    value,
                });
            }
            if !seen_names.insert(member_name.to_string()) {
                return Err(SchemaError::DuplicateEnumName {
                    enum_name: name,
                    name: member_name.to_string(),
                });
            }
            if value < out.get(default_position).map_or(i32::MAX, |m: &EnumMember| m.value) {
                default_position = position;
            }
            out.push(EnumMember {
                value,
                name: member_name.to_string(),
            });
        }
        Ok(Arc::new(Self {
            name,
            members: out,
            default_position,
        }))
    }

    /// Enum type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in declaration order.
    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    /// The member decode falls back to in lenient mode: the smallest
    /// declared value (zero in well-formed schemas).
    pub fn default_member(&self) -> &EnumMember {
        &self.members[self.default_position]
    }

    /// Look up a member by value. No clamping, no nearest fallback.
    pub fn value_of(&self, value: i32) -> Result<&EnumMember, LookupError> {
        self.members
            .iter()
            .find(|m| m.value == value)
            .ok_or_else(|| LookupError::ValueNotFound {
                enum_name: self.name.clone(),
                value,
            })
    }

    /// Look up a member by name, symmetric with [`value_of`](Self::value_of).
    pub fn name_of(&self, name: &str) -> Result<&EnumMember, LookupError> {
        self.members
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| LookupError::NameNotFound {
                enum_name: self.name.clone(),
                name: name.to_string(),
            })
    }
}

// ============================================================================
// Message descriptor
// ============================================================================

/// The ordered field set of one message type, with name and wire-index
/// lookup tables resolved at construction.
#[derive(Debug)]
pub struct MessageDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
    by_name: HashMap<String, usize>,
    by_index: HashMap<u16, usize>,
}

impl MessageDescriptor {
    /// Build a message descriptor. Field names and wire indexes must each be
    /// unique within the message.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Arc<Self>, SchemaError> {
        let name = name.into();
        let mut by_name = HashMap::with_capacity(fields.len());
        let mut by_index = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if by_name.insert(field.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateFieldName {
                    message: name,
                    name: field.name.clone(),
                });
            }
            if by_index.insert(field.index, position).is_some() {
                return Err(SchemaError::DuplicateWireIndex {
                    message: name,
                    index: field.index,
                });
            }
        }
        Ok(Arc::new(Self {
            name,
            fields,
            by_name,
            by_index,
        }))
    }

    /// Message type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Position of a field by wire name.
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Field by wire name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_position(name).map(|pos| &self.fields[pos])
    }

    /// Position of a field by stable wire index.
    pub fn position_by_index(&self, index: u16) -> Option<usize> {
        self.by_index.get(&index).copied()
    }
}

// ============================================================================
// Service descriptor
// ============================================================================

/// Composite 64-bit method identifier: `(service_id << 32) | local_id`.
///
/// Globally unique across all services sharing one transport, with no
/// name-based lookup needed on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodId(pub u64);

impl MethodId {
    /// Compose from a service id and a method-local id.
    pub fn compose(service_id: u32, local_id: u32) -> Self {
        Self((u64::from(service_id) << 32) | u64::from(local_id))
    }

    /// The service-id half.
    pub fn service_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The method-local half.
    pub fn local_id(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service_id(), self.local_id())
    }
}

/// One RPC method: name, service-local id, and its request/response pair.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    name: String,
    local_id: u32,
    request: Arc<MessageDescriptor>,
    response: Arc<MessageDescriptor>,
}

impl MethodDescriptor {
    pub fn new(
        name: impl Into<String>,
        local_id: u32,
        request: Arc<MessageDescriptor>,
        response: Arc<MessageDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            local_id,
            request,
            response,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_id(&self) -> u32 {
        self.local_id
    }

    pub fn request(&self) -> &Arc<MessageDescriptor> {
        &self.request
    }

    pub fn response(&self) -> &Arc<MessageDescriptor> {
        &self.response
    }
}

/// A named, numbered set of RPC methods.
#[derive(Debug)]
pub struct ServiceDescriptor {
    name: String,
    id: u32,
    methods: Vec<MethodDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ServiceDescriptor {
    /// Build a service descriptor. Method names and local ids must each be
    /// unique within the service.
    pub fn new(
        name: impl Into<String>,
        id: u32,
        methods: Vec<MethodDescriptor>,
    ) -> Result<Arc<Self>, SchemaError> {
        let name = name.into();
        let mut by_name = HashMap::with_capacity(methods.len());
        let mut seen_local = std::collections::HashSet::new();
        for (position, method) in methods.iter().enumerate() {
            if by_name.insert(method.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateMethodName {
                    service: name,
                    name: method.name.clone(),
                });
            }
            if !seen_local.insert(method.local_id) {
                return Err(SchemaError::DuplicateLocalId {
                    service: name,
                    local_id: method.local_id,
                });
            }
        }
        Ok(Arc::new(Self {
            name,
            id,
            methods,
            by_name,
        }))
    }

    /// Service name (the first segment of every method path).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Service id (the high half of every method id).
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Methods in declaration order.
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Method by name.
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.by_name.get(name).map(|pos| &self.methods[*pos])
    }

    /// Wire path of a method: `"<service>/<method>"`.
    pub fn path_of(&self, method: &MethodDescriptor) -> String {
        format!("{}/{}", self.name, method.name)
    }

    /// Composite identifier of a method.
    pub fn method_id(&self, method: &MethodDescriptor) -> MethodId {
        MethodId::compose(self.id, method.local_id)
    }
}
