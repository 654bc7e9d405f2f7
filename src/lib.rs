//! # Wirebuf Schema Runtime
//!
//! A runtime library for schema-driven messaging: immutable descriptors
//! describe message, enum, and service shapes; dynamic message values
//! encode and decode through two wire representations; and an RPC layer
//! routes calls between a client stub and a server-side dispatch table
//! over an abstract transport.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Schema definitions (external)
//!     ↓
//! [Descriptors]        → EnumDescriptor / MessageDescriptor / ServiceDescriptor
//!     ↓
//! [SchemaRegistry]     → frozen name / path / method-id lookup tables
//!     ↓                                         inbound bytes or JSON
//! [Codecs]             → text (JSON)  ⇄  MessageValue  ⇄  binary (tag/length)
//!     ↓
//! [RPC]                → ServiceClient stub → Transport → Router → handler
//! ```
//!
//! ## Usage
//!
//! ### Descriptors and codecs
//! ```rust,ignore
//! use wirebuf::prelude::*;
//!
//! let info = MessageDescriptor::new(
//!     "Info",
//!     vec![
//!         FieldDescriptor::nullable("user_id", 0, FieldKind::Scalar(ScalarKind::Int64)),
//!         FieldDescriptor::required("name", 1, FieldKind::Scalar(ScalarKind::String)),
//!     ],
//! )?;
//!
//! let mut msg = MessageValue::new(info.clone());
//! msg.set("user_id", Value::Int64(42));
//!
//! let json = text::encode_message(&msg);
//! let bytes = binary::encode_message(&msg);
//! assert_eq!(text::decode_message(&info, &json, DecodeMode::Lenient)?, msg);
//! assert_eq!(binary::decode_message(&info, &bytes)?, msg);
//! ```
//!
//! ### RPC dispatch
//! ```rust,ignore
//! let router = RouterBuilder::new()
//!     .register(&service, "get_info", move |req, _ctx| async move {
//!         // typed handler logic over MessageValue
//!         Ok(response)
//!     })?
//!     .build();
//!
//! let response = router.dispatch("user_server/get_info", payload, CallContext::new()).await?;
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `value` | Dynamic `Value` model and `MessageValue` instances |
//! | `schema` | Immutable descriptors, method ids, registry |
//! | `codec` | Dual JSON/binary codec with lenient and strict modes |
//! | `rpc` | Client stub, server router, transport contract |
//! | `config` | Hierarchical configuration (TOML + env) |

// Configuration system
pub mod config;

// Value type system (dynamic message values)
pub mod value;

// Schema descriptors and registry
pub mod schema;

// Dual text/binary codec
pub mod codec;

// RPC stub and router
pub mod rpc;

// Re-export the working set for convenience
pub use config::{CodecConfig, Config, LoggingConfig};
pub use value::{DataKind, MapKey, MessageValue, Value};

pub use schema::{
    EnumDescriptor, EnumMember, FieldDescriptor, FieldKind, LookupError, MapKeyKind,
    MessageDescriptor, MethodDescriptor, MethodId, ScalarKind, SchemaError, SchemaRegistry,
    SchemaRegistryBuilder, ServiceDescriptor,
};

pub use codec::{binary::BinaryLimits, CodecError, DecodeMode};

pub use rpc::{
    CallContext, Framing, Payload, Router, RouterBuilder, RpcError, ServiceClient, Transport,
};

/// One-line import for applications.
pub mod prelude {
    pub use crate::codec::{binary, text, DecodeMode};
    pub use crate::rpc::{
        CallContext, Framing, Payload, Router, RouterBuilder, RpcError, ServiceClient, Transport,
    };
    pub use crate::schema::{
        EnumDescriptor, FieldDescriptor, FieldKind, MapKeyKind, MessageDescriptor,
        MethodDescriptor, MethodId, ScalarKind, SchemaRegistry, SchemaRegistryBuilder,
        ServiceDescriptor,
    };
    pub use crate::value::{MapKey, MessageValue, Value};
    pub use crate::Config;
}
