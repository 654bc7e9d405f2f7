//! # RPC Layer
//!
//! Client stub and server router over an abstract transport.
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                        RPC dispatch                         |
//! +-------------------------------------------------------------+
//! |  client:  ServiceClient -> Transport::invoke(path, id, ..)  |
//! |  server:  Router::dispatch(path, payload, ctx) -> handler   |
//! +-------------------------------------------------------------+
//! |  Addressing: "<service>/<method>" path                      |
//! |              (service_id << 32 | local_id) composite id     |
//! |  Payloads:   structured text (JSON) or binary, per call     |
//! +-------------------------------------------------------------+
//! ```
//!
//! The transport is a black box satisfying an async invoke contract; this
//! layer never retries and never interprets transport failures. Routing
//! tables are built once and frozen before the first call; dispatch is
//! registration-table-driven, not inheritance-driven.

pub mod client;
pub mod context;
pub mod error;
pub mod router;

pub use client::{ServiceClient, Transport};
pub use context::CallContext;
pub use error::RpcError;
pub use router::{Router, RouterBuilder};

use serde_json::Value as JsonValue;

/// The two wire framing families a call can travel in. A response always
/// uses the same family as its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Text,
    Binary,
}

/// A request or response body in one of the two framings.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(JsonValue),
    Binary(Vec<u8>),
}

impl Payload {
    /// Which framing family this payload belongs to.
    pub fn framing(&self) -> Framing {
        match self {
            Payload::Text(_) => Framing::Text,
            Payload::Binary(_) => Framing::Binary,
        }
    }
}
