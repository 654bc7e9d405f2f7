//! Error types for the RPC layer.

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;
use crate::schema::LookupError;

/// Call-level RPC error.
///
/// Every variant is surfaced to the immediate caller; nothing here is
/// retried or swallowed by the stub or the router. Transport failures pass
/// through unchanged as opaque messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum RpcError {
    /// Dispatcher received a path with no registered route
    #[error("no route registered for '{path}'")]
    RouteNotFound { path: String },

    /// Client stub asked for a method its service does not declare
    #[error("service '{service}' has no method '{method}'")]
    MethodNotFound { service: String, method: String },

    /// Request or response failed to decode (strict mode or corrupt binary)
    #[error("decode failed: {message}")]
    Decode { message: String },

    /// The bound handler returned an error
    #[error("handler error: {message}")]
    Handler { message: String },

    /// Opaque transport failure, passed through unchanged
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl RpcError {
    /// Wrap a handler-side error, preserving its rendered message.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        RpcError::Handler {
            message: err.to_string(),
        }
    }

    /// Wrap a transport-side error, preserving its rendered message.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        RpcError::Transport {
            message: err.to_string(),
        }
    }
}

impl From<CodecError> for RpcError {
    fn from(err: CodecError) -> Self {
        RpcError::Decode {
            message: err.to_string(),
        }
    }
}

impl From<LookupError> for RpcError {
    fn from(err: LookupError) -> Self {
        RpcError::Decode {
            message: err.to_string(),
        }
    }
}
