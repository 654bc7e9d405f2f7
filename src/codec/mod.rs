//! # Dual Codec
//!
//! Two wire representations of the same message values:
//!
//! - `text` - a JSON object keyed by field wire name, the interop form
//! - `binary` - a compact tag/length encoding keyed by stable wire index
//!
//! Both sides of each codec are driven entirely by descriptors; there is no
//! per-message generated code. Fields decode independently: in lenient mode
//! a field that fails to parse degrades to its default (required) or stays
//! absent (nullable) and decoding continues - a message is always fully
//! constructible from arbitrary text input.

pub mod binary;
pub mod text;

use serde::{Deserialize, Serialize};

use crate::schema::LookupError;

/// Field-level decode policy for the text codec.
///
/// Lenient mirrors the behavior of generated decoders in the wild: malformed
/// fields degrade to defaults and decode never aborts. Strict surfaces
/// malformed present fields as errors for callers that prefer validation
/// over resilience.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    #[default]
    Lenient,
    Strict,
}

/// Codec failure.
///
/// Text decoding in lenient mode never produces these; strict mode surfaces
/// `Field`/`Lookup` with the offending field path. Binary decoding errors on
/// structural corruption regardless of mode - a misaligned byte stream is
/// not recoverable per field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A present field failed to parse (strict mode)
    #[error("field '{path}': {reason}")]
    Field { path: String, reason: String },

    /// Enum lookup failed for a present field (strict mode)
    #[error("field '{path}': {source}")]
    Lookup {
        path: String,
        #[source]
        source: LookupError,
    },

    /// Binary input ended inside a value
    #[error("binary payload truncated at byte {offset}")]
    Truncated { offset: usize },

    /// Varint ran past its maximum width
    #[error("varint overflow at byte {offset}")]
    VarintOverflow { offset: usize },

    /// A declared length runs past the end of the payload
    #[error("length {len} at byte {offset} exceeds remaining payload")]
    LengthOverrun { offset: usize, len: u64 },

    /// Reserved/unknown wire type in a field tag
    #[error("invalid wire type {wire_type} at byte {offset}")]
    InvalidWireType { wire_type: u8, offset: usize },

    /// String bytes were not valid UTF-8
    #[error("invalid utf-8 in string at byte {offset}")]
    InvalidUtf8 { offset: usize },

    /// Nesting deeper than the configured limit
    #[error("message nesting exceeds depth limit {limit}")]
    DepthExceeded { limit: usize },

    /// Payload larger than the configured limit
    #[error("payload size {len} exceeds limit {limit}")]
    SizeExceeded { len: usize, limit: usize },
}
