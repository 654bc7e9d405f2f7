//! Per-call context.

use std::collections::BTreeMap;

/// Opaque call context carried end-to-end with a request.
///
/// The dispatcher and stub never inspect it; it exists so transports and
/// handlers can pass metadata (auth tokens, trace ids, deadlines) through
/// the dispatch boundary. Cancellation remains the transport's
/// responsibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    metadata: BTreeMap<String, String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}
