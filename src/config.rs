//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - wirebuf.toml (default configuration)
//! - wirebuf.local.toml (git-ignored local overrides)
//! - Environment variables (WIREBUF_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # wirebuf.toml
//! [codec]
//! mode = "lenient"
//! max_binary_len = 16777216
//! max_depth = 32
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! WIREBUF_CODEC__MODE=strict
//! WIREBUF_CODEC__MAX_BINARY_LEN=1048576
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::codec::binary::BinaryLimits;
use crate::codec::DecodeMode;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Codec behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Text decode policy: lenient degrades malformed fields to defaults,
    /// strict rejects them
    #[serde(default)]
    pub mode: DecodeMode,

    /// Maximum accepted binary payload size in bytes
    #[serde(default = "default_max_binary_len")]
    pub max_binary_len: usize,

    /// Maximum message/container nesting depth on binary decode
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl CodecConfig {
    /// Guard rails in the form the binary decoder takes.
    pub fn binary_limits(&self) -> BinaryLimits {
        BinaryLimits {
            max_len: self.max_binary_len,
            max_depth: self.max_depth,
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            mode: DecodeMode::Lenient,
            max_binary_len: default_max_binary_len(),
            max_depth: default_max_depth(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_max_binary_len() -> usize {
    16 * 1024 * 1024
}
fn default_max_depth() -> usize {
    32
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. wirebuf.toml (base configuration)
    /// 2. wirebuf.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (WIREBUF_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("wirebuf.toml"))
            .merge(Toml::file("wirebuf.local.toml"))
            .merge(Env::prefixed("WIREBUF_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("WIREBUF_").split("__"))
            .extract()
    }
}
