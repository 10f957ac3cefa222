//! Error types for lockgraph-engine
//!
//! Provides unified error handling across the crate.
//!
//! Precision loss is deliberately NOT represented here: an abstract value
//! reaching top surfaces as an `Unknown` verdict, never as an error. The
//! variants below cover genuine failures: malformed input graphs and
//! inconsistent configuration.

use thiserror::Error;

/// Main error type for lockgraph-engine operations
#[derive(Debug, Error)]
pub enum LockgraphError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (inconsistent activation/precision flags)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed control-flow graph (missing entry, dangling edge, ...)
    #[error("Malformed CFG: {0}")]
    MalformedCfg(String),

    /// Analysis error
    #[error("Analysis error: {0}")]
    Analysis(String),
}

impl LockgraphError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        LockgraphError::Config(msg.into())
    }

    /// Create a malformed-CFG error
    pub fn malformed_cfg(msg: impl Into<String>) -> Self {
        LockgraphError::MalformedCfg(msg.into())
    }

    /// Create an internal error (alias for analysis error)
    pub fn internal(msg: impl Into<String>) -> Self {
        LockgraphError::Analysis(msg.into())
    }
}

/// Result type alias for lockgraph operations
pub type Result<T> = std::result::Result<T, LockgraphError>;
