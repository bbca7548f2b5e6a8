//! Error types for regulation lookups

use thiserror::Error;

/// Errors that can occur while parsing names used in configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Name does not match any known protocol
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    /// Name does not match any known regulatory zone
    #[error("unknown zone: {0}")]
    UnknownZone(String),
}
