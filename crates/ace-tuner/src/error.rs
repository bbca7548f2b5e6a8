//! Error types for the tuner

use thiserror::Error;

use crate::MAX_RADIOS;

/// Errors that can occur while setting up or talking to the tuner
///
/// Scheduling itself never fails: missed ticks and unresolvable slots are
/// recovered inside the tasks and only show up in the statistics.
#[derive(Debug, Error)]
pub enum TunerError {
    /// The radio collaborator reported a radio count the tuner cannot drive
    #[error("unsupported radio count: {0} (expected 1..={max})", max = MAX_RADIOS)]
    UnsupportedRadioCount(u8),

    /// The tuner actor has shut down
    #[error("tuner actor is not running")]
    ActorUnavailable,

    /// Status could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
