//! Collaborators the schedulers drive
//!
//! The tuner never talks to hardware itself. Tuning and transmit requests
//! go through [`Radio`], payloads come from [`PayloadBuilder`]. Both are
//! called from the scheduler tasks and must not block.

use ace_regulation::{DataSource, RadioParameters};

/// The physical radios
pub trait Radio: Send + Sync {
    /// Number of radios available (1..=`MAX_RADIOS`)
    fn radio_count(&self) -> u8;

    /// Switch `radio` to receive with the given parameters
    fn tune_to_receive(&self, radio: u8, params: &RadioParameters);

    /// Ask `radio` to send `payload` with the given parameters
    fn request_transmit(&self, radio: u8, params: &RadioParameters, payload: &[u8]);
}

/// Builds the ownship position packet for a protocol
pub trait PayloadBuilder: Send + Sync {
    /// Encoded packet, `None` when no position is available yet
    fn build_position(&self, protocol: DataSource) -> Option<Vec<u8>>;
}
