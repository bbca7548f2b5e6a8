//! Events consumed by the tuner

use ace_regulation::DataSource;

/// Messages from the rest of the system
#[derive(Debug, Clone, PartialEq)]
pub enum TunerEvent {
    /// New ownship fix
    OwnshipPosition {
        /// Latitude in degrees
        lat: f32,
        /// Longitude in degrees
        lon: f32,
    },

    /// A position report from another aircraft was received
    AircraftPosition {
        /// Protocol the report arrived on
        protocol: DataSource,
    },

    /// The set of enabled protocols changed
    ConfigUpdated {
        /// Enabled protocols in priority order
        protocols: Vec<DataSource>,
    },
}
