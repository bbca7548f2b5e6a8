//! Radio Tuner
//!
//! Shares one or two half-duplex radios between the enabled proximity
//! protocols while keeping to the regulatory slot timing of the current zone.
//!
//! - **Receive**: one task per radio walks a weighted sequence of its assigned
//!   protocols and tunes to each protocol's next slot. Protocols producing
//!   traffic get up to three entries per round.
//! - **Transmit**: one task per protocol sends the ownship position at a
//!   random legal time within the protocol's slot windows.
//! - **Actor**: [`run_tuner_actor`] composes both behind a command channel and
//!   answers status queries.
//!
//! Hardware, payload encoding and configuration are reached through the
//! [`Radio`], [`PayloadBuilder`], [`ConfigSource`] and [`Clock`] traits.

pub mod actor;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod radio;
pub mod rx;
pub mod status;
pub mod tx;
pub mod zone;

/// Maximum number of radios the tuner can drive
pub const MAX_RADIOS: usize = 2;

pub use actor::{run_tuner_actor, Tuner, TunerCommand, TunerHandle};
pub use clock::{Clock, MonotonicClock, SystemClock};
pub use config::{normalize_protocols, ConfigSource, TunerConfig};
pub use error::TunerError;
pub use events::TunerEvent;
pub use radio::{PayloadBuilder, Radio};
pub use rx::{distribute, RadioProtocolCtx, RadioTunerRx, SlotReceive, MAX_WEIGHT};
pub use status::{ProtocolStatus, RadioStatus, RxStatus, TunerStatus, TxStatus};
pub use tx::{RadioTunerTx, SendPositionCtx, TxTick, MAX_PROTOCOLS};
pub use zone::{SharedZone, ZoneTracker};
