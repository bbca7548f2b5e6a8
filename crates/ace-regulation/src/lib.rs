//! Regulation Table
//!
//! This crate holds the static regulatory rule set for the sub-GHz
//! proximity protocols (FLARM, OGN, ADS-L, FANET, PAW):
//!
//! - **Zones**: geographic classification of the ownship position
//! - **Time slots**: per (zone, protocol) a ring of one or two windows within
//!   the second, with frequency plan, radio configuration and transmit interval
//! - **Schedule**: lookups over the table (covering slot, fitting slot,
//!   randomized legal transmit delay)
//!
//! Everything is pure: the table is compiled in and never mutated.
//!
//! # Example
//!
//! ```rust
//! use ace_regulation::{first_slot, protocol_timeslot_covering, slot, zone_of, DataSource, Zone};
//!
//! let zone = zone_of(51.0, 4.0);
//! assert_eq!(zone, Zone::Europe);
//!
//! let flarm = first_slot(zone, DataSource::Flarm);
//! assert_eq!(slot(flarm).window.start_ms, 400);
//!
//! // 900ms after PPS falls in the second FLARM window
//! let covering = protocol_timeslot_covering(900, flarm);
//! assert_eq!(slot(covering).window.start_ms, 800);
//! ```

pub mod error;
pub mod protocol;
pub mod schedule;
pub mod table;
pub mod zone;

pub use error::ParseError;
pub use protocol::{DataSource, FrequencyPlan, ProtocolConfig, RadioMode};
pub use schedule::{
    find_fitting_slot, frequency_of, ms_delay_to_reference, protocol_timeslot_covering,
    random_tx_delay, ring, RadioParameters, TxDelay,
};
pub use table::{
    first_slot, next_slot, slot, ChannelMethod, ProtocolTimeSlot, SlotId, SlotWindow, TxInterval,
    TIMINGS,
};
pub use zone::{zone_of, Zone};
