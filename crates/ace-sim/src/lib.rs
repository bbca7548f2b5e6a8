//! Tuner Simulation Library
//!
//! This crate provides the collaborators the tuner needs so it can run
//! without radio hardware. It includes:
//!
//! - **VirtualRadio**: one or two simulated radios that record and broadcast
//!   every tune and transmit request
//! - **FixedPayloadBuilder**: ownship packets from the last known position
//! - **MemoryConfig**: enabled protocols held in memory
//! - **TrafficGenerator**: random aircraft receptions with a weighted mix
//!
//! # Example
//!
//! ```rust
//! use ace_regulation::{first_slot, slot, DataSource, RadioParameters, Zone};
//! use ace_sim::VirtualRadio;
//! use ace_tuner::Radio;
//!
//! let radio = VirtualRadio::new(2);
//! let params = RadioParameters::for_slot(slot(first_slot(Zone::Europe, DataSource::Flarm)))
//!     .expect("FLARM is configured over Europe");
//! radio.tune_to_receive(0, &params);
//!
//! assert_eq!(radio.state(0).map(|s| s.frequency), Some(868_200_000));
//! ```

pub mod config;
pub mod payload;
pub mod radio;
pub mod traffic;

pub use config::MemoryConfig;
pub use payload::FixedPayloadBuilder;
pub use radio::{ActivityKind, RadioActivity, RadioState, VirtualRadio, VirtualRadioConfig};
pub use traffic::{TrafficGenerator, TrafficMix};
