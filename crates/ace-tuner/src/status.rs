//! Diagnostics snapshots
//!
//! Serialized to JSON for the status log and any diagnostics consumer.

use ace_regulation::{DataSource, Zone};
use serde::Serialize;

use crate::error::TunerError;

/// State of one receive task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioStatus {
    pub radio: u8,
    /// Protocols assigned to this radio
    pub protocols: Vec<DataSource>,
    /// Weighted receive sequence currently being worked through
    pub sequence: Vec<DataSource>,
    /// Protocol of the slot the radio will tune to next
    pub next_rx: Option<DataSource>,
    pub rx_requests: u32,
    pub timer_missed: u32,
    pub paused: bool,
}

/// State of one transmit task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolStatus {
    pub protocol: DataSource,
    pub radio: u8,
    pub tx_requests: u32,
    pub timer_missed: u32,
    /// Transmit delays that fell back to the deterministic slot offset
    pub fallbacks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RxStatus {
    pub zone: Zone,
    pub radios: Vec<RadioStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxStatus {
    pub zone: Zone,
    pub protocols: Vec<ProtocolStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TunerStatus {
    pub rx: RxStatus,
    pub tx: TxStatus,
}

impl TunerStatus {
    pub fn to_json(&self) -> Result<String, TunerError> {
        Ok(serde_json::to_string(self)?)
    }
}
