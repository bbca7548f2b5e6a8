//! Tuner configuration

use std::time::Duration;

use ace_regulation::DataSource;
use serde::{Deserialize, Serialize};

/// Timing configuration shared by the receive and transmit schedulers
///
/// The defaults were found to work on the device; they are not derived from
/// regulation and should only change for a concrete reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Minimum time between two zone classifications (ms)
    pub zone_recheck_ms: u64,
    /// Bounded wait of a receive task before it treats the tick as missed (ms)
    pub rx_wait_timeout_ms: u64,
    /// Bounded wait of a transmit task before it treats the tick as missed (ms)
    pub tx_wait_timeout_ms: u64,
    /// Receive delay when a radio has nothing to listen for (ms)
    pub rx_idle_retry_ms: u64,
    /// Minimum time between pushes of reception counters to the radios (ms)
    pub traffic_push_interval_ms: u64,
    /// Maximum wait for receive tasks to acknowledge a pause (ms)
    pub pause_ack_timeout_ms: u64,
    /// Delay before the first tick of a new transmit task (ms)
    pub tx_initial_delay_ms: u64,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            zone_recheck_ms: 30_000,
            rx_wait_timeout_ms: 2_000,
            tx_wait_timeout_ms: 3_000,
            rx_idle_retry_ms: 500,
            traffic_push_interval_ms: 1_000,
            pause_ack_timeout_ms: 50,
            tx_initial_delay_ms: 250,
        }
    }
}

impl TunerConfig {
    pub fn zone_recheck(&self) -> Duration {
        Duration::from_millis(self.zone_recheck_ms)
    }

    pub fn rx_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.rx_wait_timeout_ms)
    }

    /// Retry used after a missed receive tick
    pub fn rx_retry(&self) -> Duration {
        Duration::from_millis(self.rx_wait_timeout_ms / 2)
    }

    /// `rx_retry` in milliseconds, saturating at `u16::MAX`
    pub fn rx_retry_ms(&self) -> u16 {
        saturating_ms(self.rx_wait_timeout_ms / 2)
    }

    /// `rx_idle_retry_ms`, saturating at `u16::MAX`
    pub fn rx_idle_ms(&self) -> u16 {
        saturating_ms(self.rx_idle_retry_ms)
    }

    pub fn tx_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.tx_wait_timeout_ms)
    }

    /// Retry used after a missed or idle transmit tick
    pub fn tx_retry(&self) -> Duration {
        Duration::from_millis(self.tx_wait_timeout_ms / 2)
    }

    pub fn traffic_push_interval(&self) -> Duration {
        Duration::from_millis(self.traffic_push_interval_ms)
    }

    pub fn pause_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.pause_ack_timeout_ms)
    }

    pub fn tx_initial_delay(&self) -> Duration {
        Duration::from_millis(self.tx_initial_delay_ms)
    }
}

fn saturating_ms(ms: u64) -> u16 {
    u16::try_from(ms).unwrap_or(u16::MAX)
}

/// Source of the protocols the user enabled
pub trait ConfigSource: Send + Sync {
    /// Protocols that should be received and transmitted, in priority order
    fn enabled_protocols(&self) -> Vec<DataSource>;
}

/// Remove duplicates and the `None` sentinel, keeping the first occurrence
pub fn normalize_protocols(protocols: &[DataSource]) -> Vec<DataSource> {
    let mut result = Vec::with_capacity(protocols.len());
    for protocol in protocols {
        if *protocol != DataSource::None && !result.contains(protocol) {
            result.push(*protocol);
        }
    }
    result
}
