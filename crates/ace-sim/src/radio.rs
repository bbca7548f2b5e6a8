//! Virtual radio simulation
//!
//! Stands in for the sub-GHz radios. Every tune and transmit request is
//! applied to the simulated radio state, kept in a bounded activity log and
//! optionally broadcast to subscribers.

use std::collections::VecDeque;
use std::sync::Mutex;

use ace_regulation::{DataSource, RadioMode, RadioParameters};
use ace_tuner::Radio;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// What a radio was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityKind {
    Receive,
    Transmit,
}

/// One request handled by the virtual radio
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioActivity {
    pub radio: u8,
    pub kind: ActivityKind,
    pub protocol: DataSource,
    /// Frequency in Hz
    pub frequency: u32,
    pub power_dbm: i8,
    /// Payload size, 0 for receive
    pub payload_len: usize,
}

/// Current state of one simulated radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadioState {
    /// Frequency in Hz, 0 until first tuned
    pub frequency: u32,
    pub mode: Option<RadioMode>,
    pub protocol: Option<DataSource>,
    pub rx_count: u32,
    pub tx_count: u32,
}

/// Configuration for creating a virtual radio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualRadioConfig {
    /// Number of radios to simulate
    pub radio_count: u8,
    /// Activity entries kept for inspection
    pub log_capacity: usize,
}

impl Default for VirtualRadioConfig {
    fn default() -> Self {
        Self {
            radio_count: 1,
            log_capacity: 256,
        }
    }
}

#[derive(Debug)]
struct Inner {
    radios: Vec<RadioState>,
    log: VecDeque<RadioActivity>,
}

/// Simulated set of radios implementing [`Radio`]
#[derive(Debug)]
pub struct VirtualRadio {
    radio_count: u8,
    log_capacity: usize,
    inner: Mutex<Inner>,
    activity_tx: Option<broadcast::Sender<RadioActivity>>,
}

impl VirtualRadio {
    /// Create `radio_count` radios with the default log size
    pub fn new(radio_count: u8) -> Self {
        Self::from_config(VirtualRadioConfig {
            radio_count,
            ..Default::default()
        })
    }

    pub fn from_config(config: VirtualRadioConfig) -> Self {
        Self {
            radio_count: config.radio_count,
            log_capacity: config.log_capacity,
            inner: Mutex::new(Inner {
                radios: vec![RadioState::default(); config.radio_count as usize],
                log: VecDeque::with_capacity(config.log_capacity),
            }),
            activity_tx: None,
        }
    }

    /// Broadcast every activity, returns the first receiver
    pub fn with_broadcast(mut self, capacity: usize) -> (Self, broadcast::Receiver<RadioActivity>) {
        let (tx, rx) = broadcast::channel(capacity);
        self.activity_tx = Some(tx);
        (self, rx)
    }

    /// Additional receiver for the activity broadcast
    pub fn subscribe(&self) -> Option<broadcast::Receiver<RadioActivity>> {
        self.activity_tx.as_ref().map(|tx| tx.subscribe())
    }

    /// State of one radio
    pub fn state(&self, radio: u8) -> Option<RadioState> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.radios.get(radio as usize).copied())
    }

    /// Logged activity, oldest first
    pub fn activity(&self) -> Vec<RadioActivity> {
        self.inner
            .lock()
            .map(|inner| inner.log.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn record(&self, activity: RadioActivity) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let Some(state) = inner.radios.get_mut(activity.radio as usize) else {
            debug!("Request for unknown radio {}", activity.radio);
            return;
        };

        state.frequency = activity.frequency;
        state.protocol = Some(activity.protocol);
        match activity.kind {
            ActivityKind::Receive => state.rx_count = state.rx_count.wrapping_add(1),
            ActivityKind::Transmit => state.tx_count = state.tx_count.wrapping_add(1),
        }

        if self.log_capacity > 0 {
            if inner.log.len() == self.log_capacity {
                inner.log.pop_front();
            }
            inner.log.push_back(activity.clone());
        }
        drop(inner);

        trace!("{:?}", activity);
        if let Some(tx) = &self.activity_tx {
            // No subscribers is fine
            let _ = tx.send(activity);
        }
    }

    fn set_mode(&self, radio: u8, mode: RadioMode) {
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(state) = inner.radios.get_mut(radio as usize) {
                state.mode = Some(mode);
            }
        }
    }
}

impl Radio for VirtualRadio {
    fn radio_count(&self) -> u8 {
        self.radio_count
    }

    fn tune_to_receive(&self, radio: u8, params: &RadioParameters) {
        self.set_mode(radio, params.config.mode);
        self.record(RadioActivity {
            radio,
            kind: ActivityKind::Receive,
            protocol: params.config.data_source,
            frequency: params.frequency,
            power_dbm: params.power_dbm,
            payload_len: 0,
        });
    }

    fn request_transmit(&self, radio: u8, params: &RadioParameters, payload: &[u8]) {
        self.set_mode(radio, params.config.mode);
        self.record(RadioActivity {
            radio,
            kind: ActivityKind::Transmit,
            protocol: params.config.data_source,
            frequency: params.frequency,
            power_dbm: params.power_dbm,
            payload_len: payload.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ace_regulation::{first_slot, slot, Zone};

    fn flarm_params() -> RadioParameters {
        RadioParameters::for_slot(slot(first_slot(Zone::Europe, DataSource::Flarm))).unwrap()
    }

    #[test]
    fn test_tune_updates_state() {
        let radio = VirtualRadio::new(2);
        radio.tune_to_receive(1, &flarm_params());

        let state = radio.state(1).unwrap();
        assert_eq!(state.frequency, 868_200_000);
        assert_eq!(state.protocol, Some(DataSource::Flarm));
        assert_eq!(state.mode, Some(RadioMode::Gfsk));
        assert_eq!(state.rx_count, 1);
        assert_eq!(radio.state(0).unwrap(), RadioState::default());
    }

    #[test]
    fn test_unknown_radio_is_ignored() {
        let radio = VirtualRadio::new(1);
        radio.request_transmit(3, &flarm_params(), &[1, 2, 3]);
        assert!(radio.activity().is_empty());
        assert!(radio.state(3).is_none());
    }

    #[test]
    fn test_log_is_bounded() {
        let radio = VirtualRadio::from_config(VirtualRadioConfig {
            radio_count: 1,
            log_capacity: 4,
        });
        for _ in 0..10 {
            radio.tune_to_receive(0, &flarm_params());
        }
        assert_eq!(radio.activity().len(), 4);
        assert_eq!(radio.state(0).unwrap().rx_count, 10);
    }

    #[tokio::test]
    async fn test_activity_is_broadcast() {
        let (radio, mut rx) = VirtualRadio::new(1).with_broadcast(8);
        radio.request_transmit(0, &flarm_params(), &[0; 24]);

        let activity = rx.recv().await.unwrap();
        assert_eq!(activity.kind, ActivityKind::Transmit);
        assert_eq!(activity.payload_len, 24);
    }
}
