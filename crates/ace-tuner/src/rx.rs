//! Receive scheduler
//!
//! Each radio runs its own task that owns a [`RadioProtocolCtx`]. The task
//! walks a weighted sequence of the protocols assigned to its radio, tunes
//! the radio one millisecond after the start of the next slot of the current
//! protocol and then moves on. Protocols that produced traffic since the
//! last rebuild get more entries in the sequence.
//!
//! # Architecture
//!
//! ```text
//! RadioTunerRx ──RxSignal──► rx task (radio 0) ──tune_to_receive──► Radio
//!              ──RxSignal──► rx task (radio 1) ──tune_to_receive──►
//! ```
//!
//! Reconfiguration pauses every task (acknowledged through a oneshot),
//! sends the new assignment and resumes, which rebuilds the sequence.

use std::sync::Arc;
use std::time::Duration;

use ace_regulation::{
    first_slot, ms_delay_to_reference, protocol_timeslot_covering, ring, slot, DataSource,
    RadioParameters, SlotId, Zone,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{normalize_protocols, TunerConfig};
use crate::error::TunerError;
use crate::radio::Radio;
use crate::status::{RadioStatus, RxStatus};
use crate::zone::{SharedZone, ZoneTracker};
use crate::MAX_RADIOS;

/// Highest number of entries a protocol gets in a receive sequence
pub const MAX_WEIGHT: usize = 3;

/// Received packet counters, indexed by `DataSource::index()`
pub type SlotReceive = [u32; DataSource::COUNT];

/// Counters of one receive task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxStatistics {
    pub rx_requests: u32,
    pub timer_missed: u32,
}

/// Scheduling state of one radio
#[derive(Debug, Clone)]
pub struct RadioProtocolCtx {
    radio: u8,
    protocols: Vec<DataSource>,
    sequence: Vec<DataSource>,
    cursor: usize,
    upcoming: SlotId,
    latest: SlotReceive,
    baseline: SlotReceive,
    statistics: RxStatistics,
    idle_retry_ms: u16,
}

impl RadioProtocolCtx {
    pub fn new(radio: u8, idle_retry_ms: u16) -> Self {
        Self {
            radio,
            protocols: Vec::new(),
            sequence: Vec::new(),
            cursor: 0,
            upcoming: SlotId::NONE,
            latest: [0; DataSource::COUNT],
            baseline: [0; DataSource::COUNT],
            statistics: RxStatistics::default(),
            idle_retry_ms,
        }
    }

    pub fn radio(&self) -> u8 {
        self.radio
    }

    pub fn protocols(&self) -> &[DataSource] {
        &self.protocols
    }

    pub fn sequence(&self) -> &[DataSource] {
        &self.sequence
    }

    pub fn upcoming_slot(&self) -> SlotId {
        self.upcoming
    }

    pub fn statistics(&self) -> RxStatistics {
        self.statistics
    }

    /// Replace the assigned protocols, the sequence is rebuilt on resume
    pub fn set_protocols(&mut self, protocols: &[DataSource]) {
        self.protocols = normalize_protocols(protocols);
    }

    /// Store the newest reception counters
    pub fn update_slot_receive(&mut self, counters: SlotReceive) {
        self.latest = counters;
    }

    /// Rebuild the weighted sequence from traffic since the last rebuild
    ///
    /// No new packets gives one entry, one packet two entries, more
    /// `MAX_WEIGHT`. The counters seen now become the new baseline.
    pub fn prioritize(&mut self) {
        self.sequence.clear();
        for protocol in &self.protocols {
            let delta = protocol
                .index()
                .map(|i| self.latest[i].wrapping_sub(self.baseline[i]))
                .unwrap_or(0);
            let weight = match delta {
                0 => 1,
                1 => 2,
                _ => MAX_WEIGHT,
            };
            self.sequence
                .extend(std::iter::repeat(*protocol).take(weight));
        }
        self.baseline = self.latest;
        self.cursor = 0;
    }

    /// Pick the next slot to listen to, returns the delay until it starts (ms)
    pub fn advance(&mut self, zone: Zone, now_ms: u16) -> u16 {
        if self.protocols.is_empty() {
            self.upcoming = SlotId::NONE;
            return self.idle_retry_ms;
        }
        if self.cursor >= self.sequence.len() {
            self.prioritize();
        }

        let protocol = self.sequence[self.cursor];
        self.cursor += 1;

        let covering = protocol_timeslot_covering(now_ms, first_slot(zone, protocol));
        if covering.is_none() {
            self.upcoming = SlotId::NONE;
            return self.idle_retry_ms;
        }

        // A window that has already begun is not tuned to again, the ring slot
        // with the nearest start is next
        self.upcoming = ring(covering)
            .min_by_key(|s| ms_delay_to_reference(s.window.start_ms, now_ms))
            .map_or(covering, |s| s.slot_id);

        // One past the start so the tune lands inside the window
        ms_delay_to_reference(slot(self.upcoming).window.start_ms, now_ms) + 1
    }

    /// Timer expiry: tune to the upcoming slot and schedule the next one
    ///
    /// Returns the delay until the next tick (ms).
    pub fn fire(&mut self, radio: &dyn Radio, zone: Zone, now_ms: u16, retry_ms: u16) -> u16 {
        let params = if self.upcoming.is_none() {
            None
        } else {
            RadioParameters::for_slot(slot(self.upcoming))
        };

        match params {
            Some(params) => {
                debug!(
                    "Radio {} receiving {} on {} Hz (slot {})",
                    self.radio, params.config.data_source, params.frequency, self.upcoming
                );
                radio.tune_to_receive(self.radio, &params);
                self.statistics.rx_requests = self.statistics.rx_requests.wrapping_add(1);
                self.advance(zone, now_ms)
            }
            None => self.record_missed(zone, now_ms, retry_ms),
        }
    }

    /// A tick was missed: count it and pick a new slot
    ///
    /// Returns the delay until the new slot, `retry_ms` if none was found.
    pub fn record_missed(&mut self, zone: Zone, now_ms: u16, retry_ms: u16) -> u16 {
        self.statistics.timer_missed = self.statistics.timer_missed.wrapping_add(1);
        let delay = self.advance(zone, now_ms);
        if self.upcoming.is_none() {
            retry_ms
        } else {
            delay
        }
    }

    pub fn status(&self, paused: bool) -> RadioStatus {
        RadioStatus {
            radio: self.radio,
            protocols: self.protocols.clone(),
            sequence: self.sequence.clone(),
            next_rx: if self.upcoming.is_none() {
                None
            } else {
                Some(slot(self.upcoming).protocol)
            },
            rx_requests: self.statistics.rx_requests,
            timer_missed: self.statistics.timer_missed,
            paused,
        }
    }
}

/// Split protocols across radios, remainder to the last radio
pub fn distribute(protocols: &[DataSource], radios: usize) -> Vec<Vec<DataSource>> {
    if radios == 0 {
        return Vec::new();
    }
    let per_radio = protocols.len() / radios;
    (0..radios)
        .map(|i| {
            let start = i * per_radio;
            let end = if i + 1 == radios {
                protocols.len()
            } else {
                start + per_radio
            };
            protocols[start..end].to_vec()
        })
        .collect()
}

/// Notifications to a receive task
#[derive(Debug)]
pub(crate) enum RxSignal {
    /// Stop tuning until resumed, acknowledge once stopped
    Pause { ack: oneshot::Sender<()> },
    /// New protocol assignment, takes effect on resume
    Assign { protocols: Vec<DataSource> },
    /// Rebuild the sequence and start tuning again
    Resume,
    /// Newest reception counters
    SlotReceive(SlotReceive),
    Status { response: oneshot::Sender<RadioStatus> },
    Exit,
}

enum Wake {
    Signal(RxSignal),
    Timer,
    Timeout,
}

/// Sleep until the armed deadline, forever if none
pub(crate) async fn armed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn after_ms(ms: u16) -> Option<Instant> {
    Some(Instant::now() + Duration::from_millis(ms as u64))
}

struct RxTask {
    ctx: RadioProtocolCtx,
    radio: Arc<dyn Radio>,
    clock: Arc<dyn Clock>,
    zone: SharedZone,
    config: TunerConfig,
}

async fn run_rx_task(mut task: RxTask, mut signals: mpsc::Receiver<RxSignal>) {
    let retry_ms = task.config.rx_retry_ms();
    let mut paused = false;
    let mut deadline = after_ms(task.ctx.advance(task.zone.get(), task.clock.ms_in_second()));

    debug!("Receive task for radio {} started", task.ctx.radio());

    loop {
        let wake = tokio::select! {
            signal = signals.recv() => match signal {
                Some(signal) => Wake::Signal(signal),
                None => break,
            },
            _ = armed(deadline) => Wake::Timer,
            _ = sleep(task.config.rx_wait_timeout()) => Wake::Timeout,
        };

        match wake {
            Wake::Signal(RxSignal::Exit) => break,
            Wake::Signal(RxSignal::Pause { ack }) => {
                paused = true;
                deadline = None;
                let _ = ack.send(());
            }
            Wake::Signal(RxSignal::Assign { protocols }) => {
                task.ctx.set_protocols(&protocols);
            }
            Wake::Signal(RxSignal::Resume) => {
                paused = false;
                task.ctx.prioritize();
                let now_ms = task.clock.ms_in_second();
                deadline = after_ms(task.ctx.advance(task.zone.get(), now_ms));
            }
            Wake::Signal(RxSignal::SlotReceive(counters)) => {
                task.ctx.update_slot_receive(counters);
            }
            Wake::Signal(RxSignal::Status { response }) => {
                let _ = response.send(task.ctx.status(paused));
            }
            Wake::Timer => {
                deadline = None;
                if paused {
                    continue;
                }
                let now_ms = task.clock.ms_in_second();
                let delay = task
                    .ctx
                    .fire(task.radio.as_ref(), task.zone.get(), now_ms, retry_ms);
                deadline = after_ms(delay);
            }
            Wake::Timeout => {
                if paused || deadline.is_some() {
                    continue;
                }
                let now_ms = task.clock.ms_in_second();
                let delay = task.ctx.record_missed(task.zone.get(), now_ms, retry_ms);
                deadline = after_ms(delay);
            }
        }
    }

    debug!("Receive task for radio {} ended", task.ctx.radio());
}

struct RxTaskHandle {
    radio: u8,
    signals: mpsc::Sender<RxSignal>,
    join: JoinHandle<()>,
}

/// Receive side of the tuner
pub struct RadioTunerRx {
    radio: Arc<dyn Radio>,
    clock: Arc<dyn Clock>,
    config: TunerConfig,
    radio_count: u8,
    zone: ZoneTracker,
    slot_receive: SlotReceive,
    last_push: Option<Instant>,
    tasks: Vec<RxTaskHandle>,
}

impl RadioTunerRx {
    pub fn new(
        radio: Arc<dyn Radio>,
        clock: Arc<dyn Clock>,
        config: TunerConfig,
    ) -> Result<Self, TunerError> {
        let radio_count = radio.radio_count();
        if radio_count == 0 || radio_count as usize > MAX_RADIOS {
            return Err(TunerError::UnsupportedRadioCount(radio_count));
        }

        Ok(Self {
            radio,
            clock,
            zone: ZoneTracker::new(config.zone_recheck()),
            config,
            radio_count,
            slot_receive: [0; DataSource::COUNT],
            last_push: None,
            tasks: Vec::new(),
        })
    }

    pub fn radio_count(&self) -> u8 {
        self.radio_count
    }

    pub fn zone(&self) -> Zone {
        self.zone.current()
    }

    /// Spawn one task per radio and assign `protocols`
    pub async fn start(&mut self, protocols: &[DataSource]) {
        if self.tasks.is_empty() {
            let idle_retry_ms = self.config.rx_idle_ms();
            for radio in 0..self.radio_count {
                let (signals, signal_rx) = mpsc::channel(32);
                let task = RxTask {
                    ctx: RadioProtocolCtx::new(radio, idle_retry_ms),
                    radio: self.radio.clone(),
                    clock: self.clock.clone(),
                    zone: self.zone.shared(),
                    config: self.config.clone(),
                };
                let join = tokio::spawn(run_rx_task(task, signal_rx));
                self.tasks.push(RxTaskHandle {
                    radio,
                    signals,
                    join,
                });
            }
            info!("Receive scheduler started with {} radio(s)", self.radio_count);
        }

        self.enable_disable_datasources(protocols).await;
    }

    /// Pause all radios, split `protocols` across them and resume
    pub async fn enable_disable_datasources(&mut self, protocols: &[DataSource]) {
        let protocols = normalize_protocols(protocols);

        let mut acks = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let (ack, ack_rx) = oneshot::channel();
            if task.signals.send(RxSignal::Pause { ack }).await.is_ok() {
                acks.push((task.radio, ack_rx));
            }
        }

        let ack_deadline = Instant::now() + self.config.pause_ack_timeout();
        for (radio, ack_rx) in acks {
            if timeout_at(ack_deadline, ack_rx).await.is_err() {
                warn!("Radio {} did not acknowledge pause in time", radio);
            }
        }

        let assignments = distribute(&protocols, self.tasks.len());
        for (task, assigned) in self.tasks.iter().zip(assignments) {
            info!("Radio {} receives {:?}", task.radio, assigned);
            let _ = task
                .signals
                .send(RxSignal::Assign {
                    protocols: assigned,
                })
                .await;
            let _ = task.signals.send(RxSignal::Resume).await;
        }
    }

    /// Ownship position, may change the zone
    pub fn on_position(&mut self, lat: f32, lon: f32) {
        self.zone.on_position(lat, lon, Instant::now());
    }

    /// A packet was received on `protocol`
    pub async fn on_traffic(&mut self, protocol: DataSource) {
        let Some(index) = protocol.index() else {
            return;
        };
        self.slot_receive[index] = self.slot_receive[index].wrapping_add(1);

        let now = Instant::now();
        let due = self
            .last_push
            .map_or(true, |last| now.duration_since(last) >= self.config.traffic_push_interval());
        if !due {
            return;
        }

        self.last_push = Some(now);
        for task in &self.tasks {
            let _ = task
                .signals
                .send(RxSignal::SlotReceive(self.slot_receive))
                .await;
        }
    }

    pub async fn status(&self) -> RxStatus {
        let mut radios = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let (response, response_rx) = oneshot::channel();
            if task
                .signals
                .send(RxSignal::Status { response })
                .await
                .is_err()
            {
                continue;
            }
            if let Ok(status) = response_rx.await {
                radios.push(status);
            }
        }
        RxStatus {
            zone: self.zone.current(),
            radios,
        }
    }

    /// Tell every task to exit and wait for it
    pub async fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            let _ = task.signals.send(RxSignal::Exit).await;
            if timeout(self.config.rx_wait_timeout(), task.join).await.is_err() {
                warn!("Receive task for radio {} did not exit in time", task.radio);
            }
        }
        info!("Receive scheduler stopped");
    }
}
