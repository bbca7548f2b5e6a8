//! Transmit scheduler
//!
//! One task per enabled protocol. Each tick that falls inside one of the
//! protocol's slot windows sends an ownship position packet, then a random
//! delay within the slot's transmit interval picks the next tick. Ticks
//! outside every window only realign to the next slot start.

use std::sync::Arc;

use ace_regulation::{
    find_fitting_slot, first_slot, ms_delay_to_reference, protocol_timeslot_covering,
    random_tx_delay, slot, DataSource, RadioParameters, SlotId, Zone,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{normalize_protocols, TunerConfig};
use crate::error::TunerError;
use crate::radio::{PayloadBuilder, Radio};
use crate::rx::armed;
use crate::status::{ProtocolStatus, TxStatus};
use crate::zone::{SharedZone, ZoneTracker};
use crate::MAX_RADIOS;

/// Maximum number of protocols transmitted at the same time
pub const MAX_PROTOCOLS: usize = 6;

/// Counters of one transmit task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStatistics {
    pub tx_requests: u32,
    pub timer_missed: u32,
    pub fallbacks: u32,
}

/// Outcome of a transmit tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxTick {
    /// Inside a window: the packet was handed to the radio (when available)
    Transmitted { delay_ms: u16 },
    /// Outside every window: wait for the next slot start
    Aligned { delay_ms: u16 },
    /// No zone or no slot for this protocol in the zone
    Idle,
}

/// Transmit state of one protocol
#[derive(Debug, Clone)]
pub struct SendPositionCtx {
    protocol: DataSource,
    radio: u8,
    slot: SlotId,
    statistics: TxStatistics,
}

impl SendPositionCtx {
    pub fn new(protocol: DataSource, radio: u8) -> Self {
        Self {
            protocol,
            radio,
            slot: SlotId::NONE,
            statistics: TxStatistics::default(),
        }
    }

    pub fn protocol(&self) -> DataSource {
        self.protocol
    }

    pub fn radio(&self) -> u8 {
        self.radio
    }

    pub fn current_slot(&self) -> SlotId {
        self.slot
    }

    pub fn statistics(&self) -> TxStatistics {
        self.statistics
    }

    /// Run one scheduled tick
    pub fn on_timer<R: Rng>(
        &mut self,
        zone: Zone,
        now_ms: u16,
        radio: &dyn Radio,
        payload: &dyn PayloadBuilder,
        rng: &mut R,
    ) -> TxTick {
        if !zone.is_classified() {
            return TxTick::Idle;
        }
        if slot(self.slot).zone != zone {
            self.slot = first_slot(zone, self.protocol);
        }
        if self.slot.is_none() {
            return TxTick::Idle;
        }

        let fitting = find_fitting_slot(now_ms, self.slot);
        if fitting.is_none() {
            self.slot = protocol_timeslot_covering(now_ms, self.slot);
            let delay_ms = ms_delay_to_reference(slot(self.slot).window.start_ms, now_ms) + 1;
            return TxTick::Aligned { delay_ms };
        }

        if let Some(params) = RadioParameters::for_slot(slot(fitting)) {
            match payload.build_position(self.protocol) {
                Some(packet) => {
                    debug!(
                        "Transmitting {} on radio {} at {} Hz ({} bytes)",
                        self.protocol,
                        self.radio,
                        params.frequency,
                        packet.len()
                    );
                    radio.request_transmit(self.radio, &params, &packet);
                    self.statistics.tx_requests = self.statistics.tx_requests.wrapping_add(1);
                }
                None => debug!("No {} position to transmit", self.protocol),
            }
        }

        let next = random_tx_delay(now_ms, fitting, rng);
        if next.fallback {
            self.statistics.fallbacks = self.statistics.fallbacks.wrapping_add(1);
        }
        self.slot = next.slot;
        TxTick::Transmitted {
            delay_ms: next.delay_ms,
        }
    }

    pub fn record_missed(&mut self) {
        self.statistics.timer_missed = self.statistics.timer_missed.wrapping_add(1);
    }

    pub fn status(&self) -> ProtocolStatus {
        ProtocolStatus {
            protocol: self.protocol,
            radio: self.radio,
            tx_requests: self.statistics.tx_requests,
            timer_missed: self.statistics.timer_missed,
            fallbacks: self.statistics.fallbacks,
        }
    }
}

/// Notifications to a transmit task
#[derive(Debug)]
pub(crate) enum TxSignal {
    Status {
        response: oneshot::Sender<ProtocolStatus>,
    },
    Exit,
}

struct TxTask {
    ctx: SendPositionCtx,
    radio: Arc<dyn Radio>,
    payload: Arc<dyn PayloadBuilder>,
    clock: Arc<dyn Clock>,
    zone: SharedZone,
    config: TunerConfig,
}

async fn run_tx_task(mut task: TxTask, mut signals: mpsc::Receiver<TxSignal>) {
    let mut rng = StdRng::from_os_rng();
    let mut deadline = Some(Instant::now() + task.config.tx_initial_delay());

    debug!(
        "Transmit task for {} on radio {} started",
        task.ctx.protocol(),
        task.ctx.radio()
    );

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Some(TxSignal::Status { response }) => {
                    let _ = response.send(task.ctx.status());
                }
                Some(TxSignal::Exit) | None => break,
            },
            _ = armed(deadline) => {
                let now_ms = task.clock.ms_in_second();
                let tick = task.ctx.on_timer(
                    task.zone.get(),
                    now_ms,
                    task.radio.as_ref(),
                    task.payload.as_ref(),
                    &mut rng,
                );
                let next = match tick {
                    TxTick::Transmitted { delay_ms } | TxTick::Aligned { delay_ms } => {
                        std::time::Duration::from_millis(delay_ms as u64)
                    }
                    TxTick::Idle => task.config.tx_retry(),
                };
                deadline = Some(Instant::now() + next);
            },
            _ = sleep(task.config.tx_wait_timeout()) => {
                // Only a tick that is overdue counts as missed
                if deadline.is_some_and(|d| d >= Instant::now()) {
                    continue;
                }
                task.ctx.record_missed();
                deadline = Some(Instant::now() + task.config.tx_retry());
            },
        }
    }

    debug!("Transmit task for {} ended", task.ctx.protocol());
}

struct TxTaskHandle {
    protocol: DataSource,
    radio: u8,
    signals: mpsc::Sender<TxSignal>,
    join: JoinHandle<()>,
}

/// Transmit side of the tuner
pub struct RadioTunerTx {
    radio: Arc<dyn Radio>,
    payload: Arc<dyn PayloadBuilder>,
    clock: Arc<dyn Clock>,
    config: TunerConfig,
    radio_count: u8,
    zone: ZoneTracker,
    tasks: Vec<TxTaskHandle>,
}

impl RadioTunerTx {
    pub fn new(
        radio: Arc<dyn Radio>,
        payload: Arc<dyn PayloadBuilder>,
        clock: Arc<dyn Clock>,
        config: TunerConfig,
    ) -> Result<Self, TunerError> {
        let radio_count = radio.radio_count();
        if radio_count == 0 || radio_count as usize > MAX_RADIOS {
            return Err(TunerError::UnsupportedRadioCount(radio_count));
        }

        Ok(Self {
            radio,
            payload,
            clock,
            zone: ZoneTracker::new(config.zone_recheck()),
            config,
            radio_count,
            tasks: Vec::new(),
        })
    }

    pub fn zone(&self) -> Zone {
        self.zone.current()
    }

    /// Protocols with a running transmit task
    pub fn protocols(&self) -> Vec<DataSource> {
        self.tasks.iter().map(|t| t.protocol).collect()
    }

    /// Stop tasks for protocols no longer desired and start the new ones
    pub async fn enable_disable_datasources(&mut self, desired: &[DataSource]) {
        let desired = normalize_protocols(desired);

        let (keep, remove): (Vec<_>, Vec<_>) = self
            .tasks
            .drain(..)
            .partition(|t| desired.contains(&t.protocol));
        self.tasks = keep;
        for task in remove {
            self.stop_task(task).await;
        }

        for (index, protocol) in desired.iter().enumerate() {
            if self.tasks.iter().any(|t| t.protocol == *protocol) {
                continue;
            }
            if self.tasks.len() >= MAX_PROTOCOLS {
                warn!(
                    "Cannot transmit {}: already {} protocols active",
                    protocol, MAX_PROTOCOLS
                );
                continue;
            }

            let radio = (index % self.radio_count as usize) as u8;
            let (signals, signal_rx) = mpsc::channel(8);
            let task = TxTask {
                ctx: SendPositionCtx::new(*protocol, radio),
                radio: self.radio.clone(),
                payload: self.payload.clone(),
                clock: self.clock.clone(),
                zone: self.zone.shared(),
                config: self.config.clone(),
            };
            let join = tokio::spawn(run_tx_task(task, signal_rx));
            info!("Transmitting {} on radio {}", protocol, radio);
            self.tasks.push(TxTaskHandle {
                protocol: *protocol,
                radio,
                signals,
                join,
            });
        }
    }

    async fn stop_task(&self, task: TxTaskHandle) {
        let _ = task.signals.send(TxSignal::Exit).await;
        if timeout(self.config.tx_wait_timeout(), task.join).await.is_err() {
            warn!("Transmit task for {} did not exit in time", task.protocol);
        } else {
            info!("Stopped transmitting {} on radio {}", task.protocol, task.radio);
        }
    }

    /// Ownship position, may change the zone
    pub fn on_position(&mut self, lat: f32, lon: f32) {
        self.zone.on_position(lat, lon, Instant::now());
    }

    pub async fn status(&self) -> TxStatus {
        let mut protocols = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let (response, response_rx) = oneshot::channel();
            if task
                .signals
                .send(TxSignal::Status { response })
                .await
                .is_err()
            {
                continue;
            }
            if let Ok(status) = response_rx.await {
                protocols.push(status);
            }
        }
        TxStatus {
            zone: self.zone.current(),
            protocols,
        }
    }

    /// Tell every task to exit and wait for it
    pub async fn stop(&mut self) {
        let tasks: Vec<_> = self.tasks.drain(..).collect();
        for task in tasks {
            self.stop_task(task).await;
        }
        info!("Transmit scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TransmitLog(Mutex<Vec<(u8, u32, Vec<u8>)>>);

    impl Radio for TransmitLog {
        fn radio_count(&self) -> u8 {
            1
        }

        fn tune_to_receive(&self, _radio: u8, _params: &RadioParameters) {}

        fn request_transmit(&self, radio: u8, params: &RadioParameters, payload: &[u8]) {
            self.0
                .lock()
                .unwrap()
                .push((radio, params.frequency, payload.to_vec()));
        }
    }

    struct Packet(Option<Vec<u8>>);

    impl PayloadBuilder for Packet {
        fn build_position(&self, _protocol: DataSource) -> Option<Vec<u8>> {
            self.0.clone()
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_unclassified_zone_is_idle() {
        let radio = TransmitLog::default();
        let mut ctx = SendPositionCtx::new(DataSource::Flarm, 0);
        let tick = ctx.on_timer(
            Zone::Unclassified,
            500,
            &radio,
            &Packet(Some(vec![1])),
            &mut rng(),
        );
        assert_eq!(tick, TxTick::Idle);
        assert!(radio.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unconfigured_protocol_is_idle() {
        let radio = TransmitLog::default();
        let mut ctx = SendPositionCtx::new(DataSource::Paw, 0);
        let tick = ctx.on_timer(Zone::Europe, 500, &radio, &Packet(Some(vec![1])), &mut rng());
        assert_eq!(tick, TxTick::Idle);
    }

    #[test]
    fn test_outside_window_aligns_to_slot_start() {
        let radio = TransmitLog::default();
        let mut ctx = SendPositionCtx::new(DataSource::Flarm, 0);
        let tick = ctx.on_timer(Zone::Europe, 250, &radio, &Packet(Some(vec![1])), &mut rng());

        assert_eq!(tick, TxTick::Aligned { delay_ms: 151 });
        assert_eq!(slot(ctx.current_slot()).window.start_ms, 400);
        assert!(radio.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_inside_window_transmits_on_fitting_slot() {
        let radio = TransmitLog::default();
        let mut ctx = SendPositionCtx::new(DataSource::Flarm, 1);

        // 900ms lies in the second FLARM window, on channel 1
        let tick = ctx.on_timer(Zone::Europe, 900, &radio, &Packet(Some(vec![7, 7])), &mut rng());

        let TxTick::Transmitted { delay_ms } = tick else {
            panic!("expected transmission, got {:?}", tick);
        };
        assert!(delay_ms >= 600);
        assert_eq!(
            radio.0.lock().unwrap().as_slice(),
            &[(1, 868_400_000, vec![7, 7])]
        );
        assert_eq!(ctx.statistics().tx_requests, 1);
    }

    #[test]
    fn test_missing_payload_still_reschedules() {
        let radio = TransmitLog::default();
        let mut ctx = SendPositionCtx::new(DataSource::Flarm, 0);
        let tick = ctx.on_timer(Zone::Europe, 500, &radio, &Packet(None), &mut rng());

        assert!(matches!(tick, TxTick::Transmitted { .. }));
        assert!(radio.0.lock().unwrap().is_empty());
        assert_eq!(ctx.statistics().tx_requests, 0);
    }

    #[test]
    fn test_zone_change_resolves_new_ring() {
        let radio = TransmitLog::default();
        let mut ctx = SendPositionCtx::new(DataSource::Flarm, 0);
        ctx.on_timer(Zone::Europe, 500, &radio, &Packet(Some(vec![1])), &mut rng());
        assert_eq!(slot(ctx.current_slot()).zone, Zone::Europe);

        ctx.on_timer(Zone::Israel, 500, &radio, &Packet(Some(vec![1])), &mut rng());
        assert_eq!(slot(ctx.current_slot()).zone, Zone::Israel);
    }

    #[test]
    fn test_status_counts_misses() {
        let mut ctx = SendPositionCtx::new(DataSource::Ogn1, 1);
        ctx.record_missed();
        ctx.record_missed();

        let status = ctx.status();
        assert_eq!(status.protocol, DataSource::Ogn1);
        assert_eq!(status.radio, 1);
        assert_eq!(status.timer_missed, 2);
    }
}
