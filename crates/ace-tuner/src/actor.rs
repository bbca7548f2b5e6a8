//! Tuner Actor
//!
//! Composes the receive and transmit schedulers behind one command channel.
//! Everything that changes scheduler state goes through this actor, so the
//! schedulers themselves need no locking.
//!
//! # Example
//!
//! ```rust,ignore
//! use ace_tuner::{run_tuner_actor, Tuner, TunerHandle};
//! use tokio::sync::mpsc;
//!
//! let tuner = Tuner::new(radio, payload, config_source, clock, TunerConfig::default())?;
//! let (cmd_tx, cmd_rx) = mpsc::channel(64);
//! tokio::spawn(run_tuner_actor(tuner, cmd_rx));
//!
//! let handle = TunerHandle::new(cmd_tx);
//! handle.send_event(TunerEvent::OwnshipPosition { lat: 51.0, lon: 4.0 }).await?;
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::{ConfigSource, TunerConfig};
use crate::error::TunerError;
use crate::events::TunerEvent;
use crate::radio::{PayloadBuilder, Radio};
use crate::rx::RadioTunerRx;
use crate::status::TunerStatus;
use crate::tx::RadioTunerTx;

/// Receive and transmit schedulers driven by the same events
pub struct Tuner {
    rx: RadioTunerRx,
    tx: RadioTunerTx,
    config_source: Arc<dyn ConfigSource>,
}

impl Tuner {
    pub fn new(
        radio: Arc<dyn Radio>,
        payload: Arc<dyn PayloadBuilder>,
        config_source: Arc<dyn ConfigSource>,
        clock: Arc<dyn Clock>,
        config: TunerConfig,
    ) -> Result<Self, TunerError> {
        let rx = RadioTunerRx::new(radio.clone(), clock.clone(), config.clone())?;
        let tx = RadioTunerTx::new(radio, payload, clock, config)?;
        Ok(Self {
            rx,
            tx,
            config_source,
        })
    }

    pub fn rx(&self) -> &RadioTunerRx {
        &self.rx
    }

    pub fn tx(&self) -> &RadioTunerTx {
        &self.tx
    }

    /// Spawn the scheduler tasks for the currently enabled protocols
    pub async fn start(&mut self) {
        let protocols = self.config_source.enabled_protocols();
        info!("Starting tuner with {:?}", protocols);
        self.rx.start(&protocols).await;
        self.tx.enable_disable_datasources(&protocols).await;
    }

    pub async fn handle_event(&mut self, event: TunerEvent) {
        match event {
            TunerEvent::OwnshipPosition { lat, lon } => {
                self.rx.on_position(lat, lon);
                self.tx.on_position(lat, lon);
            }
            TunerEvent::AircraftPosition { protocol } => {
                self.rx.on_traffic(protocol).await;
            }
            TunerEvent::ConfigUpdated { protocols } => {
                info!("Enabled protocols changed to {:?}", protocols);
                self.rx.enable_disable_datasources(&protocols).await;
                self.tx.enable_disable_datasources(&protocols).await;
            }
        }
    }

    pub async fn status(&self) -> TunerStatus {
        TunerStatus {
            rx: self.rx.status().await,
            tx: self.tx.status().await,
        }
    }

    pub async fn stop(&mut self) {
        self.rx.stop().await;
        self.tx.stop().await;
    }
}

/// Commands sent to the tuner actor
#[derive(Debug)]
pub enum TunerCommand {
    /// Forward an event to the schedulers
    Event(TunerEvent),

    /// Snapshot of both schedulers
    QueryStatus {
        /// Channel to send back the status
        response: oneshot::Sender<TunerStatus>,
    },

    /// Stop all scheduler tasks and exit the actor
    Shutdown,
}

/// Run the tuner actor
///
/// Starts the schedulers, then processes commands until `Shutdown` or until
/// every sender is dropped. All scheduler tasks are stopped on exit.
pub async fn run_tuner_actor(mut tuner: Tuner, mut cmd_rx: mpsc::Receiver<TunerCommand>) {
    tuner.start().await;
    info!("Tuner actor started");

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            TunerCommand::Event(event) => {
                debug!("Tuner event: {:?}", event);
                tuner.handle_event(event).await;
            }
            TunerCommand::QueryStatus { response } => {
                let _ = response.send(tuner.status().await);
            }
            TunerCommand::Shutdown => {
                info!("Tuner actor shutting down");
                break;
            }
        }
    }

    tuner.stop().await;
    info!("Tuner actor stopped");
}

/// Client side of the tuner actor
#[derive(Debug, Clone)]
pub struct TunerHandle {
    cmd_tx: mpsc::Sender<TunerCommand>,
}

impl TunerHandle {
    pub fn new(cmd_tx: mpsc::Sender<TunerCommand>) -> Self {
        Self { cmd_tx }
    }

    pub async fn send_event(&self, event: TunerEvent) -> Result<(), TunerError> {
        self.cmd_tx
            .send(TunerCommand::Event(event))
            .await
            .map_err(|_| TunerError::ActorUnavailable)
    }

    pub async fn status(&self) -> Result<TunerStatus, TunerError> {
        let (response, response_rx) = oneshot::channel();
        self.cmd_tx
            .send(TunerCommand::QueryStatus { response })
            .await
            .map_err(|_| TunerError::ActorUnavailable)?;
        response_rx.await.map_err(|_| TunerError::ActorUnavailable)
    }

    pub async fn shutdown(&self) -> Result<(), TunerError> {
        self.cmd_tx
            .send(TunerCommand::Shutdown)
            .await
            .map_err(|_| TunerError::ActorUnavailable)
    }
}
