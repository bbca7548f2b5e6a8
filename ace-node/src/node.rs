//! Bench node: the tuner actor wired to simulated collaborators

use std::sync::Arc;
use std::time::Duration;

use ace_sim::{
    ActivityKind, FixedPayloadBuilder, MemoryConfig, RadioActivity, TrafficGenerator,
    VirtualRadio,
};
use ace_tuner::{run_tuner_actor, SystemClock, Tuner, TunerError, TunerEvent, TunerHandle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::settings::Settings;

/// Run until ctrl-c or the configured duration
pub async fn run(settings: Settings) -> Result<(), TunerError> {
    let (radio, activity_rx) = VirtualRadio::new(settings.radio_count).with_broadcast(64);
    let radio = Arc::new(radio);
    let position = settings.position;

    let tuner = Tuner::new(
        radio,
        Arc::new(FixedPayloadBuilder::at(position.lat, position.lon)),
        Arc::new(MemoryConfig::new(settings.protocols.clone())),
        Arc::new(SystemClock),
        settings.tuner.clone(),
    )?;

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let actor = tokio::spawn(run_tuner_actor(tuner, cmd_rx));
    let handle = TunerHandle::new(cmd_tx);
    tokio::spawn(log_activity(activity_rx));

    let generator = TrafficGenerator::uniform(&settings.protocols);
    let mut rng = StdRng::from_os_rng();

    let mut position_timer = interval(Duration::from_secs(1));
    let mut status_timer = interval(settings.status_interval());
    status_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let traffic_every = settings
        .traffic_interval()
        .unwrap_or(Duration::from_secs(3600));
    let mut traffic_timer = interval(traffic_every);
    traffic_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let run_for = settings
        .run_for_secs
        .map(Duration::from_secs)
        .unwrap_or(Duration::MAX);
    let deadline = sleep(run_for);
    tokio::pin!(deadline);

    info!(
        "Node running with {} radio(s) at {:.4},{:.4}",
        settings.radio_count, position.lat, position.lon
    );

    loop {
        tokio::select! {
            _ = position_timer.tick() => {
                handle
                    .send_event(TunerEvent::OwnshipPosition {
                        lat: position.lat,
                        lon: position.lon,
                    })
                    .await?;
            }
            _ = traffic_timer.tick(), if settings.traffic_interval().is_some() => {
                if let Some(event) = generator.next_event(&mut rng) {
                    handle.send_event(event).await?;
                }
            }
            _ = status_timer.tick() => {
                let status = handle.status().await?;
                info!("Status: {}", status.to_json()?);
            }
            _ = &mut deadline => {
                info!("Run time elapsed");
                break;
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for ctrl-c: {}", e);
                }
                info!("Interrupted");
                break;
            }
        }
    }

    let status = handle.status().await?;
    info!("Final status: {}", status.to_json()?);
    handle.shutdown().await?;
    if actor.await.is_err() {
        warn!("Tuner actor panicked");
    }
    Ok(())
}

async fn log_activity(mut activity_rx: broadcast::Receiver<RadioActivity>) {
    loop {
        match activity_rx.recv().await {
            Ok(activity) => match activity.kind {
                ActivityKind::Receive => debug!(
                    "radio {} rx {} {} Hz",
                    activity.radio, activity.protocol, activity.frequency
                ),
                ActivityKind::Transmit => info!(
                    "radio {} tx {} {} Hz {} dBm ({} bytes)",
                    activity.radio,
                    activity.protocol,
                    activity.frequency,
                    activity.power_dbm,
                    activity.payload_len
                ),
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                debug!("Activity log skipped {} entries", n)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
