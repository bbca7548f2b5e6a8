//! End-to-end simulation tests
//!
//! Runs the tuner actor against the simulated collaborators on paused time.

use std::sync::Arc;
use std::time::Duration;

use ace_regulation::DataSource;
use ace_sim::{ActivityKind, FixedPayloadBuilder, MemoryConfig, TrafficGenerator, VirtualRadio};
use ace_tuner::{run_tuner_actor, MonotonicClock, Tuner, TunerConfig, TunerEvent, TunerHandle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub const PROTOCOLS: [DataSource; 3] = [DataSource::Flarm, DataSource::Ogn1, DataSource::Adsl];

    /// Spawn the actor over two virtual radios placed over Europe
    pub async fn spawn_over_europe() -> (TunerHandle, Arc<VirtualRadio>, Arc<MemoryConfig>) {
        let radio = Arc::new(VirtualRadio::new(2));
        let config = Arc::new(MemoryConfig::new(PROTOCOLS.to_vec()));
        let tuner = Tuner::new(
            radio.clone(),
            Arc::new(FixedPayloadBuilder::at(51.0, 4.0)),
            config.clone(),
            Arc::new(MonotonicClock::new()),
            TunerConfig::default(),
        )
        .unwrap();

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        tokio::spawn(run_tuner_actor(tuner, cmd_rx));
        let handle = TunerHandle::new(cmd_tx);
        handle
            .send_event(TunerEvent::OwnshipPosition { lat: 51.0, lon: 4.0 })
            .await
            .unwrap();
        (handle, radio, config)
    }
}

// ============================================================================
// Simulation Tests
// ============================================================================

mod simulation_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn both_radios_receive_and_transmit() {
        let (handle, radio, _config) = helpers::spawn_over_europe().await;

        tokio::time::sleep(Duration::from_secs(10)).await;

        for index in 0..2 {
            let state = radio.state(index).unwrap();
            assert!(state.rx_count > 0, "radio {} never received", index);
        }
        let transmitted: Vec<_> = radio
            .activity()
            .into_iter()
            .filter(|a| a.kind == ActivityKind::Transmit)
            .map(|a| a.protocol)
            .collect();
        for protocol in helpers::PROTOCOLS {
            assert!(transmitted.contains(&protocol), "{} never sent", protocol);
        }

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn traffic_reaches_receive_weighting() {
        let (handle, _radio, config) = helpers::spawn_over_europe().await;
        let generator = TrafficGenerator::uniform(&[DataSource::Ogn1]);
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..5 {
            let event = generator.next_event(&mut rng).unwrap();
            handle.send_event(event).await.unwrap();
        }

        // Reapplying the same configuration rebuilds the sequences right away
        handle
            .send_event(TunerEvent::ConfigUpdated {
                protocols: config_protocols(&config),
            })
            .await
            .unwrap();

        let status = handle.status().await.unwrap();
        let ogn_entries = status
            .rx
            .radios
            .iter()
            .flat_map(|r| r.sequence.iter())
            .filter(|p| **p == DataSource::Ogn1)
            .count();
        assert_eq!(ogn_entries, 2);

        handle.shutdown().await.unwrap();
    }

    fn config_protocols(config: &MemoryConfig) -> Vec<DataSource> {
        use ace_tuner::ConfigSource;
        config.enabled_protocols()
    }
}
