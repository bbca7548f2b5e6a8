//! Simulated surrounding traffic
//!
//! Produces aircraft reception events at a configurable rate, spread over
//! the protocols with weights, so the receive weighting has something to
//! react to.

use ace_regulation::DataSource;
use ace_tuner::TunerEvent;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Share of simulated traffic per protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficMix {
    pub protocol: DataSource,
    /// Relative weight, 0 disables the protocol
    pub weight: u32,
}

/// Random aircraft reception events
#[derive(Debug, Clone)]
pub struct TrafficGenerator {
    mix: Vec<TrafficMix>,
    total: u32,
}

impl TrafficGenerator {
    pub fn new(mix: Vec<TrafficMix>) -> Self {
        let mix: Vec<_> = mix
            .into_iter()
            .filter(|m| m.weight > 0 && m.protocol != DataSource::None)
            .collect();
        let total = mix.iter().map(|m| m.weight).sum();
        Self { mix, total }
    }

    /// Equal share for every protocol
    pub fn uniform(protocols: &[DataSource]) -> Self {
        Self::new(
            protocols
                .iter()
                .map(|p| TrafficMix {
                    protocol: *p,
                    weight: 1,
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Pick the protocol of the next received packet
    pub fn next_protocol<R: Rng>(&self, rng: &mut R) -> Option<DataSource> {
        if self.total == 0 {
            return None;
        }
        let mut pick = rng.random_range(0..self.total);
        for entry in &self.mix {
            if pick < entry.weight {
                return Some(entry.protocol);
            }
            pick -= entry.weight;
        }
        None
    }

    /// The next reception as a tuner event
    pub fn next_event<R: Rng>(&self, rng: &mut R) -> Option<TunerEvent> {
        self.next_protocol(rng)
            .map(|protocol| TunerEvent::AircraftPosition { protocol })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_empty_mix_produces_nothing() {
        let generator = TrafficGenerator::new(vec![TrafficMix {
            protocol: DataSource::Flarm,
            weight: 0,
        }]);
        assert!(generator.is_empty());
        assert!(generator
            .next_protocol(&mut StdRng::seed_from_u64(1))
            .is_none());
    }

    #[test]
    fn test_weights_bias_selection() {
        let generator = TrafficGenerator::new(vec![
            TrafficMix {
                protocol: DataSource::Flarm,
                weight: 9,
            },
            TrafficMix {
                protocol: DataSource::Ogn1,
                weight: 1,
            },
        ]);
        let mut rng = StdRng::seed_from_u64(5);
        let flarm = (0..1000)
            .filter(|_| generator.next_protocol(&mut rng) == Some(DataSource::Flarm))
            .count();
        assert!(flarm > 800, "flarm picked {} times", flarm);
    }

    proptest! {
        #[test]
        fn picks_only_configured_protocols(seed in any::<u64>()) {
            let generator = TrafficGenerator::uniform(&[DataSource::Adsl, DataSource::Fanet]);
            let mut rng = StdRng::seed_from_u64(seed);
            let protocol = generator.next_protocol(&mut rng).unwrap();
            prop_assert!(protocol == DataSource::Adsl || protocol == DataSource::Fanet);
        }
    }
}
