//! Zone tracking from ownship position

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ace_regulation::{zone_of, Zone};
use tokio::time::Instant;
use tracing::info;

/// Current zone, readable by the scheduler tasks
#[derive(Debug, Clone, Default)]
pub struct SharedZone(Arc<AtomicU8>);

impl SharedZone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Zone {
        Zone::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, zone: Zone) {
        self.0.store(zone as u8, Ordering::Relaxed);
    }
}

/// Re-classifies the zone at most once per recheck interval
///
/// While the zone is unclassified every position is classified.
#[derive(Debug)]
pub struct ZoneTracker {
    zone: SharedZone,
    recheck: Duration,
    last_check: Option<Instant>,
}

impl ZoneTracker {
    pub fn new(recheck: Duration) -> Self {
        Self {
            zone: SharedZone::new(),
            recheck,
            last_check: None,
        }
    }

    /// Handle for the tasks
    pub fn shared(&self) -> SharedZone {
        self.zone.clone()
    }

    pub fn current(&self) -> Zone {
        self.zone.get()
    }

    /// Feed a position, returns the new zone if it changed
    pub fn on_position(&mut self, lat: f32, lon: f32, now: Instant) -> Option<Zone> {
        let current = self.zone.get();
        let due = self
            .last_check
            .map_or(true, |last| now.duration_since(last) >= self.recheck);
        if current.is_classified() && !due {
            return None;
        }

        self.last_check = Some(now);
        let zone = zone_of(lat, lon);
        if zone == current {
            return None;
        }

        info!("Zone changed from {} to {}", current, zone);
        self.zone.set(zone);
        Some(zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_position_classifies() {
        let mut tracker = ZoneTracker::new(Duration::from_secs(30));
        assert_eq!(tracker.current(), Zone::Unclassified);
        assert_eq!(
            tracker.on_position(51.0, 4.0, Instant::now()),
            Some(Zone::Europe)
        );
        assert_eq!(tracker.shared().get(), Zone::Europe);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recheck_is_rate_limited() {
        let mut tracker = ZoneTracker::new(Duration::from_secs(30));
        let start = Instant::now();
        tracker.on_position(51.0, 4.0, start);

        // Crossing into North America is not noticed before the interval
        let early = start + Duration::from_secs(10);
        assert_eq!(tracker.on_position(40.0, -100.0, early), None);
        assert_eq!(tracker.current(), Zone::Europe);

        let later = start + Duration::from_secs(30);
        assert_eq!(
            tracker.on_position(40.0, -100.0, later),
            Some(Zone::NorthAmerica)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unclassified_rechecks_every_position() {
        let mut tracker = ZoneTracker::new(Duration::from_secs(30));
        let start = Instant::now();
        assert_eq!(tracker.on_position(f32::NAN, 0.0, start), None);
        assert_eq!(
            tracker.on_position(51.0, 4.0, start + Duration::from_millis(100)),
            Some(Zone::Europe)
        );
    }
}
