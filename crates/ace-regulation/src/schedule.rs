//! Slot arithmetic over the regulation table
//!
//! All functions are pure over the static table. Times are milliseconds
//! within the current second (0..1000); values of 1000 or more are reduced
//! modulo 1000 before use.

use rand::Rng;
use tracing::debug;

use crate::protocol::{DataSource, ProtocolConfig};
use crate::table::{slot, ChannelMethod, ProtocolTimeSlot, SlotId, TIMINGS};

/// Attempts made to find a random transmit time inside a slot window
pub const MAX_FAIL_SAFE: u8 = 3;

/// Transmit times landing this close before a whole second are pushed past it
///
/// Some protocols (FLARM, OGN 3.x) derive their encryption key from the
/// second, a packet straddling the roll-over cannot be decrypted.
pub const SECOND_BOUNDARY_GUARD_MS: u16 = 75;

/// Offset past the slot start used by the fallback delay
pub const FALLBACK_OFFSET_MS: u16 = 100;

/// Everything the radio needs to tune to a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioParameters {
    /// Physical-layer settings of the protocol
    pub config: ProtocolConfig,
    /// Frequency in Hz
    pub frequency: u32,
    /// Transmit power in dBm
    pub power_dbm: i8,
}

impl RadioParameters {
    /// Parameters for a slot, `None` if the slot cannot be used on air
    pub fn for_slot(slot: &ProtocolTimeSlot) -> Option<Self> {
        let frequency = frequency_of(slot);
        if frequency == 0 {
            return None;
        }
        Some(Self {
            config: *slot.radio_config,
            frequency,
            power_dbm: slot.frequency_plan.power_dbm,
        })
    }
}

/// Result of `random_tx_delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxDelay {
    /// Slot the next transmission falls in
    pub slot: SlotId,
    /// Delay from now until the next transmission
    pub delay_ms: u16,
    /// The random search was exhausted and the deterministic delay was used
    pub fallback: bool,
}

/// Frequency in Hz a slot uses; 0 means the slot is not transmittable
pub fn frequency_of(slot: &ProtocolTimeSlot) -> u32 {
    if slot.protocol == DataSource::None {
        return 0;
    }
    let plan = slot.frequency_plan;
    match slot.channel_method {
        ChannelMethod::Channel0 => plan.base_frequency,
        ChannelMethod::Channel1 => plan.base_frequency + plan.channel_spacing,
    }
}

/// Delay until the next occurrence of `reference_ms` within a second
///
/// When `now_ms` is 600 a reference of 700 gives 100 and a reference of 200
/// gives 600. A reference equal to now gives a full second. The result is
/// always within 1..=1000.
pub fn ms_delay_to_reference(reference_ms: u16, now_ms: u16) -> u16 {
    let reference = reference_ms % 1000;
    let now = now_ms % 1000;
    if reference > now {
        reference - now
    } else {
        1000 - now + reference
    }
}

/// Iterate the ring of slots starting at `start`, each slot visited once
pub fn ring(start: SlotId) -> impl Iterator<Item = &'static ProtocolTimeSlot> {
    let mut current = Some(start);
    let mut steps = 0;
    std::iter::from_fn(move || {
        let id = current?;
        let entry = slot(id);
        steps += 1;
        // Bounded in case a malformed table never cycles back
        current = if entry.next_slot_id == start || steps >= TIMINGS.len() {
            None
        } else {
            Some(entry.next_slot_id)
        };
        Some(entry)
    })
}

/// Slot of the ring whose window contains `now_ms` exactly
///
/// The ring is walked twice, the second time with a 1000 ms offset so a
/// window wrapping into the next second (800..1200) matches 0..200.
pub fn find_fitting_slot(now_ms: u16, start: SlotId) -> SlotId {
    let now = now_ms % 1000;
    for offset in [0, 1000] {
        if let Some(entry) = ring(start).find(|s| s.window.contains(now + offset)) {
            return entry.slot_id;
        }
    }
    SlotId::NONE
}

/// Slot of the ring covering `now_ms`, otherwise the next one to start
///
/// Returns `SlotId::NONE` only for the sentinel ring.
pub fn protocol_timeslot_covering(now_ms: u16, start: SlotId) -> SlotId {
    if start.is_none() {
        return SlotId::NONE;
    }

    let fitting = find_fitting_slot(now_ms, start);
    if !fitting.is_none() {
        return fitting;
    }

    ring(start)
        .min_by_key(|s| ms_delay_to_reference(s.window.start_ms, now_ms))
        .map(|s| s.slot_id)
        .unwrap_or(SlotId::NONE)
}

/// Pick a random legal delay until the next transmission on `current`'s ring
///
/// The delay is drawn from the slot's transmit interval and checked against
/// the ring's windows. After `MAX_FAIL_SAFE` misses a deterministic delay is
/// returned that lands `FALLBACK_OFFSET_MS` after the slot start, no earlier
/// than the interval minimum.
pub fn random_tx_delay<R: Rng>(now_ms: u16, current: SlotId, rng: &mut R) -> TxDelay {
    let now = now_ms % 1000;
    let entry = slot(current);
    let interval = entry.tx_interval;

    for _ in 0..MAX_FAIL_SAFE {
        let mut delay = rng.random_range(interval.min_ms..=interval.max_ms.max(interval.min_ms));

        if (now + delay) % 1000 > 1000 - SECOND_BOUNDARY_GUARD_MS {
            delay += SECOND_BOUNDARY_GUARD_MS;
        }

        let fitting = find_fitting_slot(now + delay, current);
        if !fitting.is_none() {
            return TxDelay {
                slot: fitting,
                delay_ms: delay,
                fallback: false,
            };
        }
    }

    let earliest = now + interval.min_ms;
    let delay = interval.min_ms
        + ms_delay_to_reference(entry.window.start_ms + FALLBACK_OFFSET_MS, earliest);
    debug!(
        "No fitting transmit time for slot {} after {} attempts, falling back to {}ms",
        current, MAX_FAIL_SAFE, delay
    );

    TxDelay {
        slot: current,
        delay_ms: delay,
        fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::first_slot;
    use crate::zone::Zone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flarm_europe() -> SlotId {
        first_slot(Zone::Europe, DataSource::Flarm)
    }

    #[test]
    fn test_ms_delay_to_reference() {
        assert_eq!(ms_delay_to_reference(700, 600), 100);
        assert_eq!(ms_delay_to_reference(200, 600), 600);
        assert_eq!(ms_delay_to_reference(600, 600), 1000);
        assert_eq!(ms_delay_to_reference(0, 999), 1);
        assert_eq!(ms_delay_to_reference(1100, 50), 50);
    }

    #[test]
    fn test_frequency_of_channels() {
        let id = flarm_europe();
        assert_eq!(frequency_of(slot(id)), 868_200_000);
        assert_eq!(frequency_of(slot(slot(id).next_slot_id)), 868_400_000);
        assert_eq!(frequency_of(slot(SlotId::NONE)), 0);
    }

    #[test]
    fn test_radio_parameters_for_sentinel_is_none() {
        assert!(RadioParameters::for_slot(slot(SlotId::NONE)).is_none());
        let params = RadioParameters::for_slot(slot(flarm_europe())).unwrap();
        assert_eq!(params.frequency, 868_200_000);
        assert_eq!(params.power_dbm, 14);
        assert_eq!(params.config.data_source, DataSource::Flarm);
    }

    #[test]
    fn test_ring_visits_each_slot_once() {
        let ids: Vec<_> = ring(flarm_europe()).map(|s| s.slot_id).collect();
        assert_eq!(ids, vec![SlotId(1), SlotId(2)]);

        let fanet = first_slot(Zone::Europe, DataSource::Fanet);
        assert_eq!(ring(fanet).count(), 1);
        assert_eq!(ring(SlotId::NONE).count(), 1);
    }

    #[test]
    fn test_find_fitting_slot() {
        let id = flarm_europe();
        assert_eq!(find_fitting_slot(500, id), SlotId(1));
        assert_eq!(find_fitting_slot(900, id), SlotId(2));
        // 100ms is the wrapped tail of the 800..1200 window
        assert_eq!(find_fitting_slot(100, id), SlotId(2));
        assert_eq!(find_fitting_slot(300, id), SlotId::NONE);
        assert_eq!(find_fitting_slot(1500, id), SlotId(1));
        assert_eq!(find_fitting_slot(500, SlotId::NONE), SlotId::NONE);
    }

    #[test]
    fn test_covering_inside_windows() {
        let id = flarm_europe();
        assert_eq!(protocol_timeslot_covering(500, id), id);
        assert_eq!(slot(protocol_timeslot_covering(900, id)).window.start_ms, 800);
        assert_eq!(slot(protocol_timeslot_covering(0, id)).window.start_ms, 800);
    }

    #[test]
    fn test_covering_in_gap_returns_upcoming() {
        let id = flarm_europe();
        assert_eq!(slot(protocol_timeslot_covering(300, id)).window.start_ms, 400);
        // Starting from the second slot still finds the nearest start
        assert_eq!(protocol_timeslot_covering(300, SlotId(2)), SlotId(1));
    }

    #[test]
    fn test_covering_sentinel() {
        assert_eq!(protocol_timeslot_covering(500, SlotId::NONE), SlotId::NONE);
        let unconfigured = first_slot(Zone::NorthAmerica, DataSource::Flarm);
        let covering = protocol_timeslot_covering(0, unconfigured);
        assert_eq!(slot(covering).zone, Zone::Unclassified);
    }

    #[test]
    fn test_random_tx_delay_within_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = flarm_europe();
        for now in (0..1000).step_by(37) {
            let next = random_tx_delay(now, id, &mut rng);
            assert!(next.delay_ms >= 600);
            if next.fallback {
                assert!(!find_fitting_slot(now + next.delay_ms, id).is_none());
            } else {
                assert!(next.delay_ms <= 1400 + SECOND_BOUNDARY_GUARD_MS);
                assert_eq!(find_fitting_slot(now + next.delay_ms, id), next.slot);
            }
        }
    }

    #[test]
    fn test_random_tx_delay_avoids_second_boundary() {
        let mut rng = StdRng::seed_from_u64(11);
        let id = first_slot(Zone::Europe, DataSource::Fanet);
        for now in 0..1000 {
            let next = random_tx_delay(now, id, &mut rng);
            let landing = (now + next.delay_ms) % 1000;
            assert!(landing <= 1000 - SECOND_BOUNDARY_GUARD_MS || next.fallback);
        }
    }

    #[test]
    fn test_random_tx_delay_sentinel_falls_back() {
        let mut rng = StdRng::seed_from_u64(3);
        let next = random_tx_delay(250, SlotId::NONE, &mut rng);
        assert!(next.fallback);
        assert_eq!(next.slot, SlotId::NONE);
        assert_eq!(next.delay_ms, ms_delay_to_reference(FALLBACK_OFFSET_MS, 250));
    }
}
