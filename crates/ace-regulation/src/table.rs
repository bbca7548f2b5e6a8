//! Compiled-in regulation table
//!
//! Each (zone, protocol) pair owns a ring of one or two time slots. The
//! table obeys these rules, checked by the tests in `tests/table_properties.rs`:
//!
//! - slot 0 is the sentinel `NONE` slot
//! - a pair has one or two slots; `next_slot_id` points to the other one, or to itself
//! - the first slot of a pair starts before the second
//! - `window.start` and `window.duration` are within 0..=1000
//! - the windows of one pair do not overlap (modulo 1000) and may leave one gap

use std::fmt;

use crate::protocol::{
    DataSource, FrequencyPlan, ProtocolConfig, ADSL, EUROPE, EUROPE_FANET, FANET, FLARM, ISRAEL,
    OGN1,
};
use crate::zone::Zone;

/// Index of a slot in the regulation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SlotId(pub u8);

impl SlotId {
    /// The sentinel slot: no schedule for this zone/protocol
    pub const NONE: SlotId = SlotId(0);

    /// Whether this is the sentinel slot
    pub fn is_none(&self) -> bool {
        *self == SlotId::NONE
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which channel of the frequency plan a slot uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMethod {
    /// Base frequency (868.2 MHz in Europe)
    Channel0,
    /// Base frequency plus one channel spacing (868.4 MHz in Europe)
    Channel1,
}

/// Window within one second, in milliseconds after the PPS edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub start_ms: u16,
    pub duration_ms: u16,
}

impl SlotWindow {
    /// End of the window; may exceed 1000 when it wraps into the next second
    pub fn end_ms(&self) -> u16 {
        self.start_ms + self.duration_ms
    }

    /// Exact membership test, `ms` may be offset by 1000 to test the wrapped part
    pub fn contains(&self, ms: u16) -> bool {
        ms >= self.start_ms && ms < self.end_ms()
    }
}

/// Minimum and maximum time between two transmissions, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxInterval {
    pub min_ms: u16,
    pub max_ms: u16,
}

/// Wait window after channel activity was detected, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadWait {
    pub min_ms: u8,
    pub max_ms: u8,
}

/// One entry of the regulation table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolTimeSlot {
    /// This slot's id
    pub slot_id: SlotId,
    /// The other slot of the same zone/protocol, or this slot
    pub next_slot_id: SlotId,
    /// Zone where this slot applies
    pub zone: Zone,
    /// Protocol of this slot
    pub protocol: DataSource,
    /// Frequency plan of the zone
    pub frequency_plan: &'static FrequencyPlan,
    /// Physical-layer settings of the protocol
    pub radio_config: &'static ProtocolConfig,
    /// Receive/transmit window within the second
    pub window: SlotWindow,
    /// Allowed spacing between transmissions on this slot
    pub tx_interval: TxInterval,
    /// Wait window after channel activity
    pub cad_wait: CadWait,
    /// Channel of the frequency plan used by this slot
    pub channel_method: ChannelMethod,
}

#[allow(clippy::too_many_arguments)]
const fn time_slot(
    slot_id: u8,
    next_slot_id: u8,
    zone: Zone,
    protocol: DataSource,
    frequency_plan: &'static FrequencyPlan,
    radio_config: &'static ProtocolConfig,
    window: (u16, u16),
    tx_interval: (u16, u16),
    cad_wait: (u8, u8),
    channel_method: ChannelMethod,
) -> ProtocolTimeSlot {
    ProtocolTimeSlot {
        slot_id: SlotId(slot_id),
        next_slot_id: SlotId(next_slot_id),
        zone,
        protocol,
        frequency_plan,
        radio_config,
        window: SlotWindow {
            start_ms: window.0,
            duration_ms: window.1,
        },
        tx_interval: TxInterval {
            min_ms: tx_interval.0,
            max_ms: tx_interval.1,
        },
        cad_wait: CadWait {
            min_ms: cad_wait.0,
            max_ms: cad_wait.1,
        },
        channel_method,
    }
}

use ChannelMethod::{Channel0, Channel1};

/// The sentinel slot returned whenever no schedule exists
pub const NONE_SLOT: ProtocolTimeSlot = time_slot(
    0,
    0,
    Zone::Unclassified,
    DataSource::None,
    &EUROPE,
    &FLARM,
    (0, 0),
    (0, 0),
    (0, 0),
    Channel0,
);

/// The regulation table, indexed by `SlotId`
///
/// FLARM and OGN are sent/received 400..1200 ms after PPS, alternating channels
/// between the two halves, with 600..1400 ms between packets. Every protocol
/// must have an entry for `Zone::Europe`.
#[rustfmt::skip]
pub static TIMINGS: [ProtocolTimeSlot; 10] = [
    NONE_SLOT,
    // FLARM
    time_slot(1, 2, Zone::Europe, DataSource::Flarm, &EUROPE, &FLARM, (400, 400), (600, 1400), (15, 150), Channel0),
    time_slot(2, 1, Zone::Europe, DataSource::Flarm, &EUROPE, &FLARM, (800, 400), (600, 1400), (15, 150), Channel1),
    time_slot(3, 4, Zone::Israel, DataSource::Flarm, &ISRAEL, &FLARM, (400, 400), (600, 1400), (15, 150), Channel0),
    time_slot(4, 3, Zone::Israel, DataSource::Flarm, &ISRAEL, &FLARM, (800, 400), (600, 1400), (15, 150), Channel1),
    // OGN
    time_slot(5, 6, Zone::Europe, DataSource::Ogn1, &EUROPE, &OGN1, (400, 400), (600, 1400), (15, 150), Channel1),
    time_slot(6, 5, Zone::Europe, DataSource::Ogn1, &EUROPE, &OGN1, (800, 400), (600, 1400), (15, 150), Channel0),
    // ADS-L
    time_slot(7, 8, Zone::Europe, DataSource::Adsl, &EUROPE, &ADSL, (400, 400), (600, 1400), (15, 250), Channel1),
    time_slot(8, 7, Zone::Europe, DataSource::Adsl, &EUROPE, &ADSL, (800, 400), (600, 1400), (15, 250), Channel0),
    // FANET, whole second on its own frequency
    time_slot(9, 9, Zone::Europe, DataSource::Fanet, &EUROPE_FANET, &FANET, (0, 1000), (500, 1500), (0, 0), Channel0),
];

/// Look up a slot by id; unknown ids resolve to the sentinel
pub fn slot(id: SlotId) -> &'static ProtocolTimeSlot {
    TIMINGS.get(id.0 as usize).unwrap_or(&TIMINGS[0])
}

/// First slot for the given zone and protocol, `SlotId::NONE` when there is none
pub fn first_slot(zone: Zone, protocol: DataSource) -> SlotId {
    TIMINGS
        .iter()
        .find(|s| s.protocol == protocol && s.zone == zone)
        .map(|s| s.slot_id)
        .unwrap_or(SlotId::NONE)
}

/// Follow the ring from `current`, re-resolving first if the zone changed
pub fn next_slot(zone: Zone, current: SlotId) -> SlotId {
    let current_slot = slot(current);
    let resolved = if current_slot.zone != zone {
        first_slot(zone, current_slot.protocol)
    } else {
        current
    };
    slot(resolved).next_slot_id
}
