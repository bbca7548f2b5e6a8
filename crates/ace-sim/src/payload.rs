//! Simulated ownship position packets

use std::sync::RwLock;

use ace_regulation::DataSource;
use ace_tuner::PayloadBuilder;

/// Encodes the last known ownship position into a fixed test packet
///
/// Layout: protocol index, latitude and longitude as little-endian
/// `i32` in 1e-7 degrees. Not a real air format.
#[derive(Debug, Default)]
pub struct FixedPayloadBuilder {
    position: RwLock<Option<(f32, f32)>>,
}

impl FixedPayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder that already knows a position
    pub fn at(lat: f32, lon: f32) -> Self {
        let builder = Self::new();
        builder.set_position(lat, lon);
        builder
    }

    pub fn set_position(&self, lat: f32, lon: f32) {
        if let Ok(mut position) = self.position.write() {
            *position = Some((lat, lon));
        }
    }
}

impl PayloadBuilder for FixedPayloadBuilder {
    fn build_position(&self, protocol: DataSource) -> Option<Vec<u8>> {
        let index = protocol.index()?;
        let (lat, lon) = (*self.position.read().ok()?)?;

        let mut packet = Vec::with_capacity(9);
        packet.push(index as u8);
        packet.extend_from_slice(&((lat as f64 * 1e7) as i32).to_le_bytes());
        packet.extend_from_slice(&((lon as f64 * 1e7) as i32).to_le_bytes());
        Some(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_position_no_packet() {
        let builder = FixedPayloadBuilder::new();
        assert!(builder.build_position(DataSource::Flarm).is_none());
    }

    #[test]
    fn test_packet_layout() {
        let builder = FixedPayloadBuilder::at(51.5, -4.25);
        let packet = builder.build_position(DataSource::Ogn1).unwrap();

        assert_eq!(packet.len(), 9);
        assert_eq!(packet[0], 3);
        assert_eq!(i32::from_le_bytes(packet[1..5].try_into().unwrap()), 515_000_000);
        assert_eq!(i32::from_le_bytes(packet[5..9].try_into().unwrap()), -42_500_000);
    }

    #[test]
    fn test_sentinel_protocol_has_no_packet() {
        let builder = FixedPayloadBuilder::at(51.0, 4.0);
        assert!(builder.build_position(DataSource::None).is_none());
    }
}
