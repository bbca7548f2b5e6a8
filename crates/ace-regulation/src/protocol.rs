//! Protocol identifiers and their radio configurations

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A proximity-detection protocol that can be carried over the sub-GHz radios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum DataSource {
    /// FLARM (2024 format)
    Flarm = 0,
    /// ADS-L (SRD860 M-band)
    Adsl = 1,
    /// FANET (LoRa)
    Fanet = 2,
    /// OGN tracker protocol v1
    Ogn1 = 3,
    /// PilotAware
    Paw = 4,
    /// No protocol, used by the sentinel slot
    None = 5,
}

impl DataSource {
    /// Number of protocols that can be received over the radios (excludes `None`)
    pub const COUNT: usize = 5;

    /// All radio protocols in index order
    pub const ALL: [DataSource; DataSource::COUNT] = [
        DataSource::Flarm,
        DataSource::Adsl,
        DataSource::Fanet,
        DataSource::Ogn1,
        DataSource::Paw,
    ];

    /// Array index for per-protocol counters, `None` for the sentinel
    pub fn index(&self) -> Option<usize> {
        match self {
            DataSource::None => None,
            other => Some(*other as usize),
        }
    }

    /// Name used in diagnostics and configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Flarm => "FLARM",
            DataSource::Adsl => "ADSL",
            DataSource::Fanet => "FANET",
            DataSource::Ogn1 => "OGN1",
            DataSource::Paw => "PAW",
            DataSource::None => "NONE",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "FLARM" => Ok(DataSource::Flarm),
            "ADSL" | "ADS-L" => Ok(DataSource::Adsl),
            "FANET" => Ok(DataSource::Fanet),
            "OGN" | "OGN1" => Ok(DataSource::Ogn1),
            "PAW" => Ok(DataSource::Paw),
            "NONE" => Ok(DataSource::None),
            _ => Err(ParseError::UnknownProtocol(s.to_string())),
        }
    }
}

/// Modulation used by a protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RadioMode {
    /// Gaussian frequency shift keying
    Gfsk,
    /// LoRa chirp spread spectrum
    Lora,
}

/// Physical-layer settings the radio needs to receive or transmit a protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Modulation of the radio
    pub mode: RadioMode,
    /// Protocol carried with this configuration
    pub data_source: DataSource,
    /// Total packet length including CRC
    pub packet_length: u8,
    /// Number of significant bytes in `sync_word`
    pub sync_length: u8,
    /// Sync word; the first byte is the preamble
    pub sync_word: [u8; 8],
}

/// Frequency plan of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyPlan {
    /// Frequency of channel 0 in Hz
    pub base_frequency: u32,
    /// Spacing between channels in Hz
    pub channel_spacing: u32,
    /// Number of channels in the plan
    pub channels: u8,
    /// Maximum legal transmit power in dBm
    pub power_dbm: i8,
}

pub const EUROPE: FrequencyPlan = FrequencyPlan {
    base_frequency: 868_200_000,
    channel_spacing: 200_000,
    channels: 2,
    power_dbm: 14,
};
pub const NORTH_AMERICA: FrequencyPlan = FrequencyPlan {
    base_frequency: 902_200_000,
    channel_spacing: 400_000,
    channels: 65,
    power_dbm: 30,
};
pub const NEW_ZEALAND: FrequencyPlan = FrequencyPlan {
    base_frequency: 869_250_000,
    channel_spacing: 200_000,
    channels: 1,
    power_dbm: 10,
};
pub const AUSTRALIA: FrequencyPlan = FrequencyPlan {
    base_frequency: 917_000_000,
    channel_spacing: 400_000,
    channels: 24,
    power_dbm: 30,
};
pub const ISRAEL: FrequencyPlan = FrequencyPlan {
    base_frequency: 916_200_000,
    channel_spacing: 200_000,
    channels: 1,
    power_dbm: 22,
};
pub const SOUTH_AMERICA: FrequencyPlan = FrequencyPlan {
    base_frequency: 917_000_000,
    channel_spacing: 400_000,
    channels: 24,
    power_dbm: 30,
};
pub const EUROPE_FANET: FrequencyPlan = FrequencyPlan {
    base_frequency: 869_525_000,
    channel_spacing: 0,
    channels: 0,
    power_dbm: 14,
};

pub const FLARM: ProtocolConfig = ProtocolConfig {
    mode: RadioMode::Gfsk,
    data_source: DataSource::Flarm,
    packet_length: 24 + 2,
    sync_length: 8,
    sync_word: [0x55, 0x99, 0xA5, 0xA9, 0x55, 0x66, 0x65, 0x96],
};
/// 20 byte packet with a 6 byte CRC
pub const OGN1: ProtocolConfig = ProtocolConfig {
    mode: RadioMode::Gfsk,
    data_source: DataSource::Ogn1,
    packet_length: 20 + 6,
    sync_length: 8,
    sync_word: [0xAA, 0x66, 0x55, 0xA5, 0x96, 0x99, 0x96, 0x5A],
};
/// Sync 0x72 0x4B, Manchester encoded
pub const ADSL: ProtocolConfig = ProtocolConfig {
    mode: RadioMode::Gfsk,
    data_source: DataSource::Adsl,
    packet_length: 2 + 20 + 3,
    sync_length: 6,
    sync_word: [0x55, 0x99, 0x95, 0xA6, 0x9A, 0x65, 0xA9, 0x6A],
};
pub const PAW: ProtocolConfig = ProtocolConfig {
    mode: RadioMode::Gfsk,
    data_source: DataSource::Paw,
    packet_length: 0,
    sync_length: 8,
    sync_word: [0xB4, 0x2B, 0x00, 0x00, 0x00, 0x00, 0x18, 0x71],
};
pub const FANET: ProtocolConfig = ProtocolConfig {
    mode: RadioMode::Lora,
    data_source: DataSource::Fanet,
    packet_length: 0,
    sync_length: 1,
    sync_word: [0x00; 8],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_names_round_trip() {
        for source in DataSource::ALL {
            assert_eq!(source.as_str().parse::<DataSource>(), Ok(source));
        }
        assert_eq!("ads-l".parse::<DataSource>(), Ok(DataSource::Adsl));
        assert_eq!("ogn".parse::<DataSource>(), Ok(DataSource::Ogn1));
        assert!(matches!(
            "MODES".parse::<DataSource>(),
            Err(ParseError::UnknownProtocol(_))
        ));
    }

    #[test]
    fn test_index_excludes_sentinel() {
        assert_eq!(DataSource::Flarm.index(), Some(0));
        assert_eq!(DataSource::Paw.index(), Some(4));
        assert_eq!(DataSource::None.index(), None);
        for (i, source) in DataSource::ALL.iter().enumerate() {
            assert_eq!(source.index(), Some(i));
        }
    }

    #[test]
    fn test_protocol_configs_carry_their_source() {
        assert_eq!(FLARM.data_source, DataSource::Flarm);
        assert_eq!(OGN1.data_source, DataSource::Ogn1);
        assert_eq!(ADSL.data_source, DataSource::Adsl);
        assert_eq!(FANET.mode, RadioMode::Lora);
        assert_eq!(PAW.data_source, DataSource::Paw);
        assert_eq!(PAW.mode, RadioMode::Gfsk);
        assert_eq!(PAW.sync_length, 8);
    }

    #[test]
    fn test_regional_plans_stay_in_band() {
        let plans = [
            (&EUROPE, 863_000_000, 870_000_000),
            (&NORTH_AMERICA, 902_000_000, 928_000_000),
            (&NEW_ZEALAND, 864_000_000, 870_000_000),
            (&AUSTRALIA, 915_000_000, 928_000_000),
            (&ISRAEL, 915_000_000, 917_000_000),
            (&SOUTH_AMERICA, 915_000_000, 928_000_000),
        ];
        for (plan, low, high) in plans {
            assert!(plan.channels >= 1);
            let last = plan.base_frequency + plan.channel_spacing * (plan.channels as u32 - 1);
            assert!(plan.base_frequency >= low && last <= high, "{:?}", plan);
        }
    }
}
