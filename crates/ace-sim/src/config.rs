//! In-memory protocol configuration

use std::sync::RwLock;

use ace_regulation::DataSource;
use ace_tuner::ConfigSource;

/// Enabled protocols held in memory
#[derive(Debug, Default)]
pub struct MemoryConfig {
    protocols: RwLock<Vec<DataSource>>,
}

impl MemoryConfig {
    pub fn new(protocols: Vec<DataSource>) -> Self {
        Self {
            protocols: RwLock::new(protocols),
        }
    }

    pub fn set_protocols(&self, protocols: Vec<DataSource>) {
        if let Ok(mut current) = self.protocols.write() {
            *current = protocols;
        }
    }
}

impl ConfigSource for MemoryConfig {
    fn enabled_protocols(&self) -> Vec<DataSource> {
        self.protocols
            .read()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_protocols() {
        let config = MemoryConfig::new(vec![DataSource::Flarm]);
        assert_eq!(config.enabled_protocols(), vec![DataSource::Flarm]);

        config.set_protocols(vec![DataSource::Ogn1, DataSource::Fanet]);
        assert_eq!(
            config.enabled_protocols(),
            vec![DataSource::Ogn1, DataSource::Fanet]
        );
    }
}
