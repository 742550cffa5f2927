//! Satellite-process configuration (§5.A "Configuration", §7.A layering):
//! built-in defaults, overridable by a TOML file, environment, and CLI flags
//! at the binary's outermost boundary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SatelliteConfig {
    pub audit_interval: Duration,
    pub checker_interval: Duration,
    pub repairer_interval: Duration,
    pub jitter: Duration,
    pub max_retries_stat_db: u32,
    pub repair_retries: u32,
    pub max_repair: usize,
    pub checker_limit: usize,
    pub metrics_addr: String,
}

impl Default for SatelliteConfig {
    fn default() -> Self {
        Self {
            audit_interval: Duration::from_secs(30 * 60),
            checker_interval: Duration::from_secs(60 * 60),
            repairer_interval: Duration::from_secs(5 * 60),
            jitter: Duration::from_secs(30),
            max_retries_stat_db: 3,
            repair_retries: 3,
            max_repair: 8,
            checker_limit: 0,
            metrics_addr: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = SatelliteConfig::default();
        let toml_text = toml::to_string(&config).unwrap();
        let parsed: SatelliteConfig = toml::from_str(&toml_text).unwrap();
        assert_eq!(parsed.max_repair, config.max_repair);
        assert_eq!(parsed.audit_interval, config.audit_interval);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: SatelliteConfig = toml::from_str("max_repair = 16\n").unwrap();
        assert_eq!(parsed.max_repair, 16);
        assert_eq!(parsed.repair_retries, SatelliteConfig::default().repair_retries);
    }
}
