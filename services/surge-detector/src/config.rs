//! Detector and service configuration. Defaults reproduce the stock
//! detection thresholds; every field can be overridden through
//! `airwatch_core::load_config`.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::baseline::BaselineConfig;
use crate::detector::SurgeConfig;
use crate::signal::SignalStyle;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid callsign pattern: {0}")] CallsignPattern(String),
    #[error("`{0}` must be positive")] NonPositive(&'static str),
    #[error("`{field}` exceeds {max}")] OutOfRange { field: &'static str, max: i64 },
    #[error("`{0}` must be finite and not below its floor")] BelowFloor(&'static str),
}

/// Upper bound on any configured time span, so window arithmetic on
/// timestamps stays in range.
pub const MAX_SPAN_HOURS: i64 = 24 * 366 * 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    pub base_radius_km: f64,
    pub center_radius_km: f64,
    pub bases_per_flight: usize,
}

impl Default for ProximityConfig {
    fn default() -> Self { Self { base_radius_km: 150.0, center_radius_km: 1500.0, bases_per_flight: 3 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
    pub max_age_hours: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self { Self { max_entries: 200, max_age_hours: 72 } }
}

impl HistoryConfig {
    pub fn max_age(&self) -> Duration { Duration::hours(self.max_age_hours) }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Alerts not updated for this long are evicted at the next cleanup.
    pub ttl_minutes: i64,
    pub cleanup_interval_minutes: i64,
}

impl Default for AlertConfig {
    fn default() -> Self { Self { ttl_minutes: 120, cleanup_interval_minutes: 60 } }
}

impl AlertConfig {
    pub fn ttl(&self) -> Duration { Duration::minutes(self.ttl_minutes) }
    pub fn cleanup_interval(&self) -> Duration { Duration::minutes(self.cleanup_interval_minutes) }
}

/// Callsign prefixes flown by military airlift, aeromedical evacuation and
/// heavy-lift operations.
pub fn default_airlift_callsigns() -> Vec<String> {
    ["^RCH", "^REACH", "^MOOSE", "^EVAC", "^DUSTOFF", "^ASCOT", "^CNV", r"^PAT\d", "^HERKY", "^SPAR"]
        .iter().map(|p| p.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub proximity: ProximityConfig,
    pub history: HistoryConfig,
    pub baseline: BaselineConfig,
    pub surge: SurgeConfig,
    pub alerts: AlertConfig,
    pub airlift_callsigns: Vec<String>,
    pub signal: SignalStyle,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            proximity: ProximityConfig::default(),
            history: HistoryConfig::default(),
            baseline: BaselineConfig::default(),
            surge: SurgeConfig::default(),
            alerts: AlertConfig::default(),
            airlift_callsigns: default_airlift_callsigns(),
            signal: SignalStyle::default(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive_f = [
            ("proximity.base_radius_km", self.proximity.base_radius_km),
            ("proximity.center_radius_km", self.proximity.center_radius_km),
            ("baseline.floors.transport", self.baseline.floors.transport),
            ("baseline.floors.fighter", self.baseline.floors.fighter),
            ("baseline.floors.recon", self.baseline.floors.recon),
            ("surge.airlift.multiplier", self.surge.airlift.multiplier),
            ("surge.fighter.multiplier", self.surge.fighter.multiplier),
        ];
        if let Some((field, _)) = positive_f.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(ConfigError::NonPositive(*field));
        }
        let positive_i = [
            ("history.max_entries", self.history.max_entries as i64),
            ("history.max_age_hours", self.history.max_age_hours),
            ("baseline.window_hours", self.baseline.window_hours),
            ("alerts.ttl_minutes", self.alerts.ttl_minutes),
            ("alerts.cleanup_interval_minutes", self.alerts.cleanup_interval_minutes),
        ];
        if let Some((field, _)) = positive_i.iter().find(|(_, v)| *v <= 0) {
            return Err(ConfigError::NonPositive(*field));
        }
        let spans = [
            ("history.max_age_hours", self.history.max_age_hours, MAX_SPAN_HOURS),
            ("baseline.window_hours", self.baseline.window_hours, MAX_SPAN_HOURS),
            ("alerts.ttl_minutes", self.alerts.ttl_minutes, MAX_SPAN_HOURS * 60),
            ("alerts.cleanup_interval_minutes", self.alerts.cleanup_interval_minutes, MAX_SPAN_HOURS * 60),
        ];
        if let Some((field, _, max)) = spans.iter().find(|(_, v, max)| v > max) {
            return Err(ConfigError::OutOfRange { field: *field, max: *max });
        }
        let (d, f) = (&self.baseline.defaults, &self.baseline.floors);
        let defaults = [
            ("baseline.defaults.transport", d.transport, f.transport),
            ("baseline.defaults.fighter", d.fighter, f.fighter),
            ("baseline.defaults.recon", d.recon, f.recon),
        ];
        if let Some((field, _, _)) = defaults.iter().find(|(_, v, floor)| !(v.is_finite() && v >= floor)) {
            return Err(ConfigError::BelowFloor(*field));
        }
        Ok(())
    }
}

/// Top-level configuration of the `surge-detector` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub service_name: String,
    pub http_port: u16,
    /// YAML theater catalog; the builtin catalog is used when unset.
    pub registry_path: Option<String>,
    pub detector: DetectorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { service_name: "surge-detector".into(), http_port: 9095, registry_path: None, detector: DetectorConfig::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = DetectorConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.history.max_entries, 200);
        assert_eq!(cfg.history.max_age(), Duration::hours(72));
        assert_eq!(cfg.alerts.ttl(), Duration::hours(2));
        assert_eq!(cfg.alerts.cleanup_interval(), Duration::hours(1));
    }

    #[test]
    fn rejects_zero_floor_and_window() {
        let mut cfg = DetectorConfig::default();
        cfg.baseline.floors.fighter = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::NonPositive("baseline.floors.fighter"))));
        let mut cfg = DetectorConfig::default();
        cfg.alerts.ttl_minutes = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::NonPositive("alerts.ttl_minutes"))));
    }

    #[test]
    fn rejects_cold_start_default_below_floor() {
        let mut cfg = DetectorConfig::default();
        cfg.baseline.defaults.transport = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::BelowFloor("baseline.defaults.transport"))));
        let mut cfg = DetectorConfig::default();
        cfg.baseline.defaults.recon = f64::NAN;
        assert!(matches!(cfg.validate(), Err(ConfigError::BelowFloor("baseline.defaults.recon"))));
        let mut cfg = DetectorConfig::default();
        cfg.baseline.defaults.fighter = cfg.baseline.floors.fighter;
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_oversized_spans() {
        let mut cfg = DetectorConfig::default();
        cfg.alerts.ttl_minutes = i64::MAX / 2;
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { field: "alerts.ttl_minutes", .. })));
        let mut cfg = DetectorConfig::default();
        cfg.history.max_age_hours = MAX_SPAN_HOURS + 1;
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { field: "history.max_age_hours", .. })));
        let mut cfg = DetectorConfig::default();
        cfg.baseline.window_hours = MAX_SPAN_HOURS;
        cfg.alerts.cleanup_interval_minutes = MAX_SPAN_HOURS * 60;
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: ServiceConfig = serde_yaml::from_str("http_port: 8088\ndetector:\n  surge:\n    airlift:\n      min_count: 8\n").unwrap();
        assert_eq!(cfg.http_port, 8088);
        assert_eq!(cfg.detector.surge.airlift.min_count, 8);
        assert_eq!(cfg.detector.surge.airlift.multiplier, 2.0);
        assert_eq!(cfg.detector.surge.fighter.min_count, 4);
        assert_eq!(cfg.detector.airlift_callsigns, default_airlift_callsigns());
    }
}
