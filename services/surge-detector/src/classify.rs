use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::model::{AircraftType, Flight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightCategory { Transport, Fighter, Recon, Other }

/// Maps a flight to its surge category. Airlift callsigns win over the
/// declared type, so a C-130 flying a medevac callsign counts as transport
/// even when the feed tags it as something else.
#[derive(Debug, Clone)]
pub struct FlightClassifier {
    airlift_callsigns: RegexSet,
}

impl FlightClassifier {
    pub fn new<S: AsRef<str>>(airlift_callsigns: &[S]) -> Result<Self, ConfigError> {
        let set = RegexSetBuilder::new(airlift_callsigns.iter().map(|p| p.as_ref()))
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::CallsignPattern(e.to_string()))?;
        Ok(Self { airlift_callsigns: set })
    }

    pub fn is_airlift_callsign(&self, callsign: &str) -> bool {
        let c = callsign.trim();
        !c.is_empty() && self.airlift_callsigns.is_match(c)
    }

    pub fn classify(&self, flight: &Flight) -> FlightCategory {
        if matches!(flight.aircraft_type, AircraftType::Transport | AircraftType::Tanker) || self.is_airlift_callsign(&flight.callsign) {
            return FlightCategory::Transport;
        }
        match flight.aircraft_type {
            AircraftType::Fighter => FlightCategory::Fighter,
            AircraftType::Reconnaissance | AircraftType::Awacs => FlightCategory::Recon,
            _ => FlightCategory::Other,
        }
    }
}
