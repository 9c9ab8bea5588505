//! Flight records as delivered by the position feed.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AircraftType {
    Fighter,
    Bomber,
    Transport,
    Tanker,
    Awacs,
    Reconnaissance,
    Helicopter,
    Drone,
    Patrol,
    SpecialOps,
    Vip,
    #[default]
    #[serde(other)]
    Unknown,
}

impl AircraftType {
    pub fn label(&self) -> &'static str {
        match self {
            AircraftType::Fighter => "fighter",
            AircraftType::Bomber => "bomber",
            AircraftType::Transport => "transport",
            AircraftType::Tanker => "tanker",
            AircraftType::Awacs => "awacs",
            AircraftType::Reconnaissance => "reconnaissance",
            AircraftType::Helicopter => "helicopter",
            AircraftType::Drone => "drone",
            AircraftType::Patrol => "patrol",
            AircraftType::SpecialOps => "special_ops",
            AircraftType::Vip => "vip",
            AircraftType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub id: String,
    #[serde(default)]
    pub callsign: String,
    #[serde(default, alias = "aircraftType")]
    pub aircraft_type: AircraftType,
    #[serde(default, alias = "aircraftModel")]
    pub aircraft_model: Option<String>,
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lon: f64,
}

impl Flight {
    pub fn new(id: impl Into<String>, callsign: impl Into<String>, aircraft_type: AircraftType, lat: f64, lon: f64) -> Self {
        Self { id: id.into(), callsign: callsign.into(), aircraft_type, aircraft_model: None, lat, lon }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.aircraft_model = Some(model.into());
        self
    }

    pub fn position(&self) -> Coordinate { Coordinate::new(self.lat, self.lon) }

    /// Histogram key: model, else declared type.
    pub fn type_key(&self) -> String {
        match self.aircraft_model.as_deref().map(str::trim) {
            Some(model) if !model.is_empty() => model.to_string(),
            _ => self.aircraft_type.label().to_string(),
        }
    }
}

/// One line of feed input: a bare array or `{"flights": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlightBatch {
    Bare(Vec<Flight>),
    Wrapped { flights: Vec<Flight> },
}

pub fn parse_batch(line: &str) -> Result<Vec<Flight>, serde_json::Error> {
    Ok(match serde_json::from_str::<FlightBatch>(line)? {
        FlightBatch::Bare(flights) | FlightBatch::Wrapped { flights } => flights,
    })
}
