//! Per-cycle grouping of classified flights by theater.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{FlightCategory, FlightClassifier};
use crate::config::ProximityConfig;
use crate::geo::Coordinate;
use crate::model::Flight;
use crate::registry::{NearbyBase, TheaterRegistry};

/// One theater's activity for one cycle. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheaterActivity {
    pub theater_id: String,
    pub timestamp: DateTime<Utc>,
    pub transport_count: u32,
    pub fighter_count: u32,
    pub recon_count: u32,
    pub total_count: u32,
    pub flight_ids: Vec<String>,
}

/// Working tally while a cycle is being aggregated.
#[derive(Debug, Clone, PartialEq)]
pub struct TheaterTally {
    pub theater_id: String,
    pub theater_name: String,
    pub theater_center: Coordinate,
    pub transport: u32,
    pub fighter: u32,
    pub recon: u32,
    pub total: u32,
    pub flight_ids: Vec<String>,
    pub aircraft_types: BTreeMap<String, u32>,
    /// Base names in first-seen order; each flight contributes its nearest first.
    pub nearby_bases: Vec<String>,
}

impl TheaterTally {
    fn record(&mut self, flight: &Flight, category: FlightCategory, nearby: &[NearbyBase<'_>], max_bases: usize) {
        match category {
            FlightCategory::Transport => self.transport += 1,
            FlightCategory::Fighter => self.fighter += 1,
            FlightCategory::Recon => self.recon += 1,
            FlightCategory::Other => {}
        }
        self.total += 1;
        self.flight_ids.push(flight.id.clone());
        *self.aircraft_types.entry(flight.type_key()).or_insert(0) += 1;
        for n in nearby.iter().take(max_bases) {
            if !self.nearby_bases.contains(&n.base.name) { self.nearby_bases.push(n.base.name.clone()); }
        }
    }

    pub fn snapshot(&self, timestamp: DateTime<Utc>) -> TheaterActivity {
        TheaterActivity {
            theater_id: self.theater_id.clone(),
            timestamp,
            transport_count: self.transport,
            fighter_count: self.fighter,
            recon_count: self.recon,
            total_count: self.total,
            flight_ids: self.flight_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleAggregate {
    /// Keyed by theater id; only theaters with at least one flight.
    pub tallies: BTreeMap<String, TheaterTally>,
    pub invalid: usize,
    pub unassigned: usize,
}

pub fn aggregate(flights: &[Flight], registry: &TheaterRegistry, classifier: &FlightClassifier, proximity: &ProximityConfig) -> CycleAggregate {
    let mut out = CycleAggregate::default();
    for flight in flights {
        let position = flight.position();
        if !position.is_valid() {
            debug!(flight = %flight.id, lat = flight.lat, lon = flight.lon, "skipping flight with invalid coordinates");
            out.invalid += 1;
            continue;
        }
        let nearby = registry.nearby_bases(position.lat, position.lon, proximity.base_radius_km);
        let Some(theater) = registry.resolve(position, &nearby, proximity.center_radius_km) else {
            out.unassigned += 1;
            continue;
        };
        let tally = out.tallies.entry(theater.id.clone()).or_insert_with(|| TheaterTally {
            theater_id: theater.id.clone(),
            theater_name: theater.name.clone(),
            theater_center: theater.center,
            transport: 0,
            fighter: 0,
            recon: 0,
            total: 0,
            flight_ids: Vec::new(),
            aircraft_types: BTreeMap::new(),
            nearby_bases: Vec::new(),
        });
        tally.record(flight, classifier.classify(flight), &nearby, proximity.bases_per_flight);
    }
    out
}

/// Append keeping at most `cap` entries, oldest dropped first.
pub fn append_capped(history: &mut VecDeque<TheaterActivity>, entry: TheaterActivity, cap: usize) {
    history.push_back(entry);
    while history.len() > cap { history.pop_front(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_airlift_callsigns;
    use crate::model::AircraftType;

    fn setup() -> (TheaterRegistry, FlightClassifier, ProximityConfig) {
        (TheaterRegistry::builtin(), FlightClassifier::new(&default_airlift_callsigns()).unwrap(), ProximityConfig::default())
    }

    #[test]
    fn groups_and_tallies_by_theater() {
        let (reg, cls, prox) = setup();
        let flights = vec![
            Flight::new("t1", "RCH101", AircraftType::Transport, 25.2, 51.4).with_model("C-17A"),
            Flight::new("t2", "RCH102", AircraftType::Unknown, 25.1, 51.2).with_model("C-17A"),
            Flight::new("k1", "SHELL1", AircraftType::Tanker, 24.3, 54.5).with_model("KC-135R"),
            Flight::new("f1", "VIPER1", AircraftType::Fighter, 25.0, 51.0),
            Flight::new("h1", "", AircraftType::Helicopter, 26.2, 50.6),
            Flight::new("i1", "", AircraftType::Awacs, 37.0, 35.4).with_model("E-3G"),
        ];
        let agg = aggregate(&flights, &reg, &cls, &prox);
        assert_eq!(agg.tallies.len(), 2);
        let gulf = &agg.tallies["persian-gulf"];
        assert_eq!((gulf.transport, gulf.fighter, gulf.recon, gulf.total), (3, 1, 0, 5));
        assert_eq!(gulf.aircraft_types["C-17A"], 2);
        assert_eq!(gulf.aircraft_types["fighter"], 1);
        assert_eq!(gulf.aircraft_types["helicopter"], 1);
        // t1 sits closest to Al Udeid, k1 next to Al Dhafra
        assert_eq!(gulf.nearby_bases[0], "Al Udeid AB");
        assert!(gulf.nearby_bases.iter().any(|b| b == "Al Dhafra AB"));
        assert_eq!(gulf.theater_center, Coordinate::new(26.5, 51.5));
        assert_eq!(gulf.flight_ids, vec!["t1", "t2", "k1", "f1", "h1"]);
        let med = &agg.tallies["eastern-med"];
        assert_eq!((med.recon, med.total), (1, 1));
    }

    #[test]
    fn drops_invalid_and_unassigned() {
        let (reg, cls, prox) = setup();
        let flights = vec![
            Flight::new("bad", "RCH1", AircraftType::Transport, f64::NAN, 51.0),
            Flight::new("oob", "RCH2", AircraftType::Transport, 25.0, 200.0),
            Flight::new("far", "RCH3", AircraftType::Transport, -60.0, -120.0),
        ];
        let agg = aggregate(&flights, &reg, &cls, &prox);
        assert!(agg.tallies.is_empty());
        assert_eq!((agg.invalid, agg.unassigned), (2, 1));
    }

    #[test]
    fn nearby_bases_limited_per_flight() {
        let (reg, cls, mut prox) = setup();
        prox.bases_per_flight = 1;
        let agg = aggregate(&[Flight::new("t", "", AircraftType::Transport, 25.2, 51.4)], &reg, &cls, &prox);
        assert_eq!(agg.tallies["persian-gulf"].nearby_bases.len(), 1);
    }

    #[test]
    fn nearby_bases_keep_first_seen_order_without_duplicates() {
        let (reg, cls, prox) = setup();
        let flights = vec![
            Flight::new("a", "", AircraftType::Transport, 24.25, 54.55),
            Flight::new("b", "", AircraftType::Transport, 25.12, 51.32),
            Flight::new("c", "", AircraftType::Transport, 24.26, 54.54),
        ];
        let agg = aggregate(&flights, &reg, &cls, &prox);
        let bases = &agg.tallies["persian-gulf"].nearby_bases;
        assert_eq!(bases[0], "Al Dhafra AB");
        assert_eq!(bases.iter().filter(|b| *b == "Al Dhafra AB").count(), 1);
        assert!(bases.iter().position(|b| b == "Al Udeid AB").unwrap() > 0);
    }

    #[test]
    fn append_caps_history() {
        let mut h = VecDeque::new();
        let now = Utc::now();
        for i in 0..5u32 {
            let entry = TheaterActivity { theater_id: "x".into(), timestamp: now, transport_count: i, fighter_count: 0, recon_count: 0, total_count: i, flight_ids: vec![] };
            append_capped(&mut h, entry, 3);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.front().unwrap().transport_count, 2);
        assert_eq!(h.back().unwrap().transport_count, 4);
    }
}
