//! Detector cycles show up in the Prometheus exposition.
use surge_detector::{AircraftType, DetectorConfig, Flight, SurgeDetector, TheaterRegistry};

#[test]
fn detector_cycles_are_exported() {
    airwatch_core::init_metrics().unwrap();
    let det = SurgeDetector::new(TheaterRegistry::builtin(), DetectorConfig::default()).unwrap();
    let flights: Vec<Flight> = (0..6).map(|i| Flight::new(format!("t{i}"), "RCH1", AircraftType::Transport, 25.12, 51.32)).collect();
    assert_eq!(det.analyze(&flights).len(), 1);
    det.analyze(&[Flight::new("bad", "", AircraftType::Fighter, 91.0, 0.0)]);

    let body = airwatch_core::render_metrics().unwrap().unwrap();
    assert!(body.contains("airwatch_surge_cycles_total"), "missing cycles counter:\n{body}");
    assert!(body.contains("airwatch_surge_alerts_created_total"), "missing alerts counter");
    assert!(body.contains("airwatch_surge_flights_dropped_total"), "missing dropped counter");
    assert!(body.contains("surge_type=\"airlift\""), "missing surge_type label");
}
