//! Surge detection and alert lifecycle.
//!
//! Each call to [`SurgeDetector::analyze`] is one cycle:
//! 1. lazy cleanup (at most once per cleanup interval)
//! 2. classify + aggregate flights per theater
//! 3. append snapshots to the rolling history
//! 4. baseline per theater, then airlift and fighter surge checks
//!
//! A cycle holds the state write lock from start to finish, so readers see
//! either the state before or after a cycle and never a half-updated alert.
//!
//! Airlift alerts are refreshed in place every cycle the surge persists.
//! Fighter alerts are created once and left untouched while active, so they
//! age out after the alert TTL and are raised again as new if the surge is
//! still there. Reconnaissance exists as a type but is never evaluated.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use airwatch_core::SURGE_METRICS;
use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::aggregate::{aggregate, append_capped, TheaterActivity, TheaterTally};
use crate::classify::FlightClassifier;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, DetectorConfig};
use crate::geo::Coordinate;
use crate::model::Flight;
use crate::registry::TheaterRegistry;
use crate::signal::{to_signal, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurgeType { Airlift, Fighter, Reconnaissance }

impl SurgeType {
    pub fn as_str(&self) -> &'static str {
        match self { SurgeType::Airlift => "airlift", SurgeType::Fighter => "fighter", SurgeType::Reconnaissance => "reconnaissance" }
    }

    pub fn alert_key(&self, theater_id: &str) -> String { format!("{}-{}", self.as_str(), theater_id) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgeAlert {
    /// `<surge type>-<theater id>`; unique among active alerts.
    pub id: String,
    pub theater_id: String,
    pub theater_name: String,
    pub theater_center: Coordinate,
    pub surge_type: SurgeType,
    pub current_count: u32,
    pub baseline_count: f64,
    pub surge_multiple: f64,
    pub aircraft_types: BTreeMap<String, u32>,
    /// Nearest-first per contributing flight, first-seen order, no duplicates.
    pub nearby_bases: Vec<String>,
    pub first_detected: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurgeRule {
    /// Count must reach `baseline * multiplier`.
    pub multiplier: f64,
    /// Absolute floor so tiny theaters do not alert.
    pub min_count: u32,
}

impl Default for SurgeRule {
    fn default() -> Self { Self { multiplier: 2.0, min_count: 5 } }
}

impl SurgeRule {
    /// Surge multiple when the rule fires.
    pub fn evaluate(&self, count: u32, baseline: f64) -> Option<f64> {
        let fires = count as f64 >= baseline * self.multiplier && count >= self.min_count;
        fires.then(|| count as f64 / baseline)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurgeConfig {
    pub airlift: SurgeRule,
    pub fighter: SurgeRule,
}

impl Default for SurgeConfig {
    fn default() -> Self {
        Self { airlift: SurgeRule { multiplier: 2.0, min_count: 5 }, fighter: SurgeRule { multiplier: 2.0, min_count: 4 } }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub theaters_tracked: usize,
    pub history_entries: usize,
    pub active_alerts: usize,
    pub last_cleanup: Option<DateTime<Utc>>,
    pub last_cycle: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct DetectorState {
    history: HashMap<String, VecDeque<TheaterActivity>>,
    alerts: HashMap<String, SurgeAlert>,
    last_cleanup: Option<DateTime<Utc>>,
    last_cycle: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct SurgeDetector {
    registry: Arc<TheaterRegistry>,
    classifier: Arc<FlightClassifier>,
    config: Arc<DetectorConfig>,
    clock: Arc<dyn Clock>,
    state: Arc<RwLock<DetectorState>>,
}

impl SurgeDetector {
    pub fn new(registry: TheaterRegistry, config: DetectorConfig) -> Result<Self, ConfigError> {
        Self::with_clock(registry, config, Arc::new(SystemClock))
    }

    pub fn with_clock(registry: TheaterRegistry, config: DetectorConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let classifier = FlightClassifier::new(&config.airlift_callsigns)?;
        Ok(Self {
            registry: Arc::new(registry),
            classifier: Arc::new(classifier),
            config: Arc::new(config),
            clock,
            state: Arc::new(RwLock::new(DetectorState::default())),
        })
    }

    pub fn registry(&self) -> &TheaterRegistry { &self.registry }
    pub fn config(&self) -> &DetectorConfig { &self.config }

    /// Run one cycle at the clock's current time. Returns only the alerts
    /// created by this cycle.
    pub fn analyze(&self, flights: &[Flight]) -> Vec<SurgeAlert> {
        let now = self.clock.now();
        self.analyze_at(flights, now)
    }

    #[instrument(skip(self, flights), fields(flights = flights.len()))]
    pub fn analyze_at(&self, flights: &[Flight], now: DateTime<Utc>) -> Vec<SurgeAlert> {
        let started = Instant::now();
        let cycle = aggregate(flights, &self.registry, &self.classifier, &self.config.proximity);

        let mut guard = self.state.write();
        let state = &mut *guard;
        let now = match state.last_cycle {
            Some(prev) if now < prev => {
                warn!(%now, %prev, "cycle time went backwards; using previous cycle time");
                prev
            }
            _ => now,
        };
        if self.cleanup_due(state, now) { self.cleanup(state, now); }

        let mut created = Vec::new();
        for tally in cycle.tallies.values() {
            let history = state.history.entry(tally.theater_id.clone()).or_default();
            append_capped(history, tally.snapshot(now), self.config.history.max_entries);
            let baseline = self.config.baseline.estimate(history.iter(), now);
            debug!(theater = %tally.theater_id, transport = tally.transport, fighter = tally.fighter, recon = tally.recon,
                baseline_transport = baseline.transport, baseline_fighter = baseline.fighter, samples = baseline.samples, "theater activity");

            if let Some(multiple) = self.config.surge.airlift.evaluate(tally.transport, baseline.transport) {
                let key = SurgeType::Airlift.alert_key(&tally.theater_id);
                match state.alerts.get_mut(&key) {
                    Some(existing) => {
                        existing.current_count = tally.transport;
                        existing.baseline_count = baseline.transport;
                        existing.surge_multiple = multiple;
                        existing.aircraft_types = tally.aircraft_types.clone();
                        existing.nearby_bases = tally.nearby_bases.clone();
                        existing.last_updated = now;
                        SURGE_METRICS.alerts_refreshed_total.add(1, &[KeyValue::new("surge_type", SurgeType::Airlift.as_str())]);
                    }
                    None => created.push(self.raise(&mut state.alerts, key, SurgeType::Airlift, tally, tally.transport, baseline.transport, multiple, now)),
                }
            }

            if let Some(multiple) = self.config.surge.fighter.evaluate(tally.fighter, baseline.fighter) {
                let key = SurgeType::Fighter.alert_key(&tally.theater_id);
                if !state.alerts.contains_key(&key) {
                    created.push(self.raise(&mut state.alerts, key, SurgeType::Fighter, tally, tally.fighter, baseline.fighter, multiple, now));
                }
            }
        }
        state.last_cycle = Some(now);
        drop(guard);

        SURGE_METRICS.cycles_total.add(1, &[]);
        if cycle.invalid > 0 { SURGE_METRICS.flights_dropped_total.add(cycle.invalid as u64, &[KeyValue::new("reason", "invalid_coordinates")]); }
        if cycle.unassigned > 0 { SURGE_METRICS.flights_dropped_total.add(cycle.unassigned as u64, &[KeyValue::new("reason", "no_theater")]); }
        SURGE_METRICS.cycle_latency_ms.record(started.elapsed().as_secs_f64() * 1000.0, &[]);
        debug!(theaters = cycle.tallies.len(), invalid = cycle.invalid, unassigned = cycle.unassigned, new_alerts = created.len(), "cycle complete");
        created
    }

    #[allow(clippy::too_many_arguments)]
    fn raise(&self, alerts: &mut HashMap<String, SurgeAlert>, key: String, surge_type: SurgeType, tally: &TheaterTally,
             count: u32, baseline: f64, multiple: f64, now: DateTime<Utc>) -> SurgeAlert {
        let alert = SurgeAlert {
            id: key.clone(),
            theater_id: tally.theater_id.clone(),
            theater_name: tally.theater_name.clone(),
            theater_center: tally.theater_center,
            surge_type,
            current_count: count,
            baseline_count: baseline,
            surge_multiple: multiple,
            aircraft_types: tally.aircraft_types.clone(),
            nearby_bases: tally.nearby_bases.clone(),
            first_detected: now,
            last_updated: now,
        };
        info!(alert = %key, count, baseline, multiple, "surge detected");
        SURGE_METRICS.alerts_created_total.add(1, &[KeyValue::new("surge_type", surge_type.as_str())]);
        alerts.insert(key, alert.clone());
        alert
    }

    fn cleanup_due(&self, state: &DetectorState, now: DateTime<Utc>) -> bool {
        match state.last_cleanup {
            None => true,
            Some(last) => now - last >= self.config.alerts.cleanup_interval(),
        }
    }

    fn cleanup(&self, state: &mut DetectorState, now: DateTime<Utc>) {
        let history_cutoff = now - self.config.history.max_age();
        let mut pruned = 0u64;
        for history in state.history.values_mut() {
            while history.front().is_some_and(|a| a.timestamp < history_cutoff) {
                history.pop_front();
                pruned += 1;
            }
        }
        state.history.retain(|_, h| !h.is_empty());

        let alert_cutoff = now - self.config.alerts.ttl();
        let before = state.alerts.len();
        state.alerts.retain(|key, alert| {
            let keep = alert.last_updated >= alert_cutoff;
            if !keep { debug!(alert = %key, last_updated = %alert.last_updated, "evicting stale alert"); }
            keep
        });
        let evicted = (before - state.alerts.len()) as u64;

        state.last_cleanup = Some(now);
        if pruned > 0 { SURGE_METRICS.history_pruned_total.add(pruned, &[]); }
        if evicted > 0 { SURGE_METRICS.alerts_evicted_total.add(evicted, &[]); }
        debug!(pruned, evicted, theaters = state.history.len(), "cleanup complete");
    }

    /// Every active alert, ordered by key.
    pub fn active_alerts(&self) -> Vec<SurgeAlert> {
        let state = self.state.read();
        let mut alerts: Vec<SurgeAlert> = state.alerts.values().cloned().collect();
        alerts.sort_by(|a, b| a.id.cmp(&b.id));
        alerts
    }

    pub fn alert(&self, key: &str) -> Option<SurgeAlert> { self.state.read().alerts.get(key).cloned() }

    /// Bounded activity history for one theater, oldest first.
    pub fn theater_history(&self, theater_id: &str) -> Vec<TheaterActivity> {
        self.state.read().history.get(theater_id).map(|h| h.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn active_signals(&self) -> Vec<Signal> {
        self.active_alerts().iter().map(|a| to_signal(a, &self.config.signal)).collect()
    }

    pub fn signal_for(&self, alert: &SurgeAlert) -> Signal { to_signal(alert, &self.config.signal) }

    pub fn summary(&self) -> StateSummary {
        let state = self.state.read();
        StateSummary {
            theaters_tracked: state.history.len(),
            history_entries: state.history.values().map(VecDeque::len).sum(),
            active_alerts: state.alerts.len(),
            last_cleanup: state.last_cleanup,
            last_cycle: state.last_cycle,
        }
    }
}
