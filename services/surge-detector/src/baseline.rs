//! Expected ("normal") activity per theater from the trailing history window.
//!
//! With too few samples the estimator falls back to fixed defaults so a
//! freshly started process does not alert on sparse data. Otherwise the
//! per-category mean is used, floored so that near-empty theaters do not
//! turn two aircraft into a surge.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::TheaterActivity;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryLevels {
    pub transport: f64,
    pub fighter: f64,
    pub recon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub transport: f64,
    pub fighter: f64,
    pub recon: f64,
    /// History entries inside the window.
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    pub window_hours: i64,
    pub min_samples: usize,
    pub defaults: CategoryLevels,
    pub floors: CategoryLevels,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            window_hours: 48,
            min_samples: 6,
            defaults: CategoryLevels { transport: 3.0, fighter: 2.0, recon: 1.0 },
            floors: CategoryLevels { transport: 2.0, fighter: 1.0, recon: 1.0 },
        }
    }
}

impl BaselineConfig {
    pub fn window(&self) -> Duration { Duration::hours(self.window_hours) }

    pub fn estimate<'a, I>(&self, history: I, now: DateTime<Utc>) -> Baseline
    where
        I: IntoIterator<Item = &'a TheaterActivity>,
    {
        let cutoff = now - self.window();
        let (mut n, mut transport, mut fighter, mut recon) = (0usize, 0u64, 0u64, 0u64);
        for a in history.into_iter().filter(|a| a.timestamp >= cutoff) {
            n += 1;
            transport += a.transport_count as u64;
            fighter += a.fighter_count as u64;
            recon += a.recon_count as u64;
        }
        if n < self.min_samples {
            let d = self.defaults;
            return Baseline { transport: d.transport, fighter: d.fighter, recon: d.recon, samples: n };
        }
        let mean = |sum: u64| sum as f64 / n as f64;
        Baseline {
            transport: mean(transport).max(self.floors.transport),
            fighter: mean(fighter).max(self.floors.fighter),
            recon: mean(recon).max(self.floors.recon),
            samples: n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(at: DateTime<Utc>, transport: u32, fighter: u32, recon: u32) -> TheaterActivity {
        TheaterActivity { theater_id: "t".into(), timestamp: at, transport_count: transport, fighter_count: fighter, recon_count: recon, total_count: transport + fighter + recon, flight_ids: vec![] }
    }

    #[test]
    fn cold_start_uses_defaults() {
        let cfg = BaselineConfig::default();
        let now = Utc::now();
        let history: Vec<_> = (0..5).map(|i| entry(now - Duration::hours(i), 40, 40, 40)).collect();
        let b = cfg.estimate(&history, now);
        assert_eq!((b.transport, b.fighter, b.recon, b.samples), (3.0, 2.0, 1.0, 5));
        let empty: Vec<TheaterActivity> = vec![];
        assert_eq!(cfg.estimate(&empty, now).transport, 3.0);
    }

    #[test]
    fn mean_over_window() {
        let cfg = BaselineConfig::default();
        let now = Utc::now();
        let history: Vec<_> = [2, 2, 2, 3, 3, 6].iter().enumerate()
            .map(|(i, &t)| entry(now - Duration::hours(6 - i as i64), t, 4, 3))
            .collect();
        let b = cfg.estimate(&history, now);
        assert_eq!(b.samples, 6);
        assert!((b.transport - 3.0).abs() < 1e-12);
        assert!((b.fighter - 4.0).abs() < 1e-12);
        assert!((b.recon - 3.0).abs() < 1e-12);
    }

    #[test]
    fn floors_apply_to_quiet_theaters() {
        let cfg = BaselineConfig::default();
        let now = Utc::now();
        let history: Vec<_> = (0..10).map(|i| entry(now - Duration::hours(i), 0, 0, 0)).collect();
        let b = cfg.estimate(&history, now);
        assert_eq!((b.transport, b.fighter, b.recon), (2.0, 1.0, 1.0));
    }

    #[test]
    fn entries_outside_window_do_not_count() {
        let cfg = BaselineConfig::default();
        let now = Utc::now();
        let mut history: Vec<_> = (0..6).map(|i| entry(now - Duration::hours(49 + i), 10, 10, 10)).collect();
        history.push(entry(now, 10, 10, 10));
        let b = cfg.estimate(&history, now);
        assert_eq!(b.samples, 1);
        assert_eq!(b.transport, 3.0);
        // exactly on the boundary is inside
        let edge = vec![entry(now - Duration::hours(48), 1, 1, 1); 6];
        assert_eq!(cfg.estimate(&edge, now).samples, 6);
    }
}
