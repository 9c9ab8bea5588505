//! Converts surge alerts into generic, display-ready signal records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detector::{SurgeAlert, SurgeType};

pub const SIGNAL_TYPE: &str = "military_surge";
pub const SIGNAL_CATEGORY: &str = "military";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity { Medium, High, Critical }

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self { Severity::Medium => "medium", Severity::High => "high", Severity::Critical => "critical" }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgeLabel {
    pub icon: String,
    pub title: String,
    /// Noun used for the counted flights in descriptions.
    pub noun: String,
}

impl SurgeLabel {
    fn new(icon: &str, title: &str, noun: &str) -> Self { Self { icon: icon.into(), title: title.into(), noun: noun.into() } }
}

/// Presentation parameters: severity tiers, confidence curve and labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalStyle {
    pub critical_multiple: f64,
    pub high_multiple: f64,
    pub confidence_base: f64,
    pub confidence_pivot: f64,
    pub confidence_step: f64,
    pub confidence_cap: f64,
    pub max_aircraft_types: usize,
    pub max_bases: usize,
    pub airlift: SurgeLabel,
    pub fighter: SurgeLabel,
    pub reconnaissance: SurgeLabel,
}

impl Default for SignalStyle {
    fn default() -> Self {
        Self {
            critical_multiple: 4.0,
            high_multiple: 3.0,
            confidence_base: 0.6,
            confidence_pivot: 2.0,
            confidence_step: 0.1,
            confidence_cap: 0.95,
            max_aircraft_types: 3,
            max_bases: 3,
            airlift: SurgeLabel::new("✈️", "Military airlift surge", "transport"),
            fighter: SurgeLabel::new("⚔️", "Fighter surge", "fighter"),
            reconnaissance: SurgeLabel::new("📡", "Reconnaissance surge", "reconnaissance"),
        }
    }
}

impl SignalStyle {
    pub fn label(&self, t: SurgeType) -> &SurgeLabel {
        match t { SurgeType::Airlift => &self.airlift, SurgeType::Fighter => &self.fighter, SurgeType::Reconnaissance => &self.reconnaissance }
    }

    pub fn severity(&self, multiple: f64) -> Severity {
        if multiple >= self.critical_multiple { Severity::Critical } else if multiple >= self.high_multiple { Severity::High } else { Severity::Medium }
    }

    /// Monotonic in the surge multiple, capped, always within 0..=1.
    pub fn confidence(&self, multiple: f64) -> f64 {
        (self.confidence_base + (multiple - self.confidence_pivot) * self.confidence_step)
            .min(self.confidence_cap)
            .clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalLocation {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetadata {
    pub theater_id: String,
    pub surge_type: SurgeType,
    pub current_count: u32,
    pub baseline_count: f64,
    pub surge_multiple: f64,
    pub aircraft_types: BTreeMap<String, u32>,
    pub nearby_bases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    #[serde(rename = "type")]
    pub signal_type: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: f64,
    pub category: String,
    pub timestamp: DateTime<Utc>,
    pub location: SignalLocation,
    pub metadata: SignalMetadata,
}

/// Aircraft types by descending count, ties broken by name.
pub fn top_aircraft_types(types: &BTreeMap<String, u32>, n: usize) -> Vec<(&str, u32)> {
    let mut v: Vec<(&str, u32)> = types.iter().map(|(k, &c)| (k.as_str(), c)).collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    v.truncate(n);
    v
}

pub fn to_signal(alert: &SurgeAlert, style: &SignalStyle) -> Signal {
    let label = style.label(alert.surge_type);
    let mut description = format!(
        "{} {} flights in {} vs baseline {:.1} ({:.1}x normal).",
        alert.current_count, label.noun, alert.theater_name, alert.baseline_count, alert.surge_multiple,
    );
    let types = top_aircraft_types(&alert.aircraft_types, style.max_aircraft_types);
    if !types.is_empty() {
        let list: Vec<String> = types.iter().map(|(name, count)| format!("{name} ({count})")).collect();
        description.push_str(&format!(" Aircraft: {}.", list.join(", ")));
    }
    if !alert.nearby_bases.is_empty() {
        let bases: Vec<&str> = alert.nearby_bases.iter().take(style.max_bases).map(String::as_str).collect();
        description.push_str(&format!(" Near: {}.", bases.join(", ")));
    }

    Signal {
        id: format!("surge-{}-{}", alert.id, alert.first_detected.timestamp_millis()),
        signal_type: SIGNAL_TYPE.into(),
        title: format!("{} {}: {}", label.icon, label.title, alert.theater_name),
        description,
        severity: style.severity(alert.surge_multiple),
        confidence: style.confidence(alert.surge_multiple),
        category: SIGNAL_CATEGORY.into(),
        timestamp: alert.last_updated,
        location: SignalLocation { lat: alert.theater_center.lat, lon: alert.theater_center.lon, name: alert.theater_name.clone() },
        metadata: SignalMetadata {
            theater_id: alert.theater_id.clone(),
            surge_type: alert.surge_type,
            current_count: alert.current_count,
            baseline_count: alert.baseline_count,
            surge_multiple: alert.surge_multiple,
            aircraft_types: alert.aircraft_types.clone(),
            nearby_bases: alert.nearby_bases.clone(),
        },
    }
}
