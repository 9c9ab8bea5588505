//! Theater and base catalog with proximity lookups.
//!
//! A flight resolves to a theater in two tiers: the closest base within the
//! proximity radius that some theater owns, otherwise the nearest theater
//! center within the fallback radius.

use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ProximityConfig;
use crate::geo::{distance_km, Coordinate};
use crate::model::Flight;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("io error: {0}")] Io(#[from] std::io::Error),
    #[error("yaml error: {0}")] Yaml(#[from] serde_yaml::Error),
    #[error("duplicate theater id `{0}`")] DuplicateTheater(String),
    #[error("duplicate base id `{0}`")] DuplicateBase(String),
    #[error("theater `{theater}` references unknown base `{base}`")] UnknownBase { theater: String, base: String },
    #[error("invalid coordinate for `{0}`")] InvalidCoordinate(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Base {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub location: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theater {
    pub id: String,
    pub name: String,
    #[serde(rename = "bases", default)]
    pub base_ids: Vec<String>,
    pub center: Coordinate,
}

#[derive(Debug, Clone, Copy)]
pub struct NearbyBase<'a> {
    pub base: &'a Base,
    pub distance_km: f64,
}

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    bases: Vec<Base>,
    #[serde(default)]
    theaters: Vec<Theater>,
}

#[derive(Debug, Clone)]
pub struct TheaterRegistry {
    theaters: Vec<Theater>,
    bases: Vec<Base>,
    theater_index: HashMap<String, usize>,
    base_index: HashMap<String, usize>,
    // base id -> owning theater; first theater in catalog order wins
    base_owner: HashMap<String, usize>,
}

impl TheaterRegistry {
    pub fn new(theaters: Vec<Theater>, bases: Vec<Base>) -> Result<Self, RegistryError> {
        let mut seen_bases = HashMap::new();
        for b in &bases {
            if !b.location.is_valid() { return Err(RegistryError::InvalidCoordinate(b.id.clone())); }
            if seen_bases.insert(b.id.as_str(), ()).is_some() { return Err(RegistryError::DuplicateBase(b.id.clone())); }
        }
        let mut seen_theaters = HashMap::new();
        for t in &theaters {
            if !t.center.is_valid() { return Err(RegistryError::InvalidCoordinate(t.id.clone())); }
            if seen_theaters.insert(t.id.as_str(), ()).is_some() { return Err(RegistryError::DuplicateTheater(t.id.clone())); }
            if let Some(missing) = t.base_ids.iter().find(|id| !seen_bases.contains_key(id.as_str())) {
                return Err(RegistryError::UnknownBase { theater: t.id.clone(), base: missing.clone() });
            }
        }
        Ok(Self::index(theaters, bases))
    }

    fn index(theaters: Vec<Theater>, bases: Vec<Base>) -> Self {
        let theater_index = theaters.iter().enumerate().map(|(i, t)| (t.id.clone(), i)).collect();
        let base_index = bases.iter().enumerate().map(|(i, b)| (b.id.clone(), i)).collect();
        let mut base_owner = HashMap::new();
        for (i, t) in theaters.iter().enumerate() {
            for id in &t.base_ids { base_owner.entry(id.clone()).or_insert(i); }
        }
        Self { theaters, bases, theater_index, base_index, base_owner }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let catalog: Catalog = serde_yaml::from_str(yaml)?;
        Self::new(catalog.theaters, catalog.bases)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Catalog compiled into the binary.
    pub fn builtin() -> Self {
        let bases = BUILTIN_BASES.iter()
            .map(|&(id, name, lat, lon)| Base { id: id.into(), name: name.into(), location: Coordinate::new(lat, lon) })
            .collect();
        let theaters = BUILTIN_THEATERS.iter()
            .map(|&(id, name, lat, lon, base_ids)| Theater {
                id: id.into(),
                name: name.into(),
                base_ids: base_ids.iter().map(|b| b.to_string()).collect(),
                center: Coordinate::new(lat, lon),
            })
            .collect();
        Self::index(theaters, bases)
    }

    pub fn theaters(&self) -> &[Theater] { &self.theaters }
    pub fn bases(&self) -> &[Base] { &self.bases }
    pub fn theater(&self, id: &str) -> Option<&Theater> { self.theater_index.get(id).map(|&i| &self.theaters[i]) }
    pub fn base(&self, id: &str) -> Option<&Base> { self.base_index.get(id).map(|&i| &self.bases[i]) }
    pub fn owning_theater(&self, base_id: &str) -> Option<&Theater> { self.base_owner.get(base_id).map(|&i| &self.theaters[i]) }

    /// Bases within `radius_km`, closest first.
    pub fn nearby_bases(&self, lat: f64, lon: f64, radius_km: f64) -> Vec<NearbyBase<'_>> {
        let mut out: Vec<NearbyBase<'_>> = self.bases.iter()
            .map(|base| NearbyBase { base, distance_km: distance_km(lat, lon, base.location.lat, base.location.lon) })
            .filter(|n| n.distance_km <= radius_km)
            .collect();
        out.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        out
    }

    /// Two-tier resolution given an already computed, closest-first base list.
    pub fn resolve(&self, position: Coordinate, nearby: &[NearbyBase<'_>], center_radius_km: f64) -> Option<&Theater> {
        if let Some(theater) = nearby.iter().find_map(|n| self.owning_theater(&n.base.id)) {
            return Some(theater);
        }
        self.theaters.iter()
            .map(|t| (t, position.distance_to(&t.center)))
            .filter(|(_, d)| *d <= center_radius_km)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(t, _)| t)
    }

    pub fn theater_of(&self, flight: &Flight, proximity: &ProximityConfig) -> Option<&Theater> {
        let nearby = self.nearby_bases(flight.lat, flight.lon, proximity.base_radius_km);
        self.resolve(flight.position(), &nearby, proximity.center_radius_km)
    }
}

const BUILTIN_BASES: &[(&str, &str, f64, f64)] = &[
    ("al-udeid", "Al Udeid AB", 25.117, 51.315),
    ("al-dhafra", "Al Dhafra AB", 24.248, 54.547),
    ("ali-al-salem", "Ali Al Salem AB", 29.347, 47.521),
    ("nsa-bahrain", "NSA Bahrain", 26.209, 50.609),
    ("prince-sultan", "Prince Sultan AB", 24.062, 47.580),
    ("incirlik", "Incirlik AB", 37.002, 35.426),
    ("akrotiri", "RAF Akrotiri", 34.590, 32.988),
    ("souda-bay", "NSA Souda Bay", 35.532, 24.150),
    ("amari", "Amari AB", 59.260, 24.208),
    ("siauliai", "Siauliai AB", 55.894, 23.395),
    ("lask", "Lask AB", 51.551, 19.179),
    ("mk-airbase", "Mihail Kogalniceanu AB", 44.362, 28.488),
    ("kadena", "Kadena AB", 26.356, 127.768),
    ("andersen", "Andersen AFB", 13.584, 144.930),
    ("osan", "Osan AB", 37.090, 127.030),
    ("kunsan", "Kunsan AB", 35.904, 126.616),
    ("ramstein", "Ramstein AB", 49.437, 7.600),
    ("mildenhall", "RAF Mildenhall", 52.362, 0.486),
    ("rota", "NS Rota", 36.645, -6.349),
];

const BUILTIN_THEATERS: &[(&str, &str, f64, f64, &[&str])] = &[
    ("persian-gulf", "Persian Gulf", 26.5, 51.5, &["al-udeid", "al-dhafra", "ali-al-salem", "nsa-bahrain", "prince-sultan"]),
    ("eastern-med", "Eastern Mediterranean", 35.0, 31.0, &["incirlik", "akrotiri", "souda-bay"]),
    ("baltic", "Baltic", 56.5, 22.0, &["amari", "siauliai", "lask"]),
    ("black-sea", "Black Sea", 44.0, 33.0, &["mk-airbase"]),
    ("western-pacific", "Western Pacific", 24.0, 130.0, &["kadena", "andersen"]),
    ("korean-peninsula", "Korean Peninsula", 37.5, 127.5, &["osan", "kunsan"]),
];
