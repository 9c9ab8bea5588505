//! Military airlift and fighter surge detection over live flight snapshots.

pub mod aggregate;
pub mod baseline;
pub mod classify;
pub mod clock;
pub mod config;
pub mod detector;
pub mod geo;
pub mod http;
pub mod model;
pub mod registry;
pub mod signal;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DetectorConfig, ServiceConfig};
pub use detector::{StateSummary, SurgeAlert, SurgeConfig, SurgeDetector, SurgeRule, SurgeType};
pub use model::{parse_batch, AircraftType, Flight};
pub use registry::{RegistryError, TheaterRegistry};
pub use signal::{to_signal, Severity, Signal};
