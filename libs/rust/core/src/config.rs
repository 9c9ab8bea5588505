//! Layered configuration: struct defaults, then an optional file, then env.
//!
//! `AIRWATCH_CONFIG_FILE` names the file (yaml/toml/json by extension).
//! Environment keys use the `AIRWATCH__` prefix with `__` between nested
//! levels, e.g. `AIRWATCH__DETECTOR__ALERTS__TTL_MINUTES=90`.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

pub const CONFIG_FILE_ENV: &str = "AIRWATCH_CONFIG_FILE";
pub const ENV_PREFIX: &str = "AIRWATCH";

pub fn load_config<T>(service: &str) -> Result<T>
where
    T: DeserializeOwned + Serialize + Default,
{
    let defaults = config::Config::try_from(&T::default()).context("serializing config defaults")?;
    let mut builder = config::Config::builder().add_source(defaults);
    if let Ok(file) = std::env::var(CONFIG_FILE_ENV) {
        info!(service, file = %file, "layering config file");
        builder = builder.add_source(config::File::with_name(&file).required(false));
    }
    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));
    let cfg = builder.build().with_context(|| format!("building config for {service}"))?;
    cfg.try_deserialize().with_context(|| format!("deserializing config for {service}"))
}
