//! Surge detection metrics and the Prometheus exporter behind `/metrics`.
//!
//! `init_metrics` must run before `SURGE_METRICS` is first touched; instruments
//! created earlier bind to the global no-op provider.

use anyhow::Result;
use once_cell::sync::{Lazy, OnceCell};
use opentelemetry::metrics::{Counter, Histogram, Meter, Unit};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};

static PROM_REGISTRY: OnceCell<Registry> = OnceCell::new();

/// Install a Prometheus-backed meter provider as the global provider. Idempotent.
pub fn init_metrics() -> Result<()> {
    PROM_REGISTRY.get_or_try_init(|| -> Result<Registry> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter().with_registry(registry.clone()).build()?;
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        opentelemetry::global::set_meter_provider(provider);
        Ok(registry)
    })?;
    Ok(())
}

/// Text exposition of every collected series; `None` until `init_metrics` ran.
pub fn render_metrics() -> Option<Result<String>> {
    let registry = PROM_REGISTRY.get()?;
    let mut buf = Vec::new();
    Some(
        TextEncoder::new()
            .encode(&registry.gather(), &mut buf)
            .map_err(anyhow::Error::from)
            .and_then(|_| String::from_utf8(buf).map_err(anyhow::Error::from)),
    )
}

#[derive(Clone, Debug)]
pub struct SurgeMetrics {
    pub cycles_total: Counter<u64>,
    pub flights_dropped_total: Counter<u64>,
    pub alerts_created_total: Counter<u64>,
    pub alerts_refreshed_total: Counter<u64>,
    pub alerts_evicted_total: Counter<u64>,
    pub history_pruned_total: Counter<u64>,
    pub cycle_latency_ms: Histogram<f64>,
}

static SURGE_METER: Lazy<Meter> = Lazy::new(|| opentelemetry::global::meter("airwatch_surge"));

pub static SURGE_METRICS: Lazy<SurgeMetrics> = Lazy::new(|| {
    SurgeMetrics {
        cycles_total: SURGE_METER.u64_counter("airwatch_surge_cycles_total").with_description("Analysis cycles executed").init(),
        flights_dropped_total: SURGE_METER.u64_counter("airwatch_surge_flights_dropped_total").with_description("Flights excluded from aggregation, by reason").init(),
        alerts_created_total: SURGE_METER.u64_counter("airwatch_surge_alerts_created_total").with_description("Surge alerts created, by surge type").init(),
        alerts_refreshed_total: SURGE_METER.u64_counter("airwatch_surge_alerts_refreshed_total").with_description("Existing surge alerts refreshed in place").init(),
        alerts_evicted_total: SURGE_METER.u64_counter("airwatch_surge_alerts_evicted_total").with_description("Surge alerts evicted after inactivity").init(),
        history_pruned_total: SURGE_METER.u64_counter("airwatch_surge_history_pruned_total").with_description("Activity snapshots pruned by age").init(),
        cycle_latency_ms: SURGE_METER.f64_histogram("airwatch_surge_cycle_latency_ms").with_description("Analysis cycle latency (ms)").with_unit(Unit::new("ms")).init(),
    }
});
