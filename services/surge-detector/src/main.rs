use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

use airwatch_core::{init_metrics, init_tracing, load_config, mark_ready, serve};
use surge_detector::{http, parse_batch, ServiceConfig, SurgeDetector, TheaterRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("surge-detector")?;
    init_metrics()?;

    let cfg: ServiceConfig = load_config("surge-detector")?;
    info!(service = %cfg.service_name, port = cfg.http_port, registry = ?cfg.registry_path, "config loaded");

    let registry = match &cfg.registry_path {
        Some(path) => TheaterRegistry::from_yaml_file(path).with_context(|| format!("loading theater catalog {path}"))?,
        None => TheaterRegistry::builtin(),
    };
    info!(theaters = registry.theaters().len(), bases = registry.bases().len(), "theater catalog loaded");

    let detector = SurgeDetector::new(registry, cfg.detector.clone()).context("invalid detector config")?;
    serve(http::router(detector.clone()), cfg.http_port).await?;
    mark_ready();
    info!("service ready; reading flight batches from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() { continue; }
                let flights = match parse_batch(&line) {
                    Ok(f) => f,
                    Err(e) => { warn!(error = %e, "skipping malformed flight batch"); continue; }
                };
                for alert in detector.analyze(&flights) {
                    info!(alert = %alert.id, multiple = alert.surge_multiple, count = alert.current_count, "new surge alert");
                    let mut out = serde_json::to_vec(&detector.signal_for(&alert))?;
                    out.push(b'\n');
                    stdout.write_all(&out).await?;
                }
                stdout.flush().await?;
            }
            _ = signal::ctrl_c() => {
                info!("shutdown");
                return Ok(());
            }
        }
    }

    info!("input closed; serving state until interrupted");
    signal::ctrl_c().await?;
    info!("shutdown");
    Ok(())
}
