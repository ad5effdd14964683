//! news-ledger binary entrypoint.
//! Runs every configured source once (or on an interval) against one pair of logs.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_ledger::ingest::config::load_config_default;
use news_ledger::ingest::scheduler::{run_with_logs, spawn_scheduler, IngestSchedulerCfg};

const ENV_INTERVAL_SECS: &str = "NEWS_LEDGER_INTERVAL_SECS";
const ENV_METRICS_ADDR: &str = "NEWS_LEDGER_METRICS_ADDR";
const ENV_LOG_JSON: &str = "NEWS_LEDGER_LOG_JSON";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(ENV_LOG_JSON).ok().is_some_and(|v| v == "1");
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

fn init_metrics() -> Result<()> {
    let Ok(raw) = std::env::var(ENV_METRICS_ADDR) else {
        return Ok(());
    };
    let addr: SocketAddr = raw
        .parse()
        .with_context(|| format!("{ENV_METRICS_ADDR}={raw} is not a socket address"))?;
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("installing prometheus exporter")?;
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}

fn interval_secs() -> Option<u64> {
    std::env::var(ENV_INTERVAL_SECS)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&s| s > 0)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();
    init_metrics()?;

    let cfg = load_config_default()?;
    let paths = cfg.output.log_paths();
    let adapters = cfg.build_adapters();
    tracing::info!(
        sources = adapters.len(),
        structured_log = %paths.structured.display(),
        text_log = %paths.text.display(),
        "configuration loaded"
    );

    match interval_secs() {
        Some(interval_secs) => {
            tracing::info!(interval_secs, "running on a schedule");
            spawn_scheduler(IngestSchedulerCfg { interval_secs }, adapters, paths)
                .await
                .context("scheduler task ended")?;
        }
        None => {
            let summary = run_with_logs(&adapters, &paths).await?;
            for (name, res) in &summary.sources {
                if let Err(e) = res {
                    tracing::warn!(source = %name, error = %e, "source failed this run");
                }
            }
        }
    }

    Ok(())
}
