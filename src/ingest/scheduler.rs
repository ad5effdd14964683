// src/ingest/scheduler.rs
use chrono::NaiveDate;
use metrics::counter;
use tokio::task::JoinHandle;

use crate::ingest::dedup::SeenSet;
use crate::ingest::error::IngestError;
use crate::ingest::recency::today_utc;
use crate::ingest::sink::{LogPaths, LogWriter};
use crate::ingest::types::{FeedAdapter, RunSummary};

#[derive(Clone, Copy, Debug)]
pub struct IngestSchedulerCfg {
    pub interval_secs: u64,
}

/// One complete run: load the seen set from the structured log, open both
/// logs, ingest every source, close the logs.
///
/// Only a seen set that cannot be read or logs that cannot be opened fail the
/// run; everything per-source ends up in the summary.
pub async fn run_with_logs(
    adapters: &[Box<dyn FeedAdapter>],
    paths: &LogPaths,
) -> Result<RunSummary, IngestError> {
    run_with_logs_on(adapters, paths, today_utc()).await
}

/// [`run_with_logs`] with the recency filter pinned to `today`.
pub async fn run_with_logs_on(
    adapters: &[Box<dyn FeedAdapter>],
    paths: &LogPaths,
    today: NaiveDate,
) -> Result<RunSummary, IngestError> {
    crate::ingest::ensure_metrics_described();
    counter!("ingest_runs_total").increment(1);
    let mut seen = SeenSet::load(&paths.structured)?;
    let mut writer = LogWriter::open(paths)?;
    let summary = crate::ingest::run_once(adapters, &mut seen, &mut writer, today).await;
    writer.close()?;

    let totals = summary.totals();
    tracing::info!(
        target: "ingest",
        sources = summary.sources.len(),
        failed_sources = ?summary.failed_sources(),
        written = totals.written,
        skipped = totals.skipped,
        filtered = totals.filtered,
        rejected = totals.rejected,
        failed = totals.failed,
        "ingest run finished"
    );
    Ok(summary)
}

/// Re-run the pipeline on a fixed interval. Each tick is an independent run;
/// a failed tick is logged and the next one proceeds.
pub fn spawn_scheduler(
    cfg: IngestSchedulerCfg,
    adapters: Vec<Box<dyn FeedAdapter>>,
    paths: LogPaths,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(cfg.interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Err(e) = run_with_logs(&adapters, &paths).await {
                tracing::error!(target: "ingest", error = %e, "ingest tick failed");
            }
        }
    })
}
