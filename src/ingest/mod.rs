// src/ingest/mod.rs
pub mod config;
pub mod dedup;
pub mod error;
pub mod providers;
pub mod recency;
pub mod scheduler;
pub mod sink;
pub mod types;

use chrono::NaiveDate;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

use crate::ingest::dedup::SeenSet;
use crate::ingest::recency::{is_current, parse_date};
use crate::ingest::sink::RecordSink;
use crate::ingest::types::{FeedAdapter, FeedBatch, IngestResult, RunSummary};

/// One-time metrics registration (so series show up on the exporter).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Complete ingest runs started.");
        describe_counter!("ingest_events_total", "Raw items parsed from sources.");
        describe_counter!("ingest_written_total", "Records appended to the logs.");
        describe_counter!(
            "ingest_skipped_total",
            "Items skipped because their dedup key was already seen."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Items dropped by the same-day recency filter."
        );
        describe_counter!(
            "ingest_parse_errors_total",
            "Items dropped on missing fields or unparseable dates."
        );
        describe_counter!(
            "ingest_sink_errors_total",
            "Records whose log append failed."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Source fetch/decode errors."
        );
        describe_histogram!("ingest_parse_ms", "Feed document parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when the ingest pipeline last ran."
        );
    });
}

/// Normalize feed text: decode entities, strip tags, fold quotes and whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. NBSP)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Run one batch through normalize → recency → dedup → append.
///
/// Items are handled in batch order. A key enters `seen` only after its record
/// was appended, so a failed write is retried on a later run and a duplicate
/// later in the same run (any source) is skipped.
pub fn ingest<S: RecordSink + ?Sized>(
    adapter: &dyn FeedAdapter,
    batch: &FeedBatch,
    seen: &mut SeenSet,
    sink: &mut S,
    today: NaiveDate,
) -> IngestResult {
    ensure_metrics_described();
    let source = adapter.name();
    let mut res = IngestResult::default();

    for (idx, raw) in batch.iter().enumerate() {
        let item = match adapter.normalize(raw) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(source, index = idx, error = %e, "dropping item");
                res.rejected += 1;
                continue;
            }
        };

        match parse_date(&item.published_raw, adapter.date_format()) {
            Ok(date) if is_current(date, today) => {}
            Ok(date) => {
                tracing::debug!(source, index = idx, %date, %today, "not from today");
                res.filtered += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(source, index = idx, error = %e, "dropping item");
                res.rejected += 1;
                continue;
            }
        }

        let record = item.into_record();
        let key = record.dedup_key();
        if seen.contains(&key) {
            tracing::debug!(source, key = %key.fingerprint(), "already seen");
            res.skipped += 1;
            continue;
        }

        match sink.append(&record) {
            Ok(()) => {
                tracing::info!(source, key = %key.fingerprint(), "recorded");
                seen.insert(key);
                res.written += 1;
            }
            Err(e) => {
                tracing::error!(source, key = %key.fingerprint(), error = %e, "append failed; will retry next run");
                res.failed += 1;
            }
        }
    }

    counter!("ingest_written_total").increment(res.written as u64);
    counter!("ingest_skipped_total").increment(res.skipped as u64);
    counter!("ingest_filtered_total").increment(res.filtered as u64);
    counter!("ingest_parse_errors_total").increment(res.rejected as u64);
    counter!("ingest_sink_errors_total").increment(res.failed as u64);

    res
}

/// Fetch and ingest every source in order, sharing one seen set.
/// A failing source is logged and recorded in the summary; the others still run.
pub async fn run_once<S: RecordSink + ?Sized>(
    adapters: &[Box<dyn FeedAdapter>],
    seen: &mut SeenSet,
    sink: &mut S,
    today: NaiveDate,
) -> RunSummary {
    ensure_metrics_described();

    let mut summary = RunSummary::default();
    for a in adapters {
        let name = a.name().to_string();
        let outcome = match a.fetch().await {
            Ok(batch) => {
                let res = ingest(a.as_ref(), &batch, seen, sink, today);
                tracing::info!(
                    source = %name,
                    fetched = batch.len(),
                    written = res.written,
                    skipped = res.skipped,
                    filtered = res.filtered,
                    rejected = res.rejected,
                    failed = res.failed,
                    "source ingested"
                );
                Ok(res)
            }
            Err(e) => {
                tracing::warn!(error = %e, source = %name, "provider error");
                counter!("ingest_provider_errors_total").increment(1);
                Err(e)
            }
        };
        summary.sources.push((name, outcome));
    }

    let now = chrono::Utc::now().timestamp().max(0);
    gauge!("ingest_pipeline_last_run_ts").set(now as f64);

    summary
}
