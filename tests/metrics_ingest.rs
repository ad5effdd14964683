// tests/metrics_ingest.rs
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusBuilder;
use news_ledger::ingest::providers::rss::RssAdapter;
use news_ledger::ingest::scheduler::run_with_logs_on;
use news_ledger::ingest::sink::{LogPaths, MemorySink};
use news_ledger::{run_once, FeedAdapter, SeenSet};

const WIRE_XML: &str = include_str!("fixtures/wire_rss.xml");

#[tokio::test]
async fn metrics_exposed_after_ingest() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("recorder");

    let adapters: Vec<Box<dyn FeedAdapter>> = vec![
        Box::new(RssAdapter::from_fixture("wire", WIRE_XML)),
        Box::new(RssAdapter::from_fixture("broken", "not xml at all")),
    ];
    let mut seen = SeenSet::new();
    let mut sink = MemorySink::default();
    let today = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
    let _ = run_once(&adapters, &mut seen, &mut sink, today).await;

    let dir = tempfile::tempdir().unwrap();
    let paths = LogPaths {
        structured: dir.path().join("news.jsonl"),
        text: dir.path().join("news.txt"),
    };
    run_with_logs_on(&[], &paths, today).await.expect("empty run");

    // Scrape metrics text and check series presence by substring
    let out = handle.render();
    for series in [
        "ingest_runs_total",
        "ingest_events_total",
        "ingest_written_total",
        "ingest_skipped_total",
        "ingest_filtered_total",
        "ingest_parse_errors_total",
        "ingest_provider_errors_total",
        "ingest_parse_ms",
        "ingest_pipeline_last_run_ts",
    ] {
        assert!(out.contains(series), "missing {series} in:\n{out}");
    }
}
