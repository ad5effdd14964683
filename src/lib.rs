// src/lib.rs
//! Deduplicating news ingestion.
//!
//! Feed adapters turn RSS channels, news sitemaps and JSON lists into
//! normalized items; the engine keeps same-day items whose dedup key is new
//! and appends them to a JSON Lines log and a plain-text log. The JSON Lines
//! log doubles as the seen set for the next run.

pub mod ingest;

pub use crate::ingest::dedup::{DedupKey, SeenSet};
pub use crate::ingest::error::IngestError;
pub use crate::ingest::sink::{LogPaths, LogWriter, RecordSink};
pub use crate::ingest::types::{
    FeedAdapter, FeedBatch, IngestResult, NewsRecord, NormalizedItem, RawItem, RunSummary,
};
pub use crate::ingest::{ingest, run_once};
