// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::ingest::dedup::DedupKey;
use crate::ingest::error::IngestError;
use crate::ingest::recency::DateFormat;

/// Canonical unit persisted to both logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsRecord {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Original date-time text, in the source's own format.
    #[serde(rename = "date")]
    pub published_at: String,
}

impl NewsRecord {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::of(self)
    }
}

/// Adapter output: the semantic fields of one raw item, text already cleaned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedItem {
    pub title: String,
    pub description: Option<String>,
    pub published_raw: String,
}

impl NormalizedItem {
    pub fn into_record(self) -> NewsRecord {
        NewsRecord {
            title: self.title,
            description: self.description,
            published_at: self.published_raw,
        }
    }
}

/// `<item>` of an RSS channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RssItem {
    pub title: Option<String>,
    pub link: Option<String>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    pub description: Option<String>,
}

/// `<url>` entry of a (news) sitemap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapEntry {
    pub loc: Option<String>,
    pub lastmod: Option<String>,
    pub news_title: Option<String>,
    pub news_publication_date: Option<String>,
}

/// One source-specific item as it came off the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    Rss(RssItem),
    Sitemap(SitemapEntry),
    Json(serde_json::Value),
}

impl RawItem {
    pub fn kind(&self) -> &'static str {
        match self {
            RawItem::Rss(_) => "rss",
            RawItem::Sitemap(_) => "sitemap",
            RawItem::Json(_) => "json",
        }
    }
}

/// Items returned by one fetch against one source, in source order.
pub type FeedBatch = Vec<RawItem>;

/// Outcome counters of one `ingest` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestResult {
    pub written: usize,
    /// Duplicates of an already seen record.
    pub skipped: usize,
    /// Items not dated today (UTC).
    pub filtered: usize,
    /// Items dropped on a parse error.
    pub rejected: usize,
    /// Items whose sink write failed; left for a later run.
    pub failed: usize,
}

impl IngestResult {
    pub fn absorb(&mut self, other: &IngestResult) {
        self.written += other.written;
        self.skipped += other.skipped;
        self.filtered += other.filtered;
        self.rejected += other.rejected;
        self.failed += other.failed;
    }
}

/// Per-source outcomes of one run, in the order sources were processed.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub sources: Vec<(String, Result<IngestResult, IngestError>)>,
}

impl RunSummary {
    pub fn totals(&self) -> IngestResult {
        let mut acc = IngestResult::default();
        for (_, r) in &self.sources {
            if let Ok(r) = r {
                acc.absorb(r);
            }
        }
        acc
    }

    pub fn failed_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Source-specific fetch + normalize pair. The engine never sees transport details.
#[async_trait::async_trait]
pub trait FeedAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<FeedBatch, IngestError>;

    fn normalize(&self, raw: &RawItem) -> Result<NormalizedItem, IngestError>;

    fn date_format(&self) -> &DateFormat;
}
