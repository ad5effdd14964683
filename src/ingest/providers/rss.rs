// src/ingest/providers/rss.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use super::{clean_opt, scrub_html_entities_for_xml, Transport};
use crate::ingest::error::IngestError;
use crate::ingest::recency::DateFormat;
use crate::ingest::types::{FeedAdapter, FeedBatch, NormalizedItem, RawItem, RssItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

/// RSS 2.0 channel adapter. Title, description and `pubDate` per `<item>`.
pub struct RssAdapter {
    name: String,
    transport: Transport,
    date_format: DateFormat,
}

impl RssAdapter {
    pub fn new(name: &str, transport: Transport) -> Self {
        Self {
            name: name.to_string(),
            transport,
            date_format: DateFormat::Rfc2822,
        }
    }

    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self::new(name, Transport::fixture(xml))
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    pub fn parse_items_from_str(s: &str) -> Result<Vec<RssItem>, String> {
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).map_err(|e| format!("parsing rss xml: {e}"))?;
        Ok(rss.channel.item)
    }
}

#[async_trait]
impl FeedAdapter for RssAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<FeedBatch, IngestError> {
        let body = self.transport.load(&self.name).await?;
        let t0 = std::time::Instant::now();
        let items = Self::parse_items_from_str(&body)
            .map_err(|e| IngestError::fetch(&self.name, e))?;
        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total").increment(items.len() as u64);
        Ok(items.into_iter().map(RawItem::Rss).collect())
    }

    fn normalize(&self, raw: &RawItem) -> Result<NormalizedItem, IngestError> {
        let RawItem::Rss(it) = raw else {
            return Err(IngestError::Parse(format!(
                "rss adapter got a {} item",
                raw.kind()
            )));
        };
        let title = clean_opt(it.title.as_deref()).ok_or_else(|| IngestError::missing_field("title"))?;
        let published_raw = it
            .pub_date
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| IngestError::missing_field("pubDate"))?;
        Ok(NormalizedItem {
            title,
            description: clean_opt(it.description.as_deref()),
            published_raw: published_raw.to_string(),
        })
    }

    fn date_format(&self) -> &DateFormat {
        &self.date_format
    }
}
