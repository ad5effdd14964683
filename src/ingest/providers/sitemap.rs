// src/ingest/providers/sitemap.rs
//! News sitemap adapter.
//!
//! Reads `<urlset><url>` entries. Titles and dates live in the `news:`
//! extension (`news:news/news:title`, `news:news/news:publication_date`); plain
//! `lastmod` is the date fallback. Elements are matched by local name, so the
//! prefix a publisher binds to the news namespace does not matter.

use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{clean_opt, scrub_html_entities_for_xml, Transport};
use crate::ingest::error::IngestError;
use crate::ingest::recency::DateFormat;
use crate::ingest::types::{FeedAdapter, FeedBatch, NormalizedItem, RawItem, SitemapEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Loc,
    Lastmod,
    Title,
    PublicationDate,
}

fn field_for(local: &[u8], in_news: bool) -> Option<Field> {
    match (local, in_news) {
        (b"loc", false) => Some(Field::Loc),
        (b"lastmod", false) => Some(Field::Lastmod),
        (b"title", true) => Some(Field::Title),
        (b"publication_date", true) => Some(Field::PublicationDate),
        _ => None,
    }
}

/// Extract every `<url>` entry from a sitemap document.
pub fn parse_entries_from_str(s: &str) -> Result<Vec<SitemapEntry>, String> {
    let xml = scrub_html_entities_for_xml(s);
    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut current: Option<SitemapEntry> = None;
    let mut in_news = false;
    let mut field: Option<Field> = None;
    let mut saw_urlset = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"urlset" => saw_urlset = true,
                    b"url" => current = Some(SitemapEntry::default()),
                    b"news" if current.is_some() => in_news = true,
                    other if current.is_some() => field = field_for(other, in_news),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"url" => {
                    if let Some(entry) = current.take() {
                        out.push(entry);
                    }
                    in_news = false;
                    field = None;
                }
                b"news" => in_news = false,
                _ => field = None,
            },
            Ok(Event::Text(t)) => {
                if let (Some(f), Some(entry)) = (field, current.as_mut()) {
                    let text = t
                        .unescape()
                        .map_err(|e| format!("bad text at {}: {e}", reader.buffer_position()))?;
                    set_field(entry, f, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let (Some(f), Some(entry)) = (field, current.as_mut()) {
                    let bytes = c.into_inner();
                    set_field(entry, f, &String::from_utf8_lossy(&bytes));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "parsing sitemap xml at {}: {e}",
                    reader.buffer_position()
                ))
            }
        }
    }

    if !saw_urlset {
        return Err("document has no <urlset> root".to_string());
    }
    Ok(out)
}

fn set_field(entry: &mut SitemapEntry, f: Field, text: &str) {
    let slot = match f {
        Field::Loc => &mut entry.loc,
        Field::Lastmod => &mut entry.lastmod,
        Field::Title => &mut entry.news_title,
        Field::PublicationDate => &mut entry.news_publication_date,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}

/// Sitemap-only sources carry no description.
pub struct SitemapAdapter {
    name: String,
    transport: Transport,
    date_format: DateFormat,
}

impl SitemapAdapter {
    pub fn new(name: &str, transport: Transport) -> Self {
        Self {
            name: name.to_string(),
            transport,
            date_format: DateFormat::Iso8601,
        }
    }

    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self::new(name, Transport::fixture(xml))
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }
}

#[async_trait]
impl FeedAdapter for SitemapAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<FeedBatch, IngestError> {
        let body = self.transport.load(&self.name).await?;
        let t0 = std::time::Instant::now();
        let entries = parse_entries_from_str(&body).map_err(|e| IngestError::fetch(&self.name, e))?;
        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total").increment(entries.len() as u64);
        Ok(entries.into_iter().map(RawItem::Sitemap).collect())
    }

    fn normalize(&self, raw: &RawItem) -> Result<NormalizedItem, IngestError> {
        let RawItem::Sitemap(entry) = raw else {
            return Err(IngestError::Parse(format!(
                "sitemap adapter got a {} item",
                raw.kind()
            )));
        };
        let title = clean_opt(entry.news_title.as_deref())
            .ok_or_else(|| IngestError::missing_field("news:title"))?;
        let published_raw = entry
            .news_publication_date
            .as_deref()
            .or(entry.lastmod.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| IngestError::missing_field("news:publication_date"))?;
        Ok(NormalizedItem {
            title,
            description: None,
            published_raw: published_raw.to_string(),
        })
    }

    fn date_format(&self) -> &DateFormat {
        &self.date_format
    }
}
