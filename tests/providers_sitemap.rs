// tests/providers_sitemap.rs
use chrono::NaiveDate;
use news_ledger::ingest::providers::sitemap::SitemapAdapter;
use news_ledger::ingest::sink::MemorySink;
use news_ledger::{ingest, FeedAdapter, SeenSet};

const SITEMAP_XML: &str = include_str!("fixtures/news_sitemap.xml");

#[tokio::test]
async fn news_sitemap_yields_titles_without_description() {
    let provider = SitemapAdapter::from_fixture("daily", SITEMAP_XML);
    let batch = provider.fetch().await.expect("sitemap parse ok");
    assert_eq!(batch.len(), 3);

    let first = provider.normalize(&batch[0]).unwrap();
    assert_eq!(first.title, "Transit strike enters second day");
    assert_eq!(first.description, None);
    assert_eq!(first.published_raw, "2025-05-06T07:30:00+02:00");
}

#[tokio::test]
async fn entries_are_judged_by_utc_date() {
    let provider = SitemapAdapter::from_fixture("daily", SITEMAP_XML);
    let batch = provider.fetch().await.unwrap();
    let mut seen = SeenSet::new();
    let mut sink = MemorySink::default();
    let today = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();

    let res = ingest(&provider, &batch, &mut seen, &mut sink, today);
    assert_eq!(res.written, 1);
    assert_eq!(res.filtered, 1, "01:30+02:00 is still May 5 in UTC");
    assert_eq!(res.rejected, 1, "plain <url> without news:title");
}
