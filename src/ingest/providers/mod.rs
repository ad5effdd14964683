// src/ingest/providers/mod.rs
pub mod json_feed;
pub mod rss;
pub mod sitemap;

use std::path::PathBuf;
use std::time::Duration;

use crate::ingest::error::IngestError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("news-ledger/", env!("CARGO_PKG_VERSION"));

/// Where an adapter reads its document from.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Document held in memory (tests, replay).
    Fixture(String),
    File(PathBuf),
    Http { url: String, client: reqwest::Client },
}

impl Transport {
    pub fn fixture(s: &str) -> Self {
        Transport::Fixture(s.to_string())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Transport::File(path.into())
    }

    pub fn http(url: &str) -> Self {
        Transport::Http {
            url: url.to_string(),
            client: default_client(),
        }
    }

    /// Read the whole document. Any failure here is a fetch error for `source_name`.
    pub async fn load(&self, source_name: &str) -> Result<String, IngestError> {
        match self {
            Transport::Fixture(s) => Ok(s.clone()),
            Transport::File(p) => tokio::fs::read_to_string(p)
                .await
                .map_err(|e| IngestError::fetch(source_name, format!("{}: {e}", p.display()))),
            Transport::Http { url, client } => {
                let resp = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| IngestError::fetch(source_name, e))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(IngestError::fetch(
                        source_name,
                        format!("{url} returned status {status}"),
                    ));
                }
                resp.text()
                    .await
                    .map_err(|e| IngestError::fetch(source_name, e))
            }
        }
    }
}

fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Some publishers leak HTML entities into XML, which quick-xml rejects.
pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

/// Normalize an optional text field; empty after cleaning counts as absent.
pub(crate) fn clean_opt(s: Option<&str>) -> Option<String> {
    s.map(crate::ingest::normalize_text).filter(|t| !t.is_empty())
}
