// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::error::IngestError;
use crate::ingest::providers::json_feed::{JsonFeedAdapter, JsonFields};
use crate::ingest::providers::rss::RssAdapter;
use crate::ingest::providers::sitemap::SitemapAdapter;
use crate::ingest::providers::Transport;
use crate::ingest::recency::DateFormat;
use crate::ingest::sink::LogPaths;
use crate::ingest::types::FeedAdapter;

pub const ENV_PATH: &str = "NEWS_LEDGER_CONFIG";
const DEFAULT_STRUCTURED_LOG: &str = "data/news.jsonl";
const DEFAULT_TEXT_LOG: &str = "data/news.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rss,
    Sitemap,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub date_format: Option<DateFormat>,
    // json sources only
    #[serde(default)]
    pub items_pointer: Option<String>,
    #[serde(default)]
    pub title_field: Option<String>,
    #[serde(default)]
    pub description_field: Option<String>,
    #[serde(default)]
    pub date_field: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_structured_log")]
    pub structured_log: PathBuf,
    #[serde(default = "default_text_log")]
    pub text_log: PathBuf,
}

fn default_structured_log() -> PathBuf {
    PathBuf::from(DEFAULT_STRUCTURED_LOG)
}

fn default_text_log() -> PathBuf {
    PathBuf::from(DEFAULT_TEXT_LOG)
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            structured_log: default_structured_log(),
            text_log: default_text_log(),
        }
    }
}

impl OutputConfig {
    pub fn log_paths(&self) -> LogPaths {
        LogPaths {
            structured: self.structured_log.clone(),
            text: self.text_log.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl LedgerConfig {
    /// Build one adapter per configured source, in file order.
    pub fn build_adapters(&self) -> Vec<Box<dyn FeedAdapter>> {
        self.sources.iter().map(SourceConfig::build_adapter).collect()
    }
}

impl SourceConfig {
    fn transport(&self) -> Transport {
        match (&self.url, &self.path) {
            (Some(url), _) => Transport::http(url),
            (None, Some(p)) => Transport::file(p.clone()),
            // rejected by validate()
            (None, None) => Transport::fixture(""),
        }
    }

    pub fn build_adapter(&self) -> Box<dyn FeedAdapter> {
        let transport = self.transport();
        let format = self.date_format.clone();
        match self.kind {
            SourceKind::Rss => {
                let mut a = RssAdapter::new(&self.name, transport);
                if let Some(f) = format {
                    a = a.with_date_format(f);
                }
                Box::new(a)
            }
            SourceKind::Sitemap => {
                let mut a = SitemapAdapter::new(&self.name, transport);
                if let Some(f) = format {
                    a = a.with_date_format(f);
                }
                Box::new(a)
            }
            SourceKind::Json => {
                let defaults = JsonFields::default();
                let fields = JsonFields {
                    items_pointer: self.items_pointer.clone().unwrap_or_default(),
                    title: self.title_field.clone().unwrap_or(defaults.title),
                    description: self.description_field.clone().or(defaults.description),
                    date: self.date_field.clone().unwrap_or(defaults.date),
                };
                let mut a = JsonFeedAdapter::new(&self.name, transport, fields);
                if let Some(f) = format {
                    a = a.with_date_format(f);
                }
                Box::new(a)
            }
        }
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<LedgerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(validate(cfg)?)
}

/// Load config using env var + fallbacks:
/// 1) $NEWS_LEDGER_CONFIG
/// 2) config/sources.toml
/// 3) config/sources.json
pub fn load_config_default() -> Result<LedgerConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Err(anyhow!(
        "no config found: set {ENV_PATH} or create config/sources.toml"
    ))
}

fn parse_config(s: &str, hint_ext: &str) -> Result<LedgerConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => {
            // Unknown extension: JSON first (it is stricter), then TOML.
            if let Ok(v) = serde_json::from_str(s) {
                return Ok(v);
            }
            toml::from_str(s).map_err(|e| anyhow!("unsupported config format: {e}"))
        }
    }
}

fn validate(mut cfg: LedgerConfig) -> Result<LedgerConfig, IngestError> {
    let mut names = BTreeSet::new();
    for src in cfg.sources.iter_mut() {
        src.name = src.name.trim().to_string();
        if src.name.is_empty() {
            return Err(IngestError::Config("source with empty name".into()));
        }
        if !names.insert(src.name.clone()) {
            return Err(IngestError::Config(format!(
                "duplicate source name `{}`",
                src.name
            )));
        }
        match (&src.url, &src.path) {
            (Some(_), Some(_)) => {
                return Err(IngestError::Config(format!(
                    "source `{}` sets both url and path",
                    src.name
                )))
            }
            (None, None) => {
                return Err(IngestError::Config(format!(
                    "source `{}` needs a url or a path",
                    src.name
                )))
            }
            _ => {}
        }
        if src.kind != SourceKind::Json
            && (src.items_pointer.is_some()
                || src.title_field.is_some()
                || src.description_field.is_some()
                || src.date_field.is_some())
        {
            tracing::warn!(source = %src.name, "json field options ignored for non-json source");
        }
    }
    Ok(cfg)
}
