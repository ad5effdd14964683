// src/ingest/error.rs
//! Error taxonomy for the ingest pipeline.
//!
//! Item-level (`Parse`, `SinkWrite`) and source-level (`Fetch`) errors are
//! contained by the engine and only reported. `SeenLoad` and `Config` abort a run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Network/transport failure or an undecodable feed document.
    #[error("fetch failed for {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    /// Malformed date or missing required field in a raw item.
    #[error("parse error: {0}")]
    Parse(String),

    /// Appending to one of the log sinks failed.
    #[error("write to {sink} log failed: {source}")]
    SinkWrite {
        sink: &'static str,
        #[source]
        source: io::Error,
    },

    /// The structured log exists but cannot be read.
    #[error("cannot load seen set from {}: {source}", path.display())]
    SeenLoad {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid source or output configuration (empty or duplicate names,
    /// neither or both of `url` and `path`).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl IngestError {
    pub fn fetch(source_name: &str, message: impl ToString) -> Self {
        Self::Fetch {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }

    pub fn missing_field(field: &str) -> Self {
        Self::Parse(format!("missing required field `{field}`"))
    }
}
