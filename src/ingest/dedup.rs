// src/ingest/dedup.rs
//! Dedup keys and the seen set rebuilt from the structured log.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::ingest::error::IngestError;
use crate::ingest::types::NewsRecord;

/// Canonical serialization of a record's semantic fields.
///
/// Keys are emitted in sorted order and `description` is omitted when absent,
/// so two structurally equal records always produce the same key no matter how
/// the fields were ordered in the line they were read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn of(record: &NewsRecord) -> Self {
        let mut fields: BTreeMap<&str, &str> = BTreeMap::new();
        fields.insert("title", record.title.as_str());
        if let Some(d) = record.description.as_deref() {
            fields.insert("description", d);
        }
        fields.insert("date", record.published_at.as_str());
        // A map of strings always serializes.
        let canonical = serde_json::to_string(&fields).unwrap_or_default();
        Self(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex digest, used to identify records in logs without echoing titles.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut out = String::with_capacity(12);
        for b in digest.iter().take(6) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keys of every record already ingested.
#[derive(Debug, Default, Clone)]
pub struct SeenSet {
    keys: HashSet<DedupKey>,
    /// Lines of the log that could not be decoded while loading.
    malformed: usize,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the set from a JSON Lines log. A missing file yields an empty set.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no structured log yet; starting empty");
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(IngestError::SeenLoad {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        let set = Self::from_reader(BufReader::new(file)).map_err(|e| IngestError::SeenLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::info!(
            path = %path.display(),
            keys = set.len(),
            malformed = set.malformed,
            "loaded seen set"
        );
        Ok(set)
    }

    /// Undecodable lines, including a tail cut inside a UTF-8 sequence, are
    /// skipped and counted. Only I/O errors fail the load.
    pub fn from_reader<R: BufRead>(mut reader: R) -> io::Result<Self> {
        let mut set = Self::new();
        let mut buf = Vec::new();
        let mut lineno = 0usize;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            lineno += 1;
            let trimmed = buf.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_slice::<NewsRecord>(trimmed) {
                Ok(rec) => {
                    set.insert(rec.dedup_key());
                }
                Err(e) => {
                    set.malformed += 1;
                    tracing::warn!(line = lineno, error = %e, "skipping malformed log line");
                }
            }
        }
        Ok(set)
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.keys.contains(key)
    }

    /// Returns `false` if the key was already present.
    pub fn insert(&mut self, key: DedupKey) -> bool {
        self.keys.insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn malformed_lines(&self) -> usize {
        self.malformed
    }
}
