// src/ingest/sink.rs
//! Output sinks: the JSON Lines log (also the seen-set seed) and the plain-text log.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::ingest::error::IngestError;
use crate::ingest::types::NewsRecord;

/// Where one record goes once it passed the filters.
pub trait RecordSink {
    /// Append a record to every output. An `Err` means the record must not be
    /// treated as ingested.
    fn append(&mut self, record: &NewsRecord) -> Result<(), IngestError>;
}

/// Human-readable block: title, description (if any), date, blank separator.
pub fn render_text(record: &NewsRecord) -> String {
    let mut out = String::with_capacity(record.title.len() + record.published_at.len() + 4);
    out.push_str(&record.title);
    out.push('\n');
    if let Some(d) = &record.description {
        out.push_str(d);
        out.push('\n');
    }
    out.push_str(&record.published_at);
    out.push_str("\n\n");
    out
}

/// One structured log line, keys in canonical order.
pub fn render_json_line(record: &NewsRecord) -> String {
    let mut line = record.dedup_key().as_str().to_string();
    line.push('\n');
    line
}

/// Paths of the two append-only logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub structured: PathBuf,
    pub text: PathBuf,
}

/// Both log files, opened once per run in append mode.
///
/// Each record goes to the text log first and to the structured log last, so a
/// line in the structured log always means the record was fully written.
/// Every rendered block is handed to the file in a single unbuffered
/// `write_all`; a failed write leaves nothing behind to be replayed later.
pub struct LogWriter<W: Write = File> {
    structured: W,
    text: W,
    paths: LogPaths,
    /// Set after a failed structured write, which may have left a partial line.
    torn: bool,
}

impl LogWriter<File> {
    pub fn open(paths: &LogPaths) -> Result<Self, IngestError> {
        let structured = open_append(&paths.structured).map_err(|e| IngestError::SinkWrite {
            sink: "structured",
            source: e,
        })?;
        let text = open_append(&paths.text).map_err(|e| IngestError::SinkWrite {
            sink: "text",
            source: e,
        })?;
        let mut writer = Self {
            structured,
            text,
            paths: paths.clone(),
            torn: false,
        };
        writer.repair_torn_tail()?;
        Ok(writer)
    }

    /// A crash mid-line leaves the log without a final newline; start on a fresh line.
    fn repair_torn_tail(&mut self) -> Result<(), IngestError> {
        let map = |e| IngestError::SinkWrite {
            sink: "structured",
            source: e,
        };
        let mut f = File::open(&self.paths.structured).map_err(map)?;
        let len = f.metadata().map_err(map)?.len();
        if len == 0 {
            return Ok(());
        }
        f.seek(SeekFrom::End(-1)).map_err(map)?;
        let mut last = [0u8; 1];
        f.read_exact(&mut last).map_err(map)?;
        if last[0] != b'\n' {
            tracing::warn!(path = %self.paths.structured.display(), "structured log ends mid-line; terminating it");
            self.structured.write_all(b"\n").map_err(map)?;
        }
        Ok(())
    }

    /// Flush and fsync both logs.
    pub fn close(mut self) -> Result<(), IngestError> {
        self.flush_all()?;
        self.structured.sync_all().map_err(|e| IngestError::SinkWrite {
            sink: "structured",
            source: e,
        })?;
        self.text.sync_all().map_err(|e| IngestError::SinkWrite {
            sink: "text",
            source: e,
        })
    }
}

impl<W: Write> LogWriter<W> {
    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    fn flush_all(&mut self) -> Result<(), IngestError> {
        self.structured
            .flush()
            .map_err(|e| IngestError::SinkWrite {
                sink: "structured",
                source: e,
            })?;
        self.text.flush().map_err(|e| IngestError::SinkWrite {
            sink: "text",
            source: e,
        })
    }
}

impl<W: Write> RecordSink for LogWriter<W> {
    fn append(&mut self, record: &NewsRecord) -> Result<(), IngestError> {
        let text = render_text(record);
        self.text
            .write_all(text.as_bytes())
            .map_err(|e| IngestError::SinkWrite {
                sink: "text",
                source: e,
            })?;

        let mut line = render_json_line(record);
        if self.torn {
            line.insert(0, '\n');
        }
        match self.structured.write_all(line.as_bytes()) {
            Ok(()) => {
                self.torn = false;
                Ok(())
            }
            Err(e) => {
                self.torn = true;
                Err(IngestError::SinkWrite {
                    sink: "structured",
                    source: e,
                })
            }
        }
    }
}

impl<W: Write> Drop for LogWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.flush_all() {
            tracing::error!(error = %e, "flushing logs on drop failed");
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// In-memory sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<NewsRecord>,
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &NewsRecord) -> Result<(), IngestError> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::dedup::SeenSet;

    fn rec(title: &str, desc: Option<&str>) -> NewsRecord {
        NewsRecord {
            title: title.into(),
            description: desc.map(Into::into),
            published_at: "Tue, 06 May 2025 14:03:00 GMT".into(),
        }
    }

    fn paths(dir: &Path) -> LogPaths {
        LogPaths {
            structured: dir.join("out/news.jsonl"),
            text: dir.join("out/news.txt"),
        }
    }

    #[test]
    fn text_block_layout() {
        assert_eq!(
            render_text(&rec("T", Some("D"))),
            "T\nD\nTue, 06 May 2025 14:03:00 GMT\n\n"
        );
        assert_eq!(render_text(&rec("T", None)), "T\nTue, 06 May 2025 14:03:00 GMT\n\n");
    }

    #[test]
    fn appends_across_writers_and_reloads_as_seen() {
        let dir = tempfile::tempdir().unwrap();
        let p = paths(dir.path());

        let mut w = LogWriter::open(&p).unwrap();
        w.append(&rec("A", Some("d"))).unwrap();
        w.close().unwrap();

        let mut w = LogWriter::open(&p).unwrap();
        w.append(&rec("B", None)).unwrap();
        drop(w);

        let jsonl = fs::read_to_string(&p.structured).unwrap();
        assert_eq!(jsonl.lines().count(), 2);
        let first: serde_json::Value = serde_json::from_str(jsonl.lines().next().unwrap()).unwrap();
        assert_eq!(first["title"], "A");
        assert_eq!(first["description"], "d");
        assert!(first["date"].is_string());

        let txt = fs::read_to_string(&p.text).unwrap();
        assert!(txt.starts_with("A\nd\n"));
        assert!(txt.contains("\n\nB\n"));

        let seen = SeenSet::load(&p.structured).unwrap();
        assert!(seen.contains(&rec("A", Some("d")).dedup_key()));
        assert!(seen.contains(&rec("B", None).dedup_key()));
    }

    /// Accepts writes except for the ones it was told to reject.
    #[derive(Default)]
    struct FailingWriter {
        data: Vec<u8>,
        rejects: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.rejects > 0 {
                self.rejects -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_structured_write_is_not_replayed() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = LogWriter {
            structured: FailingWriter {
                rejects: 1,
                ..Default::default()
            },
            text: FailingWriter::default(),
            paths: paths(dir.path()),
            torn: false,
        };

        let x = rec("X", None);
        let err = w.append(&x).unwrap_err();
        assert!(matches!(err, IngestError::SinkWrite { sink: "structured", .. }));
        // text went first and was kept
        assert!(String::from_utf8_lossy(&w.text.data).starts_with("X\n"));
        assert!(w.structured.data.is_empty());

        w.append(&rec("Y", None)).unwrap();
        w.append(&x).unwrap();
        w.flush_all().unwrap();

        let seen = SeenSet::from_reader(w.structured.data.as_slice()).unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.malformed_lines(), 0);
        let jsonl = String::from_utf8(w.structured.data.clone()).unwrap();
        assert_eq!(jsonl.matches("\"title\":\"X\"").count(), 1);
        assert!(jsonl.starts_with('\n'));
    }

    #[test]
    fn failed_text_write_skips_structured_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = LogWriter {
            structured: FailingWriter::default(),
            text: FailingWriter {
                rejects: 1,
                ..Default::default()
            },
            paths: paths(dir.path()),
            torn: false,
        };

        let err = w.append(&rec("X", None)).unwrap_err();
        assert!(matches!(err, IngestError::SinkWrite { sink: "text", .. }));
        assert!(w.structured.data.is_empty());
        w.append(&rec("Y", None)).unwrap();
        assert_eq!(String::from_utf8_lossy(&w.text.data), "Y\nTue, 06 May 2025 14:03:00 GMT\n\n");
    }

    #[test]
    fn torn_tail_is_terminated_before_appending() {
        let dir = tempfile::tempdir().unwrap();
        let p = paths(dir.path());
        fs::create_dir_all(p.structured.parent().unwrap()).unwrap();
        fs::write(&p.structured, "{\"title\":\"X\",\"date\":\"1\"}\n{\"title\":\"tor").unwrap();

        let mut w = LogWriter::open(&p).unwrap();
        w.append(&rec("C", None)).unwrap();
        w.close().unwrap();

        let seen = SeenSet::load(&p.structured).unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.malformed_lines(), 1);
    }
}
