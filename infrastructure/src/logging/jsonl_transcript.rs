//! JSONL transcript sink.
//!
//! Mirrors every appended transcript entry to a file, one serialized
//! [`TranscriptEntry`] per line, so a room's full history survives
//! compaction of the in-memory transcript.

use super::open_append;
use atelier_application::{TranscriptSink, TranscriptSinkError};
use atelier_domain::TranscriptEntry;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct JsonlTranscriptSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlTranscriptSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, TranscriptSinkError> {
        let path = path.as_ref();
        let writer = open_append(path)?;
        Ok(Self {
            writer: Mutex::new(writer),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every entry mirrored to `path`.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<TranscriptEntry>, TranscriptSinkError> {
        let file = File::open(path.as_ref())?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line)
                .map_err(|e| TranscriptSinkError::Serialization(e.to_string()))?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl TranscriptSink for JsonlTranscriptSink {
    fn append(&self, entry: &TranscriptEntry) -> Result<(), TranscriptSinkError> {
        let line = serde_json::to_string(entry)
            .map_err(|e| TranscriptSinkError::Serialization(e.to_string()))?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("transcript writer poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}
