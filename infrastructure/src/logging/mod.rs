//! Logging infrastructure - structured conversation logging.
//!
//! Provides [`JsonlConversationLogger`] for conversation events and
//! [`JsonlTranscriptSink`] for transcript entries. Both append one JSON
//! object per line and flush after every record.

mod jsonl_logger;
mod jsonl_transcript;

pub use jsonl_logger::JsonlConversationLogger;
pub use jsonl_transcript::JsonlTranscriptSink;

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::Path;

/// Open `path` for appending, creating parent directories as needed.
fn open_append(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}
