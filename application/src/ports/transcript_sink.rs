//! Persistence collaborator for long-lived rooms.
//!
//! The orchestrator keeps its transcript in memory. A [`TranscriptSink`]
//! mirrors every appended entry to durable storage owned by the caller.

use atelier_domain::TranscriptEntry;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptSinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Append-only mirror of a transcript.
pub trait TranscriptSink: Send + Sync {
    fn append(&self, entry: &TranscriptEntry) -> Result<(), TranscriptSinkError>;
}

/// Sink that discards everything.
pub struct NoTranscriptSink;

impl TranscriptSink for NoTranscriptSink {
    fn append(&self, _entry: &TranscriptEntry) -> Result<(), TranscriptSinkError> {
        Ok(())
    }
}
