//! Transcript domain
//!
//! The append-only conversation log, its logical revisions and the
//! per-agent views computed from it.

pub mod entities;
pub mod view;

pub use entities::{Compaction, EntryDraft, EntryRole, Revision, Transcript, TranscriptEntry};
pub use view::{OWN_SPEAKER_LABEL, ViewEntry, ViewRole};
