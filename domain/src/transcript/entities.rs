//! Transcript entities: entries, revisions and the append-only log.

use crate::agent::AgentName;
use crate::core::error::RollbackError;
use crate::tool::entities::{ToolCallRequest, ToolCallResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical timestamp of a transcript entry.
///
/// Revisions increase by one per appended entry and start at 1. Rollback
/// and snapshots are keyed by revision, never by wall-clock time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Role of an entry in the shared transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryRole {
    /// Human or external input
    User,
    /// Reply produced by a synthetic agent
    Assistant,
    /// Merged tool results
    Tool,
    /// Scene-setting or administrative notes
    System,
}

/// An entry that has not been appended yet.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub speaker: AgentName,
    pub role: EntryRole,
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub tool_results: Vec<ToolCallResult>,
}

impl EntryDraft {
    pub fn new(speaker: impl Into<AgentName>, role: EntryRole, content: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Input from a human or an external source.
    pub fn user(speaker: impl Into<AgentName>, content: impl Into<String>) -> Self {
        Self::new(speaker, EntryRole::User, content)
    }

    pub fn assistant(speaker: impl Into<AgentName>, content: impl Into<String>) -> Self {
        Self::new(speaker, EntryRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", EntryRole::System, content)
    }

    /// Merged tool results, one line per call in declaration order.
    pub fn tool_results(results: Vec<ToolCallResult>) -> Self {
        let content = results
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            speaker: AgentName::tool_executor(),
            role: EntryRole::Tool,
            content,
            tool_calls: Vec::new(),
            tool_results: results,
        }
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCallRequest>) -> Self {
        self.tool_calls = calls;
        self
    }
}

/// One appended record of the conversation. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub revision: Revision,
    pub speaker: AgentName,
    pub role: EntryRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolCallResult>,
    pub recorded_at: DateTime<Utc>,
}

impl TranscriptEntry {
    /// Whether this entry asks for tool calls that still need resolving.
    ///
    /// Assistant replies and requests issued directly by the tool executor
    /// qualify. Tool-result entries never carry calls of their own.
    pub fn has_pending_tool_calls(&self) -> bool {
        matches!(self.role, EntryRole::Assistant | EntryRole::Tool) && !self.tool_calls.is_empty()
    }

    /// Equality ignoring the wall-clock timestamp.
    pub fn same_turn_as(&self, other: &TranscriptEntry) -> bool {
        self.revision == other.revision
            && self.speaker == other.speaker
            && self.role == other.role
            && self.content == other.content
            && self.tool_calls == other.tool_calls
            && self.tool_results == other.tool_results
    }
}

/// What a compaction pass removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compaction {
    /// Number of discarded entries
    pub discarded: usize,
    /// Highest discarded revision
    pub through: Revision,
}

/// Append-only conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_revision: u64,
    /// Revisions in `(head_end, gap_end]` were discarded by compaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gap: Option<(Revision, Revision)>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_revision: 1,
            gap: None,
        }
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a transcript by appending `drafts` in order.
    pub fn from_drafts(drafts: impl IntoIterator<Item = EntryDraft>) -> Self {
        let mut transcript = Self::new();
        for draft in drafts {
            transcript.append(draft);
        }
        transcript
    }

    /// Append a draft, stamping it with the next revision and the current time.
    pub fn append(&mut self, draft: EntryDraft) -> &TranscriptEntry {
        let revision = Revision(self.next_revision);
        self.next_revision += 1;
        self.entries.push(TranscriptEntry {
            revision,
            speaker: draft.speaker,
            role: draft.role,
            content: draft.content,
            tool_calls: draft.tool_calls,
            tool_results: draft.tool_results,
            recorded_at: Utc::now(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, revision: Revision) -> Option<&TranscriptEntry> {
        self.entries
            .binary_search_by_key(&revision, |e| e.revision)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn last_revision(&self) -> Option<Revision> {
        self.entries.last().map(|e| e.revision)
    }

    /// The last `n` entries.
    pub fn tail(&self, n: usize) -> &[TranscriptEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Most recent speaker of an assistant entry, skipping tool results and
    /// human input.
    pub fn last_assistant_speaker(&self) -> Option<&AgentName> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.role == EntryRole::Assistant)
            .map(|e| &e.speaker)
    }

    /// Most recent entry of the given role.
    pub fn last_of_role(&self, role: EntryRole) -> Option<&TranscriptEntry> {
        self.entries.iter().rev().find(|e| e.role == role)
    }

    /// Whether compaction ever discarded entries that are still in the past.
    pub fn is_compacted(&self) -> bool {
        self.gap.is_some()
    }

    /// Check that the transcript can be cut back to `revision`.
    pub fn check_rollback(&self, revision: Revision) -> Result<(), RollbackError> {
        let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) else {
            return Err(RollbackError::NothingToRollback);
        };
        if revision > last.revision || revision < first.revision {
            return Err(RollbackError::UnknownRevision(revision.0));
        }
        if let Some((head_end, gap_end)) = self.gap
            && revision > head_end
            && revision <= gap_end
        {
            let earliest = self
                .entries
                .iter()
                .find(|e| e.revision > gap_end)
                .map_or(gap_end.0 + 1, |e| e.revision.0);
            return Err(RollbackError::Compacted {
                requested: revision.0,
                earliest,
            });
        }
        Ok(())
    }

    /// Drop every entry after `revision` and return the removed entries.
    ///
    /// The next appended entry gets `revision + 1`, so replaying the same
    /// inputs reproduces the same revisions.
    pub fn truncate_after(
        &mut self,
        revision: Revision,
    ) -> Result<Vec<TranscriptEntry>, RollbackError> {
        self.check_rollback(revision)?;
        let keep = self.entries.partition_point(|e| e.revision <= revision);
        let removed = self.entries.split_off(keep);
        self.next_revision = revision.0 + 1;
        if let Some((head_end, _)) = self.gap
            && revision <= head_end
        {
            self.gap = None;
        }
        Ok(removed)
    }

    /// Keep the first `head` and the most recent `cap - head` entries once
    /// the transcript grows beyond `cap`.
    pub fn compact(&mut self, cap: usize, head: usize) -> Option<Compaction> {
        if self.entries.len() <= cap || head >= cap {
            return None;
        }
        let tail = cap - head;
        let drop_end = self.entries.len() - tail;
        let discarded: Vec<TranscriptEntry> = self.entries.drain(head..drop_end).collect();
        let through = discarded.last()?.revision;
        let head_end = match head {
            0 => Revision(0),
            _ => self.entries[head - 1].revision,
        };
        self.gap = Some(match self.gap {
            Some((existing_head, _)) if existing_head <= head_end => (existing_head, through),
            _ => (head_end, through),
        });
        Some(Compaction {
            discarded: discarded.len(),
            through,
        })
    }
}
