//! Per-agent transcript views.
//!
//! A view relabels the stored log from one agent's perspective: its own
//! utterances become [`ViewRole::Own`] (shown as "You"), everyone else keeps
//! their name. Views are computed on read; stored entries are untouched.

use super::entities::{EntryRole, Transcript, TranscriptEntry};
use crate::agent::AgentName;
use crate::tool::entities::ToolCallRequest;
use serde::{Deserialize, Serialize};

/// Label used for the viewing agent's own utterances.
pub const OWN_SPEAKER_LABEL: &str = "You";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewRole {
    /// Said by the viewing agent
    Own,
    /// Said by another agent or by a human
    Peer,
    /// Tool output
    Tool,
    System,
}

/// One transcript entry as seen by a particular agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEntry {
    pub role: ViewRole,
    pub speaker: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ViewEntry {
    /// Render the entry from `viewer`'s point of view.
    pub fn from_entry(entry: &TranscriptEntry, viewer: &AgentName) -> Self {
        let own = entry.speaker == *viewer && entry.role == EntryRole::Assistant;
        let role = match entry.role {
            EntryRole::Tool => ViewRole::Tool,
            EntryRole::System => ViewRole::System,
            _ if own => ViewRole::Own,
            _ => ViewRole::Peer,
        };
        let speaker = if own {
            OWN_SPEAKER_LABEL.to_string()
        } else {
            entry.speaker.to_string()
        };
        Self {
            role,
            speaker,
            content: entry.content.clone(),
            tool_calls: entry.tool_calls.clone(),
        }
    }

    /// Corrective note appended to a prompt after a rejected reply.
    pub fn correction(hint: impl Into<String>) -> Self {
        Self {
            role: ViewRole::System,
            speaker: "system".to_string(),
            content: hint.into(),
            tool_calls: Vec::new(),
        }
    }
}

impl Transcript {
    /// The whole transcript as seen by `viewer`.
    pub fn view_for(&self, viewer: &AgentName) -> Vec<ViewEntry> {
        self.entries()
            .iter()
            .map(|e| ViewEntry::from_entry(e, viewer))
            .collect()
    }

    /// The last `n` entries, labelled neutrally (no viewer).
    pub fn tail_view(&self, n: usize) -> Vec<ViewEntry> {
        let nobody = AgentName::new("");
        self.tail(n)
            .iter()
            .map(|e| ViewEntry::from_entry(e, &nobody))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::entities::EntryDraft;

    fn sample() -> Transcript {
        Transcript::from_drafts([
            EntryDraft::system("Gallery opens."),
            EntryDraft::user("buyer", "How much?"),
            EntryDraft::assistant("negotiator", "1500 tokens."),
            EntryDraft::assistant("closer", "Shall we close?"),
            EntryDraft::tool_results(vec![]),
        ])
    }

    #[test]
    fn test_own_utterances_are_relabelled() {
        let view = sample().view_for(&AgentName::new("negotiator"));

        assert_eq!(view[0].role, ViewRole::System);
        assert_eq!(view[1].role, ViewRole::Peer);
        assert_eq!(view[1].speaker, "buyer");
        assert_eq!(view[2].role, ViewRole::Own);
        assert_eq!(view[2].speaker, OWN_SPEAKER_LABEL);
        assert_eq!(view[3].role, ViewRole::Peer);
        assert_eq!(view[3].speaker, "closer");
        assert_eq!(view[4].role, ViewRole::Tool);
    }

    #[test]
    fn test_view_does_not_mutate_entries() {
        let transcript = sample();
        let _ = transcript.view_for(&AgentName::new("negotiator"));
        assert_eq!(transcript.entries()[2].speaker, "negotiator");
    }

    #[test]
    fn test_tail_view() {
        let tail = sample().tail_view(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].speaker, "closer");
        assert_eq!(tail[0].role, ViewRole::Peer);
    }
}
