//! Session state and the scheduler's phase machine.
//!
//! ```text
//!  AwaitingFirstSpeaker ──► SpeakerActive ◄──► AwaitingToolResolution
//!          │                    │   ▲
//!          │                    ▼   │
//!          └──────────────► AwaitingInput      (human has the floor)
//!                               │
//!                               ▼
//!                          Terminated           (no further turns)
//! ```
//!
//! Every appended entry records a [`Checkpoint`] of the bookkeeping needed
//! to resume from that point, which is what rollback restores.

use crate::agent::AgentName;
use crate::context::{ContextSnapshot, ContextStore};
use crate::core::error::RollbackError;
use crate::transcript::{Compaction, EntryDraft, Revision, Transcript, TranscriptEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    /// The round counter reached `max_rounds`
    MaxRounds,
    /// A hand-off rule or fallback policy said to stop
    HandOff,
    /// Neither hand-off rules nor fallback produced a speaker
    NoEligibleSpeaker,
    /// The latest entry contained a termination marker
    TerminationMarker { marker: String },
    /// Replies kept failing after the retry bound
    Fatal { message: String },
    /// The session was cancelled by its owner
    Cancelled,
}

impl TerminationReason {
    pub fn as_str(&self) -> &str {
        match self {
            TerminationReason::MaxRounds => "max_rounds",
            TerminationReason::HandOff => "hand_off",
            TerminationReason::NoEligibleSpeaker => "no_eligible_speaker",
            TerminationReason::TerminationMarker { .. } => "termination_marker",
            TerminationReason::Fatal { .. } => "fatal",
            TerminationReason::Cancelled => "cancelled",
        }
    }

    /// Whether the session ended without a fault.
    pub fn is_clean(&self) -> bool {
        !matches!(self, TerminationReason::Fatal { .. })
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::TerminationMarker { marker } => {
                write!(f, "termination marker '{}'", marker)
            }
            TerminationReason::Fatal { message } => write!(f, "fatal: {}", message),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Phase of the turn loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SchedulerPhase {
    AwaitingFirstSpeaker,
    SpeakerActive { speaker: AgentName },
    AwaitingToolResolution,
    /// Suspended until the next incoming message (human or external)
    AwaitingInput {
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<AgentName>,
    },
    Terminated { reason: TerminationReason },
}

impl SchedulerPhase {
    pub fn as_str(&self) -> &str {
        match self {
            SchedulerPhase::AwaitingFirstSpeaker => "awaiting_first_speaker",
            SchedulerPhase::SpeakerActive { .. } => "speaker_active",
            SchedulerPhase::AwaitingToolResolution => "awaiting_tool_resolution",
            SchedulerPhase::AwaitingInput { .. } => "awaiting_input",
            SchedulerPhase::Terminated { .. } => "terminated",
        }
    }
}

/// Bookkeeping captured after an entry was appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub context: ContextSnapshot,
    pub round_count: usize,
    pub current_speaker: Option<AgentName>,
    pub initial_turn_pending: bool,
    pub pending_next: Option<AgentName>,
}

/// Everything the scheduler mutates during a session.
#[derive(Debug, Clone)]
pub struct SessionState {
    transcript: Transcript,
    context: ContextStore,
    current_speaker: Option<AgentName>,
    round_count: usize,
    max_rounds: usize,
    phase: SchedulerPhase,
    initial_turn_pending: bool,
    pending_next: Option<AgentName>,
    checkpoints: BTreeMap<Revision, Checkpoint>,
}

impl SessionState {
    /// Fresh state over a seed transcript and context.
    ///
    /// Seed entries get checkpoints too, so a session can be rolled back to
    /// any point of its seed.
    pub fn new(seed: Vec<EntryDraft>, context: ContextStore, max_rounds: usize) -> Self {
        let mut state = Self {
            transcript: Transcript::new(),
            context,
            current_speaker: None,
            round_count: 0,
            max_rounds,
            phase: SchedulerPhase::AwaitingFirstSpeaker,
            initial_turn_pending: true,
            pending_next: None,
            checkpoints: BTreeMap::new(),
        };
        for draft in seed {
            state.current_speaker = Some(draft.speaker.clone());
            state.append(draft);
        }
        state
    }

    // ==================== Accessors ====================

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    pub fn current_speaker(&self) -> Option<&AgentName> {
        self.current_speaker.as_ref()
    }

    pub fn round_count(&self) -> usize {
        self.round_count
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub fn phase(&self) -> &SchedulerPhase {
        &self.phase
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.phase, SchedulerPhase::Terminated { .. })
    }

    pub fn termination_reason(&self) -> Option<&TerminationReason> {
        match &self.phase {
            SchedulerPhase::Terminated { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn initial_turn_pending(&self) -> bool {
        self.initial_turn_pending
    }

    pub fn rounds_exhausted(&self) -> bool {
        self.round_count >= self.max_rounds
    }

    pub fn checkpoint_at(&self, revision: Revision) -> Option<&Checkpoint> {
        self.checkpoints.get(&revision)
    }

    // ==================== Mutation ====================

    /// Writable Context Store, for merging tool deltas.
    pub fn context_mut(&mut self) -> &mut ContextStore {
        &mut self.context
    }

    /// Append an entry and checkpoint the state right after it.
    pub fn append(&mut self, draft: EntryDraft) -> &TranscriptEntry {
        let revision = self.transcript.append(draft).revision;
        let checkpoint = self.checkpoint();
        self.checkpoints.insert(revision, checkpoint);
        &self.transcript.entries()[self.transcript.len() - 1]
    }

    /// Append a reply from `speaker` and count the round.
    pub fn append_reply(&mut self, draft: EntryDraft) -> &TranscriptEntry {
        self.round_count += 1;
        self.append(draft)
    }

    pub fn set_phase(&mut self, phase: SchedulerPhase) {
        self.phase = phase;
    }

    /// Give the floor to `speaker`.
    pub fn activate(&mut self, speaker: AgentName) {
        self.current_speaker = Some(speaker.clone());
        self.phase = SchedulerPhase::SpeakerActive { speaker };
    }

    /// Record who produced the entry about to be appended.
    pub fn set_current_speaker(&mut self, speaker: AgentName) {
        self.current_speaker = Some(speaker);
    }

    pub fn terminate(&mut self, reason: TerminationReason) {
        self.phase = SchedulerPhase::Terminated { reason };
    }

    /// Reopen a terminated session so it waits for input again.
    ///
    /// Returns the reason it had terminated with, if any.
    pub fn reopen(&mut self) -> Option<TerminationReason> {
        let reason = self.termination_reason().cloned()?;
        self.phase = SchedulerPhase::AwaitingInput { from: None };
        Some(reason)
    }

    /// Consume the once-per-session initial-agent precedence.
    pub fn take_initial_turn(&mut self) -> bool {
        std::mem::take(&mut self.initial_turn_pending)
    }

    pub fn set_pending_next(&mut self, agent: Option<AgentName>) {
        self.pending_next = agent;
    }

    pub fn take_pending_next(&mut self) -> Option<AgentName> {
        self.pending_next.take()
    }

    /// Cut the session back to `revision` and restore its checkpoint.
    ///
    /// On error nothing is changed. On success the removed entries are
    /// returned and the session waits for input again.
    pub fn rollback(&mut self, revision: Revision) -> Result<Vec<TranscriptEntry>, RollbackError> {
        self.transcript.check_rollback(revision)?;
        let checkpoint = self
            .checkpoints
            .get(&revision)
            .cloned()
            .ok_or(RollbackError::UnknownRevision(revision.value()))?;

        let removed = self.transcript.truncate_after(revision)?;
        self.checkpoints.retain(|r, _| *r <= revision);
        self.context.restore(&checkpoint.context);
        self.round_count = checkpoint.round_count;
        self.current_speaker = checkpoint.current_speaker;
        self.initial_turn_pending = checkpoint.initial_turn_pending;
        self.pending_next = checkpoint.pending_next;
        self.phase = SchedulerPhase::AwaitingInput { from: None };
        Ok(removed)
    }

    /// Compact the transcript and drop checkpoints of discarded entries.
    pub fn compact(&mut self, cap: usize, head: usize) -> Option<Compaction> {
        let compaction = self.transcript.compact(cap, head)?;
        let transcript = &self.transcript;
        self.checkpoints
            .retain(|revision, _| transcript.get(*revision).is_some());
        Some(compaction)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            context: self.context.snapshot(),
            round_count: self.round_count,
            current_speaker: self.current_speaker.clone(),
            initial_turn_pending: self.initial_turn_pending,
            pending_next: self.pending_next.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reopen_terminated_state() {
        let mut state = SessionState::new(Vec::new(), ContextStore::new(), 3);
        assert_eq!(state.reopen(), None);

        state.terminate(TerminationReason::HandOff);
        assert_eq!(state.reopen(), Some(TerminationReason::HandOff));
        assert!(!state.is_terminated());
        assert_eq!(state.phase(), &SchedulerPhase::AwaitingInput { from: None });
    }

    #[test]
    fn test_new_state_checkpoints_seed() {
        let state = SessionState::new(
            vec![EntryDraft::user("buyer", "hi")],
            ContextStore::from_pairs([("bottom_price", json!(1000))]),
            20,
        );

        assert_eq!(state.transcript().len(), 1);
        assert_eq!(state.phase(), &SchedulerPhase::AwaitingFirstSpeaker);
        assert!(state.initial_turn_pending());
        assert!(state.checkpoint_at(Revision::new(1)).is_some());
        assert_eq!(state.current_speaker(), Some(&AgentName::new("buyer")));
    }

    #[test]
    fn test_initial_turn_taken_once() {
        let mut state = SessionState::new(vec![], ContextStore::new(), 5);
        assert!(state.take_initial_turn());
        assert!(!state.take_initial_turn());
    }

    #[test]
    fn test_rollback_restores_context_and_rounds() {
        let mut state = SessionState::new(vec![], ContextStore::new(), 20);
        state.append(EntryDraft::user("buyer", "hello"));
        state.take_initial_turn();
        state.context_mut().set("bottom_price", json!(1200));
        state.append_reply(EntryDraft::assistant("negotiator", "1500"));
        state.terminate(TerminationReason::HandOff);

        let removed = state.rollback(Revision::new(1)).unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(state.round_count(), 0);
        assert!(state.context().get("bottom_price").is_none());
        assert!(state.initial_turn_pending());
        assert!(!state.is_terminated());
        assert!(state.checkpoint_at(Revision::new(2)).is_none());
    }

    #[test]
    fn test_failed_rollback_changes_nothing() {
        let mut state = SessionState::new(vec![EntryDraft::user("buyer", "a")], ContextStore::new(), 3);
        state.terminate(TerminationReason::MaxRounds);

        assert!(state.rollback(Revision::new(7)).is_err());
        assert!(state.is_terminated());
        assert_eq!(state.transcript().len(), 1);
    }

    #[test]
    fn test_compact_prunes_checkpoints() {
        let seed = (1..=45).map(|i| EntryDraft::user("buyer", format!("m{i}"))).collect();
        let mut state = SessionState::new(seed, ContextStore::new(), 100);

        state.compact(40, 3).unwrap();

        assert!(state.checkpoint_at(Revision::new(3)).is_some());
        assert!(state.checkpoint_at(Revision::new(5)).is_none());
        assert!(state.checkpoint_at(Revision::new(45)).is_some());
        assert!(state.rollback(Revision::new(5)).unwrap_err().is_compacted());
    }

    #[test]
    fn test_termination_reason_display() {
        assert_eq!(TerminationReason::MaxRounds.to_string(), "max_rounds");
        assert!(TerminationReason::NoEligibleSpeaker.is_clean());
        assert!(
            !TerminationReason::Fatal {
                message: "boom".to_string()
            }
            .is_clean()
        );
    }
}
