//! Conversation Room use case.
//!
//! A long-lived group room wrapping one scheduler session. Every appended
//! entry is mirrored to a [`TranscriptSink`]; the in-memory transcript is
//! compacted once it grows past [`RoomParams::transcript_cap`], keeping the
//! scene-setting head and the most recent entries.
//!
//! A room outlives individual exchanges: when a post ends with a hand-off
//! termination, no eligible speaker or a termination marker, the room
//! reopens and waits for the next post. Round budget exhaustion,
//! cancellation and fatal errors close it for good.

use crate::config::RoomParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::transcript_sink::{NoTranscriptSink, TranscriptSink};
use crate::use_cases::turn_scheduler::{
    IncomingMessage, SessionError, SessionHandle, StartSessionInput, TurnOutcome, TurnScheduler,
};
use atelier_domain::{ContextStore, Revision, TerminationReason, Transcript, TranscriptEntry};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A group room over one session.
pub struct ConversationRoom {
    scheduler: TurnScheduler,
    session: SessionHandle,
    params: RoomParams,
    sink: Arc<dyn TranscriptSink>,
    conversation_logger: Arc<dyn ConversationLogger>,
    backups: Vec<Vec<TranscriptEntry>>,
    mirrored_through: Option<Revision>,
}

impl ConversationRoom {
    /// Open a room. The room's round budget applies unless `input` sets one.
    pub fn open(
        scheduler: TurnScheduler,
        mut input: StartSessionInput,
        params: RoomParams,
    ) -> Result<Self, SessionError> {
        if input.max_rounds.is_none() {
            input.max_rounds = Some(params.max_rounds);
        }
        let session = scheduler.start_session(input)?;
        info!("Room opened over session {}", session.id());

        Ok(Self {
            scheduler,
            session,
            params,
            sink: Arc::new(NoTranscriptSink),
            conversation_logger: Arc::new(NoConversationLogger),
            backups: Vec::new(),
            mirrored_through: None,
        })
    }

    /// Mirror entries to `sink`, starting with the seed already in the room.
    pub fn with_transcript_sink(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.sink = sink;
        self.sync_sink();
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    // ==================== Accessors ====================

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        self.session.state().transcript()
    }

    pub fn context(&self) -> &ContextStore {
        self.session.state().context()
    }

    /// Revision of the latest entry, usable as a rollback point.
    pub fn revision(&self) -> Option<Revision> {
        self.transcript().last_revision()
    }

    /// Entry batches discarded by earlier rollbacks, oldest first.
    pub fn backups(&self) -> &[Vec<TranscriptEntry>] {
        &self.backups
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_terminated()
    }

    // ==================== Operations ====================

    /// Post a message and let the room run until it waits for input again.
    pub async fn post(&mut self, message: IncomingMessage) -> Result<TurnOutcome, SessionError> {
        let result = self.scheduler.submit_turn(&mut self.session, message).await;
        // Entries appended before a failure still reach the sink.
        self.sync_sink();
        let outcome = result?;
        self.compact();

        if let Some(reason) = &outcome.termination
            && keeps_room_open(reason)
        {
            debug!("Room reopening after {}", reason);
            self.session.state_mut().reopen();
        }

        Ok(outcome)
    }

    /// Roll the room back to `revision`, keeping the discarded entries as a
    /// backup. Fails with [`RollbackError::Compacted`](atelier_domain::RollbackError::Compacted)
    /// for revisions inside a compacted gap.
    pub fn rollback(&mut self, revision: Revision) -> Result<Vec<TranscriptEntry>, SessionError> {
        let removed = self.scheduler.rollback(&mut self.session, revision)?;
        if !removed.is_empty() {
            self.backups.push(removed.clone());
        }
        self.mirrored_through = self.mirrored_through.map(|r| r.min(revision));
        Ok(removed)
    }

    fn compact(&mut self) {
        let Some(compaction) = self
            .session
            .state_mut()
            .compact(self.params.transcript_cap, self.params.retained_head)
        else {
            return;
        };

        info!(
            "Room transcript compacted: {} entries discarded through {}",
            compaction.discarded, compaction.through
        );
        self.conversation_logger.log(ConversationEvent::new(
            "transcript_compacted",
            json!({
                "session": self.session.id(),
                "discarded": compaction.discarded,
                "through": compaction.through.value(),
                "retained": self.transcript().len(),
            }),
        ));
    }

    fn sync_sink(&mut self) {
        let since = self.mirrored_through;
        for entry in self.session.state().transcript().entries() {
            if since.is_some_and(|since| entry.revision <= since) {
                continue;
            }
            if let Err(e) = self.sink.append(entry) {
                warn!("Failed to mirror entry {}: {}", entry.revision, e);
            }
        }
        if let Some(last) = self.revision() {
            self.mirrored_through = Some(last);
        }
    }
}

fn keeps_room_open(reason: &TerminationReason) -> bool {
    matches!(
        reason,
        TerminationReason::HandOff
            | TerminationReason::NoEligibleSpeaker
            | TerminationReason::TerminationMarker { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::reasoning_gateway::{
        AgentReply, ReasoningError, ReasoningGateway, ReplyRequest,
    };
    use crate::ports::transcript_sink::TranscriptSinkError;
    use async_trait::async_trait;
    use atelier_domain::{
        AfterWork, AgentDescriptor, AgentRegistry, EntryDraft, HandOffRule, RollbackError,
        ViewEntry,
    };
    use std::sync::Mutex;

    struct EchoGateway;

    #[async_trait]
    impl ReasoningGateway for EchoGateway {
        async fn generate_reply(
            &self,
            request: ReplyRequest<'_>,
        ) -> Result<AgentReply, ReasoningError> {
            let last = request.view.last().map(|v| v.content.clone()).unwrap_or_default();
            Ok(AgentReply::text(format!("{} heard: {}", request.agent.name(), last)))
        }

        async fn evaluate_condition(
            &self,
            _condition: &str,
            _tail: &[ViewEntry],
        ) -> Result<bool, ReasoningError> {
            Ok(true)
        }
    }

    #[derive(Default)]
    struct MemorySink {
        entries: Mutex<Vec<TranscriptEntry>>,
    }

    impl TranscriptSink for MemorySink {
        fn append(&self, entry: &TranscriptEntry) -> Result<(), TranscriptSinkError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    fn gallery() -> Arc<AgentRegistry> {
        Arc::new(
            AgentRegistry::new()
                .with_agent(
                    AgentDescriptor::synthetic("artist")
                        .with_hand_off(HandOffRule::after_work(AfterWork::RevertToHuman)),
                )
                .unwrap()
                .with_agent(AgentDescriptor::human("visitor"))
                .unwrap(),
        )
    }

    fn open_room(params: RoomParams) -> ConversationRoom {
        let input = StartSessionInput::new(gallery(), "artist").with_seed(vec![
            EntryDraft::system("The gallery opens."),
            EntryDraft::system("Artworks are on display."),
        ]);
        ConversationRoom::open(TurnScheduler::new(Arc::new(EchoGateway)), input, params).unwrap()
    }

    #[tokio::test]
    async fn test_post_mirrors_entries_to_sink() {
        let sink = Arc::new(MemorySink::default());
        let mut room = open_room(RoomParams::default()).with_transcript_sink(sink.clone());

        let outcome = room.post(IncomingMessage::human("hello")).await.unwrap();

        assert_eq!(outcome.last_reply_from("artist"), Some("artist heard: hello"));
        assert_eq!(outcome.awaiting_input_from.as_ref().map(|a| a.as_str()), Some("visitor"));
        let mirrored = sink.entries.lock().unwrap();
        assert_eq!(mirrored.len(), 4);
        assert_eq!(mirrored[0].content, "The gallery opens.");
    }

    #[tokio::test]
    async fn test_compaction_keeps_head_and_tail() {
        let sink = Arc::new(MemorySink::default());
        let params = RoomParams::default()
            .with_transcript_cap(6)
            .with_retained_head(2);
        let mut room = open_room(params).with_transcript_sink(sink.clone());

        for i in 0..4 {
            room.post(IncomingMessage::human(format!("m{i}"))).await.unwrap();
        }

        // 2 seed + 4 * (message + reply) = 10 entries, compacted to 6
        let transcript = room.transcript();
        assert_eq!(transcript.len(), 6);
        assert_eq!(transcript.entries()[0].content, "The gallery opens.");
        assert_eq!(transcript.entries()[1].content, "Artworks are on display.");
        assert_eq!(transcript.last().unwrap().content, "artist heard: m3");
        assert!(transcript.is_compacted());
        assert_eq!(sink.entries.lock().unwrap().len(), 10);

        let err = room.rollback(Revision::new(4)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Rollback(RollbackError::Compacted { requested: 4, .. })
        ));
        assert_eq!(room.transcript().len(), 6);
    }

    #[tokio::test]
    async fn test_rollback_keeps_backup_and_room_continues() {
        let mut room = open_room(RoomParams::default());
        room.post(IncomingMessage::human("first")).await.unwrap();
        let checkpoint = room.revision().unwrap();
        room.post(IncomingMessage::human("second")).await.unwrap();

        let removed = room.rollback(checkpoint).unwrap();

        assert_eq!(removed.len(), 2);
        assert_eq!(room.backups().len(), 1);
        assert_eq!(room.backups()[0][0].content, "second");
        assert_eq!(room.revision(), Some(checkpoint));

        let outcome = room.post(IncomingMessage::human("again")).await.unwrap();
        assert_eq!(outcome.last_reply_from("artist"), Some("artist heard: again"));
    }

    #[tokio::test]
    async fn test_room_reopens_after_hand_off_termination() {
        let registry = Arc::new(
            AgentRegistry::new()
                .with_agent(AgentDescriptor::synthetic("host"))
                .unwrap(),
        );
        let mut room = ConversationRoom::open(
            TurnScheduler::new(Arc::new(EchoGateway)),
            StartSessionInput::new(registry, "host"),
            RoomParams::default(),
        )
        .unwrap();

        let first = room.post(IncomingMessage::human("one")).await.unwrap();
        assert_eq!(first.termination, Some(TerminationReason::HandOff));
        assert!(!room.is_closed());

        let second = room
            .post(IncomingMessage::from_speaker("host", "announcement"))
            .await
            .unwrap();
        assert_eq!(second.new_entries.len(), 1);
        assert_eq!(second.new_entries[0].content, "announcement");
        assert_eq!(second.termination, Some(TerminationReason::HandOff));
        assert!(!room.is_closed());
    }
}
