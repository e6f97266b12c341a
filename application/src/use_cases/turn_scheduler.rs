//! Turn Scheduler use case.
//!
//! Drives one session turn by turn: appends incoming messages, resolves
//! tool calls through the [`ToolDispatcher`], picks the next speaker with
//! the [`HandOffResolver`] and asks the reasoning collaborator for replies.
//! Turns are strictly sequential; at most one reasoning call or tool
//! dispatch is in flight per session.
//!
//! ```text
//! submit_turn(msg)
//!   └─► append msg ─► loop {
//!         terminated / cancelled / marker?  ─► stop
//!         last entry has tool calls?        ─► dispatch all, append tool result
//!         rounds exhausted?                 ─► stop
//!         resolve next speaker              ─► human: suspend / terminate: stop
//!         generate reply (bounded retries)  ─► append, round += 1
//!       }
//! ```

use crate::config::SchedulerParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::reasoning_gateway::{
    AgentReply, ReasoningError, ReasoningGateway, ReplyRequest,
};
use crate::use_cases::hand_off::{ConditionFailure, HandOffResolver, NextSpeaker};
use crate::use_cases::shared::{bounded, is_cancelled};
use crate::use_cases::tool_dispatcher::ToolDispatcher;
use atelier_domain::util::preview;
use atelier_domain::{
    AgentDescriptor, AgentName, AgentRegistry, ConfigurationError, ContextStore, EntryDraft,
    EntryRole, FallbackPolicy, Revision, RollbackError, SchedulerPhase, SessionState,
    TerminationReason, ToolCallRequest, TranscriptEntry, ViewEntry,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors surfaced to the owner of a session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Agent '{agent}' produced no valid reply after {attempts} attempts: {last_error}")]
    Fatal {
        agent: AgentName,
        attempts: usize,
        last_error: ReasoningError,
    },

    #[error("Session already terminated ({0})")]
    Terminated(TerminationReason),

    #[error("Rollback failed: {0}")]
    Rollback(#[from] RollbackError),

    #[error("Hand-off condition '{condition}' of '{agent}' could not be evaluated: {error}")]
    Condition {
        agent: AgentName,
        condition: String,
        error: ReasoningError,
    },
}

impl From<ConditionFailure> for SessionError {
    fn from(failure: ConditionFailure) -> Self {
        SessionError::Condition {
            agent: failure.agent,
            condition: failure.condition,
            error: failure.error,
        }
    }
}

/// Input for [`TurnScheduler::start_session`].
pub struct StartSessionInput {
    pub registry: Arc<AgentRegistry>,
    pub initial_agent: AgentName,
    pub seed: Vec<EntryDraft>,
    pub context: ContextStore,
    /// Overrides [`SchedulerParams::max_rounds`]
    pub max_rounds: Option<usize>,
    /// Overrides [`SchedulerParams::default_fallback`]
    pub default_fallback: Option<FallbackPolicy>,
    /// Parent token; cancelling it cancels the session
    pub cancellation: Option<CancellationToken>,
    /// Context key that receives the content of each user-role input
    pub latest_input_key: Option<String>,
}

impl StartSessionInput {
    pub fn new(registry: Arc<AgentRegistry>, initial_agent: impl Into<AgentName>) -> Self {
        Self {
            registry,
            initial_agent: initial_agent.into(),
            seed: Vec::new(),
            context: ContextStore::new(),
            max_rounds: None,
            default_fallback: None,
            cancellation: None,
            latest_input_key: None,
        }
    }

    pub fn with_seed(mut self, seed: Vec<EntryDraft>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_context(mut self, context: ContextStore) -> Self {
        self.context = context;
        self
    }

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = Some(max);
        self
    }

    pub fn with_default_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.default_fallback = Some(fallback);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Mirror every human or external message into `key` before it is
    /// appended, so tools can read the latest input from shared state.
    pub fn with_latest_input_key(mut self, key: impl Into<String>) -> Self {
        self.latest_input_key = Some(key.into());
        self
    }
}

/// A running (or finished) session.
pub struct SessionHandle {
    id: String,
    registry: Arc<AgentRegistry>,
    initial_agent: AgentName,
    default_fallback: FallbackPolicy,
    state: SessionState,
    cancellation: CancellationToken,
    latest_input_key: Option<String>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn initial_agent(&self) -> &AgentName {
        &self.initial_agent
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    /// Stop the session before its next reasoning call.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// A message entering the session from outside the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    /// Author; `None` means the registry's human participant
    pub speaker: Option<AgentName>,
    pub content: String,
    /// Calls issued directly through the tool executor
    pub tool_calls: Vec<ToolCallRequest>,
}

impl IncomingMessage {
    /// Message from the human participant.
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            speaker: None,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Message attributed to a named speaker.
    pub fn from_speaker(speaker: impl Into<AgentName>, content: impl Into<String>) -> Self {
        Self {
            speaker: Some(speaker.into()),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Tool calls submitted on behalf of the session. They are looked up in
    /// the union of every agent's tool table.
    pub fn tool_requests(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            speaker: Some(AgentName::tool_executor()),
            content: String::new(),
            tool_calls: calls,
        }
    }

    fn into_draft(self, registry: &AgentRegistry) -> EntryDraft {
        let speaker = self
            .speaker
            .or_else(|| registry.human().map(|h| h.name().clone()))
            .unwrap_or_else(|| AgentName::new(EXTERNAL_SPEAKER));
        if speaker.is_tool_executor() {
            return EntryDraft::new(speaker, EntryRole::Tool, self.content)
                .with_tool_calls(self.tool_calls);
        }
        let synthetic = registry
            .get(speaker.as_str())
            .is_some_and(|agent| !agent.is_human());
        let role = if synthetic {
            EntryRole::Assistant
        } else {
            EntryRole::User
        };
        EntryDraft::new(speaker, role, self.content)
    }
}

/// Speaker label for external input when the registry has no human.
pub const EXTERNAL_SPEAKER: &str = "external";

/// Result of one [`TurnScheduler::submit_turn`] call.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Entries appended during this call, incoming message included
    pub new_entries: Vec<TranscriptEntry>,
    pub last_speaker: Option<AgentName>,
    pub termination: Option<TerminationReason>,
    /// Set when the session suspended for input
    pub awaiting_input_from: Option<AgentName>,
    pub context: ContextStore,
}

impl TurnOutcome {
    pub fn terminated(&self) -> bool {
        self.termination.is_some()
    }

    /// Content of the last appended entry spoken by `agent`.
    pub fn last_reply_from(&self, agent: &str) -> Option<&str> {
        self.new_entries
            .iter()
            .rev()
            .find(|e| e.speaker == agent && e.role == EntryRole::Assistant)
            .map(|e| e.content.as_str())
    }
}

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_session_id() -> String {
    let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("session-{}-{}", Utc::now().format("%Y%m%d%H%M%S"), n)
}

/// Use case running the per-turn algorithm over a [`SessionHandle`].
pub struct TurnScheduler {
    gateway: Arc<dyn ReasoningGateway>,
    params: SchedulerParams,
    dispatcher: ToolDispatcher,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl Clone for TurnScheduler {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            params: self.params.clone(),
            dispatcher: self.dispatcher.clone(),
            conversation_logger: self.conversation_logger.clone(),
        }
    }
}

impl TurnScheduler {
    pub fn new(gateway: Arc<dyn ReasoningGateway>) -> Self {
        Self {
            gateway,
            params: SchedulerParams::default(),
            dispatcher: ToolDispatcher::new(),
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_params(mut self, params: SchedulerParams) -> Self {
        self.params = params;
        self
    }

    /// Create with a conversation logger (shared with the dispatcher).
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.dispatcher = ToolDispatcher::new().with_conversation_logger(logger.clone());
        self.conversation_logger = logger;
        self
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    /// Validate the topology and open a session.
    ///
    /// Configuration errors (unknown hand-off target, unknown initial agent,
    /// empty registry) are reported here, never mid-run.
    pub fn start_session(&self, input: StartSessionInput) -> Result<SessionHandle, SessionError> {
        input.registry.validate(input.initial_agent.as_str())?;

        let max_rounds = input.max_rounds.unwrap_or(self.params.max_rounds);
        let default_fallback = input
            .default_fallback
            .unwrap_or_else(|| self.params.default_fallback.into());
        let cancellation = input
            .cancellation
            .map(|parent| parent.child_token())
            .unwrap_or_default();

        let handle = SessionHandle {
            id: next_session_id(),
            registry: input.registry,
            initial_agent: input.initial_agent,
            default_fallback,
            state: SessionState::new(input.seed, input.context, max_rounds),
            cancellation,
            latest_input_key: input.latest_input_key,
        };

        info!(
            "Session {} started: {} agents, initial agent {}",
            handle.id,
            handle.registry.len(),
            handle.initial_agent
        );
        self.conversation_logger.log(ConversationEvent::new(
            "session_started",
            json!({
                "session": handle.id,
                "initial_agent": handle.initial_agent.as_str(),
                "agents": handle.registry.agents().map(|a| a.name().as_str()).collect::<Vec<_>>(),
                "seed_entries": handle.state.transcript().len(),
                "max_rounds": max_rounds,
            }),
        ));

        Ok(handle)
    }

    /// Append `incoming` and run the session until it suspends or terminates.
    pub async fn submit_turn(
        &self,
        session: &mut SessionHandle,
        incoming: IncomingMessage,
    ) -> Result<TurnOutcome, SessionError> {
        if let Some(reason) = session.state.termination_reason() {
            return Err(SessionError::Terminated(reason.clone()));
        }
        let since = session.state.transcript().last_revision();

        let draft = incoming.into_draft(&session.registry);
        debug!("Session {}: incoming from {}", session.id, draft.speaker);
        if draft.role == EntryRole::User
            && let Some(key) = &session.latest_input_key
        {
            session.state.context_mut().set(key.as_str(), draft.content.clone());
        }
        session.state.set_current_speaker(draft.speaker.clone());
        session.state.append(draft);

        self.drive(session, since).await
    }

    /// Run the session from its current transcript without new input.
    ///
    /// Used to start a session over a seed transcript.
    pub async fn resume(&self, session: &mut SessionHandle) -> Result<TurnOutcome, SessionError> {
        if let Some(reason) = session.state.termination_reason() {
            return Err(SessionError::Terminated(reason.clone()));
        }
        let since = session.state.transcript().last_revision();
        self.drive(session, since).await
    }

    /// Cut the session back to `revision`, restoring the Context Store as it
    /// was right after that entry. On error the session is unchanged.
    pub fn rollback(
        &self,
        session: &mut SessionHandle,
        revision: Revision,
    ) -> Result<Vec<TranscriptEntry>, SessionError> {
        let removed = session.state.rollback(revision)?;
        info!(
            "Session {} rolled back to {} ({} entries removed)",
            session.id,
            revision,
            removed.len()
        );
        self.conversation_logger.log(ConversationEvent::new(
            "session_rolled_back",
            json!({
                "session": session.id,
                "revision": revision.value(),
                "removed": removed.len(),
            }),
        ));
        Ok(removed)
    }

    async fn drive(
        &self,
        session: &mut SessionHandle,
        since: Option<Revision>,
    ) -> Result<TurnOutcome, SessionError> {
        let result = self.run_loop(session).await;
        if let Err(error) = &result {
            let reason = match error {
                SessionError::Fatal { .. } | SessionError::Condition { .. } => {
                    TerminationReason::Fatal {
                        message: error.to_string(),
                    }
                }
                _ => TerminationReason::NoEligibleSpeaker,
            };
            self.finish(session, reason);
        }
        result?;
        Ok(self.outcome(session, since))
    }

    async fn run_loop(&self, session: &mut SessionHandle) -> Result<(), SessionError> {
        let resolver = HandOffResolver::new(self.gateway.clone(), self.params.clone());

        loop {
            if session.state.is_terminated() {
                return Ok(());
            }

            let Some(last) = session.state.transcript().last() else {
                self.finish(session, TerminationReason::NoEligibleSpeaker);
                return Ok(());
            };

            // Tool calls belong to the turn that issued them: they are
            // resolved before cancellation or a marker can stop the session.
            if last.has_pending_tool_calls() {
                let caller = last.speaker.clone();
                let calls = last.tool_calls.clone();
                let marker = self
                    .params
                    .matching_marker(&last.content)
                    .map(str::to_string);
                self.resolve_tools(session, &caller, &calls).await;
                if let Some(marker) = marker {
                    self.finish(session, TerminationReason::TerminationMarker { marker });
                    return Ok(());
                }
                continue;
            }

            if is_cancelled(&session.cancellation) {
                self.finish(session, TerminationReason::Cancelled);
                return Ok(());
            }

            if let Some(marker) = self.params.matching_marker(&last.content) {
                let reason = TerminationReason::TerminationMarker {
                    marker: marker.to_string(),
                };
                self.finish(session, reason);
                return Ok(());
            }

            if session.state.rounds_exhausted() {
                self.finish(session, TerminationReason::MaxRounds);
                return Ok(());
            }

            let next = resolver
                .resolve(
                    &session.registry,
                    &mut session.state,
                    &session.initial_agent,
                    &session.default_fallback,
                )
                .await?;

            let speaker = match next {
                NextSpeaker::Terminate(reason) => {
                    self.finish(session, reason);
                    return Ok(());
                }
                NextSpeaker::Agent(speaker) => speaker,
            };

            let registry = session.registry.clone();
            let Some(agent) = registry.get(speaker.as_str()) else {
                warn!("Session {}: selected unknown agent '{}'", session.id, speaker);
                self.finish(session, TerminationReason::NoEligibleSpeaker);
                return Ok(());
            };

            debug!("Session {}: next speaker {}", session.id, speaker);
            self.conversation_logger.log(ConversationEvent::new(
                "speaker_selected",
                json!({
                    "session": session.id,
                    "speaker": speaker.as_str(),
                    "human": agent.is_human(),
                    "round": session.state.round_count(),
                }),
            ));

            if agent.is_human() {
                session
                    .state
                    .set_phase(SchedulerPhase::AwaitingInput { from: Some(speaker) });
                return Ok(());
            }

            session.state.activate(speaker);
            let reply = self.request_reply(session, agent).await?;
            let entry = session.state.append_reply(reply.into_draft(agent));

            self.conversation_logger.log(ConversationEvent::new(
                "turn_completed",
                json!({
                    "session": session.id,
                    "speaker": entry.speaker.as_str(),
                    "revision": entry.revision.value(),
                    "tool_calls": entry.tool_calls.iter().map(|c| c.tool_name.as_str()).collect::<Vec<_>>(),
                    "content": preview(&entry.content, 200),
                }),
            ));
        }
    }

    async fn resolve_tools(
        &self,
        session: &mut SessionHandle,
        caller: &AgentName,
        calls: &[ToolCallRequest],
    ) {
        session.state.set_phase(SchedulerPhase::AwaitingToolResolution);
        let resolution = self
            .dispatcher
            .dispatch_all(&session.registry, caller, calls, session.state.context_mut())
            .await;

        if let Some(next) = &resolution.next_agent {
            debug!("Session {}: tool directive routes to {}", session.id, next);
        }
        session.state.set_pending_next(resolution.next_agent);
        session.state.set_current_speaker(AgentName::tool_executor());
        session.state.append(EntryDraft::tool_results(resolution.results));
    }

    async fn request_reply(
        &self,
        session: &SessionHandle,
        agent: &AgentDescriptor,
    ) -> Result<AgentReply, SessionError> {
        let attempts = self.params.reply_attempts();
        let mut hints: Vec<ViewEntry> = Vec::new();
        let mut last_error = None;

        for attempt in 1..=attempts {
            let state = &session.state;
            let mut view = state.transcript().view_for(agent.name());
            view.extend(hints.iter().cloned());

            let request = ReplyRequest {
                agent,
                instructions: agent.render_instructions(state.context()),
                view,
                shared: state.context(),
                attempt,
            };

            let reply = bounded(self.params.reply_timeout, self.gateway.generate_reply(request))
                .await
                .and_then(|reply| reply.validate().map(|_| reply));

            match reply {
                Ok(reply) => return Ok(reply),
                Err(error) => {
                    warn!(
                        "Reply from {} rejected (attempt {}/{}): {}",
                        agent.name(),
                        attempt,
                        attempts,
                        error
                    );
                    self.conversation_logger.log(ConversationEvent::new(
                        "reply_rejected",
                        json!({
                            "session": session.id,
                            "speaker": agent.name().as_str(),
                            "attempt": attempt,
                            "error": error.to_string(),
                        }),
                    ));
                    hints.push(ViewEntry::correction(format!(
                        "Your previous reply was rejected: {}. Please answer again.",
                        error
                    )));
                    last_error = Some(error);
                }
            }
        }

        Err(SessionError::Fatal {
            agent: agent.name().clone(),
            attempts,
            last_error: last_error
                .unwrap_or_else(|| ReasoningError::Unavailable("no attempt was made".into())),
        })
    }

    fn finish(&self, session: &mut SessionHandle, reason: TerminationReason) {
        info!("Session {} terminated: {}", session.id, reason);
        self.conversation_logger.log(ConversationEvent::new(
            "session_terminated",
            json!({
                "session": session.id,
                "reason": reason.as_str(),
                "detail": reason.to_string(),
                "rounds": session.state.round_count(),
                "last_speaker": session.state.current_speaker().map(|s| s.as_str()),
            }),
        ));
        session.state.terminate(reason);
    }

    fn outcome(&self, session: &SessionHandle, since: Option<Revision>) -> TurnOutcome {
        let state = &session.state;
        let new_entries = state
            .transcript()
            .entries()
            .iter()
            .filter(|e| since.is_none_or(|since| e.revision > since))
            .cloned()
            .collect();
        let awaiting_input_from = match state.phase() {
            SchedulerPhase::AwaitingInput { from } => from.clone(),
            _ => None,
        };

        TurnOutcome {
            new_entries,
            last_speaker: state.current_speaker().cloned(),
            termination: state.termination_reason().cloned(),
            awaiting_input_from,
            context: state.context().clone(),
        }
    }
}
