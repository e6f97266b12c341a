//! Hand-off resolution.
//!
//! Picks the next speaker once the latest entry carries no unresolved tool
//! calls. Precedence, highest first:
//!
//! 1. the configured initial agent, once per session
//! 2. the next agent named by a tool routing directive
//! 3. the most recent synthetic speaker, when the latest entry came from
//!    the human, a tool or the system
//! 4. the last speaker's hand-off rules, top to bottom
//! 5. the last speaker's fallback policy, or the session default

use crate::config::SchedulerParams;
use crate::ports::reasoning_gateway::{ReasoningError, ReasoningGateway};
use crate::use_cases::shared::bounded;
use atelier_domain::{
    AfterWork, AgentName, AgentRegistry, EntryRole, FallbackPolicy, HandOffRule, SessionState,
    TerminationReason,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of hand-off resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextSpeaker {
    Agent(AgentName),
    Terminate(TerminationReason),
}

impl NextSpeaker {
    fn no_eligible() -> Self {
        NextSpeaker::Terminate(TerminationReason::NoEligibleSpeaker)
    }
}

/// Failure to judge a conditional hand-off within the retry bound.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionFailure {
    pub agent: AgentName,
    pub condition: String,
    pub attempts: usize,
    pub error: ReasoningError,
}

/// Resolves the next speaker for a session.
pub struct HandOffResolver {
    gateway: Arc<dyn ReasoningGateway>,
    params: SchedulerParams,
}

impl HandOffResolver {
    pub fn new(gateway: Arc<dyn ReasoningGateway>, params: SchedulerParams) -> Self {
        Self { gateway, params }
    }

    /// Determine who speaks after the latest entry of `state`.
    ///
    /// Consumes the once-only initial-agent precedence and any pending
    /// directive target.
    pub async fn resolve(
        &self,
        registry: &AgentRegistry,
        state: &mut SessionState,
        initial_agent: &AgentName,
        default_fallback: &FallbackPolicy,
    ) -> Result<NextSpeaker, ConditionFailure> {
        if state.take_initial_turn() {
            state.take_pending_next();
            return Ok(NextSpeaker::Agent(initial_agent.clone()));
        }

        if let Some(target) = state.take_pending_next() {
            if registry.contains(target.as_str()) {
                return Ok(NextSpeaker::Agent(target));
            }
            warn!("Routing directive names unknown agent '{}', ignoring", target);
        }

        let Some(last) = state.transcript().last() else {
            return Ok(NextSpeaker::no_eligible());
        };

        let from_human = registry
            .get(last.speaker.as_str())
            .is_some_and(|agent| agent.is_human());
        if from_human || last.role != EntryRole::Assistant {
            // A human, tool or system entry never keeps the floor.
            return Ok(match state.transcript().last_assistant_speaker() {
                Some(previous)
                    if registry
                        .get(previous.as_str())
                        .is_some_and(|agent| !agent.is_human()) =>
                {
                    NextSpeaker::Agent(previous.clone())
                }
                _ => NextSpeaker::no_eligible(),
            });
        }

        let Some(agent) = registry.get(last.speaker.as_str()) else {
            return Ok(NextSpeaker::no_eligible());
        };

        for rule in agent.hand_offs() {
            match rule {
                HandOffRule::OnCondition { target, condition } => {
                    if self.evaluate(agent.name(), condition, state).await? {
                        debug!("Condition '{}' fired: {} -> {}", condition, agent.name(), target);
                        return Ok(NextSpeaker::Agent(target.clone()));
                    }
                }
                HandOffRule::AfterWork { directive } => {
                    return Ok(after_work(registry, agent.name(), directive));
                }
            }
        }

        let fallback = agent.fallback().unwrap_or(default_fallback);
        debug!("No hand-off fired for {}, applying {:?}", agent.name(), fallback);
        Ok(apply_fallback(registry, agent.name(), fallback, state))
    }

    async fn evaluate(
        &self,
        agent: &AgentName,
        condition: &str,
        state: &SessionState,
    ) -> Result<bool, ConditionFailure> {
        let tail = state.transcript().tail_view(self.params.condition_window);
        let attempts = self.params.reply_attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            let call = self.gateway.evaluate_condition(condition, &tail);
            match bounded(self.params.reply_timeout, call).await {
                Ok(verdict) => return Ok(verdict),
                Err(e) => {
                    warn!(
                        "Condition evaluation failed (attempt {}/{}): {}",
                        attempt, attempts, e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(ConditionFailure {
            agent: agent.clone(),
            condition: condition.to_string(),
            attempts,
            error: last_error
                .unwrap_or_else(|| ReasoningError::Unavailable("no attempt was made".into())),
        })
    }
}

fn after_work(registry: &AgentRegistry, last: &AgentName, directive: &AfterWork) -> NextSpeaker {
    match directive {
        AfterWork::Agent(target) => NextSpeaker::Agent(target.clone()),
        AfterWork::Terminate => NextSpeaker::Terminate(TerminationReason::HandOff),
        AfterWork::RevertToHuman => revert_to_human(registry),
        AfterWork::Stay => NextSpeaker::Agent(last.clone()),
    }
}

fn apply_fallback(
    registry: &AgentRegistry,
    last: &AgentName,
    fallback: &FallbackPolicy,
    state: &SessionState,
) -> NextSpeaker {
    match fallback {
        FallbackPolicy::Terminate => NextSpeaker::Terminate(TerminationReason::HandOff),
        FallbackPolicy::RevertToHuman => revert_to_human(registry),
        FallbackPolicy::Stay => NextSpeaker::Agent(last.clone()),
        FallbackPolicy::Custom(select) => {
            match select(last, state.transcript(), state.context()) {
                Some(next) if registry.contains(next.as_str()) => NextSpeaker::Agent(next),
                Some(next) => {
                    warn!("Custom fallback chose unknown agent '{}'", next);
                    NextSpeaker::no_eligible()
                }
                None => NextSpeaker::no_eligible(),
            }
        }
    }
}

fn revert_to_human(registry: &AgentRegistry) -> NextSpeaker {
    match registry.human() {
        Some(human) => NextSpeaker::Agent(human.name().clone()),
        None => NextSpeaker::no_eligible(),
    }
}
