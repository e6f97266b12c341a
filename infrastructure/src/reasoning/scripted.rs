//! Scripted reasoning gateway for dry runs and scenario tests.
//!
//! Replies are queued per agent and handed out in order. Hand-off
//! conditions are answered from a separate verdict queue.

use async_trait::async_trait;
use atelier_application::{AgentReply, ReasoningError, ReasoningGateway, ReplyRequest};
use atelier_domain::{ToolCallRequest, ViewEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// One scripted reply.
///
/// ```toml
/// [[turns]]
/// agent = "emotion_estimator"
/// tool_calls = [{ name = "update_buyer_emotion", args = { emotion = "positive" } }]
///
/// [[turns]]
/// agent = "negotiator"
/// content = "Sunset is yours for 1500 tokens."
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedTurn {
    pub agent: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ScriptedToolCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedToolCall {
    pub name: String,
    #[serde(default)]
    pub args: BTreeMap<String, Value>,
}

/// Deterministic [`ReasoningGateway`].
pub struct ScriptedReasoner {
    replies: Mutex<HashMap<String, VecDeque<ScriptedTurn>>>,
    verdicts: Mutex<VecDeque<bool>>,
    default_verdict: bool,
    fallback_reply: Option<String>,
    call_ids: AtomicUsize,
}

impl Default for ScriptedReasoner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedReasoner {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            verdicts: Mutex::new(VecDeque::new()),
            default_verdict: false,
            fallback_reply: None,
            call_ids: AtomicUsize::new(0),
        }
    }

    /// Queue replies, each under its own agent.
    pub fn with_turns(self, turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            for turn in turns {
                replies.entry(turn.agent.clone()).or_default().push_back(turn);
            }
        }
        self
    }

    /// Queue condition verdicts, consumed in order.
    pub fn with_verdicts(self, verdicts: impl IntoIterator<Item = bool>) -> Self {
        if let Ok(mut queue) = self.verdicts.lock() {
            queue.extend(verdicts);
        }
        self
    }

    /// Verdict used once the queue is empty.
    pub fn with_default_verdict(mut self, verdict: bool) -> Self {
        self.default_verdict = verdict;
        self
    }

    /// Text used by agents whose queue is empty. Without one, an empty
    /// queue is reported as [`ReasoningError::Unavailable`].
    pub fn with_fallback_reply(mut self, reply: impl Into<String>) -> Self {
        self.fallback_reply = Some(reply.into());
        self
    }

    /// Replies not yet consumed, per agent.
    pub fn remaining_turns(&self) -> HashMap<String, usize> {
        self.replies
            .lock()
            .map(|replies| {
                replies
                    .iter()
                    .filter(|(_, queue)| !queue.is_empty())
                    .map(|(agent, queue)| (agent.clone(), queue.len()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn to_reply(&self, turn: ScriptedTurn) -> AgentReply {
        turn.tool_calls
            .into_iter()
            .fold(AgentReply::text(turn.content), |reply, call| {
                let id = self.call_ids.fetch_add(1, Ordering::Relaxed) + 1;
                let request = call
                    .args
                    .into_iter()
                    .fold(ToolCallRequest::new(format!("call_{}", id), call.name), |req, (k, v)| {
                        req.with_arg(k, v)
                    });
                reply.with_tool_call(request)
            })
    }
}

#[async_trait]
impl ReasoningGateway for ScriptedReasoner {
    async fn generate_reply(&self, request: ReplyRequest<'_>) -> Result<AgentReply, ReasoningError> {
        let agent = request.agent.name().as_str();
        let next = self
            .replies
            .lock()
            .map_err(|_| ReasoningError::Unavailable("script lock poisoned".to_string()))?
            .get_mut(agent)
            .and_then(VecDeque::pop_front);

        match (next, &self.fallback_reply) {
            (Some(turn), _) => {
                debug!("Scripted reply for {} (attempt {})", agent, request.attempt);
                Ok(self.to_reply(turn))
            }
            (None, Some(fallback)) => Ok(AgentReply::text(fallback.clone())),
            (None, None) => {
                warn!("No scripted reply left for {}", agent);
                Err(ReasoningError::Unavailable(format!(
                    "no scripted reply left for {}",
                    agent
                )))
            }
        }
    }

    async fn evaluate_condition(
        &self,
        condition: &str,
        _tail: &[ViewEntry],
    ) -> Result<bool, ReasoningError> {
        let verdict = self
            .verdicts
            .lock()
            .map_err(|_| ReasoningError::Unavailable("script lock poisoned".to_string()))?
            .pop_front()
            .unwrap_or(self.default_verdict);
        debug!("Scripted verdict for '{}': {}", condition, verdict);
        Ok(verdict)
    }
}
