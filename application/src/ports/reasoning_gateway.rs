//! Reasoning gateway port
//!
//! Defines the interface to the external reasoning collaborator: the
//! capability that produces an agent's next reply and judges hand-off
//! conditions. Implementations (LLM adapters, scripted stubs) live in the
//! infrastructure layer.

use async_trait::async_trait;
use atelier_domain::{
    AgentDescriptor, ContextStore, EntryDraft, ToolCallRequest, ToolDefinition, ViewEntry,
};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the reasoning collaborator.
///
/// Every variant is retryable: the scheduler appends the error as a
/// correction hint and asks again, up to its retry bound.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReasoningError {
    #[error("Reply failed a format check: {0}")]
    FormatViolation(String),

    #[error("Reasoning call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Reasoning collaborator unavailable: {0}")]
    Unavailable(String),
}

impl ReasoningError {
    pub fn is_format_violation(&self) -> bool {
        matches!(self, ReasoningError::FormatViolation(_))
    }
}

/// Everything the collaborator needs to produce one reply.
pub struct ReplyRequest<'a> {
    /// The agent that holds the floor
    pub agent: &'a AgentDescriptor,
    /// Instructions with Context Store placeholders already filled in
    pub instructions: String,
    /// Transcript as seen by the agent, followed by any correction hints
    pub view: Vec<ViewEntry>,
    /// Read-only view of the shared state
    pub shared: &'a ContextStore,
    /// 1-based attempt number within the current turn
    pub attempt: usize,
}

impl ReplyRequest<'_> {
    /// Tools the agent may call in this reply.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.agent.tool_definitions()
    }
}

/// A reply produced by the collaborator, not yet appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReply {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl AgentReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_call(mut self, call: ToolCallRequest) -> Self {
        self.tool_calls.push(call);
        self
    }

    /// Structural check applied before the reply enters the transcript.
    pub fn validate(&self) -> Result<(), ReasoningError> {
        if self.content.trim().is_empty() && self.tool_calls.is_empty() {
            return Err(ReasoningError::FormatViolation(
                "reply has neither content nor tool calls".to_string(),
            ));
        }
        if let Some(call) = self.tool_calls.iter().find(|c| c.tool_name.trim().is_empty()) {
            return Err(ReasoningError::FormatViolation(format!(
                "tool call '{}' has no tool name",
                call.id
            )));
        }
        Ok(())
    }

    /// Turn the reply into a transcript draft spoken by `agent`.
    pub fn into_draft(self, agent: &AgentDescriptor) -> EntryDraft {
        EntryDraft::assistant(agent.name().clone(), self.content).with_tool_calls(self.tool_calls)
    }
}

/// Gateway to the reasoning collaborator.
#[async_trait]
pub trait ReasoningGateway: Send + Sync {
    /// Produce the next reply of `request.agent`. May include tool calls.
    async fn generate_reply(&self, request: ReplyRequest<'_>) -> Result<AgentReply, ReasoningError>;

    /// Judge a natural-language hand-off condition against the transcript tail.
    async fn evaluate_condition(
        &self,
        condition: &str,
        tail: &[ViewEntry],
    ) -> Result<bool, ReasoningError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reply_is_a_format_violation() {
        let err = AgentReply::text("   ").validate().unwrap_err();
        assert!(err.is_format_violation());
    }

    #[test]
    fn test_tool_only_reply_is_valid() {
        let reply = AgentReply::default().with_tool_call(ToolCallRequest::new("c1", "pay"));
        assert!(reply.validate().is_ok());
    }

    #[test]
    fn test_nameless_tool_call_rejected() {
        let reply = AgentReply::text("ok").with_tool_call(ToolCallRequest::new("c9", ""));
        assert!(matches!(
            reply.validate(),
            Err(ReasoningError::FormatViolation(msg)) if msg.contains("c9")
        ));
    }

    #[test]
    fn test_into_draft() {
        let agent = AgentDescriptor::synthetic("negotiator");
        let draft = AgentReply::text("1500 tokens").into_draft(&agent);
        assert_eq!(draft.speaker, "negotiator");
        assert_eq!(draft.content, "1500 tokens");
    }
}
