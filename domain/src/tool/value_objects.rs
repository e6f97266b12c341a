//! Tool domain value objects - outputs, routing directives and errors
//!
//! A tool returns either a plain value, which is rendered into the
//! transcript, or a [`RoutingDirective`] that can name the next speaker and
//! carry Context Store deltas. A [`ToolError`] never aborts a session: the
//! dispatcher turns it into tool-result content visible to the caller.

use crate::agent::AgentName;
use crate::context::ContextDelta;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error that occurred during tool execution.
///
/// | Code | Description |
/// |------|-------------|
/// | `INVALID_ARGUMENT` | Missing or malformed parameters |
/// | `NOT_FOUND` | Unknown tool or resource |
/// | `EXECUTION_FAILED` | Collaborator failure (wallet, transfer, store) |
/// | `TIMEOUT` | Operation timed out |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", format!("Not found: {}", resource.into()))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            "TIMEOUT",
            format!("Operation timed out: {}", operation.into()),
        )
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Tool result that steers the conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingDirective {
    /// Agent that should speak next
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_agent: Option<AgentName>,
    /// Key/value pairs merged into the Context Store
    #[serde(default, skip_serializing_if = "ContextDelta::is_empty")]
    pub context_updates: ContextDelta,
    /// Text rendered into the transcript for this call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl RoutingDirective {
    /// Directive handing the floor to `agent`.
    pub fn to(agent: impl Into<AgentName>) -> Self {
        Self {
            next_agent: Some(agent.into()),
            ..Self::default()
        }
    }

    /// Directive that only updates shared state.
    pub fn updates_only() -> Self {
        Self::default()
    }

    pub fn with_update(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context_updates.insert(key.into(), value.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Successful result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolOutput {
    /// Plain value, stringified into the transcript
    Value { content: String },
    /// Routing directive (next speaker and/or shared-state deltas)
    Directive(RoutingDirective),
}

impl ToolOutput {
    pub fn value(content: impl Into<String>) -> Self {
        ToolOutput::Value {
            content: content.into(),
        }
    }

    /// Text that goes into the tool-result entry.
    pub fn content(&self) -> &str {
        match self {
            ToolOutput::Value { content } => content,
            ToolOutput::Directive(directive) => directive.value.as_deref().unwrap_or_default(),
        }
    }

    pub fn directive(&self) -> Option<&RoutingDirective> {
        match self {
            ToolOutput::Directive(directive) => Some(directive),
            ToolOutput::Value { .. } => None,
        }
    }
}

impl From<RoutingDirective> for ToolOutput {
    fn from(directive: RoutingDirective) -> Self {
        ToolOutput::Directive(directive)
    }
}
