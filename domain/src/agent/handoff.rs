//! Hand-off rules and fallback policies.
//!
//! An agent carries an ordered list of [`HandOffRule`]s, evaluated top to
//! bottom after it speaks. When no rule fires, its [`FallbackPolicy`] (or
//! the session default) decides what happens next.
//!
//! ```text
//!   last speaker ──► rule 1 (condition?) ──► rule 2 ... ──► fallback
//!                        │ true                               │
//!                        ▼                                    ▼
//!                     target            Terminate / RevertToHuman / Stay / Custom
//! ```

use super::value_objects::AgentName;
use crate::context::ContextStore;
use crate::transcript::Transcript;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Unconditional after-work directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfterWork {
    /// Transfer to a named agent
    Agent(AgentName),
    /// End the session
    Terminate,
    /// Hand the floor to the human participant
    RevertToHuman,
    /// Let the same agent speak again
    Stay,
}

/// One declarative transfer-of-control edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandOffRule {
    /// Transfer when the reasoning collaborator judges `condition` true
    OnCondition { target: AgentName, condition: String },
    /// Always fires when reached
    AfterWork { directive: AfterWork },
}

impl HandOffRule {
    pub fn on_condition(target: impl Into<AgentName>, condition: impl Into<String>) -> Self {
        HandOffRule::OnCondition {
            target: target.into(),
            condition: condition.into(),
        }
    }

    pub fn after_work(directive: AfterWork) -> Self {
        HandOffRule::AfterWork { directive }
    }

    /// Shorthand for an unconditional transfer to `target`.
    pub fn always(target: impl Into<AgentName>) -> Self {
        Self::after_work(AfterWork::Agent(target.into()))
    }

    /// The agent this rule can transfer to, if any.
    pub fn target(&self) -> Option<&AgentName> {
        match self {
            HandOffRule::OnCondition { target, .. } => Some(target),
            HandOffRule::AfterWork {
                directive: AfterWork::Agent(target),
            } => Some(target),
            HandOffRule::AfterWork { .. } => None,
        }
    }
}

/// Caller-supplied next-speaker function for [`FallbackPolicy::Custom`].
///
/// Receives the last speaker, the transcript and the Context Store.
/// Returning `None` ends the session.
pub type SpeakerSelector =
    Arc<dyn Fn(&AgentName, &Transcript, &ContextStore) -> Option<AgentName> + Send + Sync>;

/// What happens when none of an agent's hand-off rules fire.
#[derive(Clone, Default)]
pub enum FallbackPolicy {
    #[default]
    Terminate,
    RevertToHuman,
    Stay,
    Custom(SpeakerSelector),
}

impl FallbackPolicy {
    pub fn custom<F>(selector: F) -> Self
    where
        F: Fn(&AgentName, &Transcript, &ContextStore) -> Option<AgentName> + Send + Sync + 'static,
    {
        FallbackPolicy::Custom(Arc::new(selector))
    }

    pub fn kind(&self) -> Option<FallbackKind> {
        match self {
            FallbackPolicy::Terminate => Some(FallbackKind::Terminate),
            FallbackPolicy::RevertToHuman => Some(FallbackKind::RevertToHuman),
            FallbackPolicy::Stay => Some(FallbackKind::Stay),
            FallbackPolicy::Custom(_) => None,
        }
    }
}

impl std::fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackPolicy::Terminate => write!(f, "Terminate"),
            FallbackPolicy::RevertToHuman => write!(f, "RevertToHuman"),
            FallbackPolicy::Stay => write!(f, "Stay"),
            FallbackPolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Serializable subset of [`FallbackPolicy`], used by configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    #[default]
    Terminate,
    RevertToHuman,
    Stay,
}

impl FallbackKind {
    pub fn as_str(&self) -> &str {
        match self {
            FallbackKind::Terminate => "terminate",
            FallbackKind::RevertToHuman => "revert_to_human",
            FallbackKind::Stay => "stay",
        }
    }
}

impl From<FallbackKind> for FallbackPolicy {
    fn from(kind: FallbackKind) -> Self {
        match kind {
            FallbackKind::Terminate => FallbackPolicy::Terminate,
            FallbackKind::RevertToHuman => FallbackPolicy::RevertToHuman,
            FallbackKind::Stay => FallbackPolicy::Stay,
        }
    }
}

impl FromStr for FallbackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "terminate" => Ok(FallbackKind::Terminate),
            "revert_to_human" | "human" => Ok(FallbackKind::RevertToHuman),
            "stay" => Ok(FallbackKind::Stay),
            other => Err(format!("unknown fallback policy: {other}")),
        }
    }
}

impl std::fmt::Display for FallbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
