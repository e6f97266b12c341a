//! Agent domain value objects.
//!
//! - [`AgentName`] - unique name of a participant within one registry
//! - [`AgentKind`] - whether the participant is driven by a human or by the
//!   reasoning collaborator

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Reserved speaker name for tool-result entries.
///
/// The tool executor is not a registered agent; it answers tool calls on
/// behalf of whoever issued them.
pub const TOOL_EXECUTOR: &str = "tool_executor";

/// Unique name of an agent within a registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentName(String);

impl AgentName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the tool executor pseudo-speaker.
    pub fn tool_executor() -> Self {
        Self::new(TOOL_EXECUTOR)
    }

    pub fn is_tool_executor(&self) -> bool {
        self.0 == TOOL_EXECUTOR
    }

    /// Names must be non-empty and made of ASCII letters, digits, `_` or `-`.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl<T: Into<String>> From<T> for AgentName {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl Borrow<str> for AgentName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AgentName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AgentName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who drives an agent's turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Replies come from the reasoning collaborator
    #[default]
    Synthetic,
    /// Replies come from outside; the session suspends until one arrives
    Human,
}

impl AgentKind {
    pub fn as_str(&self) -> &str {
        match self {
            AgentKind::Synthetic => "synthetic",
            AgentKind::Human => "human",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_name_from_str() {
        let name: AgentName = "negotiator".into();
        assert_eq!(name.as_str(), "negotiator");
        assert_eq!(name, "negotiator");
        assert_eq!(name.to_string(), "negotiator");
    }

    #[test]
    fn test_agent_name_well_formed() {
        assert!(AgentName::new("Hacking_Checker").is_well_formed());
        assert!(AgentName::new("nested-helper-1").is_well_formed());
        assert!(!AgentName::new("").is_well_formed());
        assert!(!AgentName::new("two words").is_well_formed());
    }

    #[test]
    fn test_tool_executor_name() {
        assert!(AgentName::tool_executor().is_tool_executor());
        assert!(!AgentName::new("negotiator").is_tool_executor());
    }

    #[test]
    fn test_kind_default_is_synthetic() {
        assert_eq!(AgentKind::default(), AgentKind::Synthetic);
        assert_eq!(AgentKind::Human.to_string(), "human");
    }
}
