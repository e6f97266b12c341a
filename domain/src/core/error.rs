//! Domain error types
//!
//! Configuration problems are detected while a session topology is
//! assembled and are never retried. Rollback problems are reported to the
//! caller with the session left untouched.

use thiserror::Error;

/// Errors raised while assembling an agent topology.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Agent registry is empty")]
    EmptyRegistry,

    #[error("Invalid agent name: {0:?}")]
    InvalidAgentName(String),

    #[error("Duplicate agent name: {0}")]
    DuplicateAgent(String),

    #[error("Agent '{agent}' hands off to unknown agent '{target}'")]
    UnknownHandOffTarget { agent: String, target: String },

    #[error("Initial agent '{0}' is not registered")]
    UnknownInitialAgent(String),

    #[error("Agent '{0}' is not registered")]
    UnknownAgent(String),

    #[error("More than one human participant: '{first}' and '{second}'")]
    MultipleHumans { first: String, second: String },

    #[error("Agent '{agent}' declares tool '{tool}' twice")]
    DuplicateTool { agent: String, tool: String },
}

/// Errors raised when a session cannot be rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RollbackError {
    #[error("Revision {requested} was discarded by compaction (earliest retained: {earliest})")]
    Compacted { requested: u64, earliest: u64 },

    #[error("Revision {0} does not exist in the transcript")]
    UnknownRevision(u64),

    #[error("Transcript is empty, nothing to roll back")]
    NothingToRollback,
}

impl RollbackError {
    /// Check if this error was caused by transcript compaction
    pub fn is_compacted(&self) -> bool {
        matches!(self, RollbackError::Compacted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_target_display() {
        let error = ConfigurationError::UnknownHandOffTarget {
            agent: "filter".to_string(),
            target: "ghost".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Agent 'filter' hands off to unknown agent 'ghost'"
        );
    }

    #[test]
    fn test_is_compacted_check() {
        assert!(
            RollbackError::Compacted {
                requested: 4,
                earliest: 10
            }
            .is_compacted()
        );
        assert!(!RollbackError::UnknownRevision(3).is_compacted());
        assert!(!RollbackError::NothingToRollback.is_compacted());
    }
}
