//! Scheduler parameters - turn loop control.
//!
//! [`SchedulerParams`] groups the static parameters of the
//! [`TurnScheduler`](crate::use_cases::turn_scheduler::TurnScheduler) and
//! [`RoomParams`] those of the long-lived
//! [`ConversationRoom`](crate::use_cases::room::ConversationRoom).
//! These are application-layer concerns, not domain policy.

use atelier_domain::FallbackKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Turn loop control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerParams {
    /// Replies allowed per session before it terminates.
    pub max_rounds: usize,
    /// Extra attempts after a rejected or failed reply.
    pub max_reply_retries: usize,
    /// Timeout for one reasoning call; elapsed calls count as retryable errors.
    pub reply_timeout: Option<Duration>,
    /// An entry whose trimmed content ends with one of these ends the session.
    pub termination_markers: Vec<String>,
    /// Fallback for agents that declare none.
    pub default_fallback: FallbackKind,
    /// Number of trailing entries shown when evaluating a hand-off condition.
    pub condition_window: usize,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            max_rounds: 20,
            max_reply_retries: 3,
            reply_timeout: Some(Duration::from_secs(60)),
            termination_markers: vec!["TERMINATE".to_string()],
            default_fallback: FallbackKind::Terminate,
            condition_window: 6,
        }
    }
}

impl SchedulerParams {
    // ==================== Builder Methods ====================

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_max_reply_retries(mut self, max: usize) -> Self {
        self.max_reply_retries = max;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn with_termination_markers(mut self, markers: Vec<String>) -> Self {
        self.termination_markers = markers;
        self
    }

    pub fn with_default_fallback(mut self, fallback: FallbackKind) -> Self {
        self.default_fallback = fallback;
        self
    }

    pub fn with_condition_window(mut self, window: usize) -> Self {
        self.condition_window = window;
        self
    }

    /// Total attempts per turn, including the first.
    pub fn reply_attempts(&self) -> usize {
        self.max_reply_retries + 1
    }

    /// The marker that `content` ends with, if any.
    pub fn matching_marker(&self, content: &str) -> Option<&str> {
        let trimmed = content.trim_end();
        self.termination_markers
            .iter()
            .map(String::as_str)
            .find(|marker| !marker.is_empty() && trimmed.ends_with(marker))
    }
}

/// Group room parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomParams {
    /// Transcript length above which the room compacts.
    pub transcript_cap: usize,
    /// Entries kept from the start of the transcript when compacting.
    pub retained_head: usize,
    /// Reply budget of the room's session.
    pub max_rounds: usize,
}

impl Default for RoomParams {
    fn default() -> Self {
        Self {
            transcript_cap: 40,
            retained_head: 3,
            max_rounds: 200,
        }
    }
}

impl RoomParams {
    pub fn with_transcript_cap(mut self, cap: usize) -> Self {
        self.transcript_cap = cap;
        self
    }

    pub fn with_retained_head(mut self, head: usize) -> Self {
        self.retained_head = head;
        self
    }

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = SchedulerParams::default();
        assert_eq!(params.max_rounds, 20);
        assert_eq!(params.max_reply_retries, 3);
        assert_eq!(params.reply_attempts(), 4);
        assert_eq!(params.reply_timeout, Some(Duration::from_secs(60)));
        assert_eq!(params.default_fallback, FallbackKind::Terminate);
    }

    #[test]
    fn test_builder_chain() {
        let params = SchedulerParams::default()
            .with_max_rounds(5)
            .with_max_reply_retries(0)
            .with_reply_timeout(None)
            .with_default_fallback(FallbackKind::Stay)
            .with_condition_window(2);

        assert_eq!(params.max_rounds, 5);
        assert_eq!(params.reply_attempts(), 1);
        assert!(params.reply_timeout.is_none());
        assert_eq!(params.default_fallback, FallbackKind::Stay);
        assert_eq!(params.condition_window, 2);
    }

    #[test]
    fn test_matching_marker() {
        let params = SchedulerParams::default()
            .with_termination_markers(vec!["TERMINATE".to_string(), String::new()]);

        assert_eq!(params.matching_marker("All done. TERMINATE  \n"), Some("TERMINATE"));
        assert_eq!(params.matching_marker("TERMINATE the deal? no"), None);
        assert_eq!(params.matching_marker(""), None);
    }

    #[test]
    fn test_room_defaults() {
        let room = RoomParams::default();
        assert_eq!(room.transcript_cap, 40);
        assert_eq!(room.retained_head, 3);

        let room = room.with_transcript_cap(10).with_retained_head(2).with_max_rounds(7);
        assert_eq!((room.transcript_cap, room.retained_head, room.max_rounds), (10, 2, 7));
    }
}
