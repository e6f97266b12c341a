//! Conversation room configuration from TOML (`[room]` section)

use crate::config::validation::ConfigIssue;
use atelier_application::RoomParams;
use serde::{Deserialize, Serialize};

/// Raw room configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoomConfig {
    pub transcript_cap: usize,
    pub retained_head: usize,
    pub max_rounds: usize,
}

impl Default for FileRoomConfig {
    fn default() -> Self {
        let params = RoomParams::default();
        Self {
            transcript_cap: params.transcript_cap,
            retained_head: params.retained_head,
            max_rounds: params.max_rounds,
        }
    }
}

impl FileRoomConfig {
    /// Convert to [`RoomParams`]. An inconsistent cap/head pair falls back
    /// to the default pair.
    pub fn to_room_params(&self) -> (RoomParams, Vec<ConfigIssue>) {
        let defaults = RoomParams::default();
        let mut issues = Vec::new();

        let (cap, head) = if self.retained_head >= self.transcript_cap {
            issues.push(ConfigIssue::constraint(
                "room.retained_head",
                format!(
                    "room.retained_head ({}) must be smaller than room.transcript_cap ({})",
                    self.retained_head, self.transcript_cap
                ),
            ));
            (defaults.transcript_cap, defaults.retained_head)
        } else {
            (self.transcript_cap, self.retained_head)
        };

        let max_rounds = if self.max_rounds == 0 {
            issues.push(ConfigIssue::constraint(
                "room.max_rounds",
                "room.max_rounds must be at least 1, using the default",
            ));
            defaults.max_rounds
        } else {
            self.max_rounds
        };

        let params = RoomParams::default()
            .with_transcript_cap(cap)
            .with_retained_head(head)
            .with_max_rounds(max_rounds);
        (params, issues)
    }
}
