//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into the application
//! parameter structs, collecting validation issues on the way.

mod bargaining;
mod logging;
mod room;
mod scheduler;

pub use bargaining::FileBargainingConfig;
pub use logging::FileLoggingConfig;
pub use room::FileRoomConfig;
pub use scheduler::FileSchedulerConfig;

use super::validation::ConfigIssue;
use atelier_application::{BargainingParams, RoomParams, SchedulerParams};
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Turn loop settings
    pub scheduler: FileSchedulerConfig,
    /// Long-lived room settings
    pub room: FileRoomConfig,
    /// Bargaining topology settings
    pub bargaining: FileBargainingConfig,
    /// Log destinations
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.scheduler.to_scheduler_params().1);
        issues.extend(self.room.to_room_params().1);
        issues.extend(self.bargaining.to_bargaining_params().1);
        issues
    }

    pub fn scheduler_params(&self) -> SchedulerParams {
        self.scheduler.to_scheduler_params().0
    }

    pub fn room_params(&self) -> RoomParams {
        self.room.to_room_params().0
    }

    pub fn bargaining_params(&self) -> BargainingParams {
        self.bargaining.to_bargaining_params().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[scheduler]
max_rounds = 12
termination_markers = ["TERMINATE", "DONE"]

[room]
transcript_cap = 20
retained_head = 2

[bargaining]
seller_wallet = "sellerWallet"
critic = "critic_1"

[logging]
conversation_log = "logs/events.jsonl"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_empty());
        assert_eq!(config.scheduler_params().max_rounds, 12);
        assert_eq!(
            config.scheduler_params().termination_markers,
            vec!["TERMINATE".to_string(), "DONE".to_string()]
        );
        assert_eq!(config.room_params().transcript_cap, 20);
        assert_eq!(config.bargaining_params().critic, "critic_1");
        assert_eq!(
            config.logging.conversation_log.as_deref(),
            Some(std::path::Path::new("logs/events.jsonl"))
        );
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert_eq!(config.scheduler_params(), SchedulerParams::default());
        assert_eq!(config.room_params(), RoomParams::default());
        // Only the missing seller wallet is reported
        assert_eq!(config.validate().len(), 1);
    }
}
