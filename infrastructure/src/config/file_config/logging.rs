//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where diagnostic logs and conversation telemetry go.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for daily-rolling diagnostic logs
    pub log_dir: Option<PathBuf>,
    /// JSONL file receiving conversation events
    pub conversation_log: Option<PathBuf>,
    /// JSONL file mirroring transcript entries
    pub transcript_log: Option<PathBuf>,
}
