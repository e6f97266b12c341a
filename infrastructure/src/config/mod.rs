//! Configuration file loading for atelier
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `ATELIER_` environment variables, nested keys split on `__`
//! 2. `--config <path>` specified file
//! 3. Project root: `./atelier.toml` or `./.atelier.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/atelier/config.toml`
//! 5. Default values

mod file_config;
mod loader;
mod validation;

pub use file_config::{
    FileBargainingConfig, FileConfig, FileLoggingConfig, FileRoomConfig, FileSchedulerConfig,
};
pub use loader::ConfigLoader;
pub use validation::{ConfigIssue, ConfigIssueCode, Severity};
