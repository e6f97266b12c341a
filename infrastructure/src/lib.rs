//! Infrastructure layer for atelier
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod market;
pub mod reasoning;

// Re-export commonly used types
pub use config::{
    ConfigIssue, ConfigLoader, FileBargainingConfig, FileConfig, FileLoggingConfig,
    FileRoomConfig, FileSchedulerConfig,
};
pub use logging::{JsonlConversationLogger, JsonlTranscriptSink};
pub use market::{InMemoryMarket, MarketSeed, TransferRecord};
pub use reasoning::{ScriptedReasoner, ScriptedToolCall, ScriptedTurn};
