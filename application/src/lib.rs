//! Application layer for atelier
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{BargainingParams, RoomParams, SchedulerParams};
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    market::{
        CritiqueStore, ListingCatalog, MarketError, MarketPorts, OwnershipTransfer, WalletGateway,
    },
    reasoning_gateway::{AgentReply, ReasoningError, ReasoningGateway, ReplyRequest},
    transcript_sink::{NoTranscriptSink, TranscriptSink, TranscriptSinkError},
};
pub use use_cases::bargaining::{
    BargainReply, BargainingSession, BargainingSessionBuilder, BargainingTopology,
};
pub use use_cases::hand_off::{HandOffResolver, NextSpeaker};
pub use use_cases::room::ConversationRoom;
pub use use_cases::tool_dispatcher::{DispatchOutcome, ToolDispatcher, ToolResolution};
pub use use_cases::turn_scheduler::{
    IncomingMessage, SessionError, SessionHandle, StartSessionInput, TurnOutcome, TurnScheduler,
};
