//! Domain layer for atelier
//!
//! This crate contains the core entities and value objects of the
//! multi-agent conversation orchestrator. It performs no I/O.
//!
//! # Core Concepts
//!
//! ## Agents and hand-offs
//!
//! - **Agent Descriptor**: a named participant with tools, ordered hand-off
//!   rules and a fallback policy
//! - **Agent Registry**: an arena of descriptors indexed by name, validated
//!   before a session starts
//!
//! ## Shared state
//!
//! - **Context Store**: the key/value state shared by every agent and tool
//!   of one session
//! - **Transcript**: the append-only log, stamped with logical revisions
//!
//! ## Market
//!
//! Listings, critiques, floor pricing and transaction commands used by the
//! bargaining topology.

pub mod agent;
pub mod context;
pub mod core;
pub mod market;
pub mod session;
pub mod tool;
pub mod transcript;
pub mod util;

// Re-export commonly used types
pub use agent::{
    AfterWork, AgentDescriptor, AgentKind, AgentName, AgentRegistry, Emotion, FallbackKind,
    FallbackPolicy, HandOffRule, Mood, PersonaBook, PersonaState, SpeakerSelector, TOOL_EXECUTOR,
};
pub use context::{ContextDelta, ContextSnapshot, ContextStore};
pub use core::error::{ConfigurationError, RollbackError};
pub use market::{
    Critique, Listing, ListingLookupError, PricingFactors, TransactionCommand,
    confirmation_template, payment_instruction, within_tolerance,
};
pub use session::{Checkpoint, SchedulerPhase, SessionState, TerminationReason};
pub use tool::{
    entities::{ToolCallRequest, ToolCallResult, ToolDefinition, ToolParameter},
    traits::{AgentTool, FnTool, ToolInvocation},
    value_objects::{RoutingDirective, ToolError, ToolOutput},
};
pub use transcript::{
    Compaction, EntryDraft, EntryRole, OWN_SPEAKER_LABEL, Revision, Transcript, TranscriptEntry,
    ViewEntry, ViewRole,
};
