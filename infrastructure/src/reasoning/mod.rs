//! Reasoning gateway adapters.
//!
//! Only a deterministic, scripted gateway ships here. Model-backed adapters
//! implement the same [`ReasoningGateway`](atelier_application::ReasoningGateway)
//! port outside this workspace.

mod scripted;

pub use scripted::{ScriptedReasoner, ScriptedToolCall, ScriptedTurn};
