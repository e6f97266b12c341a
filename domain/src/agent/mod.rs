//! Agent domain module
//!
//! Participants of a conversation and the rules that move the floor
//! between them.
//!
//! - [`value_objects`] - [`AgentName`], [`AgentKind`]
//! - [`handoff`] - [`HandOffRule`], [`AfterWork`], [`FallbackPolicy`]
//! - [`descriptor`] - [`AgentDescriptor`]
//! - [`registry`] - [`AgentRegistry`]
//! - [`persona`] - mood, relations and plans, kept apart from descriptors

pub mod descriptor;
pub mod handoff;
pub mod persona;
pub mod registry;
pub mod value_objects;

pub use descriptor::AgentDescriptor;
pub use handoff::{AfterWork, FallbackKind, FallbackPolicy, HandOffRule, SpeakerSelector};
pub use persona::{Emotion, Mood, PersonaBook, PersonaState};
pub use registry::AgentRegistry;
pub use value_objects::{AgentKind, AgentName, TOOL_EXECUTOR};
