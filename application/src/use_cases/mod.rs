//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod bargaining;
pub mod hand_off;
pub mod room;
pub(crate) mod shared;
pub mod tool_dispatcher;
pub mod turn_scheduler;
