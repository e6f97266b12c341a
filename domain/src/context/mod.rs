//! Context Store: the only shared mutable state of a conversation.

mod store;

pub use store::{ContextDelta, ContextSnapshot, ContextStore};
