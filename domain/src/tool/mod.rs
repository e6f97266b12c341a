//! Tool domain
//!
//! - [`entities`] - tool definitions, call requests and per-call results
//! - [`value_objects`] - tool outputs, routing directives and errors
//! - [`traits`] - the [`AgentTool`](traits::AgentTool) seam

pub mod entities;
pub mod traits;
pub mod value_objects;
