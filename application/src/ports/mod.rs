//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod conversation_logger;
pub mod market;
pub mod reasoning_gateway;
pub mod transcript_sink;
