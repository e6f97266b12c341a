//! Session domain
//!
//! [`SessionState`] holds the transcript, Context Store, round counter and
//! scheduler phase of one conversation run.

pub mod state;

pub use state::{Checkpoint, SchedulerPhase, SessionState, TerminationReason};
