//! Application-level configuration.
//!
//! - [`SchedulerParams`] - turn loop control (rounds, retries, timeouts, markers)
//! - [`RoomParams`] - compaction and budget of long-lived rooms
//! - [`BargainingParams`] - pricing and settlement of bargaining sessions

pub mod bargaining_params;
pub mod scheduler_params;

pub use bargaining_params::BargainingParams;
pub use scheduler_params::{RoomParams, SchedulerParams};
