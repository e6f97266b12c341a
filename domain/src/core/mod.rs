//! Core domain concepts shared across all subdomains.
//!
//! - [`error::ConfigurationError`] - topology assembly failures
//! - [`error::RollbackError`] - rollback requests that cannot be honored

pub mod error;
