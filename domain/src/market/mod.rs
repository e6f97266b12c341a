//! Market domain
//!
//! Value objects behind the bargaining tools: listings and critiques, the
//! floor-price formula, and the transaction commands used to close a deal.

pub mod command;
pub mod listing;
pub mod pricing;

pub use command::{TransactionCommand, confirmation_template, payment_instruction};
pub use listing::{Critique, Listing, ListingLookupError};
pub use pricing::{PricingFactors, within_tolerance};
