//! Bargaining sessions: a fixed five-agent topology negotiating the sale
//! of one artwork with a human buyer.
//!
//! ```text
//!  buyer ──► content_filter ──(not a hack)──► deal_closer ──(continues)──► emotion_estimator
//!                 │ otherwise                     │ otherwise                    │ update_buyer_emotion
//!                 ▼                               ▼                              ▼
//!             terminate                       terminate                   bid_estimator
//!                                                                              │ estimate_buyer_bid
//!                                                                              ▼
//!                                                                          negotiator
//! ```

pub mod builder;
pub mod session;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::{BargainingSessionBuilder, BargainingTopology};
pub use session::{BargainReply, BargainingSession};

/// Agent names of the bargaining topology.
pub mod agents {
    pub const CONTENT_FILTER: &str = "content_filter";
    pub const DEAL_CLOSER: &str = "deal_closer";
    pub const EMOTION_ESTIMATOR: &str = "emotion_estimator";
    pub const BID_ESTIMATOR: &str = "bid_estimator";
    pub const NEGOTIATOR: &str = "negotiator";
    pub const BUYER: &str = "buyer";
}

/// Context Store keys shared by the bargaining agents and tools.
pub mod keys {
    pub const CHARACTER_PROFILE: &str = "character_profile";
    pub const ARTWORK_METADATA: &str = "artwork_metadata";
    pub const ARTWORK_NAME: &str = "artwork_name";
    pub const NFT_ID: &str = "nft_id";
    pub const BOTTOM_PRICE: &str = "bottom_price";
    pub const DEAL_PRICE: &str = "deal_price";
    pub const BUYER_BID_ESTIMATE: &str = "buyer_bid_estimate";
    pub const BUYER_BID_CONFIDENCE: &str = "buyer_bid_confidence";
    pub const BUYER_EMOTION: &str = "buyer_emotion";
    pub const BUYER_MESSAGE: &str = "buyer_message";
    pub const WALLET_ADDRESS: &str = "wallet_address";
    pub const SELLER_MOOD: &str = "seller_mood";
    pub const DEAL_CLOSED: &str = "deal_closed";
}
