//! Market collaborators used by the bargaining tools.
//!
//! Listing storage, critique storage, wallet balances and ownership
//! transfer are owned by the embedding application. The orchestrator only
//! sees these narrow async interfaces.

use async_trait::async_trait;
use atelier_domain::{Critique, Listing};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),
}

/// Public listing lookup.
#[async_trait]
pub trait ListingCatalog: Send + Sync {
    async fn listing_by_id(&self, nft_id: &str) -> Result<Option<Listing>, MarketError>;

    async fn listings_by_name(&self, artwork_name: &str) -> Result<Vec<Listing>, MarketError>;
}

/// Critique records keyed by critic and token.
#[async_trait]
pub trait CritiqueStore: Send + Sync {
    async fn critique(&self, critic: &str, nft_id: &str) -> Result<Option<Critique>, MarketError>;
}

/// On-chain balance lookup.
#[async_trait]
pub trait WalletGateway: Send + Sync {
    async fn balance(&self, address: &str) -> Result<f64, MarketError>;
}

/// Ownership transfer of a token to a buyer.
#[async_trait]
pub trait OwnershipTransfer: Send + Sync {
    async fn transfer(&self, nft_id: &str, to_address: &str, price: f64)
    -> Result<(), MarketError>;
}

/// The four market collaborators, bundled for the bargaining builder.
#[derive(Clone)]
pub struct MarketPorts {
    pub catalog: Arc<dyn ListingCatalog>,
    pub critiques: Arc<dyn CritiqueStore>,
    pub wallet: Arc<dyn WalletGateway>,
    pub transfer: Arc<dyn OwnershipTransfer>,
}

impl MarketPorts {
    pub fn new(
        catalog: Arc<dyn ListingCatalog>,
        critiques: Arc<dyn CritiqueStore>,
        wallet: Arc<dyn WalletGateway>,
        transfer: Arc<dyn OwnershipTransfer>,
    ) -> Self {
        Self {
            catalog,
            critiques,
            wallet,
            transfer,
        }
    }
}
