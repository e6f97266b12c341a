//! In-memory implementation of the four market collaborators.
//!
//! Backs the dry-run harness and scenario tests. Balances are keyed by
//! wallet address; a transfer records the new owner of the token.

use async_trait::async_trait;
use atelier_application::{
    CritiqueStore, ListingCatalog, MarketError, MarketPorts, OwnershipTransfer, WalletGateway,
};
use atelier_domain::{Critique, Listing};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Initial market contents, as found in a dry-run script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSeed {
    pub listings: Vec<Listing>,
    pub critiques: Vec<Critique>,
    /// Wallet balances keyed by address
    pub balances: HashMap<String, f64>,
}

/// A completed ownership transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub nft_id: String,
    pub to_address: String,
    pub price: f64,
}

pub struct InMemoryMarket {
    listings: Vec<Listing>,
    critiques: Vec<Critique>,
    balances: Mutex<HashMap<String, f64>>,
    owners: Mutex<HashMap<String, String>>,
    transfers: Mutex<Vec<TransferRecord>>,
}

impl InMemoryMarket {
    pub fn new(seed: MarketSeed) -> Self {
        Self {
            listings: seed.listings,
            critiques: seed.critiques,
            balances: Mutex::new(seed.balances),
            owners: Mutex::new(HashMap::new()),
            transfers: Mutex::new(Vec::new()),
        }
    }

    /// Bundle this market as the ports the bargaining builder expects.
    pub fn ports(self: &Arc<Self>) -> MarketPorts {
        MarketPorts::new(self.clone(), self.clone(), self.clone(), self.clone())
    }

    /// Credit `amount` to `address`, as a buyer payment would.
    pub fn deposit(&self, address: &str, amount: f64) -> Result<(), MarketError> {
        *lock(&self.balances)?.entry(address.to_string()).or_default() += amount;
        Ok(())
    }

    pub fn transfers(&self) -> Vec<TransferRecord> {
        lock(&self.transfers).map(|t| t.clone()).unwrap_or_default()
    }

    pub fn owner_of(&self, nft_id: &str) -> Option<String> {
        lock(&self.owners).ok()?.get(nft_id).cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, MarketError> {
    mutex
        .lock()
        .map_err(|_| MarketError::Storage("market state poisoned".to_string()))
}

#[async_trait]
impl ListingCatalog for InMemoryMarket {
    async fn listing_by_id(&self, nft_id: &str) -> Result<Option<Listing>, MarketError> {
        Ok(self.listings.iter().find(|l| l.nft_id == nft_id).cloned())
    }

    async fn listings_by_name(&self, artwork_name: &str) -> Result<Vec<Listing>, MarketError> {
        Ok(self
            .listings
            .iter()
            .filter(|l| l.artwork_name == artwork_name)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CritiqueStore for InMemoryMarket {
    async fn critique(&self, critic: &str, nft_id: &str) -> Result<Option<Critique>, MarketError> {
        Ok(self
            .critiques
            .iter()
            .find(|c| c.critic == critic && c.nft_id == nft_id)
            .cloned())
    }
}

#[async_trait]
impl WalletGateway for InMemoryMarket {
    async fn balance(&self, address: &str) -> Result<f64, MarketError> {
        Ok(lock(&self.balances)?.get(address).copied().unwrap_or_default())
    }
}

#[async_trait]
impl OwnershipTransfer for InMemoryMarket {
    async fn transfer(&self, nft_id: &str, to_address: &str, price: f64) -> Result<(), MarketError> {
        if !self.listings.iter().any(|l| l.nft_id == nft_id) {
            return Err(MarketError::Transfer(format!("unknown token {}", nft_id)));
        }
        let mut owners = lock(&self.owners)?;
        if let Some(owner) = owners.get(nft_id) {
            return Err(MarketError::Transfer(format!(
                "token {} already belongs to {}",
                nft_id, owner
            )));
        }
        owners.insert(nft_id.to_string(), to_address.to_string());
        lock(&self.transfers)?.push(TransferRecord {
            nft_id: nft_id.to_string(),
            to_address: to_address.to_string(),
            price,
        });
        info!("Token {} transferred to {} for {}", nft_id, to_address, price);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> InMemoryMarket {
        InMemoryMarket::new(MarketSeed {
            listings: vec![Listing::new("42", "Sunset"), Listing::new("43", "Sunset")],
            critiques: vec![],
            balances: HashMap::from([("seller".to_string(), 10.0)]),
        })
    }

    #[tokio::test]
    async fn test_balances_and_deposits() {
        let market = market();
        assert_eq!(market.balance("seller").await.unwrap(), 10.0);
        assert_eq!(market.balance("nobody").await.unwrap(), 0.0);

        market.deposit("seller", 1500.0).unwrap();
        assert_eq!(market.balance("seller").await.unwrap(), 1510.0);
    }

    #[tokio::test]
    async fn test_transfer_records_owner_once() {
        let market = market();
        market.transfer("42", "buyer", 1500.0).await.unwrap();

        assert_eq!(market.owner_of("42").as_deref(), Some("buyer"));
        assert_eq!(market.transfers().len(), 1);

        let again = market.transfer("42", "other", 1.0).await.unwrap_err();
        assert!(matches!(again, MarketError::Transfer(_)));
        let unknown = market.transfer("99", "buyer", 1.0).await.unwrap_err();
        assert!(matches!(unknown, MarketError::Transfer(_)));
    }

    #[tokio::test]
    async fn test_name_lookup_returns_every_match() {
        let market = market();
        assert_eq!(market.listings_by_name("Sunset").await.unwrap().len(), 2);
        assert!(market.listing_by_id("44").await.unwrap().is_none());
    }
}
