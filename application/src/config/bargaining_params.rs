//! Bargaining session parameters.

use atelier_domain::PricingFactors;
use atelier_domain::market::pricing::BALANCE_TOLERANCE;
use serde::{Deserialize, Serialize};

/// Parameters of the bargaining topology and its tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BargainingParams {
    /// Reply budget of one bargaining round.
    pub max_rounds: usize,
    /// `bottom_price` seeded into every new negotiation.
    pub initial_bottom_price: f64,
    /// Relative tolerance when checking a claimed wallet balance.
    pub balance_tolerance: f64,
    /// Coefficients of the floor-price formula.
    pub pricing: PricingFactors,
    /// Wallet that receives payments.
    pub seller_wallet: String,
    /// Critic whose reviews drive the floor price.
    pub critic: String,
    /// Persona description shown to the negotiator.
    pub character_profile: String,
}

impl Default for BargainingParams {
    fn default() -> Self {
        Self {
            max_rounds: 20,
            initial_bottom_price: 1000.0,
            balance_tolerance: BALANCE_TOLERANCE,
            pricing: PricingFactors::default(),
            seller_wallet: String::new(),
            critic: String::new(),
            character_profile: String::new(),
        }
    }
}

impl BargainingParams {
    pub fn with_seller_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.seller_wallet = wallet.into();
        self
    }

    pub fn with_critic(mut self, critic: impl Into<String>) -> Self {
        self.critic = critic.into();
        self
    }

    pub fn with_character_profile(mut self, profile: impl Into<String>) -> Self {
        self.character_profile = profile.into();
        self
    }

    pub fn with_pricing(mut self, pricing: PricingFactors) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_initial_bottom_price(mut self, price: f64) -> Self {
        self.initial_bottom_price = price;
        self
    }

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = BargainingParams::default();
        assert_eq!(params.max_rounds, 20);
        assert_eq!(params.initial_bottom_price, 1000.0);
        assert_eq!(params.balance_tolerance, 0.1);
    }

    #[test]
    fn test_builders() {
        let params = BargainingParams::default()
            .with_seller_wallet("seller")
            .with_critic("critic_1")
            .with_initial_bottom_price(500.0);
        assert_eq!(params.seller_wallet, "seller");
        assert_eq!(params.critic, "critic_1");
        assert_eq!(params.initial_bottom_price, 500.0);
    }
}
