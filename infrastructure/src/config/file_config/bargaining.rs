//! Bargaining configuration from TOML (`[bargaining]` section)

use crate::config::validation::ConfigIssue;
use atelier_application::BargainingParams;
use atelier_domain::PricingFactors;
use serde::{Deserialize, Serialize};

/// Raw bargaining configuration from TOML.
///
/// # Example
///
/// ```toml
/// [bargaining]
/// seller_wallet = "7Kwp9Qv"
/// critic = "critic_1"
/// initial_bottom_price = 1000.0
/// balance_tolerance = 0.1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBargainingConfig {
    pub max_rounds: usize,
    pub initial_bottom_price: f64,
    pub balance_tolerance: f64,
    pub critique_price_factor: f64,
    pub positive_mood_factor: f64,
    pub negative_mood_factor: f64,
    pub seller_wallet: String,
    pub critic: String,
    pub character_profile: String,
}

impl Default for FileBargainingConfig {
    fn default() -> Self {
        let params = BargainingParams::default();
        Self {
            max_rounds: params.max_rounds,
            initial_bottom_price: params.initial_bottom_price,
            balance_tolerance: params.balance_tolerance,
            critique_price_factor: params.pricing.critique,
            positive_mood_factor: params.pricing.positive_mood,
            negative_mood_factor: params.pricing.negative_mood,
            seller_wallet: params.seller_wallet,
            critic: params.critic,
            character_profile: params.character_profile,
        }
    }
}

impl FileBargainingConfig {
    pub fn to_bargaining_params(&self) -> (BargainingParams, Vec<ConfigIssue>) {
        let defaults = BargainingParams::default();
        let mut issues = Vec::new();

        let balance_tolerance = if self.balance_tolerance > 0.0 && self.balance_tolerance < 1.0 {
            self.balance_tolerance
        } else {
            issues.push(ConfigIssue::constraint(
                "bargaining.balance_tolerance",
                format!(
                    "bargaining.balance_tolerance must be between 0 and 1 (exclusive), got {}",
                    self.balance_tolerance
                ),
            ));
            defaults.balance_tolerance
        };

        let max_rounds = if self.max_rounds == 0 {
            issues.push(ConfigIssue::constraint(
                "bargaining.max_rounds",
                "bargaining.max_rounds must be at least 1, using the default",
            ));
            defaults.max_rounds
        } else {
            self.max_rounds
        };

        if self.seller_wallet.trim().is_empty() {
            issues.push(ConfigIssue::constraint(
                "bargaining.seller_wallet",
                "bargaining.seller_wallet is empty; payment instructions will fail",
            ));
        }

        let mut params = BargainingParams::default()
            .with_max_rounds(max_rounds)
            .with_initial_bottom_price(self.initial_bottom_price)
            .with_pricing(PricingFactors {
                critique: self.critique_price_factor,
                positive_mood: self.positive_mood_factor,
                negative_mood: self.negative_mood_factor,
            })
            .with_seller_wallet(self.seller_wallet.clone())
            .with_critic(self.critic.clone())
            .with_character_profile(self.character_profile.clone());
        params.balance_tolerance = balance_tolerance;
        (params, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bargaining_config_deserialize() {
        let toml_str = r#"
[bargaining]
seller_wallet = "sellerWallet"
critic = "critic_1"
critique_price_factor = 100.0
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let (params, issues) = config.bargaining.to_bargaining_params();
        assert!(issues.is_empty());
        assert_eq!(params.seller_wallet, "sellerWallet");
        assert_eq!(params.pricing.critique, 100.0);
        assert_eq!(params.initial_bottom_price, 1000.0);
    }

    #[test]
    fn test_bargaining_config_flags_tolerance_and_wallet() {
        let config = FileBargainingConfig {
            balance_tolerance: 1.5,
            ..Default::default()
        };
        let (params, issues) = config.to_bargaining_params();
        assert_eq!(issues.len(), 2);
        assert_eq!(params.balance_tolerance, 0.1);
    }
}
