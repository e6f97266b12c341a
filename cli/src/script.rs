//! Dry-run scripts for `atelier bargain`.
//!
//! ```toml
//! verdicts = [true, true]
//!
//! [market]
//! listings = [{ nft_id = "42", artwork_name = "Sunset" }]
//! critiques = [{ critic = "critic_1", nft_id = "42", overall_score = 8.0 }]
//! balances = { sellerWallet = 100.0 }
//!
//! [[turns]]
//! agent = "negotiator"
//! content = "Sunset is yours for 1500 tokens."
//!
//! [[messages]]
//! text = "How much for Sunset?"
//! ```

use anyhow::{Context, Result};
use atelier_domain::Mood;
use atelier_infrastructure::{MarketSeed, ScriptedReasoner, ScriptedTurn};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct BargainScript {
    #[serde(default)]
    pub market: MarketSeed,
    #[serde(default)]
    pub turns: Vec<ScriptedTurn>,
    #[serde(default)]
    pub verdicts: Vec<bool>,
    #[serde(default)]
    pub default_verdict: bool,
    /// Reply for agents whose scripted turns ran out
    pub fallback_reply: Option<String>,
    /// Seller mood fed into the floor price
    pub seller_mood: Option<Mood>,
    pub messages: Vec<BuyerMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuyerMessage {
    pub text: String,
    /// Payment credited before the message is sent
    pub deposit: Option<Deposit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Deposit {
    pub address: String,
    pub amount: f64,
}

impl BargainScript {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing script {}", path.display()))
    }

    pub fn reasoner(&self) -> ScriptedReasoner {
        let reasoner = ScriptedReasoner::new()
            .with_turns(self.turns.clone())
            .with_verdicts(self.verdicts.iter().copied())
            .with_default_verdict(self.default_verdict);
        match &self.fallback_reply {
            Some(reply) => reasoner.with_fallback_reply(reply.clone()),
            None => reasoner,
        }
    }
}
