//! In-memory market and scripted reasoning used by the bargaining tests.

use crate::ports::market::{
    CritiqueStore, ListingCatalog, MarketError, MarketPorts, OwnershipTransfer, WalletGateway,
};
use crate::ports::reasoning_gateway::{AgentReply, ReasoningError, ReasoningGateway, ReplyRequest};
use async_trait::async_trait;
use atelier_domain::{Critique, Listing, ToolCallRequest, ViewEntry};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub(crate) struct MockMarket {
    listings: Vec<Listing>,
    critiques: Vec<Critique>,
    pub balance: Mutex<f64>,
    pub transfers: Mutex<Vec<(String, String, f64)>>,
}

impl MockMarket {
    pub fn new(balance: f64) -> Arc<Self> {
        Arc::new(Self {
            listings: vec![
                Listing::new("42", "Sunset").with_description("Orange sky over the bay"),
                Listing::new("43", "Harbor").with_creator("painter"),
                Listing::new("44", "Harbor"),
            ],
            critiques: vec![Critique {
                critic: "critic_1".to_string(),
                nft_id: "42".to_string(),
                overall_score: 8.0,
                notes: String::new(),
            }],
            balance: Mutex::new(balance),
            transfers: Mutex::new(Vec::new()),
        })
    }

    pub fn ports(self: &Arc<Self>) -> MarketPorts {
        MarketPorts::new(self.clone(), self.clone(), self.clone(), self.clone())
    }

    pub fn set_balance(&self, balance: f64) {
        *self.balance.lock().unwrap() = balance;
    }
}

#[async_trait]
impl ListingCatalog for MockMarket {
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
impl CritiqueStore for MockMarket {
    async fn critique(&self, critic: &str, nft_id: &str) -> Result<Option<Critique>, MarketError> {
        Ok(self
            .critiques
            .iter()
            .find(|c| c.critic == critic && c.nft_id == nft_id)
            .cloned())
    }
}

#[async_trait]
impl WalletGateway for MockMarket {
    async fn balance(&self, _address: &str) -> Result<f64, MarketError> {
        Ok(*self.balance.lock().unwrap())
    }
}

#[async_trait]
impl OwnershipTransfer for MockMarket {
    async fn transfer(&self, nft_id: &str, to_address: &str, price: f64) -> Result<(), MarketError> {
        self.transfers
            .lock()
            .unwrap()
            .push((nft_id.to_string(), to_address.to_string(), price));
        Ok(())
    }
}

/// Per-agent reply queues plus a queue of condition verdicts.
#[derive(Default)]
pub(crate) struct ScriptedNegotiation {
    replies: Mutex<HashMap<String, VecDeque<AgentReply>>>,
    conditions: Mutex<VecDeque<bool>>,
}

impl ScriptedNegotiation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn says(self, agent: &str, content: &str) -> Self {
        self.push(agent, AgentReply::text(content))
    }

    pub fn calls(self, agent: &str, tool: &str, args: &[(&str, Value)]) -> Self {
        let mut call = ToolCallRequest::new(format!("call_{}", tool), tool);
        for (key, value) in args {
            call = call.with_arg(*key, value.clone());
        }
        self.push(agent, AgentReply::default().with_tool_call(call))
    }

    pub fn condition(self, verdict: bool) -> Self {
        self.conditions.lock().unwrap().push_back(verdict);
        self
    }

    fn push(self, agent: &str, reply: AgentReply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(agent.to_string())
            .or_default()
            .push_back(reply);
        self
    }
}

#[async_trait]
impl ReasoningGateway for ScriptedNegotiation {
    async fn generate_reply(&self, request: ReplyRequest<'_>) -> Result<AgentReply, ReasoningError> {
        let name = request.agent.name().to_string();
        let scripted = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&name)
            .and_then(|queue| queue.pop_front());
        Ok(scripted.unwrap_or_else(|| AgentReply::text(format!("{} has nothing to add", name))))
    }

    async fn evaluate_condition(
        &self,
        _condition: &str,
        _tail: &[ViewEntry],
    ) -> Result<bool, ReasoningError> {
        Ok(self.conditions.lock().unwrap().pop_front().unwrap_or(false))
    }
}
