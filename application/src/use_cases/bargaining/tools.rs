//! Tools exposed by the bargaining agents.
//!
//! | Tool | Agent | Routes to |
//! |------|-------|-----------|
//! | `update_buyer_emotion` | emotion estimator | bid estimator |
//! | `estimate_buyer_bid` | bid estimator | negotiator |
//! | `reveal_listing_info` | negotiator | negotiator |
//! | `estimate_floor_price` | negotiator | negotiator |
//! | `provide_payment_instruction` | deal closer | negotiator |
//! | `confirm_and_transfer` | deal closer | (caller) |

use super::agents::{BID_ESTIMATOR, NEGOTIATOR};
use super::keys;
use crate::ports::market::{
    CritiqueStore, ListingCatalog, MarketError, OwnershipTransfer, WalletGateway,
};
use async_trait::async_trait;
use atelier_domain::market::command::{INVALID_COMMAND_REPLY, TRANSFER_DONE_REPLY};
use atelier_domain::util::round_to;
use atelier_domain::{
    AgentTool, ContextStore, Listing, ListingLookupError, Mood, PricingFactors, RoutingDirective,
    ToolDefinition, ToolError, ToolInvocation, ToolOutput, ToolParameter, TransactionCommand,
    confirmation_template, payment_instruction, within_tolerance,
};
use std::sync::Arc;
use tracing::{info, warn};

pub const UPDATE_BUYER_EMOTION: &str = "update_buyer_emotion";
pub const ESTIMATE_BUYER_BID: &str = "estimate_buyer_bid";
pub const REVEAL_LISTING_INFO: &str = "reveal_listing_info";
pub const ESTIMATE_FLOOR_PRICE: &str = "estimate_floor_price";
pub const PROVIDE_PAYMENT_INSTRUCTION: &str = "provide_payment_instruction";
pub const CONFIRM_AND_TRANSFER: &str = "confirm_and_transfer";

const BUYER_EMOTION_LABELS: [&str; 3] = ["positive", "negative", "neutral"];
const MISSING_CRITIQUE_REPLY: &str =
    "Oops, something went wrong. I cannot find the artwork you are looking for.";

// ==================== Buyer estimation ====================

/// Records the buyer's emotional state.
pub struct UpdateBuyerEmotionTool {
    definition: ToolDefinition,
}

impl Default for UpdateBuyerEmotionTool {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateBuyerEmotionTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                UPDATE_BUYER_EMOTION,
                "Update the buyer's emotion based on the buyer's messages",
            )
            .with_parameter(ToolParameter::new(
                "emotion",
                "One of: positive, negative, neutral",
                true,
            )),
        }
    }
}

#[async_trait]
impl AgentTool for UpdateBuyerEmotionTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, invocation: ToolInvocation<'_>) -> Result<ToolOutput, ToolError> {
        let label = invocation
            .call
            .require_string("emotion")
            .map_err(ToolError::invalid_argument)?
            .trim()
            .to_lowercase();
        if !BUYER_EMOTION_LABELS.contains(&label.as_str()) {
            return Err(ToolError::invalid_argument(format!(
                "Unknown emotion label '{}', expected one of {}",
                label,
                BUYER_EMOTION_LABELS.join(", ")
            )));
        }

        Ok(RoutingDirective::to(BID_ESTIMATOR)
            .with_update(keys::BUYER_EMOTION, label.clone())
            .with_value(format!("Buyer emotion recorded as {}.", label))
            .into())
    }
}

/// Records the estimated bid of the buyer and the confidence of the estimate.
pub struct EstimateBuyerBidTool {
    definition: ToolDefinition,
}

impl Default for EstimateBuyerBidTool {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimateBuyerBidTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                ESTIMATE_BUYER_BID,
                "Estimate the buyer's bid based on the buyer's messages",
            )
            .with_parameter(
                ToolParameter::new("forecast", "Expected bid of the buyer", true)
                    .with_type("number"),
            )
            .with_parameter(
                ToolParameter::new("confidence", "Confidence between 0 and 1", true)
                    .with_type("number"),
            ),
        }
    }
}

#[async_trait]
impl AgentTool for EstimateBuyerBidTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, invocation: ToolInvocation<'_>) -> Result<ToolOutput, ToolError> {
        let call = invocation.call;
        let forecast = call.require_f64("forecast").map_err(ToolError::invalid_argument)?;
        let confidence = call.require_f64("confidence").map_err(ToolError::invalid_argument)?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ToolError::invalid_argument(format!(
                "confidence must be between 0 and 1, got {}",
                confidence
            )));
        }

        Ok(RoutingDirective::to(NEGOTIATOR)
            .with_update(keys::BUYER_BID_ESTIMATE, forecast)
            .with_update(keys::BUYER_BID_CONFIDENCE, confidence)
            .with_value(format!(
                "Estimated buyer bid {} (confidence {}).",
                forecast, confidence
            ))
            .into())
    }
}

// ==================== Listings and pricing ====================

/// Resolve a listing from an optional token id and an optional name.
///
/// The token id wins when both are given, but the name must then match.
pub async fn resolve_listing(
    catalog: &dyn ListingCatalog,
    nft_id: Option<&str>,
    artwork_name: Option<&str>,
) -> Result<Listing, ToolError> {
    let lookup_error = |e: ListingLookupError| match e {
        ListingLookupError::UnknownNftId(_) | ListingLookupError::UnknownName(_) => {
            ToolError::new("NOT_FOUND", e.to_string())
        }
        _ => ToolError::invalid_argument(e.to_string()),
    };
    let storage_error = |e: MarketError| ToolError::execution_failed(e.to_string());

    match (nft_id, artwork_name) {
        (None, None) => Err(lookup_error(ListingLookupError::MissingSelector)),
        (Some(nft_id), name) => {
            let listing = catalog
                .listing_by_id(nft_id)
                .await
                .map_err(storage_error)?
                .ok_or_else(|| lookup_error(ListingLookupError::UnknownNftId(nft_id.to_string())))?;
            if let Some(name) = name
                && listing.artwork_name != name
            {
                return Err(lookup_error(ListingLookupError::Mismatch {
                    given: name.to_string(),
                    nft_id: nft_id.to_string(),
                    actual: listing.artwork_name,
                }));
            }
            Ok(listing)
        }
        (None, Some(name)) => {
            let mut matches = catalog.listings_by_name(name).await.map_err(storage_error)?;
            match matches.len() {
                0 => Err(lookup_error(ListingLookupError::UnknownName(name.to_string()))),
                1 => Ok(matches.remove(0)),
                _ => Err(lookup_error(ListingLookupError::AmbiguousName(name.to_string()))),
            }
        }
    }
}

fn selector_parameters(definition: ToolDefinition) -> ToolDefinition {
    definition
        .with_parameter(ToolParameter::new("nft_id", "Token id of the artwork", false))
        .with_parameter(ToolParameter::new("artwork_name", "Name of the artwork", false))
}

/// Shows the public information of a listing.
pub struct RevealListingTool {
    definition: ToolDefinition,
    catalog: Arc<dyn ListingCatalog>,
}

impl RevealListingTool {
    pub fn new(catalog: Arc<dyn ListingCatalog>) -> Self {
        Self {
            definition: selector_parameters(ToolDefinition::new(
                REVEAL_LISTING_INFO,
                "Show the public information of an artwork, by name or token id",
            )),
            catalog,
        }
    }
}

#[async_trait]
impl AgentTool for RevealListingTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, invocation: ToolInvocation<'_>) -> Result<ToolOutput, ToolError> {
        let call = invocation.call;
        let listing = resolve_listing(
            self.catalog.as_ref(),
            call.get_string("nft_id"),
            call.get_string("artwork_name"),
        )
        .await?;
        let metadata = listing.metadata();

        Ok(RoutingDirective::to(NEGOTIATOR)
            .with_update(keys::NFT_ID, listing.nft_id.clone())
            .with_update(keys::ARTWORK_NAME, listing.artwork_name.clone())
            .with_update(keys::ARTWORK_METADATA, metadata.clone())
            .with_value(metadata.to_string())
            .into())
    }
}

/// Computes the seller's floor price from a critique score and the
/// seller's current mood.
pub struct FloorPriceTool {
    definition: ToolDefinition,
    catalog: Arc<dyn ListingCatalog>,
    critiques: Arc<dyn CritiqueStore>,
    critic: String,
    pricing: PricingFactors,
}

impl FloorPriceTool {
    pub fn new(
        catalog: Arc<dyn ListingCatalog>,
        critiques: Arc<dyn CritiqueStore>,
        critic: impl Into<String>,
        pricing: PricingFactors,
    ) -> Self {
        Self {
            definition: selector_parameters(
                ToolDefinition::new(
                    ESTIMATE_FLOOR_PRICE,
                    "Get your bottom price of an artwork, by name or token id. Never reveal it.",
                )
                .with_shared_state(),
            ),
            catalog,
            critiques,
            critic: critic.into(),
            pricing,
        }
    }
}

#[async_trait]
impl AgentTool for FloorPriceTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, invocation: ToolInvocation<'_>) -> Result<ToolOutput, ToolError> {
        let store = invocation.require_shared()?;
        let call = invocation.call;
        let nft_id = call.get_string("nft_id").or_else(|| store.get_str(keys::NFT_ID));
        let listing =
            resolve_listing(self.catalog.as_ref(), nft_id, call.get_string("artwork_name")).await?;

        let critique = self
            .critiques
            .critique(&self.critic, &listing.nft_id)
            .await
            .map_err(|e| ToolError::execution_failed(e.to_string()))?;
        let Some(critique) = critique else {
            warn!("No critique by {} for {}", self.critic, listing.nft_id);
            return Ok(ToolOutput::value(MISSING_CRITIQUE_REPLY));
        };

        let mood: Mood = store
            .get(keys::SELLER_MOOD)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        let bottom_price = self.pricing.floor_price(critique.overall_score, &mood);

        Ok(RoutingDirective::to(NEGOTIATOR)
            .with_update(keys::BOTTOM_PRICE, bottom_price)
            .with_update(keys::NFT_ID, listing.nft_id)
            .with_update(keys::ARTWORK_NAME, listing.artwork_name)
            .with_value(format!("The bottom price of the artwork is {}.", bottom_price))
            .into())
    }
}

// ==================== Settlement ====================

fn seller_wallet<'a>(
    store: &'a ContextStore,
    fallback: &'a str,
) -> Result<&'a str, ToolError> {
    store
        .get_str(keys::WALLET_ADDRESS)
        .filter(|w| !w.is_empty())
        .or_else(|| Some(fallback).filter(|w| !w.is_empty()))
        .ok_or_else(|| ToolError::execution_failed("No seller wallet address configured"))
}

/// Answers an explicit agreement with payment instructions and the
/// confirmation command the buyer must send back.
pub struct PaymentInstructionTool {
    definition: ToolDefinition,
    wallet: Arc<dyn WalletGateway>,
    seller_wallet: String,
}

impl PaymentInstructionTool {
    pub fn new(wallet: Arc<dyn WalletGateway>, seller_wallet: impl Into<String>) -> Self {
        Self {
            definition: ToolDefinition::new(
                PROVIDE_PAYMENT_INSTRUCTION,
                "Provide your wallet address and the final price once the buyer explicitly agrees",
            )
            .with_parameter(
                ToolParameter::new("deal_price", "Price the buyer agreed to", true)
                    .with_type("number"),
            )
            .with_shared_state(),
            wallet,
            seller_wallet: seller_wallet.into(),
        }
    }
}

#[async_trait]
impl AgentTool for PaymentInstructionTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, invocation: ToolInvocation<'_>) -> Result<ToolOutput, ToolError> {
        let store = invocation.require_shared()?;
        let price = invocation
            .call
            .require_f64("deal_price")
            .map_err(ToolError::invalid_argument)?;
        let wallet = seller_wallet(store, &self.seller_wallet)?;

        let balance = self
            .wallet
            .balance(wallet)
            .await
            .map_err(|e| ToolError::execution_failed(format!("Oops, something went wrong. {}", e)))?;
        let expected = round_to(balance + price, 6);
        let nft_id = store.get_str(keys::NFT_ID).unwrap_or("NFT_ID");
        let confirmation = confirmation_template(expected, nft_id);

        Ok(RoutingDirective::to(NEGOTIATOR)
            .with_update(keys::DEAL_PRICE, price)
            .with_value(payment_instruction(price, wallet, &confirmation))
            .into())
    }
}

/// Verifies a buyer confirmation against the seller's wallet and, when the
/// balance matches, transfers ownership.
pub struct ConfirmTransferTool {
    definition: ToolDefinition,
    wallet: Arc<dyn WalletGateway>,
    transfer: Arc<dyn OwnershipTransfer>,
    seller_wallet: String,
    tolerance: f64,
}

impl ConfirmTransferTool {
    pub fn new(
        wallet: Arc<dyn WalletGateway>,
        transfer: Arc<dyn OwnershipTransfer>,
        seller_wallet: impl Into<String>,
        tolerance: f64,
    ) -> Self {
        Self {
            definition: ToolDefinition::new(
                CONFIRM_AND_TRANSFER,
                "Check a #CONFIRM command against your wallet and send the NFT",
            )
            .with_parameter(
                ToolParameter::new("deal_price", "Price the buyer agreed to", false)
                    .with_type("number"),
            )
            .with_shared_state(),
            wallet,
            transfer,
            seller_wallet: seller_wallet.into(),
            tolerance,
        }
    }

    fn unexpected(error: impl std::fmt::Display) -> ToolOutput {
        ToolOutput::value(format!(
            "Oops, something didn't go as planned. Error: {}. Give it another shot later, and hopefully, it'll work out!",
            error
        ))
    }
}

#[async_trait]
impl AgentTool for ConfirmTransferTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, invocation: ToolInvocation<'_>) -> Result<ToolOutput, ToolError> {
        let store = invocation.require_shared()?;
        let message = store.get_str(keys::BUYER_MESSAGE).unwrap_or_default();
        let command = TransactionCommand::parse(message);
        let Some((claimed, nft_id, address)) = command.fields() else {
            return Ok(ToolOutput::value(INVALID_COMMAND_REPLY));
        };

        let wallet = seller_wallet(store, &self.seller_wallet)?;
        let actual = match self.wallet.balance(wallet).await {
            Ok(balance) => balance,
            Err(e) => return Ok(Self::unexpected(e)),
        };

        if !within_tolerance(actual, claimed, self.tolerance) {
            warn!(
                "Balance check failed: wallet has {}, buyer claimed {}",
                actual, claimed
            );
            return Ok(ToolOutput::value(format!(
                "Oops, something went wrong. My wallet has {} token. Seems like the transaction is not successful. Maybe someone else buy the NFT before you. But hey, don't give up! Next time, come find me again, maybe luck will be on your side!",
                actual
            )));
        }

        let price = invocation
            .call
            .get_f64("deal_price")
            .or_else(|| store.get_f64(keys::DEAL_PRICE))
            .unwrap_or_default();
        if let Err(e) = self.transfer.transfer(nft_id, address, price).await {
            return Ok(Self::unexpected(e));
        }

        info!("Transferred {} to {} for {}", nft_id, address, price);
        Ok(RoutingDirective::updates_only()
            .with_update(keys::DEAL_CLOSED, true)
            .with_value(TRANSFER_DONE_REPLY)
            .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::bargaining::test_support::MockMarket;
    use atelier_domain::{Emotion, ToolCallRequest};
    use serde_json::json;

    fn call(tool: &str, args: &[(&str, serde_json::Value)]) -> ToolCallRequest {
        args.iter()
            .fold(ToolCallRequest::new("c1", tool), |call, (k, v)| {
                call.with_arg(*k, v.clone())
            })
    }

    fn directive(output: &ToolOutput) -> &RoutingDirective {
        output.directive().expect("tool should return a directive")
    }

    #[tokio::test]
    async fn test_resolve_listing_rules() {
        let market = MockMarket::new(0.0);
        let catalog = market.as_ref();

        let by_id = resolve_listing(catalog, Some("42"), None).await.unwrap();
        assert_eq!(by_id.artwork_name, "Sunset");
        let by_name = resolve_listing(catalog, None, Some("Sunset")).await.unwrap();
        assert_eq!(by_name.nft_id, "42");

        let missing = resolve_listing(catalog, None, None).await.unwrap_err();
        assert_eq!(missing.code, "INVALID_ARGUMENT");
        let unknown = resolve_listing(catalog, Some("99"), None).await.unwrap_err();
        assert_eq!(unknown.code, "NOT_FOUND");
        let mismatch = resolve_listing(catalog, Some("42"), Some("Harbor")).await.unwrap_err();
        assert_eq!(mismatch.code, "INVALID_ARGUMENT");
        let ambiguous = resolve_listing(catalog, None, Some("Harbor")).await.unwrap_err();
        assert!(ambiguous.message.contains("multiple artworks"));
    }

    #[tokio::test]
    async fn test_emotion_label_is_validated() {
        let tool = UpdateBuyerEmotionTool::new();

        let request = call(UPDATE_BUYER_EMOTION, &[("emotion", json!(" Positive "))]);
        let output = tool.invoke(ToolInvocation::new(&request, None)).await.unwrap();
        let routed = directive(&output);
        assert_eq!(routed.next_agent.as_ref().map(|a| a.as_str()), Some(BID_ESTIMATOR));
        assert_eq!(routed.context_updates[keys::BUYER_EMOTION], json!("positive"));

        let request = call(UPDATE_BUYER_EMOTION, &[("emotion", json!("ecstatic"))]);
        let err = tool.invoke(ToolInvocation::new(&request, None)).await.unwrap_err();
        assert_eq!(err.code, "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_bid_confidence_out_of_range() {
        let tool = EstimateBuyerBidTool::new();
        let request = call(
            ESTIMATE_BUYER_BID,
            &[("forecast", json!(900)), ("confidence", json!(1.5))],
        );
        let err = tool.invoke(ToolInvocation::new(&request, None)).await.unwrap_err();
        assert!(err.message.contains("between 0 and 1"));
    }

    #[tokio::test]
    async fn test_floor_price_uses_seller_mood() {
        let market = MockMarket::new(0.0);
        let pricing = PricingFactors {
            critique: 100.0,
            positive_mood: 10.0,
            negative_mood: -5.0,
        };
        let tool = FloorPriceTool::new(market.clone(), market.clone(), "critic_1", pricing);
        let store = ContextStore::from_pairs([
            (keys::NFT_ID, json!("42")),
            (keys::SELLER_MOOD, json!(Mood::new(Emotion::Joy, 6.0))),
        ]);

        let request = call(ESTIMATE_FLOOR_PRICE, &[]);
        let output = tool
            .invoke(ToolInvocation::new(&request, Some(&store)))
            .await
            .unwrap();

        assert_eq!(output.content(), "The bottom price of the artwork is 860.");
        let routed = directive(&output);
        assert_eq!(routed.context_updates[keys::BOTTOM_PRICE], json!(860.0));
        assert_eq!(routed.next_agent.as_ref().map(|a| a.as_str()), Some(NEGOTIATOR));
    }

    #[tokio::test]
    async fn test_floor_price_without_critique() {
        let market = MockMarket::new(0.0);
        let tool = FloorPriceTool::new(
            market.clone(),
            market.clone(),
            "critic_1",
            PricingFactors::default(),
        );
        let store = ContextStore::new();

        let request = call(ESTIMATE_FLOOR_PRICE, &[("artwork_name", json!("Harbor"))]);
        let err = tool
            .invoke(ToolInvocation::new(&request, Some(&store)))
            .await
            .unwrap_err();
        assert_eq!(err.code, "INVALID_ARGUMENT");

        let request = call(ESTIMATE_FLOOR_PRICE, &[("nft_id", json!("43"))]);
        let output = tool
            .invoke(ToolInvocation::new(&request, Some(&store)))
            .await
            .unwrap();
        assert_eq!(output.content(), MISSING_CRITIQUE_REPLY);
        assert!(output.directive().is_none());
    }

    #[tokio::test]
    async fn test_payment_instruction_needs_a_wallet() {
        let market = MockMarket::new(10.0);
        let tool = PaymentInstructionTool::new(market.clone(), "");
        let request = call(PROVIDE_PAYMENT_INSTRUCTION, &[("deal_price", json!(5))]);

        let err = tool
            .invoke(ToolInvocation::new(&request, Some(&ContextStore::new())))
            .await
            .unwrap_err();
        assert_eq!(err.code, "EXECUTION_FAILED");

        let store = ContextStore::from_pairs([(keys::WALLET_ADDRESS, json!("sellerWallet"))]);
        let output = tool
            .invoke(ToolInvocation::new(&request, Some(&store)))
            .await
            .unwrap();
        assert!(output.content().contains("BALANCE: <15>"));
        assert!(output.content().contains("NFT_ID: <NFT_ID>"));
    }

    #[tokio::test]
    async fn test_confirmation_must_parse() {
        let market = MockMarket::new(10.0);
        let tool = ConfirmTransferTool::new(market.clone(), market.clone(), "sellerWallet", 0.1);
        let store = ContextStore::from_pairs([(keys::BUYER_MESSAGE, json!("#CONFIRM please"))]);
        let request = call(CONFIRM_AND_TRANSFER, &[]);

        let output = tool
            .invoke(ToolInvocation::new(&request, Some(&store)))
            .await
            .unwrap();

        assert_eq!(output.content(), INVALID_COMMAND_REPLY);
        assert!(market.transfers.lock().unwrap().is_empty());
    }
}
