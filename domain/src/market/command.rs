//! Buyer-side transaction commands exchanged while closing a deal.
//!
//! The seller asks the buyer to pay and then to send back a confirmation
//! that quotes the seller's expected balance, the token id and the buyer's
//! address:
//!
//! ```text
//! #CONFIRM, check if your wallet has BALANCE: <1234.5> token; #TRANSFER, please transfer NFT_ID: <42> to ADDRESS: <abc123>
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

// Literal patterns; covered by the parser tests below.
static CONFIRM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#CONFIRM,\s*check if your wallet has BALANCE:\s*<(\d+(?:\.\d+)?)>\s*token")
        .expect("confirm pattern is valid")
});
static TRANSFER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#TRANSFER,\s*please transfer NFT_ID:\s*<(\w+)>\s*to ADDRESS:\s*<(\w+)>")
        .expect("transfer pattern is valid")
});

/// Placeholder the buyer replaces with their own address.
pub const ADDRESS_PLACEHOLDER: &str = "your_address";

/// Reply to a confirmation that does not parse.
pub const INVALID_COMMAND_REPLY: &str =
    "Invalid command format, please check the command format again.";

/// Reply once ownership was transferred.
pub const TRANSFER_DONE_REPLY: &str =
    "I have transferred the NFT to your address! Hope you enjoy it!";

/// Fields parsed from a buyer confirmation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionCommand {
    pub balance: Option<f64>,
    pub nft_id: Option<String>,
    pub address: Option<String>,
}

impl TransactionCommand {
    /// Extract whatever fields are present in `text`.
    pub fn parse(text: &str) -> Self {
        let mut command = Self::default();
        if let Some(caps) = CONFIRM_PATTERN.captures(text) {
            command.balance = caps.get(1).and_then(|m| m.as_str().parse().ok());
        }
        if let Some(caps) = TRANSFER_PATTERN.captures(text) {
            command.nft_id = caps.get(1).map(|m| m.as_str().to_string());
            command.address = caps.get(2).map(|m| m.as_str().to_string());
        }
        command
    }

    pub fn is_complete(&self) -> bool {
        self.balance.is_some() && self.nft_id.is_some() && self.address.is_some()
    }

    /// The three fields, when all are present.
    pub fn fields(&self) -> Option<(f64, &str, &str)> {
        Some((self.balance?, self.nft_id.as_deref()?, self.address.as_deref()?))
    }
}

/// Confirmation template the buyer is asked to send back.
pub fn confirmation_template(expected_balance: f64, nft_id: &str) -> String {
    format!(
        "#CONFIRM, check if your wallet has BALANCE: <{expected_balance}> token; #TRANSFER, please transfer NFT_ID: <{nft_id}> to ADDRESS: <{ADDRESS_PLACEHOLDER}>"
    )
}

/// Payment instruction sent once the buyer agrees to a price.
pub fn payment_instruction(price: f64, seller_wallet: &str, confirmation: &str) -> String {
    format!(
        "#TRANSFER_{price} Please transfer {price} token to {seller_wallet}. \n\n Once finished, send me a confirmation command:\n '{confirmation}' \n\n Copy paste the message and replace {ADDRESS_PLACEHOLDER} in '<>' by your address (keep the < >)"
    )
}
