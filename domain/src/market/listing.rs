//! Public listing data and critique records.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// A listed artwork, as shown to buyers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub nft_id: String,
    pub artwork_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Listing {
    pub fn new(nft_id: impl Into<String>, artwork_name: impl Into<String>) -> Self {
        Self {
            nft_id: nft_id.into(),
            artwork_name: artwork_name.into(),
            description: String::new(),
            creator: String::new(),
            image_url: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Metadata stored in the Context Store as `artwork_metadata`.
    pub fn metadata(&self) -> Value {
        json!({
            "nft_id": self.nft_id,
            "name": self.artwork_name,
            "description": self.description,
            "creator": self.creator,
            "image_url": self.image_url,
        })
    }
}

/// A critic's review of one artwork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub critic: String,
    pub nft_id: String,
    pub overall_score: f64,
    #[serde(default)]
    pub notes: String,
}

/// Why a listing could not be resolved from a name and/or id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListingLookupError {
    #[error("Please provide the artwork name or nft id.")]
    MissingSelector,

    #[error("I cannot find the artwork you are looking for. Please check the nft id:{0} again.")]
    UnknownNftId(String),

    #[error("I cannot find the artwork {0}. Please check the artwork name again.")]
    UnknownName(String),

    #[error(
        "There are multiple artworks with the same name. Please provide the nft id of the artwork you are looking for."
    )]
    AmbiguousName(String),

    #[error(
        "The artwork name:{given} and nft id:{nft_id} do not match. I checked the nft id and the relevant artwork name is {actual}."
    )]
    Mismatch {
        given: String,
        nft_id: String,
        actual: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_metadata() {
        let listing = Listing::new("42", "Dawn")
            .with_description("Soft light over water")
            .with_creator("painter");
        let meta = listing.metadata();
        assert_eq!(meta["nft_id"], "42");
        assert_eq!(meta["name"], "Dawn");
        assert_eq!(meta["creator"], "painter");
    }

    #[test]
    fn test_lookup_error_messages() {
        let err = ListingLookupError::Mismatch {
            given: "Dusk".to_string(),
            nft_id: "42".to_string(),
            actual: "Dawn".to_string(),
        };
        assert!(err.to_string().contains("relevant artwork name is Dawn"));
        assert_eq!(
            ListingLookupError::MissingSelector.to_string(),
            "Please provide the artwork name or nft id."
        );
    }
}
