//! Floor-price computation and settlement tolerance.

use crate::agent::persona::Mood;
use serde::{Deserialize, Serialize};

/// Weight of the critique score in the floor price.
pub const CRITIQUE_PRICE_FACTOR: f64 = 0.0001;
/// Weight of mood intensity when the seller feels positive.
pub const POSITIVE_MOOD_PRICE_FACTOR: f64 = 0.00002;
/// Weight of mood intensity otherwise.
pub const NEGATIVE_MOOD_PRICE_FACTOR: f64 = -0.00001;
/// Relative tolerance when comparing a claimed wallet balance.
pub const BALANCE_TOLERANCE: f64 = 0.1;

/// Coefficients of the floor-price formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingFactors {
    pub critique: f64,
    pub positive_mood: f64,
    pub negative_mood: f64,
}

impl Default for PricingFactors {
    fn default() -> Self {
        Self {
            critique: CRITIQUE_PRICE_FACTOR,
            positive_mood: POSITIVE_MOOD_PRICE_FACTOR,
            negative_mood: NEGATIVE_MOOD_PRICE_FACTOR,
        }
    }
}

impl PricingFactors {
    /// `score * critique + intensity * (positive_mood | negative_mood)`
    pub fn floor_price(&self, critique_score: f64, seller_mood: &Mood) -> f64 {
        let mood_factor = if seller_mood.is_positive() {
            self.positive_mood
        } else {
            self.negative_mood
        };
        critique_score * self.critique + seller_mood.intensity * mood_factor
    }
}

/// Whether `actual` is within `tolerance` (relative) of `claimed`.
pub fn within_tolerance(actual: f64, claimed: f64, tolerance: f64) -> bool {
    (actual - claimed).abs() < claimed * tolerance
}
