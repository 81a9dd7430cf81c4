//! Price per canonical unit discounted by quality.
//!
//! A rating `r` on the 1–5 scale multiplies the normalized price by
//! `1 − (1 − r/5) × factor`, so a top-rated offer keeps its price and a
//! one-star offer at factor 0.1 is scored 8% lower. Offers without a rating
//! are left unadjusted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::normalization::{self, PriceCalculation, PriceMode, PriceOptions};
use crate::application::strategies::{currency_rate_violation, format_price};
use crate::domain::error::DomainError;
use crate::domain::ports::strategy::{
    ComparatorStrategy, ComparisonContext, Scoring, StrategyDescriptor, StrategyId, StrategyScore,
};
use crate::domain::values::flag::ResultFlag;

pub const DEFAULT_QUALITY_FACTOR: f64 = 0.1;
const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityAdjustedOptions {
    pub quality_adjustment_factor: f64,
    pub include_shipping: bool,
    pub include_tax: bool,
    pub currency_rate: Option<f64>,
}

impl Default for QualityAdjustedOptions {
    fn default() -> Self {
        Self {
            quality_adjustment_factor: DEFAULT_QUALITY_FACTOR,
            include_shipping: true,
            include_tax: true,
            currency_rate: None,
        }
    }
}

/// `1 − (1 − rating/5) × factor`
pub fn quality_multiplier(rating: u8, factor: f64) -> f64 {
    1.0 - (1.0 - f64::from(rating) / MAX_RATING) * factor
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QualityAdjustedStrategy;

#[async_trait]
impl ComparatorStrategy for QualityAdjustedStrategy {
    type Options = QualityAdjustedOptions;

    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            id: StrategyId::QualityAdjusted,
            name: "Quality-adjusted price",
            description: "Price per canonical unit weighted by the offer's quality rating",
            version: "1.0.0",
        }
    }

    fn validate_options(options: &Self::Options) -> Vec<String> {
        let mut problems = Vec::new();
        let factor = options.quality_adjustment_factor;
        if !factor.is_finite() || !(0.0..=1.0).contains(&factor) {
            problems.push(format!(
                "quality_adjustment_factor must be between 0 and 1, got {factor}"
            ));
        }
        problems.extend(currency_rate_violation(options.currency_rate));
        problems
    }

    async fn score(
        &self,
        ctx: &ComparisonContext<'_>,
        options: &Self::Options,
    ) -> Result<Scoring, DomainError> {
        let price_options = PriceOptions {
            mode: PriceMode::Including,
            include_shipping: options.include_shipping,
            include_tax: options.include_tax,
            use_effective_price: false,
            currency_rate: options.currency_rate,
            ..Default::default()
        };
        let priced = match normalization::calculate_price(ctx.offer, ctx.item, &price_options) {
            PriceCalculation::Priced(p) => p,
            PriceCalculation::Failed(failure) => return Ok(Scoring::Failed(failure)),
        };

        let mut flags = priced.flags;
        let mut breakdown = priced.breakdown;
        let base = priced.price_per_canonical;

        let (score, rating_note) = match ctx.offer.quality_rating {
            Some(rating) => {
                let multiplier = quality_multiplier(rating, options.quality_adjustment_factor);
                breakdown.insert("quality_multiplier".into(), multiplier);
                (base * multiplier, format!("rated {rating}/5"))
            }
            None => {
                flags.insert(ResultFlag::NoQualityRating);
                (base, "unrated".to_string())
            }
        };
        breakdown.insert("quality_adjusted_price".into(), score);

        Ok(Scoring::Scored(StrategyScore {
            score,
            confidence: priced.confidence,
            fixed_confidence: false,
            breakdown,
            flags,
            summary: format!(
                "{} per {} adjusted for quality ({rating_note}, base {})",
                format_price(score, &ctx.offer.currency),
                ctx.item.canonical_unit,
                format_price(base, &ctx.offer.currency)
            ),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_scale() {
        assert!((quality_multiplier(5, 0.1) - 1.0).abs() < 1e-12);
        assert!((quality_multiplier(1, 0.1) - 0.92).abs() < 1e-12);
        assert!((quality_multiplier(3, 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_factor_out_of_range_rejected() {
        let opts = QualityAdjustedOptions {
            quality_adjustment_factor: 1.5,
            ..Default::default()
        };
        assert_eq!(QualityAdjustedStrategy::validate_options(&opts).len(), 1);
    }
}
