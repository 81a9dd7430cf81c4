//! Price per canonical unit, the default strategy.
//!
//! Converts each offer into the item's canonical unit and scores it by the
//! normalized price. Shipping, tax, precomputed effective prices and the
//! currency multiplier are all opt-in via options.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::normalization::{
    self, AdjustmentStage, PriceCalculation, PriceMode, PriceOptions,
};
use crate::application::strategies::{currency_rate_violation, format_price};
use crate::domain::error::DomainError;
use crate::domain::ports::strategy::{
    ComparatorStrategy, ComparisonContext, Scoring, StrategyDescriptor, StrategyId, StrategyScore,
};
use crate::domain::values::flag::ResultFlag;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricePerCanonicalOptions {
    pub include_shipping: bool,
    pub include_tax: bool,
    pub use_effective_price: bool,
    pub currency_rate: Option<f64>,
    pub apply_equivalence_factor: bool,
    pub adjustment_stage: AdjustmentStage,
}

impl Default for PricePerCanonicalOptions {
    fn default() -> Self {
        Self {
            include_shipping: true,
            include_tax: true,
            use_effective_price: false,
            currency_rate: None,
            apply_equivalence_factor: true,
            adjustment_stage: AdjustmentStage::AfterNormalization,
        }
    }
}

impl PricePerCanonicalOptions {
    pub fn price_options(&self) -> PriceOptions {
        let mode = if self.use_effective_price {
            PriceMode::Effective
        } else if self.include_shipping || self.include_tax {
            PriceMode::Including
        } else {
            PriceMode::Excluding
        };
        PriceOptions {
            mode,
            include_shipping: self.include_shipping,
            include_tax: self.include_tax,
            use_effective_price: self.use_effective_price,
            currency_rate: self.currency_rate,
            apply_equivalence_factor: self.apply_equivalence_factor,
            adjustment_stage: self.adjustment_stage,
        }
    }
}

/// Describes which cost components a price includes.
pub(crate) fn inclusion_label(include_shipping: bool, include_tax: bool) -> &'static str {
    match (include_shipping, include_tax) {
        (true, true) => "including shipping and tax",
        (true, false) => "including shipping",
        (false, true) => "including tax",
        (false, false) => "excluding shipping and tax",
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PricePerCanonicalStrategy;

#[async_trait]
impl ComparatorStrategy for PricePerCanonicalStrategy {
    type Options = PricePerCanonicalOptions;

    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            id: StrategyId::PricePerCanonical,
            name: "Price per canonical unit",
            description: "Normalizes every offer to the item's canonical unit and ranks by price per unit",
            version: "1.0.0",
        }
    }

    fn validate_options(options: &Self::Options) -> Vec<String> {
        currency_rate_violation(options.currency_rate)
            .into_iter()
            .collect()
    }

    async fn score(
        &self,
        ctx: &ComparisonContext<'_>,
        options: &Self::Options,
    ) -> Result<Scoring, DomainError> {
        let price_options = options.price_options();
        let priced = match normalization::calculate_price(ctx.offer, ctx.item, &price_options) {
            PriceCalculation::Priced(p) => p,
            PriceCalculation::Failed(failure) => return Ok(Scoring::Failed(failure)),
        };

        let basis = if price_options.mode == PriceMode::Effective
            && priced.flags.contains(&ResultFlag::EffectivePrice)
        {
            "effective price"
        } else if price_options.mode == PriceMode::Excluding {
            inclusion_label(false, false)
        } else {
            inclusion_label(options.include_shipping, options.include_tax)
        };

        Ok(Scoring::Scored(StrategyScore {
            score: priced.price_per_canonical,
            confidence: priced.confidence,
            fixed_confidence: false,
            summary: format!(
                "{} per {} ({basis})",
                format_price(priced.price_per_canonical, &ctx.offer.currency),
                ctx.item.canonical_unit
            ),
            breakdown: priced.breakdown,
            flags: priced.flags,
        }))
    }
}
