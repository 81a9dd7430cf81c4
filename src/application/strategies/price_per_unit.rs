use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::normalization::{penalize_missing_data, quality_flags, total_cost};
use crate::application::strategies::price_per_canonical::inclusion_label;
use crate::application::strategies::{currency_rate_violation, format_price};
use crate::domain::entities::comparison::ScoreBreakdown;
use crate::domain::error::DomainError;
use crate::domain::ports::strategy::{
    ComparatorStrategy, ComparisonContext, Scoring, StrategyDescriptor, StrategyId, StrategyScore,
};
use crate::domain::values::confidence::Confidence;
use crate::domain::values::flag::ResultFlag;
use crate::domain::values::unit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricePerUnitOptions {
    pub include_shipping: bool,
    pub include_tax: bool,
    pub currency_rate: Option<f64>,
}

impl Default for PricePerUnitOptions {
    fn default() -> Self {
        Self {
            include_shipping: true,
            include_tax: true,
            currency_rate: None,
        }
    }
}

/// Cost divided by the amount as displayed on the offer, without unit
/// conversion. Only meaningful when offers share a unit, hence the
/// `non-canonical-unit` flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricePerUnitStrategy;

#[async_trait]
impl ComparatorStrategy for PricePerUnitStrategy {
    type Options = PricePerUnitOptions;

    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            id: StrategyId::PricePerUnit,
            name: "Price per displayed unit",
            description: "Ranks offers by cost per unit as listed, without canonical conversion",
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
        let offer = ctx.offer;
        let rate = options.currency_rate.unwrap_or(1.0);
        let cost = total_cost(offer, options.include_shipping, options.include_tax);

        let mut flags = quality_flags(offer);
        let confidence = penalize_missing_data(
            Confidence::FULL,
            &cost,
            options.include_shipping,
            options.include_tax,
            &mut flags,
        );
        let displayed = unit::canonical_symbol(&offer.amount_unit);
        let canonical = unit::canonical_symbol(&ctx.item.canonical_unit);
        if displayed.is_none() || displayed != canonical {
            flags.insert(ResultFlag::NonCanonicalUnit);
        }
        if rate != 1.0 {
            flags.insert(ResultFlag::CurrencyConverted);
        }

        let score = cost.total * rate / offer.amount;
        let mut breakdown = ScoreBreakdown::new();
        breakdown.insert("total_cost".into(), cost.total * rate);
        breakdown.insert("amount".into(), offer.amount);
        breakdown.insert("price_per_unit".into(), score);

        Ok(Scoring::Scored(StrategyScore {
            score,
            confidence,
            fixed_confidence: false,
            breakdown,
            flags,
            summary: format!(
                "{} per {} ({})",
                format_price(score, &offer.currency),
                offer.amount_unit,
                inclusion_label(options.include_shipping, options.include_tax)
            ),
        }))
    }
}
