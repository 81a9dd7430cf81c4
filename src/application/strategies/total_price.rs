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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TotalPriceOptions {
    pub include_shipping: bool,
    pub include_tax: bool,
    pub currency_rate: Option<f64>,
}

impl Default for TotalPriceOptions {
    fn default() -> Self {
        Self {
            include_shipping: true,
            include_tax: true,
            currency_rate: None,
        }
    }
}

/// Ranks by what the shopper pays at the till, ignoring pack size.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalPriceStrategy;

#[async_trait]
impl ComparatorStrategy for TotalPriceStrategy {
    type Options = TotalPriceOptions;

    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            id: StrategyId::TotalPrice,
            name: "Total price",
            description: "Ranks offers by total cost regardless of quantity",
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
        if offer.shipping_included {
            flags.insert(ResultFlag::ShippingIncluded);
        }
        if offer.is_tax_included {
            flags.insert(ResultFlag::TaxIncluded);
        }
        if offer.amount > 1.0 {
            flags.insert(ResultFlag::BulkQuantity);
        }
        if rate != 1.0 {
            flags.insert(ResultFlag::CurrencyConverted);
        }

        let score = cost.total * rate;
        let mut breakdown = ScoreBreakdown::new();
        breakdown.insert("base_price".into(), cost.base_price);
        breakdown.insert("shipping".into(), cost.shipping);
        breakdown.insert("tax".into(), cost.tax);
        breakdown.insert("total_cost".into(), score);
        if rate != 1.0 {
            breakdown.insert("currency_rate".into(), rate);
        }

        Ok(Scoring::Scored(StrategyScore {
            score,
            confidence,
            fixed_confidence: false,
            breakdown,
            flags,
            summary: format!(
                "{} for {} {} ({})",
                format_price(score, &offer.currency),
                offer.amount,
                offer.amount_unit,
                inclusion_label(options.include_shipping, options.include_tax)
            ),
        }))
    }
}
