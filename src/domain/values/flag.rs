use serde::{Deserialize, Serialize};
use std::fmt;

/// Tags attached to a comparison result so consumers can explain or filter
/// low-trust scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultFlag {
    ShippingUnknown,
    ShippingIncluded,
    TaxUnknown,
    TaxIncluded,
    HighQuality,
    LowQuality,
    NoQualityRating,
    ConversionFailed,
    ValidationFailed,
    CurrencyConverted,
    EquivalenceAdjusted,
    EffectivePrice,
    BulkQuantity,
    NonCanonicalUnit,
    MissingProvenance,
    StalePrice,
    PriceOutlier,
    NoHistoricalData,
    FallbackComparison,
    TrendDown,
    TrendUp,
    TrendStable,
    TrendVolatile,
    HighVolatility,
    LimitedHistory,
    BelowHistoricalBest,
    AboveHistoricalBest,
    SecondarySkipped,
}

impl ResultFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultFlag::ShippingUnknown => "shipping-unknown",
            ResultFlag::ShippingIncluded => "shipping-included",
            ResultFlag::TaxUnknown => "tax-unknown",
            ResultFlag::TaxIncluded => "tax-included",
            ResultFlag::HighQuality => "high-quality",
            ResultFlag::LowQuality => "low-quality",
            ResultFlag::NoQualityRating => "no-quality-rating",
            ResultFlag::ConversionFailed => "conversion-failed",
            ResultFlag::ValidationFailed => "validation-failed",
            ResultFlag::CurrencyConverted => "currency-converted",
            ResultFlag::EquivalenceAdjusted => "equivalence-adjusted",
            ResultFlag::EffectivePrice => "effective-price",
            ResultFlag::BulkQuantity => "bulk-quantity",
            ResultFlag::NonCanonicalUnit => "non-canonical-unit",
            ResultFlag::MissingProvenance => "missing-provenance",
            ResultFlag::StalePrice => "stale-price",
            ResultFlag::PriceOutlier => "price-outlier",
            ResultFlag::NoHistoricalData => "no-historical-data",
            ResultFlag::FallbackComparison => "fallback-comparison",
            ResultFlag::TrendDown => "trend-down",
            ResultFlag::TrendUp => "trend-up",
            ResultFlag::TrendStable => "trend-stable",
            ResultFlag::TrendVolatile => "trend-volatile",
            ResultFlag::HighVolatility => "high-volatility",
            ResultFlag::LimitedHistory => "limited-history",
            ResultFlag::BelowHistoricalBest => "below-historical-best",
            ResultFlag::AboveHistoricalBest => "above-historical-best",
            ResultFlag::SecondarySkipped => "secondary-skipped",
        }
    }
}

impl fmt::Display for ResultFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
