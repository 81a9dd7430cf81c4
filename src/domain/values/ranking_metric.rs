use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores the bulk SQL path can compute without running a strategy.
///
/// Each metric mirrors the strategy of the same id at its default options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankingMetric {
    #[default]
    PricePerCanonical,
    TotalPrice,
    PricePerUnit,
    QualityAdjusted,
}

impl RankingMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingMetric::PricePerCanonical => "price-per-canonical",
            RankingMetric::TotalPrice => "total-price",
            RankingMetric::PricePerUnit => "price-per-unit",
            RankingMetric::QualityAdjusted => "quality-adjusted",
        }
    }

    /// Whether the score divides by the converted canonical amount. Offers
    /// without one cannot be scored under these metrics.
    pub fn needs_canonical_amount(&self) -> bool {
        matches!(
            self,
            RankingMetric::PricePerCanonical | RankingMetric::QualityAdjusted
        )
    }

    /// Map a strategy id onto a SQL-expressible metric.
    pub fn from_strategy_id(id: &str) -> Result<Self, DomainError> {
        match id {
            "price-per-canonical" => Ok(RankingMetric::PricePerCanonical),
            "total-price" => Ok(RankingMetric::TotalPrice),
            "price-per-unit" => Ok(RankingMetric::PricePerUnit),
            "quality-adjusted" => Ok(RankingMetric::QualityAdjusted),
            "historical-trend" => Err(DomainError::InvalidInput(
                "historical-trend needs price history and cannot be ranked in SQL".into(),
            )),
            other => Err(DomainError::StrategyNotFound(other.to_string())),
        }
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
