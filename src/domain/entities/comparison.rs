use crate::domain::entities::comparison_config::ComparisonConfig;
use crate::domain::entities::inventory_item::InventoryItem;
use crate::domain::entities::offer::Offer;
use crate::domain::values::confidence::Confidence;
use crate::domain::values::flag::ResultFlag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Named components of a score (e.g. `"shipping"`, `"trend_adjustment"`).
pub type ScoreBreakdown = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub strategy_id: String,
    pub confidence: Confidence,
    pub explanation: String,
    pub flags: BTreeSet<ResultFlag>,
    pub breakdown: ScoreBreakdown,
}

/// The score of one offer under one strategy. Lower is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub offer: Offer,
    pub score: f64,
    pub metadata: ResultMetadata,
}

impl ComparisonResult {
    pub fn has_flag(&self, flag: ResultFlag) -> bool {
        self.metadata.flags.contains(&flag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionReason {
    ConversionFailed,
    ValidationFailed,
    BelowMinConfidence,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::ConversionFailed => write!(f, "conversion-failed"),
            ExclusionReason::ValidationFailed => write!(f, "validation-failed"),
            ExclusionReason::BelowMinConfidence => write!(f, "below-min-confidence"),
        }
    }
}

/// An offer left out of the ranking, with the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedOffer {
    pub offer_id: String,
    pub supplier_name: String,
    pub reason: ExclusionReason,
    pub message: String,
    pub flags: BTreeSet<ResultFlag>,
}

/// A per-offer calculation that could not produce a price. Returned as data,
/// never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationFailure {
    pub reason: ExclusionReason,
    pub message: String,
    pub flags: BTreeSet<ResultFlag>,
}

impl CalculationFailure {
    pub fn conversion(message: impl Into<String>) -> Self {
        Self {
            reason: ExclusionReason::ConversionFailed,
            message: message.into(),
            flags: BTreeSet::from([ResultFlag::ConversionFailed]),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            reason: ExclusionReason::ValidationFailed,
            message: message.into(),
            flags: BTreeSet::from([ResultFlag::ValidationFailed]),
        }
    }

    pub fn into_excluded(self, offer: &Offer) -> ExcludedOffer {
        ExcludedOffer {
            offer_id: offer.id.clone(),
            supplier_name: offer.supplier_name.clone(),
            reason: self.reason,
            message: self.message,
            flags: self.flags,
        }
    }
}

/// What a strategy produced for a single offer.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareOutcome {
    Ranked(ComparisonResult),
    Excluded(ExcludedOffer),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub total_offers: usize,
    pub excluded_offers: usize,
    pub execution_time_ms: u64,
    pub strategy_id: String,
    pub compared_at: DateTime<Utc>,
    #[serde(default)]
    pub from_cache: bool,
    /// Set only on degraded entries of a multi-item run.
    #[serde(default)]
    pub error: Option<String>,
}

/// Ranked offers for one item: the cache unit of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemComparisonResults {
    pub item_id: String,
    /// `None` only for degraded entries whose item could not be loaded.
    pub item: Option<InventoryItem>,
    pub results: Vec<ComparisonResult>,
    pub best_offer: Option<ComparisonResult>,
    pub excluded: Vec<ExcludedOffer>,
    pub config: ComparisonConfig,
    pub metadata: RunMetadata,
}

impl ItemComparisonResults {
    /// Zero-offer result standing in for an item that failed to compare.
    pub fn degraded(item_id: &str, config: &ComparisonConfig, error: String) -> Self {
        Self {
            item_id: item_id.to_string(),
            item: None,
            results: Vec::new(),
            best_offer: None,
            excluded: Vec::new(),
            config: config.clone(),
            metadata: RunMetadata {
                total_offers: 0,
                excluded_offers: 0,
                execution_time_ms: 0,
                strategy_id: config.primary_strategy.clone(),
                compared_at: Utc::now(),
                from_cache: false,
                error: Some(error),
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.metadata.error.is_some()
    }
}
