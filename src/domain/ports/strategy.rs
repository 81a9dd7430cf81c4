//! Strategy port for offer scoring.
//!
//! Defines the [`ComparatorStrategy`] trait and supporting types. Every
//! strategy scores a single offer in the context of all offers for the same
//! item; lower scores are better.
//!
//! # Overview
//!
//! The set of strategies is closed: each one has a [`StrategyId`] and is
//! registered in the static table of
//! [`Comparator`](crate::application::strategies::Comparator), which performs
//! the shared input validation, option merging, explanation text and
//! confidence heuristics before and after calling [`ComparatorStrategy::score`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::entities::comparison::{CalculationFailure, ScoreBreakdown};
use crate::domain::entities::inventory_item::InventoryItem;
use crate::domain::entities::offer::Offer;
use crate::domain::entities::supplier::Supplier;
use crate::domain::error::DomainError;
use crate::domain::values::confidence::Confidence;
use crate::domain::values::flag::ResultFlag;

/// Identifier of every registered strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyId {
    PricePerCanonical,
    TotalPrice,
    PricePerUnit,
    QualityAdjusted,
    HistoricalTrend,
}

impl StrategyId {
    pub const ALL: [StrategyId; 5] = [
        StrategyId::PricePerCanonical,
        StrategyId::TotalPrice,
        StrategyId::PricePerUnit,
        StrategyId::QualityAdjusted,
        StrategyId::HistoricalTrend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::PricePerCanonical => "price-per-canonical",
            StrategyId::TotalPrice => "total-price",
            StrategyId::PricePerUnit => "price-per-unit",
            StrategyId::QualityAdjusted => "quality-adjusted",
            StrategyId::HistoricalTrend => "historical-trend",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| DomainError::StrategyNotFound(s.to_string()))
    }
}

/// Static description of a strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyDescriptor {
    pub id: StrategyId,
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
}

/// Read-only inputs of one comparison.
#[derive(Debug, Clone, Copy)]
pub struct ComparisonContext<'a> {
    pub offer: &'a Offer,
    pub all_offers: &'a [Offer],
    pub item: &'a InventoryItem,
    pub suppliers: &'a HashMap<String, Supplier>,
}

/// Raw output of a strategy before the shared heuristics run.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyScore {
    pub score: f64,
    pub confidence: Confidence,
    /// Skip the shared confidence penalties and keep `confidence` as is.
    pub fixed_confidence: bool,
    pub breakdown: ScoreBreakdown,
    pub flags: BTreeSet<ResultFlag>,
    /// Short phrase describing what the score measures, used in explanations.
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scoring {
    Scored(StrategyScore),
    Failed(CalculationFailure),
}

/// A scoring algorithm with typed options.
///
/// # Example
///
/// ```ignore
/// struct Cheapest;
///
/// #[async_trait]
/// impl ComparatorStrategy for Cheapest {
///     type Options = CheapestOptions;
///
///     fn descriptor(&self) -> StrategyDescriptor { /* ... */ }
///     fn validate_options(_: &CheapestOptions) -> Vec<String> { vec![] }
///
///     async fn score(&self, ctx: &ComparisonContext<'_>, _: &CheapestOptions)
///         -> Result<Scoring, DomainError> {
///         // Inspect ctx.offer, return a score
///     }
/// }
/// ```
#[async_trait]
pub trait ComparatorStrategy: Send + Sync {
    type Options: Serialize + DeserializeOwned + Default + Send + Sync;

    fn descriptor(&self) -> StrategyDescriptor;

    /// Every problem with the options; empty when valid.
    fn validate_options(options: &Self::Options) -> Vec<String>;

    fn default_options() -> Self::Options {
        Self::Options::default()
    }

    async fn score(
        &self,
        ctx: &ComparisonContext<'_>,
        options: &Self::Options,
    ) -> Result<Scoring, DomainError>;
}
