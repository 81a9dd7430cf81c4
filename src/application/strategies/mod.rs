//! Comparator strategies and the shared `compare` entry point.
//!
//! [`Comparator`] is the closed set of registered strategies. Every call goes
//! through the same pipeline: input validation, option merging over the
//! strategy's defaults, strategy scoring, then explanation text and the
//! shared confidence heuristics.

pub mod historical_trend;
pub mod price_per_canonical;
pub mod price_per_unit;
pub mod quality_adjusted;
pub mod total_price;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;

use crate::application::normalization;
use crate::domain::entities::comparison::{
    CalculationFailure, CompareOutcome, ComparisonResult, ResultMetadata,
};
use crate::domain::entities::comparison_config::StrategyOptions;
use crate::domain::entities::inventory_item::InventoryItem;
use crate::domain::entities::offer::Offer;
use crate::domain::entities::supplier::Supplier;
use crate::domain::error::DomainError;
use crate::domain::ports::price_history::PriceHistoryService;
use crate::domain::ports::strategy::{
    ComparatorStrategy, ComparisonContext, Scoring, StrategyDescriptor, StrategyId, StrategyScore,
};
use crate::domain::values::confidence::Confidence;
use crate::domain::values::flag::ResultFlag;

use historical_trend::HistoricalTrendStrategy;
use price_per_canonical::PricePerCanonicalStrategy;
use price_per_unit::PricePerUnitStrategy;
use quality_adjusted::QualityAdjustedStrategy;
use total_price::TotalPriceStrategy;

const MISSING_RATING_PENALTY: f64 = 0.1;
const MISSING_PROVENANCE_PENALTY: f64 = 0.05;
const STALE_PENALTY: f64 = 0.2;
const STALE_AFTER_DAYS: i64 = 30;
const OUTLIER_PENALTY: f64 = 0.15;
/// Relative deviation from the mean price that marks an outlier.
const OUTLIER_DEVIATION: f64 = 0.5;

/// A registered strategy.
#[derive(Clone)]
pub enum Comparator {
    PricePerCanonical(PricePerCanonicalStrategy),
    TotalPrice(TotalPriceStrategy),
    PricePerUnit(PricePerUnitStrategy),
    QualityAdjusted(QualityAdjustedStrategy),
    HistoricalTrend(HistoricalTrendStrategy),
}

impl Comparator {
    /// Construct the strategy registered under `id`.
    pub fn build(id: StrategyId, history: &Arc<dyn PriceHistoryService>) -> Self {
        match id {
            StrategyId::PricePerCanonical => {
                Comparator::PricePerCanonical(PricePerCanonicalStrategy)
            }
            StrategyId::TotalPrice => Comparator::TotalPrice(TotalPriceStrategy),
            StrategyId::PricePerUnit => Comparator::PricePerUnit(PricePerUnitStrategy),
            StrategyId::QualityAdjusted => Comparator::QualityAdjusted(QualityAdjustedStrategy),
            StrategyId::HistoricalTrend => {
                Comparator::HistoricalTrend(HistoricalTrendStrategy::new(history.clone()))
            }
        }
    }

    pub fn id(&self) -> StrategyId {
        self.descriptor().id
    }

    pub fn descriptor(&self) -> StrategyDescriptor {
        match self {
            Comparator::PricePerCanonical(s) => s.descriptor(),
            Comparator::TotalPrice(s) => s.descriptor(),
            Comparator::PricePerUnit(s) => s.descriptor(),
            Comparator::QualityAdjusted(s) => s.descriptor(),
            Comparator::HistoricalTrend(s) => s.descriptor(),
        }
    }

    /// Default options as a JSON object.
    pub fn default_options(&self) -> StrategyOptions {
        match self {
            Comparator::PricePerCanonical(_) => defaults_of::<PricePerCanonicalStrategy>(),
            Comparator::TotalPrice(_) => defaults_of::<TotalPriceStrategy>(),
            Comparator::PricePerUnit(_) => defaults_of::<PricePerUnitStrategy>(),
            Comparator::QualityAdjusted(_) => defaults_of::<QualityAdjustedStrategy>(),
            Comparator::HistoricalTrend(_) => defaults_of::<HistoricalTrendStrategy>(),
        }
    }

    /// Merge `raw` over the defaults and validate the result.
    pub fn validate_options(&self, raw: &StrategyOptions) -> Result<(), DomainError> {
        let id = self.id();
        match self {
            Comparator::PricePerCanonical(_) => {
                resolve_options::<PricePerCanonicalStrategy>(id, raw).map(drop)
            }
            Comparator::TotalPrice(_) => {
                resolve_options::<TotalPriceStrategy>(id, raw).map(drop)
            }
            Comparator::PricePerUnit(_) => {
                resolve_options::<PricePerUnitStrategy>(id, raw).map(drop)
            }
            Comparator::QualityAdjusted(_) => {
                resolve_options::<QualityAdjustedStrategy>(id, raw).map(drop)
            }
            Comparator::HistoricalTrend(_) => {
                resolve_options::<HistoricalTrendStrategy>(id, raw).map(drop)
            }
        }
    }

    /// Score `offer` among `all_offers` for `item`.
    ///
    /// Fails with `INVALID_INPUT` when the offer is not one of `all_offers` or
    /// any offer belongs to another item, with `INVALID_OPTIONS` on bad
    /// options, and with `COMPARISON_ERROR` on any internal failure. Offers
    /// that cannot be priced come back as [`CompareOutcome::Excluded`].
    pub async fn compare(
        &self,
        offer: &Offer,
        all_offers: &[Offer],
        item: &InventoryItem,
        suppliers: &HashMap<String, Supplier>,
        options: &StrategyOptions,
    ) -> Result<CompareOutcome, DomainError> {
        let ctx = ComparisonContext {
            offer,
            all_offers,
            item,
            suppliers,
        };
        match self {
            Comparator::PricePerCanonical(s) => run(s, &ctx, options).await,
            Comparator::TotalPrice(s) => run(s, &ctx, options).await,
            Comparator::PricePerUnit(s) => run(s, &ctx, options).await,
            Comparator::QualityAdjusted(s) => run(s, &ctx, options).await,
            Comparator::HistoricalTrend(s) => run(s, &ctx, options).await,
        }
    }
}

/// Static table of strategies keyed by id.
#[derive(Clone)]
pub struct StrategyRegistry {
    history: Arc<dyn PriceHistoryService>,
}

impl StrategyRegistry {
    pub fn new(history: Arc<dyn PriceHistoryService>) -> Self {
        Self { history }
    }

    pub fn get(&self, id: &str) -> Result<Comparator, DomainError> {
        let id: StrategyId = id.parse()?;
        Ok(Comparator::build(id, &self.history))
    }

    pub fn contains(&self, id: &str) -> bool {
        id.parse::<StrategyId>().is_ok()
    }

    pub fn all(&self) -> Vec<Comparator> {
        StrategyId::ALL
            .into_iter()
            .map(|id| Comparator::build(id, &self.history))
            .collect()
    }

    pub fn descriptors(&self) -> Vec<StrategyDescriptor> {
        self.all().iter().map(Comparator::descriptor).collect()
    }
}

fn defaults_of<S: ComparatorStrategy>() -> StrategyOptions {
    match serde_json::to_value(S::default_options()) {
        Ok(Value::Object(map)) => map,
        _ => StrategyOptions::new(),
    }
}

/// Overlay `raw` on the strategy defaults, deserialize strictly and validate.
pub(crate) fn resolve_options<S: ComparatorStrategy>(
    id: StrategyId,
    raw: &StrategyOptions,
) -> Result<S::Options, DomainError> {
    let mut merged = defaults_of::<S>();
    for (key, value) in raw {
        merged.insert(key.clone(), value.clone());
    }
    let options: S::Options = serde_json::from_value(Value::Object(merged))
        .map_err(|e| DomainError::invalid_options(id.as_str(), e.to_string()))?;
    let problems = S::validate_options(&options);
    if !problems.is_empty() {
        return Err(DomainError::invalid_options(id.as_str(), problems.join("; ")));
    }
    Ok(options)
}

fn validate_inputs(ctx: &ComparisonContext<'_>) -> Result<(), DomainError> {
    if ctx.all_offers.is_empty() {
        return Err(DomainError::InvalidInput(
            "No offers supplied for comparison".into(),
        ));
    }
    if !ctx.all_offers.iter().any(|o| o.id == ctx.offer.id) {
        return Err(DomainError::InvalidInput(format!(
            "Offer {} is not among the {} offers being compared",
            ctx.offer.id,
            ctx.all_offers.len()
        )));
    }
    let mismatched = ctx
        .all_offers
        .iter()
        .filter(|o| o.item_id != ctx.item.id)
        .count();
    if mismatched > 0 {
        return Err(DomainError::InvalidInput(format!(
            "{mismatched} of {} offers do not belong to item {}",
            ctx.all_offers.len(),
            ctx.item.id
        )));
    }
    Ok(())
}

async fn run<S: ComparatorStrategy>(
    strategy: &S,
    ctx: &ComparisonContext<'_>,
    raw: &StrategyOptions,
) -> Result<CompareOutcome, DomainError> {
    let id = strategy.descriptor().id;
    validate_inputs(ctx)?;
    let options = resolve_options::<S>(id, raw)?;

    if let Err(e) = ctx.offer.validate() {
        let failure = CalculationFailure::validation(e.to_string());
        return Ok(CompareOutcome::Excluded(failure.into_excluded(ctx.offer)));
    }

    let scoring = strategy.score(ctx, &options).await.map_err(|e| match e {
        DomainError::Comparison { .. } => e,
        other => DomainError::comparison(id.as_str(), other),
    })?;

    match scoring {
        Scoring::Failed(failure) => Ok(CompareOutcome::Excluded(failure.into_excluded(ctx.offer))),
        Scoring::Scored(score) if !score.score.is_finite() => Err(DomainError::comparison(
            id.as_str(),
            format!("non-finite score for offer {}", ctx.offer.id),
        )),
        Scoring::Scored(score) => Ok(CompareOutcome::Ranked(finish(id, ctx, score))),
    }
}

/// Apply the shared confidence heuristics and attach the explanation.
fn finish(id: StrategyId, ctx: &ComparisonContext<'_>, raw: StrategyScore) -> ComparisonResult {
    let mut flags = raw.flags;
    let mut confidence = raw.confidence;

    if !raw.fixed_confidence {
        if ctx.offer.quality_rating.is_none() {
            flags.insert(ResultFlag::NoQualityRating);
            confidence = confidence.penalize(MISSING_RATING_PENALTY);
        }
        if ctx.offer.source_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            flags.insert(ResultFlag::MissingProvenance);
            confidence = confidence.penalize(MISSING_PROVENANCE_PENALTY);
        }
        if Utc::now() - ctx.offer.observed_at > Duration::days(STALE_AFTER_DAYS) {
            flags.insert(ResultFlag::StalePrice);
            confidence = confidence.penalize(STALE_PENALTY);
        }
        if deviates_from_mean(ctx) {
            flags.insert(ResultFlag::PriceOutlier);
            confidence = confidence.penalize(OUTLIER_PENALTY);
        }
    }

    let explanation = explain(ctx, &raw.summary, confidence, &flags);
    ComparisonResult {
        offer: ctx.offer.clone(),
        score: raw.score,
        metadata: ResultMetadata {
            strategy_id: id.as_str().to_string(),
            confidence,
            explanation,
            flags,
            breakdown: raw.breakdown,
        },
    }
}

/// Unit price used to compare an offer with its siblings.
fn reference_price(offer: &Offer, item: &InventoryItem) -> f64 {
    offer
        .price_per_canonical_including
        .or_else(|| {
            normalization::canonical_amount(offer, item)
                .ok()
                .map(|amount| offer.total_price / amount)
        })
        .unwrap_or(offer.total_price / offer.amount)
}

fn deviates_from_mean(ctx: &ComparisonContext<'_>) -> bool {
    if ctx.all_offers.len() < 2 {
        return false;
    }
    let prices: Vec<f64> = ctx
        .all_offers
        .iter()
        .map(|o| reference_price(o, ctx.item))
        .filter(|p| p.is_finite())
        .collect();
    if prices.is_empty() {
        return false;
    }
    let mean = prices.iter().sum::<f64>() / prices.len() as f64;
    if mean <= 0.0 {
        return false;
    }
    let own = reference_price(ctx.offer, ctx.item);
    ((own - mean) / mean).abs() > OUTLIER_DEVIATION
}

fn flag_note(flag: ResultFlag) -> Option<&'static str> {
    match flag {
        ResultFlag::ShippingUnknown => Some("shipping cost unknown"),
        ResultFlag::TaxUnknown => Some("tax unknown"),
        ResultFlag::StalePrice => Some("price is over 30 days old"),
        ResultFlag::PriceOutlier => Some("far from the average price"),
        ResultFlag::NoQualityRating => Some("no quality rating"),
        ResultFlag::FallbackComparison => Some("price history unavailable"),
        ResultFlag::BelowHistoricalBest => Some("at or below the best historical price"),
        ResultFlag::AboveHistoricalBest => Some("well above the best historical price"),
        ResultFlag::BulkQuantity => Some("bulk quantity"),
        ResultFlag::NonCanonicalUnit => Some("priced in a non-canonical unit"),
        _ => None,
    }
}

fn explain(
    ctx: &ComparisonContext<'_>,
    summary: &str,
    confidence: Confidence,
    flags: &BTreeSet<ResultFlag>,
) -> String {
    let supplier = ctx
        .suppliers
        .get(&ctx.offer.supplier_id)
        .map(|s| s.name.as_str())
        .unwrap_or(ctx.offer.supplier_name.as_str());
    let notes: Vec<&str> = flags.iter().filter_map(|f| flag_note(*f)).collect();
    let mut text = format!(
        "{supplier}: {summary}. Confidence {:.0}%",
        confidence.value() * 100.0
    );
    if !notes.is_empty() {
        text.push_str(&format!(" ({})", notes.join(", ")));
    }
    text
}

/// `"EUR 0.0140"`
pub(crate) fn format_price(value: f64, currency: &str) -> String {
    format!("{currency} {value:.4}")
}

/// Shared check for an optional currency multiplier.
pub(crate) fn currency_rate_violation(rate: Option<f64>) -> Option<String> {
    match rate {
        Some(r) if !r.is_finite() || r <= 0.0 => {
            Some(format!("currency_rate must be a positive number, got {r}"))
        }
        _ => None,
    }
}
