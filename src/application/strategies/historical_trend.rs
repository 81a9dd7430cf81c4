//! Historical trend strategy.
//!
//! Scores an offer by its current price per canonical unit, nudged by what
//! the item's price history says: falling prices make waiting less costly,
//! volatility makes the price less trustworthy, and a price well above the
//! best seen is penalized. History is optional: when the service fails the
//! offer is scored by its current price with a fixed low confidence.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::normalization::{
    self, PricedOffer, PriceCalculation, PriceMode, PriceOptions,
};
use crate::application::strategies::format_price;
use crate::domain::error::DomainError;
use crate::domain::ports::price_history::PriceHistoryService;
use crate::domain::ports::strategy::{
    ComparatorStrategy, ComparisonContext, Scoring, StrategyDescriptor, StrategyId, StrategyScore,
};
use crate::domain::values::confidence::Confidence;
use crate::domain::values::flag::ResultFlag;
use crate::domain::values::trend::{
    HistoricalBest, PricePeriod, PriceStatistics, PriceTrend, TrendDirection,
};

const TREND_FACTOR: f64 = 0.1;
const VOLATILE_TREND_FACTOR: f64 = 0.15;
const VOLATILITY_PENALTY_SCALE: f64 = 0.5;
const STABILITY_BONUS: f64 = 0.05;
/// Ratio to the historical best above which a price is penalized.
const ABOVE_BEST_RATIO: f64 = 1.2;
const ABOVE_BEST_SCALE: f64 = 0.1;
const AT_BEST_BONUS: f64 = 0.05;
const FALLBACK_CONFIDENCE: f64 = 0.3;
const LIMITED_HISTORY_SAMPLES: usize = 5;
const LIMITED_HISTORY_PENALTY: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoricalTrendOptions {
    pub period: PricePeriod,
    pub current_price_weight: f64,
    pub trend_weight: f64,
    pub volatility_threshold: f64,
    pub prefer_stable_prices: bool,
    pub use_best_historical_price: bool,
    /// Restrict history to the offer's own supplier.
    pub per_supplier: bool,
    pub include_shipping: bool,
    pub include_tax: bool,
}

impl Default for HistoricalTrendOptions {
    fn default() -> Self {
        Self {
            period: PricePeriod::Month,
            current_price_weight: 1.0,
            trend_weight: 1.0,
            volatility_threshold: 0.3,
            prefer_stable_prices: true,
            use_best_historical_price: true,
            per_supplier: false,
            include_shipping: true,
            include_tax: true,
        }
    }
}

#[derive(Clone)]
pub struct HistoricalTrendStrategy {
    history: Arc<dyn PriceHistoryService>,
}

impl HistoricalTrendStrategy {
    pub fn new(history: Arc<dyn PriceHistoryService>) -> Self {
        Self { history }
    }

    /// Current price per canonical unit, divided by the item's equivalence
    /// factor like every other strategy.
    fn current_price(ctx: &ComparisonContext<'_>, options: &HistoricalTrendOptions) -> PriceCalculation {
        let price_options = PriceOptions {
            mode: PriceMode::Including,
            include_shipping: options.include_shipping,
            include_tax: options.include_tax,
            use_effective_price: false,
            ..Default::default()
        };
        normalization::calculate_price(ctx.offer, ctx.item, &price_options)
    }

    fn fallback(ctx: &ComparisonContext<'_>, priced: PricedOffer, reason: &DomainError) -> StrategyScore {
        tracing::warn!(
            item_id = %ctx.item.id,
            offer_id = %ctx.offer.id,
            error = %reason,
            "price history unavailable, scoring by current price"
        );
        let mut flags = priced.flags;
        flags.insert(ResultFlag::NoHistoricalData);
        flags.insert(ResultFlag::FallbackComparison);
        StrategyScore {
            score: priced.price_per_canonical,
            confidence: Confidence::clamped(FALLBACK_CONFIDENCE),
            fixed_confidence: true,
            breakdown: priced.breakdown,
            flags,
            summary: format!(
                "{} per {} (no price history)",
                format_price(priced.price_per_canonical, &ctx.offer.currency),
                ctx.item.canonical_unit
            ),
        }
    }
}

/// Bring a stored historical best onto the same basis as the current price.
fn on_item_basis(best: HistoricalBest, equivalence_factor: f64) -> HistoricalBest {
    HistoricalBest {
        price: best.price / equivalence_factor,
        ..best
    }
}

/// Apply the history adjustments to `priced` and return the score.
pub fn adjust_for_history(
    priced: PricedOffer,
    trend: &PriceTrend,
    stats: &PriceStatistics,
    best: Option<&HistoricalBest>,
    options: &HistoricalTrendOptions,
) -> (f64, Confidence, PricedOffer) {
    let price = priced.price_per_canonical;
    let mut flags = priced.flags.clone();
    let mut breakdown = priced.breakdown.clone();

    let base = price * options.current_price_weight;
    let strength = trend.strength.clamp(0.0, 1.0);
    let trend_adjustment = options.trend_weight
        * match trend.direction {
            TrendDirection::Down => -price * TREND_FACTOR * strength,
            TrendDirection::Up => price * TREND_FACTOR * strength,
            TrendDirection::Volatile => price * VOLATILE_TREND_FACTOR * strength,
            TrendDirection::Stable => 0.0,
        };
    flags.insert(match trend.direction {
        TrendDirection::Down => ResultFlag::TrendDown,
        TrendDirection::Up => ResultFlag::TrendUp,
        TrendDirection::Stable => ResultFlag::TrendStable,
        TrendDirection::Volatile => ResultFlag::TrendVolatile,
    });

    let volatility = stats.volatility.max(0.0);
    let mut volatility_adjustment = 0.0;
    if volatility > options.volatility_threshold {
        flags.insert(ResultFlag::HighVolatility);
        volatility_adjustment += price * (volatility - options.volatility_threshold) * VOLATILITY_PENALTY_SCALE;
    }
    if options.prefer_stable_prices {
        volatility_adjustment -= price * (1.0 - volatility.min(1.0)) * STABILITY_BONUS;
    }

    let mut best_adjustment = 0.0;
    if options.use_best_historical_price {
        if let Some(best) = best.filter(|b| b.price > 0.0) {
            let ratio = price / best.price;
            if ratio > ABOVE_BEST_RATIO {
                flags.insert(ResultFlag::AboveHistoricalBest);
                best_adjustment = price * (ratio - 1.0) * ABOVE_BEST_SCALE;
            } else if price <= best.price {
                flags.insert(ResultFlag::BelowHistoricalBest);
                best_adjustment = -price * AT_BEST_BONUS;
            }
            breakdown.insert("historical_best".into(), best.price);
        }
    }

    let mut confidence = Confidence::clamped(
        priced.confidence.value() * (0.7 + 0.3 * trend.confidence.clamp(0.0, 1.0)),
    );
    if stats.sample_count < LIMITED_HISTORY_SAMPLES {
        flags.insert(ResultFlag::LimitedHistory);
        confidence = confidence.penalize(LIMITED_HISTORY_PENALTY);
    }

    breakdown.insert("base_score".into(), base);
    breakdown.insert("trend_adjustment".into(), trend_adjustment);
    breakdown.insert("volatility_adjustment".into(), volatility_adjustment);
    breakdown.insert("best_price_adjustment".into(), best_adjustment);
    breakdown.insert("volatility".into(), volatility);
    breakdown.insert("percent_change".into(), trend.percent_change);

    let score = base + trend_adjustment + volatility_adjustment + best_adjustment;
    (
        score,
        confidence,
        PricedOffer {
            flags,
            breakdown,
            ..priced
        },
    )
}

#[async_trait]
impl ComparatorStrategy for HistoricalTrendStrategy {
    type Options = HistoricalTrendOptions;

    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            id: StrategyId::HistoricalTrend,
            name: "Historical trend",
            description: "Current price per canonical unit adjusted by price trend, volatility and historical best",
            version: "1.0.0",
        }
    }

    fn validate_options(options: &Self::Options) -> Vec<String> {
        let mut problems = Vec::new();
        let w = options.current_price_weight;
        if !w.is_finite() || w <= 0.0 || w > 1.0 {
            problems.push(format!("current_price_weight must be in (0, 1], got {w}"));
        }
        let t = options.trend_weight;
        if !t.is_finite() || !(0.0..=1.0).contains(&t) {
            problems.push(format!("trend_weight must be between 0 and 1, got {t}"));
        }
        let v = options.volatility_threshold;
        if !v.is_finite() || v < 0.0 {
            problems.push(format!("volatility_threshold must be non-negative, got {v}"));
        }
        problems
    }

    async fn score(
        &self,
        ctx: &ComparisonContext<'_>,
        options: &Self::Options,
    ) -> Result<Scoring, DomainError> {
        let priced = match Self::current_price(ctx, options) {
            PriceCalculation::Priced(p) => p,
            PriceCalculation::Failed(failure) => return Ok(Scoring::Failed(failure)),
        };

        let item_id = ctx.item.id.as_str();
        let supplier = options.per_supplier.then_some(ctx.offer.supplier_id.as_str());
        let (trend, stats, best) = tokio::join!(
            self.history.price_trend(item_id, options.period, supplier),
            self.history.price_statistics(item_id, options.period, supplier),
            self.history.best_historical_price(item_id, options.period, supplier),
        );
        let (trend, stats, best) = match (trend, stats, best) {
            // Stored history carries no equivalence factor
            (Ok(t), Ok(s), Ok(b)) => (t, s, b.map(|b| on_item_basis(b, ctx.item.equivalence_factor))),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                return Ok(Scoring::Scored(Self::fallback(ctx, priced, &e)));
            }
        };

        let (score, confidence, adjusted) =
            adjust_for_history(priced, &trend, &stats, best.as_ref(), options);
        tracing::debug!(
            item_id,
            offer_id = %ctx.offer.id,
            history = self.history.name(),
            direction = %trend.direction,
            score,
            "scored against price history"
        );

        Ok(Scoring::Scored(StrategyScore {
            score,
            confidence,
            fixed_confidence: false,
            summary: format!(
                "{} per {} with {} trend over the last {} ({} samples)",
                format_price(adjusted.price_per_canonical, &ctx.offer.currency),
                ctx.item.canonical_unit,
                trend.direction,
                options.period,
                stats.sample_count
            ),
            breakdown: adjusted.breakdown,
            flags: adjusted.flags,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::comparison::ScoreBreakdown;
    use std::collections::BTreeSet;

    fn priced(price: f64) -> PricedOffer {
        PricedOffer {
            price_per_canonical: price,
            canonical_amount: 1.0,
            total_cost: price,
            confidence: Confidence::FULL,
            breakdown: ScoreBreakdown::new(),
            flags: BTreeSet::new(),
        }
    }

    fn stats(volatility: f64, samples: usize) -> PriceStatistics {
        PriceStatistics {
            average: 10.0,
            min: 8.0,
            max: 12.0,
            volatility,
            sample_count: samples,
        }
    }

    fn trend(direction: TrendDirection, strength: f64) -> PriceTrend {
        PriceTrend {
            direction,
            strength,
            percent_change: 0.0,
            confidence: 1.0,
        }
    }

    #[test]
    fn test_downtrend_lowers_score() {
        let opts = HistoricalTrendOptions {
            prefer_stable_prices: false,
            use_best_historical_price: false,
            ..Default::default()
        };
        let (score, _, out) = adjust_for_history(
            priced(10.0),
            &trend(TrendDirection::Down, 1.0),
            &stats(0.1, 10),
            None,
            &opts,
        );
        assert!((score - 9.0).abs() < 1e-9);
        assert!(out.flags.contains(&ResultFlag::TrendDown));
    }

    #[test]
    fn test_high_volatility_penalized() {
        let opts = HistoricalTrendOptions {
            prefer_stable_prices: false,
            use_best_historical_price: false,
            ..Default::default()
        };
        let (score, _, out) = adjust_for_history(
            priced(10.0),
            &trend(TrendDirection::Stable, 0.0),
            &stats(0.5, 10),
            None,
            &opts,
        );
        // 10 + 10 × (0.5 − 0.3) × 0.5
        assert!((score - 11.0).abs() < 1e-9);
        assert!(out.flags.contains(&ResultFlag::HighVolatility));
    }

    #[test]
    fn test_historical_best_adjustments() {
        let opts = HistoricalTrendOptions {
            prefer_stable_prices: false,
            ..Default::default()
        };
        let best = HistoricalBest {
            price: 5.0,
            observed_at: chrono::Utc::now(),
            supplier_id: None,
        };
        let (score, _, out) = adjust_for_history(
            priced(10.0),
            &trend(TrendDirection::Stable, 0.0),
            &stats(0.1, 10),
            Some(&best),
            &opts,
        );
        // ratio 2.0: 10 + 10 × 1.0 × 0.1
        assert!((score - 11.0).abs() < 1e-9);
        assert!(out.flags.contains(&ResultFlag::AboveHistoricalBest));

        let (score, _, out) = adjust_for_history(
            priced(4.0),
            &trend(TrendDirection::Stable, 0.0),
            &stats(0.1, 10),
            Some(&best),
            &opts,
        );
        assert!((score - 3.8).abs() < 1e-9);
        assert!(out.flags.contains(&ResultFlag::BelowHistoricalBest));
    }

    #[test]
    fn test_limited_history_confidence() {
        let (_, confidence, out) = adjust_for_history(
            priced(10.0),
            &trend(TrendDirection::Stable, 0.0),
            &stats(0.0, 2),
            None,
            &HistoricalTrendOptions::default(),
        );
        assert!((confidence.value() - 0.9).abs() < 1e-9);
        assert!(out.flags.contains(&ResultFlag::LimitedHistory));
    }

    #[test]
    fn test_weights_validated() {
        let opts = HistoricalTrendOptions {
            current_price_weight: 0.0,
            trend_weight: 2.0,
            ..Default::default()
        };
        assert_eq!(HistoricalTrendStrategy::validate_options(&opts).len(), 2);
    }
}
