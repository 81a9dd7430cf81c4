//! Comparison engine.
//!
//! Loads an item with its offers and suppliers, scores every offer under the
//! configured strategies concurrently, and packages the ranked results. Runs
//! are cached per item and config.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinSet;

use crate::application::cache::ResultCache;
use crate::application::strategies::{Comparator, StrategyRegistry};
use crate::domain::entities::comparison::{
    CompareOutcome, ComparisonResult, ExcludedOffer, ExclusionReason, ItemComparisonResults,
    RunMetadata,
};
use crate::domain::entities::comparison_config::{ComparisonConfig, SortDirection, StrategyOptions};
use crate::domain::entities::inventory_item::InventoryItem;
use crate::domain::entities::offer::Offer;
use crate::domain::entities::supplier::Supplier;
use crate::domain::error::DomainError;
use crate::domain::ports::find_options::FindOptions;
use crate::domain::ports::item_repository::ItemRepository;
use crate::domain::ports::offer_repository::OfferRepository;
use crate::domain::ports::price_history::PriceHistoryService;
use crate::domain::ports::supplier_repository::SupplierRepository;
use crate::domain::values::flag::ResultFlag;

/// Strategies resolved from a validated config.
#[derive(Clone)]
struct Plan {
    primary: Comparator,
    primary_options: StrategyOptions,
    secondary: Vec<(Comparator, f64, StrategyOptions)>,
}

/// Read-only inputs shared by every per-offer task.
struct Snapshot {
    item: InventoryItem,
    offers: Vec<Offer>,
    suppliers: HashMap<String, Supplier>,
}

#[derive(Clone)]
pub struct ComparisonEngine {
    items: Arc<dyn ItemRepository>,
    offers: Arc<dyn OfferRepository>,
    suppliers: Arc<dyn SupplierRepository>,
    registry: StrategyRegistry,
    cache: Arc<ResultCache>,
}

impl ComparisonEngine {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        offers: Arc<dyn OfferRepository>,
        suppliers: Arc<dyn SupplierRepository>,
        history: Arc<dyn PriceHistoryService>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            items,
            offers,
            suppliers,
            registry: StrategyRegistry::new(history),
            cache: Arc::new(ResultCache::new(cache_capacity)),
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Rank every offer of `item_id` under `config`.
    pub async fn compare_offers(
        &self,
        item_id: &str,
        config: &ComparisonConfig,
    ) -> Result<ItemComparisonResults, DomainError> {
        let plan = self.plan(config)?;
        self.run(item_id, config, plan).await
    }

    /// Compare several items concurrently. A config error fails the whole
    /// call; any other per-item failure becomes a degraded entry.
    pub async fn compare_multiple_items(
        &self,
        item_ids: &[String],
        config: &ComparisonConfig,
    ) -> Result<Vec<ItemComparisonResults>, DomainError> {
        let plan = self.plan(config)?;
        let mut tasks = JoinSet::new();
        for (index, item_id) in item_ids.iter().enumerate() {
            let engine = self.clone();
            let plan = plan.clone();
            let config = config.clone();
            let item_id = item_id.clone();
            tasks.spawn(async move {
                let outcome = engine.run(&item_id, &config, plan).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<ItemComparisonResults>> = vec![None; item_ids.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(results))) => slots[index] = Some(results),
                Ok((index, Err(e))) => {
                    tracing::warn!(item_id = %item_ids[index], error = %e, "item comparison degraded");
                    slots[index] = Some(ItemComparisonResults::degraded(
                        &item_ids[index],
                        config,
                        format!("{}: {e}", e.code()),
                    ));
                }
                Err(e) => tracing::error!(error = %e, "item comparison task failed"),
            }
        }

        Ok(slots
            .into_iter()
            .zip(item_ids)
            .map(|(slot, item_id)| {
                slot.unwrap_or_else(|| {
                    ItemComparisonResults::degraded(item_id, config, "comparison task failed".into())
                })
            })
            .collect())
    }

    /// Drop cached results for one item, e.g. after its offers changed.
    pub fn invalidate_item(&self, item_id: &str) -> usize {
        let removed = self.cache.invalidate_item(item_id);
        if removed > 0 {
            tracing::debug!(item_id, removed, "invalidated cached comparisons");
        }
        removed
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Resolve and validate every strategy of `config` before any work runs.
    fn plan(&self, config: &ComparisonConfig) -> Result<Plan, DomainError> {
        let primary = self.registry.get(&config.primary_strategy)?;
        let secondary_strategies = config
            .secondary
            .iter()
            .map(|s| self.registry.get(&s.strategy_id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut violations = config.global.violations();
        for s in &config.secondary {
            if !s.weight.is_finite() || !(0.0..=1.0).contains(&s.weight) {
                violations.push(format!(
                    "weight of secondary strategy '{}' must be within [0, 1], got {}",
                    s.strategy_id, s.weight
                ));
            }
        }
        if !violations.is_empty() {
            return Err(DomainError::InvalidConfig(violations.join("; ")));
        }

        primary.validate_options(&config.options)?;
        for (strategy, s) in secondary_strategies.iter().zip(&config.secondary) {
            strategy.validate_options(&s.options)?;
        }

        Ok(Plan {
            primary,
            primary_options: config.options.clone(),
            secondary: secondary_strategies
                .into_iter()
                .zip(&config.secondary)
                .map(|(strategy, s)| (strategy, s.weight, s.options.clone()))
                .collect(),
        })
    }

    async fn run(
        &self,
        item_id: &str,
        config: &ComparisonConfig,
        plan: Plan,
    ) -> Result<ItemComparisonResults, DomainError> {
        let started = Instant::now();
        let global = &config.global;
        let cache_key = config.cache_key(item_id);

        if global.use_cache {
            if let Some(mut cached) = self.cache.get(&cache_key) {
                tracing::debug!(item_id, "comparison served from cache");
                cached.metadata.from_cache = true;
                return Ok(cached);
            }
        }

        let find = FindOptions::including_deleted(global.include_deleted);
        let (item, offers, suppliers) = tokio::try_join!(
            self.items.find_by_id(item_id),
            self.offers.find_by_item(item_id, &find),
            self.suppliers.lookup_table(),
        )?;
        let item = item.ok_or_else(|| DomainError::ItemNotFound(item_id.to_string()))?;
        let total_offers = offers.len();

        let (mut results, mut excluded) = if offers.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            let snapshot = Arc::new(Snapshot {
                item: item.clone(),
                offers,
                suppliers,
            });
            self.score_all(snapshot, &plan).await?
        };

        let min_confidence = global.min_confidence;
        if min_confidence > 0.0 {
            let (kept, dropped): (Vec<_>, Vec<_>) = results
                .into_iter()
                .partition(|r: &ComparisonResult| r.metadata.confidence.value() >= min_confidence);
            results = kept;
            excluded.extend(dropped.into_iter().map(|r| below_threshold(r, min_confidence)));
        }

        sort_results(&mut results, global.sort_direction);
        if let Some(max) = global.max_results {
            results.truncate(max);
        }

        let elapsed = started.elapsed();
        let packaged = ItemComparisonResults {
            item_id: item_id.to_string(),
            item: Some(item),
            best_offer: results.first().cloned(),
            metadata: RunMetadata {
                total_offers,
                excluded_offers: excluded.len(),
                execution_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                strategy_id: plan.primary.id().as_str().to_string(),
                compared_at: Utc::now(),
                from_cache: false,
                error: None,
            },
            results,
            excluded,
            config: config.clone(),
        };

        tracing::info!(
            item_id,
            strategy = %plan.primary.id(),
            offers = total_offers,
            ranked = packaged.results.len(),
            excluded = packaged.excluded.len(),
            elapsed_ms = packaged.metadata.execution_time_ms,
            "comparison complete"
        );

        if global.use_cache {
            self.cache.insert(
                cache_key,
                packaged.clone(),
                Duration::from_secs(global.cache_ttl_secs),
                global.cache_max_entries,
            );
        }
        Ok(packaged)
    }

    /// Score every offer in its own task and return the outcomes in load order.
    async fn score_all(
        &self,
        snapshot: Arc<Snapshot>,
        plan: &Plan,
    ) -> Result<(Vec<ComparisonResult>, Vec<ExcludedOffer>), DomainError> {
        let mut tasks = JoinSet::new();
        for index in 0..snapshot.offers.len() {
            let snapshot = snapshot.clone();
            let plan = plan.clone();
            tasks.spawn(async move {
                let outcome = evaluate(&snapshot, index, &plan).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<CompareOutcome>> = vec![None; snapshot.offers.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) =
                joined.map_err(|e| DomainError::comparison(plan.primary.id().as_str(), e))?;
            slots[index] = Some(outcome?);
        }

        let mut ranked = Vec::new();
        let mut excluded = Vec::new();
        for outcome in slots.into_iter().flatten() {
            match outcome {
                CompareOutcome::Ranked(result) => ranked.push(result),
                CompareOutcome::Excluded(offer) => excluded.push(offer),
            }
        }
        Ok((ranked, excluded))
    }
}

/// Primary score, blended with the secondary strategies as a weighted mean
/// where the primary carries weight 1.
async fn evaluate(snapshot: &Snapshot, index: usize, plan: &Plan) -> Result<CompareOutcome, DomainError> {
    let offer = &snapshot.offers[index];
    let outcome = plan
        .primary
        .compare(offer, &snapshot.offers, &snapshot.item, &snapshot.suppliers, &plan.primary_options)
        .await?;
    let mut result = match outcome {
        CompareOutcome::Ranked(result) => result,
        excluded => return Ok(excluded),
    };
    if plan.secondary.is_empty() {
        return Ok(CompareOutcome::Ranked(result));
    }

    let mut weighted = result.score;
    let mut total_weight = 1.0;
    for (strategy, weight, options) in &plan.secondary {
        let secondary = strategy
            .compare(offer, &snapshot.offers, &snapshot.item, &snapshot.suppliers, options)
            .await?;
        match secondary {
            CompareOutcome::Ranked(s) => {
                weighted += s.score * weight;
                total_weight += weight;
                result
                    .metadata
                    .breakdown
                    .insert(format!("secondary:{}", strategy.id()), s.score);
            }
            CompareOutcome::Excluded(_) => {
                result.metadata.flags.insert(ResultFlag::SecondarySkipped);
            }
        }
    }
    result.metadata.breakdown.insert("primary_score".into(), result.score);
    result.score = weighted / total_weight;
    result.metadata.breakdown.insert("composite_score".into(), result.score);
    Ok(CompareOutcome::Ranked(result))
}

fn below_threshold(result: ComparisonResult, min_confidence: f64) -> ExcludedOffer {
    ExcludedOffer {
        offer_id: result.offer.id.clone(),
        supplier_name: result.offer.supplier_name.clone(),
        reason: ExclusionReason::BelowMinConfidence,
        message: format!(
            "confidence {} is below the minimum {min_confidence}",
            result.metadata.confidence
        ),
        flags: result.metadata.flags,
    }
}

/// Stable: equal scores keep load order in both directions.
fn sort_results(results: &mut [ComparisonResult], direction: SortDirection) {
    results.sort_by(|a, b| {
        let ord: Ordering = a.score.total_cmp(&b.score);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}
