use crate::domain::error::DomainError;
use crate::domain::ports::price_history::PriceHistoryService;
use crate::domain::values::trend::{HistoricalBest, PricePeriod, PriceStatistics, PriceTrend};

/// History service for deployments without price history. Every call fails,
/// so trend comparisons fall back to current prices.
pub struct UnavailableHistoryService;

impl UnavailableHistoryService {
    fn unavailable(item_id: &str) -> DomainError {
        DomainError::History(format!("price history is not configured (item {item_id})"))
    }
}

#[async_trait::async_trait]
impl PriceHistoryService for UnavailableHistoryService {
    async fn price_trend(&self, item_id: &str, _: PricePeriod, _: Option<&str>) -> Result<PriceTrend, DomainError> {
        Err(Self::unavailable(item_id))
    }

    async fn price_statistics(
        &self,
        item_id: &str,
        _: PricePeriod,
        _: Option<&str>,
    ) -> Result<PriceStatistics, DomainError> {
        Err(Self::unavailable(item_id))
    }

    async fn best_historical_price(
        &self,
        item_id: &str,
        _: PricePeriod,
        _: Option<&str>,
    ) -> Result<Option<HistoricalBest>, DomainError> {
        Err(Self::unavailable(item_id))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
