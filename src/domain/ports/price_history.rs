//! Price history port.
//!
//! A time-series view of an item's past prices per canonical unit. Any call
//! may fail (including "service unavailable"); consumers must degrade rather
//! than propagate.

use crate::domain::error::DomainError;
use crate::domain::values::trend::{HistoricalBest, PricePeriod, PriceStatistics, PriceTrend};
use async_trait::async_trait;

#[async_trait]
pub trait PriceHistoryService: Send + Sync {
    async fn price_trend(
        &self,
        item_id: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<PriceTrend, DomainError>;

    async fn price_statistics(
        &self,
        item_id: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<PriceStatistics, DomainError>;

    /// `Ok(None)` when the period holds no observations.
    async fn best_historical_price(
        &self,
        item_id: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<Option<HistoricalBest>, DomainError>;

    /// Name for logging.
    fn name(&self) -> &str;
}
