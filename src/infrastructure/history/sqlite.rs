//! Price history derived from the offers table.
//!
//! Every stored offer with a precomputed price per canonical unit (shipping
//! and tax included) is one observation. No separate history table exists.

use crate::domain::error::DomainError;
use crate::domain::ports::price_history::PriceHistoryService;
use crate::domain::values::trend::{
    self, HistoricalBest, PricePeriod, PricePoint, PriceStatistics, PriceTrend, TrendDirection,
};
use crate::infrastructure::sqlite::sql_builder::SqlBuilder;
use crate::infrastructure::sqlite::{from_db_time, lock, to_db_time, SharedConnection};
use chrono::Utc;

pub struct SqliteHistoryService {
    conn: SharedConnection,
}

impl SqliteHistoryService {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Observations for the item within the period, oldest first.
    pub fn points(
        &self,
        item_id: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<Vec<PricePoint>, DomainError> {
        let mut builder = SqlBuilder::new("offers");
        builder
            .select(&["price_per_canonical_including", "observed_at", "supplier_id"])
            .where_eq("item_id", item_id)
            .where_gte("observed_at", to_db_time(&period.since(Utc::now())))
            .where_null("deleted_at")
            .where_not_null("price_per_canonical_including");
        if let Some(supplier_id) = supplier_id {
            builder.where_eq("supplier_id", supplier_id);
        }
        builder.order_by(&["observed_at ASC"]);
        let (sql, params) = builder.build();

        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&sql)?;
        let points = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                let observed: String = row.get(1)?;
                Ok(PricePoint {
                    price: row.get(0)?,
                    observed_at: from_db_time(&observed),
                    supplier_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(points)
    }

    fn non_empty(
        &self,
        item_id: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<Vec<PricePoint>, DomainError> {
        let points = self.points(item_id, period, supplier_id)?;
        if points.is_empty() {
            return Err(DomainError::History(format!(
                "no price history for item {item_id} in the last {period}"
            )));
        }
        Ok(points)
    }
}

#[async_trait::async_trait]
impl PriceHistoryService for SqliteHistoryService {
    async fn price_trend(
        &self,
        item_id: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<PriceTrend, DomainError> {
        let points = self.non_empty(item_id, period, supplier_id)?;
        // A single observation shows no movement.
        Ok(trend::classify_trend(&points).unwrap_or(PriceTrend {
            direction: TrendDirection::Stable,
            strength: 0.0,
            percent_change: 0.0,
            confidence: 0.1,
        }))
    }

    async fn price_statistics(
        &self,
        item_id: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<PriceStatistics, DomainError> {
        let points = self.non_empty(item_id, period, supplier_id)?;
        trend::summarize(&points)
            .ok_or_else(|| DomainError::History(format!("no price history for item {item_id}")))
    }

    async fn best_historical_price(
        &self,
        item_id: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<Option<HistoricalBest>, DomainError> {
        let points = self.points(item_id, period, supplier_id)?;
        Ok(trend::best_point(&points))
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
