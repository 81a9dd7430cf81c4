//! JSON client for a remote price history service.
//!
//! Endpoints, relative to the base URL:
//!
//! - `GET items/{id}/trend?period=month[&supplier_id=..]` → `PriceTrend`
//! - `GET items/{id}/statistics?...` → `PriceStatistics`
//! - `GET items/{id}/best?...` → `HistoricalBest` or `null`

use crate::domain::error::DomainError;
use crate::domain::ports::price_history::PriceHistoryService;
use crate::domain::values::trend::{HistoricalBest, PricePeriod, PriceStatistics, PriceTrend};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub struct HttpHistoryService {
    client: Client,
    base_url: String,
}

impl HttpHistoryService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::History(format!("HTTP client error: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        item_id: &str,
        endpoint: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<T, DomainError> {
        let url = format!("{}/items/{item_id}/{endpoint}", self.base_url);
        let mut query = vec![("period", period.as_str())];
        if let Some(supplier_id) = supplier_id {
            query.push(("supplier_id", supplier_id));
        }

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| DomainError::History(format!("History API error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::History(format!("History API {status}: {body}")));
        }

        resp.json()
            .await
            .map_err(|e| DomainError::Parse(format!("History response for {endpoint}: {e}")))
    }
}

#[async_trait::async_trait]
impl PriceHistoryService for HttpHistoryService {
    async fn price_trend(
        &self,
        item_id: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<PriceTrend, DomainError> {
        self.get(item_id, "trend", period, supplier_id).await
    }

    async fn price_statistics(
        &self,
        item_id: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<PriceStatistics, DomainError> {
        self.get(item_id, "statistics", period, supplier_id).await
    }

    async fn best_historical_price(
        &self,
        item_id: &str,
        period: PricePeriod,
        supplier_id: Option<&str>,
    ) -> Result<Option<HistoricalBest>, DomainError> {
        self.get(item_id, "best", period, supplier_id).await
    }

    fn name(&self) -> &str {
        "http"
    }
}
