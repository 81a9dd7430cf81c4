use crate::domain::entities::comparison_config::SortDirection;
use crate::domain::entities::offer::Offer;
use crate::domain::error::DomainError;
use crate::domain::ports::find_options::FindOptions;
use crate::domain::values::ranking_metric::RankingMetric;
use crate::domain::values::source_type::SourceType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Predicate fields for offer lookups. Empty vectors and `None` mean
/// "no constraint".
#[derive(Debug, Clone, Default)]
pub struct OfferFilter {
    pub item_ids: Vec<String>,
    pub supplier_ids: Vec<String>,
    pub observed_from: Option<DateTime<Utc>>,
    pub observed_to: Option<DateTime<Utc>>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_quality: Option<u8>,
    pub max_quality: Option<u8>,
    pub currencies: Vec<String>,
    pub source_types: Vec<SourceType>,
}

impl OfferFilter {
    pub fn for_item(item_id: &str) -> Self {
        Self {
            item_ids: vec![item_id.to_string()],
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// A set-oriented ranking request answered without per-offer strategies.
#[derive(Debug, Clone, Default)]
pub struct BulkRankingQuery {
    pub filter: OfferFilter,
    pub metric: RankingMetric,
    pub direction: SortDirection,
    pub include_deleted: bool,
    pub page: Page,
    /// Keep only the best row of each item.
    pub best_per_item: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedOffer {
    pub offer: Offer,
    pub score: f64,
}

#[async_trait]
pub trait OfferRepository: Send + Sync {
    async fn add(&self, offer: &Offer) -> Result<(), DomainError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Offer>, DomainError>;
    async fn find_all(&self, options: &FindOptions) -> Result<Vec<Offer>, DomainError>;
    async fn find_where(
        &self,
        filter: &OfferFilter,
        options: &FindOptions,
    ) -> Result<Vec<Offer>, DomainError>;
    async fn soft_delete(&self, id: &str) -> Result<(), DomainError>;
    async fn ranked_offers(&self, query: &BulkRankingQuery) -> Result<Vec<RankedOffer>, DomainError>;

    async fn find_by_item(
        &self,
        item_id: &str,
        options: &FindOptions,
    ) -> Result<Vec<Offer>, DomainError> {
        self.find_where(&OfferFilter::for_item(item_id), options).await
    }
}
