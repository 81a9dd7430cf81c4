pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

use crate::application::catalog::CatalogUseCase;
use crate::application::engine::ComparisonEngine;
use crate::config::{HistoryProvider, Settings};
use crate::domain::entities::comparison::ItemComparisonResults;
use crate::domain::entities::comparison_config::{ComparisonConfig, SortDirection, StrategyOptions};
use crate::domain::entities::inventory_item::InventoryItem;
use crate::domain::entities::offer::Offer;
use crate::domain::entities::supplier::Supplier;
use crate::domain::error::DomainError;
use crate::domain::ports::find_options::FindOptions;
use crate::domain::ports::item_repository::ItemRepository;
use crate::domain::ports::offer_repository::{BulkRankingQuery, OfferFilter, OfferRepository, Page, RankedOffer};
use crate::domain::ports::price_history::PriceHistoryService;
use crate::domain::ports::strategy::StrategyDescriptor;
use crate::domain::ports::supplier_repository::SupplierRepository;
use crate::domain::values::ranking_metric::RankingMetric;
use crate::domain::values::unit;
use crate::infrastructure::history::http::HttpHistoryService;
use crate::infrastructure::history::sqlite::SqliteHistoryService;
use crate::infrastructure::history::unavailable::UnavailableHistoryService;
use crate::infrastructure::sqlite::item_repo::SqliteItemRepo;
use crate::infrastructure::sqlite::offer_repo::SqliteOfferRepo;
use crate::infrastructure::sqlite::supplier_repo::SqliteSupplierRepo;
use crate::infrastructure::sqlite::{self as store, SharedConnection};
use std::sync::Arc;
use std::time::Duration;

pub struct Pricewise {
    catalog: CatalogUseCase,
    engine: ComparisonEngine,
    offers: Arc<dyn OfferRepository>,
    cache_ttl_secs: u64,
}

impl Pricewise {
    /// Open `db_path` with the remaining settings read from the environment.
    pub fn new(db_path: &str) -> Result<Self, DomainError> {
        let settings = Settings {
            db_path: db_path.to_string(),
            ..Settings::from_env()
        };
        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, DomainError> {
        let conn = store::open(&settings.db_path)?;
        let history: Arc<dyn PriceHistoryService> = match settings.history_provider {
            HistoryProvider::Sqlite => Arc::new(SqliteHistoryService::new(conn.clone())),
            HistoryProvider::Http => {
                let url = settings.history_url.as_deref().ok_or_else(|| {
                    DomainError::InvalidConfig("PRICEWISE_HISTORY_URL is required for the http history provider".into())
                })?;
                Arc::new(HttpHistoryService::new(url, Duration::from_secs(settings.history_timeout_secs))?)
            }
            HistoryProvider::None => Arc::new(UnavailableHistoryService),
        };
        let mut pricewise = Self::with_connection(conn, history, settings.cache_capacity);
        pricewise.cache_ttl_secs = settings.cache_ttl_secs;
        Ok(pricewise)
    }

    /// Open `db_path` with an explicit history service.
    pub fn with_providers(
        db_path: &str,
        history: Arc<dyn PriceHistoryService>,
        cache_capacity: usize,
    ) -> Result<Self, DomainError> {
        let conn = store::open(db_path)?;
        Ok(Self::with_connection(conn, history, cache_capacity))
    }

    pub fn with_connection(
        conn: SharedConnection,
        history: Arc<dyn PriceHistoryService>,
        cache_capacity: usize,
    ) -> Self {
        let items: Arc<dyn ItemRepository> = Arc::new(SqliteItemRepo::new(conn.clone()));
        let suppliers: Arc<dyn SupplierRepository> = Arc::new(SqliteSupplierRepo::new(conn.clone()));
        let offers: Arc<dyn OfferRepository> = Arc::new(SqliteOfferRepo::new(conn));
        tracing::debug!(history = history.name(), cache_capacity, "pricewise initialized");

        Self {
            catalog: CatalogUseCase::new(items.clone(), suppliers.clone(), offers.clone()),
            engine: ComparisonEngine::new(items, offers.clone(), suppliers, history, cache_capacity),
            offers,
            cache_ttl_secs: Settings::default().cache_ttl_secs,
        }
    }

    /// A config for `strategy` carrying the configured cache TTL.
    pub fn default_config(&self, strategy: &str) -> ComparisonConfig {
        let mut config = ComparisonConfig::new(strategy);
        config.global.cache_ttl_secs = self.cache_ttl_secs;
        config
    }

    // Catalog

    pub async fn add_item(&self, item: InventoryItem) -> Result<InventoryItem, DomainError> {
        self.catalog.add_item(item).await
    }

    pub async fn add_supplier(&self, name: String, website: Option<String>) -> Result<Supplier, DomainError> {
        self.catalog.add_supplier(Supplier::new(name, website)).await
    }

    /// Store an offer and drop cached comparisons of its item.
    pub async fn add_offer(&self, offer: Offer) -> Result<Offer, DomainError> {
        let offer = self.catalog.add_offer(offer).await?;
        self.engine.invalidate_item(&offer.item_id);
        Ok(offer)
    }

    pub async fn delete_offer(&self, id: &str) -> Result<Offer, DomainError> {
        let offer = self.catalog.delete_offer(id).await?;
        self.engine.invalidate_item(&offer.item_id);
        Ok(offer)
    }

    pub async fn item(&self, id: &str) -> Result<InventoryItem, DomainError> {
        self.catalog.item(id).await
    }

    pub async fn items(&self, include_deleted: bool) -> Result<Vec<InventoryItem>, DomainError> {
        self.catalog.items(&FindOptions::including_deleted(include_deleted)).await
    }

    pub async fn suppliers(&self) -> Result<Vec<Supplier>, DomainError> {
        self.catalog.suppliers(&FindOptions::default()).await
    }

    pub async fn offers(&self, filter: &OfferFilter, options: &FindOptions) -> Result<Vec<Offer>, DomainError> {
        self.catalog.offers(filter, options).await
    }

    // Comparison

    pub async fn compare(&self, item_id: &str, config: &ComparisonConfig) -> Result<ItemComparisonResults, DomainError> {
        self.engine.compare_offers(item_id, config).await
    }

    /// Compare the given items, or every item when `item_ids` is empty.
    pub async fn compare_all(
        &self,
        item_ids: &[String],
        config: &ComparisonConfig,
    ) -> Result<Vec<ItemComparisonResults>, DomainError> {
        let ids: Vec<String> = if item_ids.is_empty() {
            self.items(false).await?.into_iter().map(|i| i.id).collect()
        } else {
            item_ids.to_vec()
        };
        self.engine.compare_multiple_items(&ids, config).await
    }

    /// Best offer of each item, ranked in SQL under a strategy's default options.
    pub async fn best_offers(
        &self,
        strategy_id: &str,
        filter: OfferFilter,
        direction: SortDirection,
        page: Page,
    ) -> Result<Vec<RankedOffer>, DomainError> {
        let query = BulkRankingQuery {
            filter,
            metric: RankingMetric::from_strategy_id(strategy_id)?,
            direction,
            include_deleted: false,
            page,
            best_per_item: true,
        };
        self.offers.ranked_offers(&query).await
    }

    pub fn strategies(&self) -> Vec<StrategyDescriptor> {
        self.engine.registry().descriptors()
    }

    pub fn strategy_defaults(&self, strategy_id: &str) -> Result<StrategyOptions, DomainError> {
        Ok(self.engine.registry().get(strategy_id)?.default_options())
    }

    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64, DomainError> {
        Ok(unit::convert(amount, from, to)?)
    }

    pub fn invalidate_item(&self, item_id: &str) -> usize {
        self.engine.invalidate_item(item_id)
    }

    pub fn clear_cache(&self) {
        self.engine.clear_cache();
    }

    pub fn cache_len(&self) -> usize {
        self.engine.cache_len()
    }
}
