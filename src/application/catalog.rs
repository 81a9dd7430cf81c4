use crate::application::normalization;
use crate::domain::entities::inventory_item::InventoryItem;
use crate::domain::entities::offer::Offer;
use crate::domain::entities::supplier::Supplier;
use crate::domain::error::DomainError;
use crate::domain::ports::find_options::FindOptions;
use crate::domain::ports::item_repository::ItemRepository;
use crate::domain::ports::offer_repository::{OfferFilter, OfferRepository};
use crate::domain::ports::supplier_repository::SupplierRepository;
use std::sync::Arc;

/// Items, suppliers and the offers recorded against them.
pub struct CatalogUseCase {
    items: Arc<dyn ItemRepository>,
    suppliers: Arc<dyn SupplierRepository>,
    offers: Arc<dyn OfferRepository>,
}

impl CatalogUseCase {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        suppliers: Arc<dyn SupplierRepository>,
        offers: Arc<dyn OfferRepository>,
    ) -> Self {
        Self {
            items,
            suppliers,
            offers,
        }
    }

    pub async fn add_item(&self, item: InventoryItem) -> Result<InventoryItem, DomainError> {
        item.validate()?;
        self.items.add(&item).await?;
        tracing::info!(item_id = %item.id, name = %item.name, unit = %item.canonical_unit, "item added");
        Ok(item)
    }

    pub async fn add_supplier(&self, supplier: Supplier) -> Result<Supplier, DomainError> {
        if supplier.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("Supplier name must not be empty".into()));
        }
        self.suppliers.add(&supplier).await?;
        Ok(supplier)
    }

    /// Validate the offer against its item, fill the derived price fields and
    /// store it. Unknown suppliers are accepted as long as a name is given.
    pub async fn add_offer(&self, offer: Offer) -> Result<Offer, DomainError> {
        offer.validate()?;
        let item = self
            .items
            .find_by_id(&offer.item_id)
            .await?
            .ok_or_else(|| DomainError::ItemNotFound(offer.item_id.clone()))?;

        let mut offer = normalization::precompute(&offer, &item);
        if offer.supplier_name.trim().is_empty() {
            let supplier = self
                .suppliers
                .find_by_id(&offer.supplier_id)
                .await?
                .ok_or_else(|| DomainError::NotFound(format!("supplier {}", offer.supplier_id)))?;
            offer.supplier_name = supplier.name;
        }
        if offer.canonical_amount.is_none() {
            tracing::warn!(
                offer_id = %offer.id,
                unit = %offer.amount_unit,
                canonical_unit = %item.canonical_unit,
                "offer amount cannot be converted to the item's unit"
            );
        }

        self.offers.add(&offer).await?;
        tracing::info!(offer_id = %offer.id, item_id = %offer.item_id, "offer added");
        Ok(offer)
    }

    /// Soft-delete an offer and return it as it was.
    pub async fn delete_offer(&self, id: &str) -> Result<Offer, DomainError> {
        let offer = self
            .offers
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("offer {id}")))?;
        self.offers.soft_delete(id).await?;
        Ok(offer)
    }

    pub async fn item(&self, id: &str) -> Result<InventoryItem, DomainError> {
        self.items
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::ItemNotFound(id.to_string()))
    }

    pub async fn items(&self, options: &FindOptions) -> Result<Vec<InventoryItem>, DomainError> {
        self.items.find_all(options).await
    }

    pub async fn suppliers(&self, options: &FindOptions) -> Result<Vec<Supplier>, DomainError> {
        self.suppliers.find_all(options).await
    }

    pub async fn offers(&self, filter: &OfferFilter, options: &FindOptions) -> Result<Vec<Offer>, DomainError> {
        self.offers.find_where(filter, options).await
    }
}
