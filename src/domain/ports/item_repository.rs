use crate::domain::entities::inventory_item::InventoryItem;
use crate::domain::error::DomainError;
use crate::domain::ports::find_options::FindOptions;
use async_trait::async_trait;

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn add(&self, item: &InventoryItem) -> Result<(), DomainError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<InventoryItem>, DomainError>;
    async fn find_all(&self, options: &FindOptions) -> Result<Vec<InventoryItem>, DomainError>;
}
