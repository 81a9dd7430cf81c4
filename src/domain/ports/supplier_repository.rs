use crate::domain::entities::supplier::Supplier;
use crate::domain::error::DomainError;
use crate::domain::ports::find_options::FindOptions;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait SupplierRepository: Send + Sync {
    async fn add(&self, supplier: &Supplier) -> Result<(), DomainError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Supplier>, DomainError>;
    async fn find_all(&self, options: &FindOptions) -> Result<Vec<Supplier>, DomainError>;

    /// Every supplier keyed by id, as strategies consume them.
    async fn lookup_table(&self) -> Result<HashMap<String, Supplier>, DomainError> {
        let suppliers = self.find_all(&FindOptions::default()).await?;
        Ok(suppliers.into_iter().map(|s| (s.id.clone(), s)).collect())
    }
}
