use crate::domain::error::DomainError;
use crate::domain::values::unit::{self, Dimension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_equivalence_factor() -> f64 {
    1.0
}

/// A tracked product whose offers are compared in its canonical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub canonical_dimension: Dimension,
    pub canonical_unit: String,
    /// Multiplier making otherwise-incomparable products comparable
    /// (a factor of 2.0 means one canonical unit counts as two).
    #[serde(default = "default_equivalence_factor")]
    pub equivalence_factor: f64,
    #[serde(default)]
    pub is_perishable: bool,
    #[serde(default)]
    pub shelf_life_days: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Build a new item, normalizing the unit symbol (`"Grams"` → `"g"`).
    pub fn new(
        name: String,
        canonical_dimension: Dimension,
        canonical_unit: &str,
    ) -> Result<Self, DomainError> {
        let now = Utc::now();
        let symbol = unit::canonical_symbol(canonical_unit)
            .ok_or_else(|| DomainError::InvalidInput(format!("Unknown unit: {canonical_unit}")))?;
        let item = Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            canonical_dimension,
            canonical_unit: symbol.to_string(),
            equivalence_factor: 1.0,
            is_perishable: false,
            shelf_life_days: None,
            notes: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn with_equivalence_factor(mut self, factor: f64) -> Result<Self, DomainError> {
        self.equivalence_factor = factor;
        self.validate()?;
        Ok(self)
    }

    pub fn with_shelf_life(mut self, days: Option<u32>) -> Self {
        self.is_perishable = days.is_some();
        self.shelf_life_days = days;
        self
    }

    /// Check the item's invariants.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("Item name must not be empty".into()));
        }
        if !unit::is_unit_of(&self.canonical_unit, self.canonical_dimension) {
            return Err(DomainError::InvalidInput(format!(
                "Canonical unit '{}' is not a {} unit",
                self.canonical_unit, self.canonical_dimension
            )));
        }
        if !self.equivalence_factor.is_finite() || self.equivalence_factor <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "Equivalence factor must be positive, got {}",
                self.equivalence_factor
            )));
        }
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
