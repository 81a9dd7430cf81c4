use crate::domain::error::DomainError;
use crate::domain::values::source_type::SourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed price for one item from one supplier at one point in time.
///
/// Observation fields are immutable once captured; the canonical amount and
/// the three `price_per_canonical_*` fields are derived and may be refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub item_id: String,
    pub supplier_id: String,
    /// Supplier name at capture time.
    pub supplier_name: String,
    pub total_price: f64,
    /// ISO 4217 code, uppercase.
    pub currency: String,
    #[serde(default)]
    pub is_tax_included: bool,
    /// Fraction, e.g. `0.08` for 8%.
    #[serde(default)]
    pub tax_rate: Option<f64>,
    #[serde(default)]
    pub shipping_cost: Option<f64>,
    #[serde(default)]
    pub shipping_included: bool,
    pub amount: f64,
    pub amount_unit: String,
    #[serde(default)]
    pub canonical_amount: Option<f64>,
    #[serde(default)]
    pub price_per_canonical_excluding: Option<f64>,
    #[serde(default)]
    pub price_per_canonical_including: Option<f64>,
    #[serde(default)]
    pub effective_price_per_canonical: Option<f64>,
    /// 1–5
    #[serde(default)]
    pub quality_rating: Option<u8>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub notes: Option<String>,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    pub fn new(
        item_id: String,
        supplier_id: String,
        supplier_name: String,
        total_price: f64,
        currency: &str,
        amount: f64,
        amount_unit: &str,
    ) -> Result<Self, DomainError> {
        let now = Utc::now();
        let offer = Self {
            id: uuid::Uuid::new_v4().to_string(),
            item_id,
            supplier_id,
            supplier_name,
            total_price,
            currency: currency.trim().to_uppercase(),
            is_tax_included: false,
            tax_rate: None,
            shipping_cost: None,
            shipping_included: false,
            amount,
            amount_unit: amount_unit.trim().to_string(),
            canonical_amount: None,
            price_per_canonical_excluding: None,
            price_per_canonical_including: None,
            effective_price_per_canonical: None,
            quality_rating: None,
            source_url: None,
            source_type: SourceType::default(),
            notes: None,
            observed_at: now,
            deleted_at: None,
            created_at: now,
        };
        offer.validate()?;
        Ok(offer)
    }

    pub fn with_shipping(mut self, cost: Option<f64>, included: bool) -> Self {
        self.shipping_cost = cost;
        self.shipping_included = included;
        self
    }

    pub fn with_tax(mut self, included: bool, rate: Option<f64>) -> Self {
        self.is_tax_included = included;
        self.tax_rate = rate;
        self
    }

    pub fn with_quality(mut self, rating: Option<u8>) -> Self {
        self.quality_rating = rating;
        self
    }

    pub fn with_source(mut self, url: Option<String>, source_type: SourceType) -> Self {
        self.source_url = url;
        self.source_type = source_type;
        self
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }

    /// Check the observation invariants: positive finite price and amount,
    /// a three-letter currency, non-negative shipping and tax, rating 1–5.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.total_price.is_finite() || self.total_price <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "Offer {} has non-positive total price {}",
                self.id, self.total_price
            )));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "Offer {} has non-positive amount {}",
                self.id, self.amount
            )));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::InvalidInput(format!(
                "Currency must be a 3-letter ISO 4217 code, got '{}'",
                self.currency
            )));
        }
        if let Some(cost) = self.shipping_cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(DomainError::InvalidInput(format!(
                    "Shipping cost must be non-negative, got {cost}"
                )));
            }
        }
        if let Some(rate) = self.tax_rate {
            if !rate.is_finite() || rate < 0.0 {
                return Err(DomainError::InvalidInput(format!(
                    "Tax rate must be non-negative, got {rate}"
                )));
            }
        }
        if let Some(rating) = self.quality_rating {
            if !(1..=5).contains(&rating) {
                return Err(DomainError::InvalidInput(format!(
                    "Quality rating must be 1-5, got {rating}"
                )));
            }
        }
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
