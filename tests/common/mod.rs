//! Shared test helpers.
#![allow(dead_code)]

use chrono::{Duration, Utc};
use pricewise::domain::entities::inventory_item::InventoryItem;
use pricewise::domain::entities::offer::Offer;
use pricewise::domain::values::source_type::SourceType;
use pricewise::domain::values::unit::Dimension;
use pricewise::infrastructure::history::sqlite::SqliteHistoryService;
use pricewise::infrastructure::history::unavailable::UnavailableHistoryService;
use pricewise::infrastructure::sqlite;
use pricewise::Pricewise;
use std::sync::Arc;

pub fn setup() -> Pricewise {
    Pricewise::with_providers(":memory:", Arc::new(UnavailableHistoryService), 100).unwrap()
}

/// Trend comparisons read history from the same database as the offers.
pub fn setup_with_history() -> Pricewise {
    let conn = sqlite::open(":memory:").unwrap();
    Pricewise::with_connection(conn.clone(), Arc::new(SqliteHistoryService::new(conn)), 100)
}

pub fn make_item(name: &str, dimension: Dimension, unit: &str) -> InventoryItem {
    InventoryItem::new(name.to_string(), dimension, unit).unwrap()
}

pub async fn add_item(pw: &Pricewise, name: &str, dimension: Dimension, unit: &str) -> InventoryItem {
    pw.add_item(make_item(name, dimension, unit)).await.unwrap()
}

/// An offer with every optional field known: no shipping, no tax, a mid
/// rating and a source URL. Confidence starts at 1.0.
pub fn make_offer(item: &InventoryItem, supplier: &str, price: f64, amount: f64, unit: &str) -> Offer {
    Offer::new(
        item.id.clone(),
        format!("sup-{}", supplier.to_lowercase()),
        supplier.to_string(),
        price,
        "USD",
        amount,
        unit,
    )
    .unwrap()
    .with_shipping(Some(0.0), false)
    .with_tax(false, Some(0.0))
    .with_quality(Some(3))
    .with_source(
        Some(format!("https://{}.example/offer", supplier.to_lowercase())),
        SourceType::Online,
    )
}

/// Same as [`make_offer`] but observed `days_ago` days in the past.
pub fn make_offer_at(
    item: &InventoryItem,
    supplier: &str,
    price: f64,
    amount: f64,
    unit: &str,
    days_ago: i64,
) -> Offer {
    make_offer(item, supplier, price, amount, unit).observed_at(Utc::now() - Duration::days(days_ago))
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
