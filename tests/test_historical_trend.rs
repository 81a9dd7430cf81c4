//! Historical trend scoring against stored and missing price history.

mod common;

use common::{add_item, approx, make_offer_at, setup, setup_with_history};
use pricewise::domain::entities::comparison_config::ComparisonConfig;
use pricewise::domain::entities::inventory_item::InventoryItem;
use pricewise::domain::ports::price_history::PriceHistoryService;
use pricewise::domain::values::flag::ResultFlag;
use pricewise::domain::values::trend::{PricePeriod, TrendDirection};
use pricewise::domain::values::unit::Dimension;
use pricewise::infrastructure::history::sqlite::SqliteHistoryService;
use pricewise::infrastructure::sqlite;
use pricewise::Pricewise;
use std::sync::Arc;

#[tokio::test]
async fn test_unavailable_history_falls_back_to_current_price() {
    let pw = setup();
    let item = add_item(&pw, "Coffee", Dimension::Mass, "kg").await;
    pw.add_offer(make_offer_at(&item, "A", 24.0, 1.0, "kg", 1)).await.unwrap();
    pw.add_offer(make_offer_at(&item, "B", 20.0, 1.0, "kg", 1)).await.unwrap();

    let results = pw
        .compare(&item.id, &ComparisonConfig::new("historical-trend"))
        .await
        .unwrap();

    assert_eq!(results.results.len(), 2);
    let best = results.best_offer.unwrap();
    assert_eq!(best.offer.supplier_name, "B");
    assert!(approx(best.score, 20.0));
    for r in &results.results {
        assert!(approx(r.metadata.confidence.value(), 0.3));
        assert!(r.has_flag(ResultFlag::NoHistoricalData));
        assert!(r.has_flag(ResultFlag::FallbackComparison));
        assert!(r.metadata.explanation.contains("price history unavailable"));
    }
}

#[tokio::test]
async fn test_falling_prices_flag_downtrend() {
    let pw = setup_with_history();
    let item = add_item(&pw, "Coffee", Dimension::Mass, "kg").await;
    for (price, days_ago) in [(15.0, 25), (14.0, 18), (13.0, 10), (12.0, 2)] {
        pw.add_offer(make_offer_at(&item, "A", price, 1.0, "kg", days_ago))
            .await
            .unwrap();
    }

    let results = pw
        .compare(&item.id, &ComparisonConfig::new("historical-trend"))
        .await
        .unwrap();

    assert_eq!(results.results.len(), 4);
    let best = results.best_offer.unwrap();
    assert!(approx(best.offer.total_price, 12.0));
    assert!(best.score < 12.0, "downtrend and best price should lower the score");
    assert!(best.has_flag(ResultFlag::TrendDown));
    assert!(best.has_flag(ResultFlag::BelowHistoricalBest));
    assert!(best.has_flag(ResultFlag::LimitedHistory));
    assert!(!best.has_flag(ResultFlag::FallbackComparison));

    let oldest = results.results.last().unwrap();
    assert!(approx(oldest.offer.total_price, 15.0));
    assert!(oldest.has_flag(ResultFlag::AboveHistoricalBest));
}

#[tokio::test]
async fn test_equivalence_factor_applies_to_current_and_best_price() {
    let pw = setup_with_history();
    let item = InventoryItem::new("Detergent".into(), Dimension::Mass, "kg")
        .unwrap()
        .with_equivalence_factor(2.0)
        .unwrap();
    let item = pw.add_item(item).await.unwrap();
    for (price, days_ago) in [(15.0, 25), (14.0, 18), (13.0, 10), (12.0, 2)] {
        pw.add_offer(make_offer_at(&item, "A", price, 1.0, "kg", days_ago))
            .await
            .unwrap();
    }

    let results = pw
        .compare(&item.id, &ComparisonConfig::new("historical-trend"))
        .await
        .unwrap();

    let best = results.best_offer.as_ref().unwrap();
    assert!(approx(best.offer.total_price, 12.0));
    assert!(best.score < 6.0 && best.score > 4.0, "score {}", best.score);
    assert!(approx(best.metadata.breakdown["historical_best"], 6.0));
    assert!(best.has_flag(ResultFlag::BelowHistoricalBest));

    // 7.5 per adjusted unit is 25% above the adjusted best of 6
    let oldest = results.results.last().unwrap();
    assert!(approx(oldest.offer.total_price, 15.0));
    assert!(oldest.has_flag(ResultFlag::AboveHistoricalBest));

    // Blends with a primary on the same basis
    let config = ComparisonConfig::default().with_secondary("historical-trend", 1.0);
    let blended = pw.compare(&item.id, &config).await.unwrap();
    let top = blended.best_offer.unwrap();
    assert!(approx(top.metadata.breakdown["primary_score"], 6.0));
    assert!(top.metadata.breakdown["secondary:historical-trend"] < 6.0);
}

#[tokio::test]
async fn test_trend_options_are_validated() {
    let pw = setup_with_history();
    let item = add_item(&pw, "Coffee", Dimension::Mass, "kg").await;

    let config = ComparisonConfig::new("historical-trend").with_option("trend_weight", 1.5);
    let err = pw.compare(&item.id, &config).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_OPTIONS");

    let config = ComparisonConfig::new("historical-trend").with_option("period", "fortnight");
    let err = pw.compare(&item.id, &config).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_OPTIONS");
}

#[tokio::test]
async fn test_sqlite_history_respects_period_and_supplier() {
    let conn = sqlite::open(":memory:").unwrap();
    let history = Arc::new(SqliteHistoryService::new(conn.clone()));
    let pw = Pricewise::with_connection(conn, history.clone(), 10);
    let item = add_item(&pw, "Tea", Dimension::Mass, "kg").await;

    pw.add_offer(make_offer_at(&item, "A", 10.0, 1.0, "kg", 40)).await.unwrap();
    pw.add_offer(make_offer_at(&item, "A", 12.0, 1.0, "kg", 5)).await.unwrap();
    pw.add_offer(make_offer_at(&item, "B", 8.0, 1.0, "kg", 3)).await.unwrap();

    let month = history.points(&item.id, PricePeriod::Month, None).unwrap();
    assert_eq!(month.len(), 2);
    assert!(month[0].observed_at < month[1].observed_at);

    let quarter = history.points(&item.id, PricePeriod::Quarter, None).unwrap();
    assert_eq!(quarter.len(), 3);

    let only_a = history.points(&item.id, PricePeriod::Quarter, Some("sup-a")).unwrap();
    assert_eq!(only_a.len(), 2);

    let best = history
        .best_historical_price(&item.id, PricePeriod::Month, None)
        .await
        .unwrap()
        .unwrap();
    assert!(approx(best.price, 8.0));
    assert_eq!(best.supplier_id.as_deref(), Some("sup-b"));

    let stats = history
        .price_statistics(&item.id, PricePeriod::Quarter, None)
        .await
        .unwrap();
    assert_eq!(stats.sample_count, 3);
    assert!(approx(stats.min, 8.0));
    assert!(approx(stats.max, 12.0));
}

#[tokio::test]
async fn test_sqlite_history_edge_cases() {
    let conn = sqlite::open(":memory:").unwrap();
    let history = Arc::new(SqliteHistoryService::new(conn.clone()));
    let pw = Pricewise::with_connection(conn, history.clone(), 10);
    let item = add_item(&pw, "Tea", Dimension::Mass, "kg").await;

    // No observations: trend and statistics fail, best is absent
    assert!(history.price_trend(&item.id, PricePeriod::Month, None).await.is_err());
    assert!(history.price_statistics(&item.id, PricePeriod::Month, None).await.is_err());
    assert!(history
        .best_historical_price(&item.id, PricePeriod::Month, None)
        .await
        .unwrap()
        .is_none());

    // A single observation is a stable, low-confidence trend
    pw.add_offer(make_offer_at(&item, "A", 10.0, 1.0, "kg", 1)).await.unwrap();
    let trend = history.price_trend(&item.id, PricePeriod::Month, None).await.unwrap();
    assert_eq!(trend.direction, TrendDirection::Stable);
    assert!(approx(trend.confidence, 0.1));

    // Deleted offers leave the history
    let offers = pw
        .offers(&Default::default(), &Default::default())
        .await
        .unwrap();
    pw.delete_offer(&offers[0].id).await.unwrap();
    assert!(history.points(&item.id, PricePeriod::Month, None).unwrap().is_empty());
}
