//! Comparison engine: ranking, filtering, config checks, caching and
//! multi-item runs.

mod common;

use common::{add_item, approx, make_offer, make_offer_at, setup};
use pricewise::domain::entities::comparison::ExclusionReason;
use pricewise::domain::entities::comparison_config::{ComparisonConfig, GlobalOptions, SortDirection};
use pricewise::domain::values::flag::ResultFlag;
use pricewise::domain::values::unit::Dimension;

#[tokio::test]
async fn test_zero_offers_is_an_empty_result() {
    let pw = setup();
    let item = add_item(&pw, "Flour", Dimension::Mass, "g").await;

    let results = pw.compare(&item.id, &ComparisonConfig::default()).await.unwrap();
    assert!(results.results.is_empty());
    assert!(results.best_offer.is_none());
    assert_eq!(results.metadata.total_offers, 0);
    assert_eq!(results.metadata.strategy_id, "price-per-canonical");
    assert!(!results.is_degraded());
}

#[tokio::test]
async fn test_cheapest_offer_is_best() {
    let pw = setup();
    let item = add_item(&pw, "Flour", Dimension::Mass, "g").await;
    let b = pw
        .add_offer(make_offer(&item, "B", 12.0, 1000.0, "g").with_shipping(Some(2.0), false))
        .await
        .unwrap();
    let a = pw.add_offer(make_offer(&item, "A", 10.0, 1000.0, "g")).await.unwrap();

    let results = pw.compare(&item.id, &ComparisonConfig::default()).await.unwrap();
    assert_eq!(results.metadata.total_offers, 2);
    let ids: Vec<&str> = results.results.iter().map(|r| r.offer.id.as_str()).collect();
    assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
    assert!(approx(results.results[0].score, 0.01));
    assert!(approx(results.results[1].score, 0.014));
    assert_eq!(results.best_offer.unwrap().offer.id, a.id);

    let desc = ComparisonConfig::default().with_global(GlobalOptions {
        sort_direction: SortDirection::Desc,
        ..Default::default()
    });
    let results = pw.compare(&item.id, &desc).await.unwrap();
    assert_eq!(results.best_offer.unwrap().offer.id, b.id);
}

#[tokio::test]
async fn test_equal_scores_keep_newest_first() {
    let pw = setup();
    let item = add_item(&pw, "Flour", Dimension::Mass, "kg").await;
    let older = pw.add_offer(make_offer_at(&item, "A", 5.0, 1.0, "kg", 3)).await.unwrap();
    let newer = pw.add_offer(make_offer_at(&item, "B", 5.0, 1.0, "kg", 1)).await.unwrap();

    for direction in [SortDirection::Asc, SortDirection::Desc] {
        let config = ComparisonConfig::default().with_global(GlobalOptions {
            sort_direction: direction,
            ..Default::default()
        });
        let results = pw.compare(&item.id, &config).await.unwrap();
        let ids: Vec<&str> = results.results.iter().map(|r| r.offer.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()], "{direction}");
    }
}

#[tokio::test]
async fn test_max_results_truncates_after_sorting() {
    let pw = setup();
    let item = add_item(&pw, "Rice", Dimension::Mass, "kg").await;
    for (supplier, price) in [("A", 9.0), ("B", 7.0), ("C", 8.0), ("D", 10.0)] {
        pw.add_offer(make_offer(&item, supplier, price, 1.0, "kg")).await.unwrap();
    }

    let config = ComparisonConfig::new("total-price").with_global(GlobalOptions {
        max_results: Some(2),
        ..Default::default()
    });
    let results = pw.compare(&item.id, &config).await.unwrap();
    let suppliers: Vec<&str> = results.results.iter().map(|r| r.offer.supplier_name.as_str()).collect();
    assert_eq!(suppliers, vec!["B", "C"]);
    assert_eq!(results.metadata.total_offers, 4);
    assert_eq!(results.best_offer.unwrap().offer.supplier_name, "B");
}

#[tokio::test]
async fn test_min_confidence_moves_offers_to_excluded() {
    let pw = setup();
    let item = add_item(&pw, "Rice", Dimension::Mass, "kg").await;
    pw.add_offer(make_offer(&item, "A", 9.0, 1.0, "kg")).await.unwrap();
    let vague = pw
        .add_offer(make_offer(&item, "B", 8.0, 1.0, "kg").with_shipping(None, false))
        .await
        .unwrap();

    let config = ComparisonConfig::default().with_global(GlobalOptions {
        min_confidence: 0.9,
        ..Default::default()
    });
    let results = pw.compare(&item.id, &config).await.unwrap();
    assert_eq!(results.results.len(), 1);
    assert_eq!(results.results[0].offer.supplier_name, "A");
    assert_eq!(results.metadata.excluded_offers, 1);
    assert_eq!(results.excluded[0].offer_id, vague.id);
    assert_eq!(results.excluded[0].reason, ExclusionReason::BelowMinConfidence);
    assert!(results.excluded[0].flags.contains(&ResultFlag::ShippingUnknown));
}

#[tokio::test]
async fn test_unconvertible_offers_are_excluded() {
    let pw = setup();
    let item = add_item(&pw, "Milk", Dimension::Volume, "l").await;
    pw.add_offer(make_offer(&item, "A", 2.0, 1.0, "l")).await.unwrap();
    let odd = pw.add_offer(make_offer(&item, "B", 1.0, 500.0, "g")).await.unwrap();
    assert!(odd.canonical_amount.is_none());

    let results = pw.compare(&item.id, &ComparisonConfig::default()).await.unwrap();
    assert_eq!(results.metadata.total_offers, 2);
    assert_eq!(results.results.len(), 1);
    assert_eq!(results.excluded.len(), 1);
    assert_eq!(results.excluded[0].reason, ExclusionReason::ConversionFailed);
}

#[tokio::test]
async fn test_config_errors() {
    let pw = setup();
    let item = add_item(&pw, "Flour", Dimension::Mass, "g").await;

    // Unknown strategy is reported before anything else
    let config = ComparisonConfig::new("nope").with_global(GlobalOptions {
        max_results: Some(0),
        ..Default::default()
    });
    let err = pw.compare(&item.id, &config).await.unwrap_err();
    assert_eq!(err.code(), "STRATEGY_NOT_FOUND");

    let config = ComparisonConfig::default().with_secondary("nope", 0.5);
    let err = pw.compare(&item.id, &config).await.unwrap_err();
    assert_eq!(err.code(), "STRATEGY_NOT_FOUND");

    // Every global violation is reported at once
    let config = ComparisonConfig::default()
        .with_secondary("total-price", 1.5)
        .with_global(GlobalOptions {
            max_results: Some(0),
            min_confidence: 2.0,
            ..Default::default()
        });
    let err = pw.compare(&item.id, &config).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_CONFIG");
    let message = err.to_string();
    assert!(message.contains("max_results"), "{message}");
    assert!(message.contains("min_confidence"), "{message}");
    assert!(message.contains("total-price"), "{message}");
}

#[tokio::test]
async fn test_missing_item() {
    let pw = setup();
    let err = pw
        .compare("no-such-item", &ComparisonConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ITEM_NOT_FOUND");
}

#[tokio::test]
async fn test_secondary_strategies_blend_scores() {
    let pw = setup();
    let item = add_item(&pw, "Flour", Dimension::Mass, "g").await;
    pw.add_offer(make_offer(&item, "A", 10.0, 1000.0, "g")).await.unwrap();

    let config = ComparisonConfig::default().with_secondary("total-price", 0.5);
    let results = pw.compare(&item.id, &config).await.unwrap();
    let best = results.best_offer.unwrap();

    assert!(approx(best.score, (0.01 + 0.5 * 10.0) / 1.5));
    let breakdown = &best.metadata.breakdown;
    assert!(approx(breakdown["primary_score"], 0.01));
    assert!(approx(breakdown["secondary:total-price"], 10.0));
    assert!(approx(breakdown["composite_score"], best.score));
    assert_eq!(best.metadata.strategy_id, "price-per-canonical");
}

#[tokio::test]
async fn test_deleted_offers_only_when_requested() {
    let pw = setup();
    let item = add_item(&pw, "Flour", Dimension::Mass, "kg").await;
    pw.add_offer(make_offer(&item, "A", 10.0, 1.0, "kg")).await.unwrap();
    let gone = pw.add_offer(make_offer(&item, "B", 5.0, 1.0, "kg")).await.unwrap();
    pw.delete_offer(&gone.id).await.unwrap();

    let results = pw.compare(&item.id, &ComparisonConfig::default()).await.unwrap();
    assert_eq!(results.metadata.total_offers, 1);
    assert_eq!(results.best_offer.unwrap().offer.supplier_name, "A");

    let config = ComparisonConfig::default().with_global(GlobalOptions {
        include_deleted: true,
        ..Default::default()
    });
    let results = pw.compare(&item.id, &config).await.unwrap();
    assert_eq!(results.metadata.total_offers, 2);
    assert_eq!(results.best_offer.unwrap().offer.id, gone.id);

    let err = pw.delete_offer("no-such-offer").await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

// ── Cache ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_repeat_comparison_served_from_cache() {
    let pw = setup();
    let item = add_item(&pw, "Flour", Dimension::Mass, "kg").await;
    pw.add_offer(make_offer(&item, "A", 10.0, 1.0, "kg")).await.unwrap();
    let config = ComparisonConfig::default();

    let first = pw.compare(&item.id, &config).await.unwrap();
    assert!(!first.metadata.from_cache);
    let second = pw.compare(&item.id, &config).await.unwrap();
    assert!(second.metadata.from_cache);
    assert_eq!(second.results, first.results);
    assert_eq!(pw.cache_len(), 1);

    // A new offer invalidates the item's entries
    pw.add_offer(make_offer(&item, "B", 8.0, 1.0, "kg")).await.unwrap();
    assert_eq!(pw.cache_len(), 0);
    let third = pw.compare(&item.id, &config).await.unwrap();
    assert!(!third.metadata.from_cache);
    assert_eq!(third.results.len(), 2);
}

#[tokio::test]
async fn test_cache_can_be_bypassed_and_cleared() {
    let pw = setup();
    let item = add_item(&pw, "Flour", Dimension::Mass, "kg").await;
    pw.add_offer(make_offer(&item, "A", 10.0, 1.0, "kg")).await.unwrap();

    let uncached = ComparisonConfig::default().with_global(GlobalOptions {
        use_cache: false,
        ..Default::default()
    });
    pw.compare(&item.id, &uncached).await.unwrap();
    assert!(!pw.compare(&item.id, &uncached).await.unwrap().metadata.from_cache);
    assert_eq!(pw.cache_len(), 0);

    pw.compare(&item.id, &ComparisonConfig::default()).await.unwrap();
    pw.compare(&item.id, &ComparisonConfig::new("total-price")).await.unwrap();
    assert_eq!(pw.cache_len(), 2);
    assert_eq!(pw.invalidate_item(&item.id), 2);

    pw.compare(&item.id, &ComparisonConfig::default()).await.unwrap();
    pw.clear_cache();
    assert_eq!(pw.cache_len(), 0);
}

#[tokio::test]
async fn test_cache_entries_capped() {
    let pw = setup();
    let item = add_item(&pw, "Flour", Dimension::Mass, "kg").await;
    pw.add_offer(make_offer(&item, "A", 10.0, 1.0, "kg")).await.unwrap();

    let capped = |strategy: &str| {
        ComparisonConfig::new(strategy).with_global(GlobalOptions {
            cache_max_entries: 2,
            ..Default::default()
        })
    };
    for strategy in ["price-per-canonical", "total-price", "price-per-unit"] {
        pw.compare(&item.id, &capped(strategy)).await.unwrap();
    }
    assert_eq!(pw.cache_len(), 2);
    // The oldest entry was evicted first
    let again = pw.compare(&item.id, &capped("price-per-canonical")).await.unwrap();
    assert!(!again.metadata.from_cache);
}

// ── Multiple items ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_compare_all_degrades_per_item() {
    let pw = setup();
    let flour = add_item(&pw, "Flour", Dimension::Mass, "kg").await;
    let milk = add_item(&pw, "Milk", Dimension::Volume, "l").await;
    pw.add_offer(make_offer(&flour, "A", 10.0, 1.0, "kg")).await.unwrap();
    pw.add_offer(make_offer(&milk, "B", 1.5, 1.0, "l")).await.unwrap();

    let ids = vec![milk.id.clone(), "ghost".to_string(), flour.id.clone()];
    let all = pw.compare_all(&ids, &ComparisonConfig::default()).await.unwrap();

    assert_eq!(all.len(), 3);
    assert_eq!(all[0].item_id, milk.id);
    assert_eq!(all[1].item_id, "ghost");
    assert_eq!(all[2].item_id, flour.id);

    assert!(all[1].is_degraded());
    assert!(all[1].results.is_empty());
    assert!(all[1].metadata.error.as_deref().unwrap().starts_with("ITEM_NOT_FOUND"));
    assert!(!all[0].is_degraded());
    assert_eq!(all[2].best_offer.as_ref().unwrap().offer.supplier_name, "A");
}

#[tokio::test]
async fn test_compare_all_defaults_to_every_item() {
    let pw = setup();
    add_item(&pw, "Flour", Dimension::Mass, "kg").await;
    add_item(&pw, "Milk", Dimension::Volume, "l").await;

    let all = pw.compare_all(&[], &ComparisonConfig::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|r| !r.is_degraded()));
}

#[tokio::test]
async fn test_compare_all_rejects_bad_config_up_front() {
    let pw = setup();
    let flour = add_item(&pw, "Flour", Dimension::Mass, "kg").await;

    let err = pw
        .compare_all(&[flour.id], &ComparisonConfig::new("nope"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STRATEGY_NOT_FOUND");
}
