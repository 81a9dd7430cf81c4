//! Price normalization: unit conversion, cost modes and derived fields.

mod common;

use common::{approx, make_item, make_offer};
use pricewise::application::normalization::{
    calculate_batch, calculate_price, precompute, PriceCalculation, PriceMode, PriceOptions,
};
use pricewise::domain::entities::comparison::ExclusionReason;
use pricewise::domain::values::flag::ResultFlag;
use pricewise::domain::values::unit::Dimension;

fn priced(calc: PriceCalculation) -> f64 {
    match calc {
        PriceCalculation::Priced(p) => p.price_per_canonical,
        PriceCalculation::Failed(f) => panic!("expected a price, got {f:?}"),
    }
}

#[test]
fn test_including_mode_adds_unincluded_shipping() {
    let item = make_item("Flour", Dimension::Mass, "g");
    let a = make_offer(&item, "A", 10.0, 1000.0, "g");
    let b = make_offer(&item, "B", 12.0, 1000.0, "g").with_shipping(Some(2.0), false);

    let options = PriceOptions::default();
    assert!(approx(priced(calculate_price(&a, &item, &options)), 0.01));
    assert!(approx(priced(calculate_price(&b, &item, &options)), 0.014));
}

#[test]
fn test_excluding_mode_ignores_shipping_and_tax() {
    let item = make_item("Flour", Dimension::Mass, "g");
    let b = make_offer(&item, "B", 12.0, 1000.0, "g")
        .with_shipping(Some(2.0), false)
        .with_tax(false, Some(0.1));

    let options = PriceOptions::with_mode(PriceMode::Excluding);
    assert!(approx(priced(calculate_price(&b, &item, &options)), 0.012));
}

#[test]
fn test_offer_converted_into_canonical_unit() {
    let item = make_item("Rice", Dimension::Mass, "kg");
    let offer = make_offer(&item, "A", 5.0, 500.0, "g");

    let calc = calculate_price(&offer, &item, &PriceOptions::default());
    let priced = calc.priced().unwrap();
    assert!(approx(priced.canonical_amount, 0.5));
    assert!(approx(priced.price_per_canonical, 10.0));
    // price × canonical amount recovers the total cost
    assert!(approx(priced.price_per_canonical * priced.canonical_amount, priced.total_cost));
}

#[test]
fn test_tax_added_only_when_not_included() {
    let item = make_item("Soap", Dimension::Count, "ea");
    let taxed = make_offer(&item, "A", 10.0, 1.0, "ea").with_tax(false, Some(0.1));
    let inclusive = make_offer(&item, "B", 10.0, 1.0, "ea").with_tax(true, Some(0.1));

    let options = PriceOptions::default();
    assert!(approx(priced(calculate_price(&taxed, &item, &options)), 11.0));

    let calc = calculate_price(&inclusive, &item, &options);
    let p = calc.priced().unwrap();
    assert!(approx(p.price_per_canonical, 10.0));
    assert!(p.flags.contains(&ResultFlag::TaxIncluded));
}

#[test]
fn test_incompatible_unit_is_a_conversion_failure() {
    let item = make_item("Flour", Dimension::Mass, "kg");
    let offer = make_offer(&item, "A", 3.0, 1.0, "l");

    match calculate_price(&offer, &item, &PriceOptions::default()) {
        PriceCalculation::Failed(failure) => {
            assert_eq!(failure.reason, ExclusionReason::ConversionFailed);
            assert!(failure.flags.contains(&ResultFlag::ConversionFailed));
            assert!(failure.message.contains("kg"));
        }
        PriceCalculation::Priced(p) => panic!("expected failure, got {p:?}"),
    }
}

#[test]
fn test_invalid_offer_is_a_validation_failure() {
    let item = make_item("Flour", Dimension::Mass, "kg");
    let mut offer = make_offer(&item, "A", 3.0, 1.0, "kg");
    offer.total_price = -1.0;

    match calculate_price(&offer, &item, &PriceOptions::default()) {
        PriceCalculation::Failed(failure) => {
            assert_eq!(failure.reason, ExclusionReason::ValidationFailed);
        }
        PriceCalculation::Priced(p) => panic!("expected failure, got {p:?}"),
    }
}

#[test]
fn test_missing_shipping_lowers_confidence() {
    let item = make_item("Flour", Dimension::Mass, "g");
    let offer = make_offer(&item, "A", 10.0, 1000.0, "g").with_shipping(None, false);

    let including = calculate_price(&offer, &item, &PriceOptions::default());
    let p = including.priced().unwrap();
    assert!(p.flags.contains(&ResultFlag::ShippingUnknown));
    assert!(approx(p.confidence.value(), 0.8));

    let excluding = calculate_price(&offer, &item, &PriceOptions::with_mode(PriceMode::Excluding));
    assert!(approx(excluding.priced().unwrap().confidence.value(), 0.9));
}

#[test]
fn test_equivalence_factor_divides_and_rate_multiplies() {
    let item = make_item("Detergent", Dimension::Mass, "g")
        .with_equivalence_factor(2.0)
        .unwrap();
    let offer = make_offer(&item, "A", 10.0, 1000.0, "g");

    let calc = calculate_price(&offer, &item, &PriceOptions::default());
    let p = calc.priced().unwrap();
    assert!(approx(p.price_per_canonical, 0.005));
    assert!(p.flags.contains(&ResultFlag::EquivalenceAdjusted));

    let converted = PriceOptions {
        currency_rate: Some(1.1),
        apply_equivalence_factor: false,
        ..Default::default()
    };
    let calc = calculate_price(&offer, &item, &converted);
    let p = calc.priced().unwrap();
    assert!(approx(p.price_per_canonical, 0.011));
    assert!(p.flags.contains(&ResultFlag::CurrencyConverted));
    assert!(!p.flags.contains(&ResultFlag::EquivalenceAdjusted));
}

#[test]
fn test_non_positive_currency_rate_fails() {
    let item = make_item("Flour", Dimension::Mass, "g");
    let offer = make_offer(&item, "A", 10.0, 1000.0, "g");
    let options = PriceOptions {
        currency_rate: Some(0.0),
        ..Default::default()
    };
    assert!(!calculate_price(&offer, &item, &options).is_success());
}

#[test]
fn test_effective_mode_prefers_precomputed_price() {
    let item = make_item("Flour", Dimension::Mass, "g");
    let mut offer = make_offer(&item, "A", 10.0, 1000.0, "g");
    let options = PriceOptions::with_mode(PriceMode::Effective);

    // No precomputed price: falls back to including
    assert!(approx(priced(calculate_price(&offer, &item, &options)), 0.01));

    offer.effective_price_per_canonical = Some(0.008);
    let calc = calculate_price(&offer, &item, &options);
    let p = calc.priced().unwrap();
    assert!(approx(p.price_per_canonical, 0.008));
    assert!(p.flags.contains(&ResultFlag::EffectivePrice));
}

#[test]
fn test_batch_splits_valid_and_invalid() {
    let item = make_item("Flour", Dimension::Mass, "kg");
    let good = make_offer(&item, "A", 10.0, 1.0, "kg");
    let unknown_shipping = make_offer(&item, "B", 10.0, 1.0, "kg").with_shipping(None, false);
    let wrong_unit = make_offer(&item, "C", 10.0, 1.0, "ml");

    let batch = calculate_batch(
        &[good.clone(), unknown_shipping.clone(), wrong_unit.clone()],
        &item,
        &PriceOptions::default(),
        0.9,
    );
    assert_eq!(batch.valid.len(), 1);
    assert_eq!(batch.valid[0].0.id, good.id);
    assert_eq!(batch.invalid.len(), 2);

    let reasons: Vec<_> = batch.invalid.iter().map(|e| (e.offer_id.clone(), e.reason)).collect();
    assert!(reasons.contains(&(unknown_shipping.id, ExclusionReason::BelowMinConfidence)));
    assert!(reasons.contains(&(wrong_unit.id, ExclusionReason::ConversionFailed)));
}

#[test]
fn test_precompute_fills_derived_fields() {
    let item = make_item("Flour", Dimension::Mass, "kg")
        .with_equivalence_factor(2.0)
        .unwrap();
    let offer = make_offer(&item, "A", 12.0, 2000.0, "g").with_shipping(Some(2.0), false);

    let filled = precompute(&offer, &item);
    assert!(approx(filled.canonical_amount.unwrap(), 2.0));
    assert!(approx(filled.price_per_canonical_excluding.unwrap(), 6.0));
    // derived prices carry no equivalence adjustment
    assert!(approx(filled.price_per_canonical_including.unwrap(), 7.0));
    assert_eq!(filled.effective_price_per_canonical, filled.price_per_canonical_including);

    let unconvertible = precompute(&make_offer(&item, "B", 1.0, 1.0, "ea"), &item);
    assert!(unconvertible.canonical_amount.is_none());
    assert!(unconvertible.price_per_canonical_including.is_none());
}
