//! Price normalization.
//!
//! Converts an offer's observed quantity into its item's canonical unit and
//! derives a price per canonical unit under one of three policies:
//!
//! - **Excluding**: base price only.
//! - **Including**: base price plus shipping (unless already included) plus
//!   `base × tax_rate` (unless tax is already included).
//! - **Effective**: the offer's precomputed effective price when present and
//!   enabled, else Including.
//!
//! Failures are returned as [`PriceCalculation::Failed`], never raised.
//!
//! Adjustments use one rule everywhere: the currency rate multiplies the
//! price and the item's equivalence factor divides the price per canonical
//! unit.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::entities::comparison::{
    CalculationFailure, ExcludedOffer, ExclusionReason, ScoreBreakdown,
};
use crate::domain::entities::inventory_item::InventoryItem;
use crate::domain::entities::offer::Offer;
use crate::domain::values::confidence::Confidence;
use crate::domain::values::flag::ResultFlag;
use crate::domain::values::unit;

/// Penalty for missing shipping or tax data when the mode uses it.
const MISSING_DATA_PENALTY: f64 = 0.2;
/// Penalty for missing shipping or tax data the mode does not use.
const MISSING_DATA_PENALTY_UNUSED: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceMode {
    Excluding,
    #[default]
    Including,
    Effective,
}

/// Whether currency and equivalence adjustments scale the total cost or the
/// per-canonical price. Precomputed effective prices are always adjusted
/// after normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStage {
    BeforeNormalization,
    #[default]
    AfterNormalization,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceOptions {
    pub mode: PriceMode,
    /// Honoured in Including mode (and the Effective fallback).
    pub include_shipping: bool,
    pub include_tax: bool,
    pub use_effective_price: bool,
    pub currency_rate: Option<f64>,
    pub apply_equivalence_factor: bool,
    pub adjustment_stage: AdjustmentStage,
}

impl Default for PriceOptions {
    fn default() -> Self {
        Self {
            mode: PriceMode::Including,
            include_shipping: true,
            include_tax: true,
            use_effective_price: true,
            currency_rate: None,
            apply_equivalence_factor: true,
            adjustment_stage: AdjustmentStage::AfterNormalization,
        }
    }
}

impl PriceOptions {
    pub fn with_mode(mode: PriceMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }
}

/// Cost of one offer with its shipping and tax components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub base_price: f64,
    pub shipping: f64,
    pub tax: f64,
    pub total: f64,
    /// False when shipping applies but the offer carries no cost for it.
    pub shipping_known: bool,
    /// False when tax applies but the offer carries no rate for it.
    pub tax_known: bool,
}

/// Total cost of an offer, adding shipping and tax when requested and not
/// already part of the price.
pub fn total_cost(offer: &Offer, include_shipping: bool, include_tax: bool) -> CostBreakdown {
    let base_price = offer.total_price;

    let (shipping, shipping_known) = if offer.shipping_included {
        (0.0, true)
    } else {
        match offer.shipping_cost {
            Some(cost) => (if include_shipping { cost } else { 0.0 }, true),
            None => (0.0, false),
        }
    };

    let (tax, tax_known) = if offer.is_tax_included {
        (0.0, true)
    } else {
        match offer.tax_rate {
            Some(rate) => (if include_tax { base_price * rate } else { 0.0 }, true),
            None => (0.0, false),
        }
    };

    CostBreakdown {
        base_price,
        shipping,
        tax,
        total: base_price + shipping + tax,
        shipping_known,
        tax_known,
    }
}

/// Lower confidence and flag the result for each unknown cost component.
/// Components the caller did not include cost the lighter penalty.
pub fn penalize_missing_data(
    confidence: Confidence,
    cost: &CostBreakdown,
    with_shipping: bool,
    with_tax: bool,
    flags: &mut BTreeSet<ResultFlag>,
) -> Confidence {
    let penalty = |used: bool| {
        if used {
            MISSING_DATA_PENALTY
        } else {
            MISSING_DATA_PENALTY_UNUSED
        }
    };
    let mut confidence = confidence;
    if !cost.shipping_known {
        flags.insert(ResultFlag::ShippingUnknown);
        confidence = confidence.penalize(penalty(with_shipping));
    }
    if !cost.tax_known {
        flags.insert(ResultFlag::TaxUnknown);
        confidence = confidence.penalize(penalty(with_tax));
    }
    confidence
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedOffer {
    pub price_per_canonical: f64,
    pub canonical_amount: f64,
    /// Cost in the target currency, before the equivalence factor.
    pub total_cost: f64,
    pub confidence: Confidence,
    pub breakdown: ScoreBreakdown,
    pub flags: BTreeSet<ResultFlag>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PriceCalculation {
    Priced(PricedOffer),
    Failed(CalculationFailure),
}

impl PriceCalculation {
    pub fn is_success(&self) -> bool {
        matches!(self, PriceCalculation::Priced(_))
    }

    pub fn priced(&self) -> Option<&PricedOffer> {
        match self {
            PriceCalculation::Priced(p) => Some(p),
            PriceCalculation::Failed(_) => None,
        }
    }
}

/// Flags describing the offer's quality rating.
pub fn quality_flags(offer: &Offer) -> BTreeSet<ResultFlag> {
    let mut flags = BTreeSet::new();
    match offer.quality_rating {
        Some(r) if r >= 4 => {
            flags.insert(ResultFlag::HighQuality);
        }
        Some(r) if r <= 2 => {
            flags.insert(ResultFlag::LowQuality);
        }
        _ => {}
    }
    flags
}

/// Convert the offer's observed amount into the item's canonical unit.
pub fn canonical_amount(offer: &Offer, item: &InventoryItem) -> Result<f64, CalculationFailure> {
    let base = unit::validate_and_convert(offer.amount, &offer.amount_unit, item.canonical_dimension)
        .map_err(|e| {
            CalculationFailure::conversion(format!(
                "cannot convert {} {} to {}: {e}",
                offer.amount, offer.amount_unit, item.canonical_unit
            ))
        })?;
    let target = unit::lookup(&item.canonical_unit).ok_or_else(|| {
        CalculationFailure::conversion(format!("unknown canonical unit '{}'", item.canonical_unit))
    })?;
    Ok(base / target.to_base)
}

/// Price one offer against its item.
pub fn calculate_price(offer: &Offer, item: &InventoryItem, options: &PriceOptions) -> PriceCalculation {
    if let Err(e) = offer.validate() {
        return PriceCalculation::Failed(CalculationFailure::validation(e.to_string()));
    }
    let rate = options.currency_rate.unwrap_or(1.0);
    if !rate.is_finite() || rate <= 0.0 {
        return PriceCalculation::Failed(CalculationFailure::validation(format!(
            "currency rate must be positive, got {rate}"
        )));
    }
    let canonical_amount = match canonical_amount(offer, item) {
        Ok(amount) => amount,
        Err(failure) => return PriceCalculation::Failed(failure),
    };
    let equivalence = if options.apply_equivalence_factor {
        item.equivalence_factor
    } else {
        1.0
    };

    let mut flags = quality_flags(offer);
    let mut confidence = Confidence::FULL;
    let mut breakdown = ScoreBreakdown::new();
    breakdown.insert("canonical_amount".into(), canonical_amount);

    if offer.shipping_included {
        flags.insert(ResultFlag::ShippingIncluded);
    }
    if offer.is_tax_included {
        flags.insert(ResultFlag::TaxIncluded);
    }

    let effective = match options.mode {
        PriceMode::Effective if options.use_effective_price => offer
            .effective_price_per_canonical
            .filter(|p| p.is_finite() && *p > 0.0),
        _ => None,
    };

    let (price_per_canonical, cost) = if let Some(precomputed) = effective {
        flags.insert(ResultFlag::EffectivePrice);
        breakdown.insert("effective_price".into(), precomputed);
        (precomputed * rate / equivalence, precomputed * canonical_amount)
    } else {
        let including = options.mode != PriceMode::Excluding;
        let with_shipping = including && options.include_shipping;
        let with_tax = including && options.include_tax;
        let cost = total_cost(offer, with_shipping, with_tax);
        confidence = penalize_missing_data(confidence, &cost, with_shipping, with_tax, &mut flags);
        breakdown.insert("base_price".into(), cost.base_price);
        breakdown.insert("shipping".into(), cost.shipping);
        breakdown.insert("tax".into(), cost.tax);

        let per_canonical = match options.adjustment_stage {
            AdjustmentStage::BeforeNormalization => (cost.total * rate / equivalence) / canonical_amount,
            AdjustmentStage::AfterNormalization => cost.total / canonical_amount * rate / equivalence,
        };
        (per_canonical, cost.total)
    };

    if options.currency_rate.is_some() && rate != 1.0 {
        flags.insert(ResultFlag::CurrencyConverted);
        breakdown.insert("currency_rate".into(), rate);
    }
    if equivalence != 1.0 {
        flags.insert(ResultFlag::EquivalenceAdjusted);
        breakdown.insert("equivalence_factor".into(), equivalence);
    }
    let total_cost = cost * rate;
    breakdown.insert("total_cost".into(), total_cost);
    breakdown.insert("price_per_canonical".into(), price_per_canonical);

    if !price_per_canonical.is_finite() {
        return PriceCalculation::Failed(CalculationFailure::validation(format!(
            "price per canonical unit is not finite for offer {}",
            offer.id
        )));
    }

    PriceCalculation::Priced(PricedOffer {
        price_per_canonical,
        canonical_amount,
        total_cost,
        confidence,
        breakdown,
        flags,
    })
}

/// Offers priced in one pass, split by a minimum confidence.
#[derive(Debug, Clone, Default)]
pub struct BatchCalculation {
    pub valid: Vec<(Offer, PricedOffer)>,
    pub invalid: Vec<ExcludedOffer>,
}

pub fn calculate_batch(
    offers: &[Offer],
    item: &InventoryItem,
    options: &PriceOptions,
    min_confidence: f64,
) -> BatchCalculation {
    let mut batch = BatchCalculation::default();
    for offer in offers {
        match calculate_price(offer, item, options) {
            PriceCalculation::Priced(priced) if priced.confidence.value() >= min_confidence => {
                batch.valid.push((offer.clone(), priced));
            }
            PriceCalculation::Priced(priced) => batch.invalid.push(ExcludedOffer {
                offer_id: offer.id.clone(),
                supplier_name: offer.supplier_name.clone(),
                reason: ExclusionReason::BelowMinConfidence,
                message: format!(
                    "confidence {} is below the minimum {min_confidence}",
                    priced.confidence
                ),
                flags: priced.flags,
            }),
            PriceCalculation::Failed(failure) => batch.invalid.push(failure.into_excluded(offer)),
        }
    }
    batch
}

/// Fill the offer's derived fields: canonical amount and the excluding,
/// including and effective prices per canonical unit. Derived prices carry
/// no currency or equivalence adjustment; effective equals including.
/// Fields stay `None` when the amount cannot be converted.
pub fn precompute(offer: &Offer, item: &InventoryItem) -> Offer {
    let mut out = offer.clone();
    let raw = PriceOptions {
        apply_equivalence_factor: false,
        ..Default::default()
    };
    let excluding = calculate_price(
        offer,
        item,
        &PriceOptions {
            mode: PriceMode::Excluding,
            ..raw.clone()
        },
    );
    let including = calculate_price(offer, item, &raw);

    out.canonical_amount = including.priced().map(|p| p.canonical_amount);
    out.price_per_canonical_excluding = excluding.priced().map(|p| p.price_per_canonical);
    out.price_per_canonical_including = including.priced().map(|p| p.price_per_canonical);
    out.effective_price_per_canonical = out.price_per_canonical_including;
    out
}
