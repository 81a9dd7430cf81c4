//! Unit of measure table.
//!
//! Every unit belongs to exactly one [`Dimension`] and carries a factor to
//! that dimension's base unit (`g`, `ml`, `ea`, `m`, `m2`). Lookups are
//! case-insensitive and accept common spelled-out aliases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Mass,
    Volume,
    Count,
    Length,
    Area,
}

impl Dimension {
    pub fn base_unit(&self) -> &'static str {
        match self {
            Dimension::Mass => "g",
            Dimension::Volume => "ml",
            Dimension::Count => "ea",
            Dimension::Length => "m",
            Dimension::Area => "m2",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Mass => write!(f, "mass"),
            Dimension::Volume => write!(f, "volume"),
            Dimension::Count => write!(f, "count"),
            Dimension::Length => write!(f, "length"),
            Dimension::Area => write!(f, "area"),
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mass" | "weight" => Ok(Dimension::Mass),
            "volume" => Ok(Dimension::Volume),
            "count" => Ok(Dimension::Count),
            "length" => Ok(Dimension::Length),
            "area" => Ok(Dimension::Area),
            _ => Err(format!("Unknown dimension: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("unit '{unit}' measures {found}, expected {expected}")]
    IncompatibleUnit {
        unit: String,
        expected: Dimension,
        found: Dimension,
    },

    #[error("amount must be a positive finite number, got {0}")]
    InvalidAmount(f64),
}

/// A known unit: canonical symbol, dimension and factor to the base unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    pub symbol: &'static str,
    pub dimension: Dimension,
    pub to_base: f64,
}

const fn unit(symbol: &'static str, dimension: Dimension, to_base: f64) -> UnitDef {
    UnitDef {
        symbol,
        dimension,
        to_base,
    }
}

const UNITS: &[UnitDef] = &[
    // mass
    unit("mg", Dimension::Mass, 0.001),
    unit("g", Dimension::Mass, 1.0),
    unit("kg", Dimension::Mass, 1000.0),
    unit("oz", Dimension::Mass, 28.349_523_125),
    unit("lb", Dimension::Mass, 453.592_37),
    // volume
    unit("ml", Dimension::Volume, 1.0),
    unit("cl", Dimension::Volume, 10.0),
    unit("dl", Dimension::Volume, 100.0),
    unit("l", Dimension::Volume, 1000.0),
    unit("tsp", Dimension::Volume, 4.928_921_593_75),
    unit("tbsp", Dimension::Volume, 14.786_764_781_25),
    unit("fl_oz", Dimension::Volume, 29.573_529_562_5),
    unit("cup", Dimension::Volume, 236.588_236_5),
    unit("pt", Dimension::Volume, 473.176_473),
    unit("qt", Dimension::Volume, 946.352_946),
    unit("gal", Dimension::Volume, 3785.411_784),
    // count
    unit("ea", Dimension::Count, 1.0),
    unit("pair", Dimension::Count, 2.0),
    unit("dozen", Dimension::Count, 12.0),
    // length
    unit("mm", Dimension::Length, 0.001),
    unit("cm", Dimension::Length, 0.01),
    unit("m", Dimension::Length, 1.0),
    unit("km", Dimension::Length, 1000.0),
    unit("in", Dimension::Length, 0.0254),
    unit("ft", Dimension::Length, 0.3048),
    unit("yd", Dimension::Length, 0.9144),
    // area
    unit("cm2", Dimension::Area, 0.0001),
    unit("m2", Dimension::Area, 1.0),
    unit("km2", Dimension::Area, 1_000_000.0),
    unit("in2", Dimension::Area, 0.000_645_16),
    unit("ft2", Dimension::Area, 0.092_903_04),
];

/// Spelled-out and plural forms mapped to table symbols.
const ALIASES: &[(&str, &str)] = &[
    ("milligram", "mg"),
    ("milligrams", "mg"),
    ("gram", "g"),
    ("grams", "g"),
    ("gr", "g"),
    ("kilogram", "kg"),
    ("kilograms", "kg"),
    ("kilo", "kg"),
    ("kilos", "kg"),
    ("ounce", "oz"),
    ("ounces", "oz"),
    ("pound", "lb"),
    ("pounds", "lb"),
    ("lbs", "lb"),
    ("milliliter", "ml"),
    ("milliliters", "ml"),
    ("millilitre", "ml"),
    ("millilitres", "ml"),
    ("liter", "l"),
    ("liters", "l"),
    ("litre", "l"),
    ("litres", "l"),
    ("teaspoon", "tsp"),
    ("teaspoons", "tsp"),
    ("tablespoon", "tbsp"),
    ("tablespoons", "tbsp"),
    ("floz", "fl_oz"),
    ("fl oz", "fl_oz"),
    ("fl.oz", "fl_oz"),
    ("cups", "cup"),
    ("pint", "pt"),
    ("pints", "pt"),
    ("quart", "qt"),
    ("quarts", "qt"),
    ("gallon", "gal"),
    ("gallons", "gal"),
    ("each", "ea"),
    ("unit", "ea"),
    ("units", "ea"),
    ("pc", "ea"),
    ("pcs", "ea"),
    ("piece", "ea"),
    ("pieces", "ea"),
    ("ct", "ea"),
    ("count", "ea"),
    ("pairs", "pair"),
    ("dz", "dozen"),
    ("millimeter", "mm"),
    ("millimeters", "mm"),
    ("centimeter", "cm"),
    ("centimeters", "cm"),
    ("meter", "m"),
    ("meters", "m"),
    ("metre", "m"),
    ("metres", "m"),
    ("kilometer", "km"),
    ("kilometers", "km"),
    ("inch", "in"),
    ("inches", "in"),
    ("foot", "ft"),
    ("feet", "ft"),
    ("yard", "yd"),
    ("yards", "yd"),
    ("sq cm", "cm2"),
    ("sqcm", "cm2"),
    ("sq m", "m2"),
    ("sqm", "m2"),
    ("sq km", "km2"),
    ("sq in", "in2"),
    ("sq ft", "ft2"),
    ("sqft", "ft2"),
];

/// Look up a unit by symbol or alias.
pub fn lookup(unit: &str) -> Option<UnitDef> {
    let key = unit.trim().to_lowercase();
    let symbol = ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, symbol)| *symbol)
        .unwrap_or(key.as_str());
    UNITS.iter().find(|u| u.symbol == symbol).copied()
}

/// Canonical symbol for a unit string (`"Grams"` → `"g"`).
pub fn canonical_symbol(unit: &str) -> Option<&'static str> {
    lookup(unit).map(|u| u.symbol)
}

/// Whether `unit` is a known unit of `dimension`.
pub fn is_unit_of(unit: &str, dimension: Dimension) -> bool {
    lookup(unit).is_some_and(|u| u.dimension == dimension)
}

/// Symbols of every unit in a dimension, in table order.
pub fn units_of(dimension: Dimension) -> Vec<&'static str> {
    UNITS
        .iter()
        .filter(|u| u.dimension == dimension)
        .map(|u| u.symbol)
        .collect()
}

/// Validate `unit` against `dimension` and convert `amount` to the
/// dimension's base unit.
pub fn validate_and_convert(
    amount: f64,
    unit: &str,
    dimension: Dimension,
) -> Result<f64, ConversionError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ConversionError::InvalidAmount(amount));
    }
    let def = lookup(unit).ok_or_else(|| ConversionError::UnknownUnit(unit.to_string()))?;
    if def.dimension != dimension {
        return Err(ConversionError::IncompatibleUnit {
            unit: unit.to_string(),
            expected: dimension,
            found: def.dimension,
        });
    }
    Ok(amount * def.to_base)
}

/// Convert `amount` between two units of the same dimension.
pub fn convert(amount: f64, from: &str, to: &str) -> Result<f64, ConversionError> {
    let target = lookup(to).ok_or_else(|| ConversionError::UnknownUnit(to.to_string()))?;
    let base = validate_and_convert(amount, from, target.dimension)?;
    Ok(base / target.to_base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_kilograms_to_grams() {
        assert!(close(convert(1.5, "kg", "g").unwrap(), 1500.0));
    }

    #[test]
    fn test_aliases_are_case_insensitive() {
        assert_eq!(canonical_symbol("Grams"), Some("g"));
        assert_eq!(canonical_symbol(" LITRES "), Some("l"));
        assert_eq!(canonical_symbol("fl oz"), Some("fl_oz"));
    }

    #[test]
    fn test_pounds_to_ounces() {
        assert!(close(convert(1.0, "lb", "oz").unwrap(), 16.0));
    }

    #[test]
    fn test_dozen_counts_as_twelve() {
        assert!(close(validate_and_convert(2.0, "dozen", Dimension::Count).unwrap(), 24.0));
    }

    #[test]
    fn test_incompatible_unit_rejected() {
        let err = validate_and_convert(1.0, "ml", Dimension::Mass).unwrap_err();
        assert!(matches!(err, ConversionError::IncompatibleUnit { found: Dimension::Volume, .. }));
    }

    #[test]
    fn test_unknown_unit_rejected() {
        assert_eq!(
            convert(1.0, "furlong", "m").unwrap_err(),
            ConversionError::UnknownUnit("furlong".into())
        );
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        assert!(matches!(
            validate_and_convert(0.0, "g", Dimension::Mass),
            Err(ConversionError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_and_convert(f64::NAN, "g", Dimension::Mass),
            Err(ConversionError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_every_dimension_has_its_base_unit() {
        for dim in [
            Dimension::Mass,
            Dimension::Volume,
            Dimension::Count,
            Dimension::Length,
            Dimension::Area,
        ] {
            let base = lookup(dim.base_unit()).unwrap();
            assert_eq!(base.dimension, dim);
            assert!(close(base.to_base, 1.0));
        }
    }
}
