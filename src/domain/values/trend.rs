//! Historical price trend values.
//!
//! The history port returns these types; the pure helpers at the bottom
//! classify a raw series of observations and back the SQLite history adapter.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coefficient of variation above which a series is classified volatile.
const VOLATILE_CV: f64 = 0.25;
/// Percent change inside which a series is classified stable.
const STABLE_BAND_PCT: f64 = 5.0;
/// Percent change that maps to full trend strength.
const FULL_STRENGTH_PCT: f64 = 20.0;
/// Samples needed for full trend confidence.
const FULL_CONFIDENCE_SAMPLES: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricePeriod {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl PricePeriod {
    pub fn days(&self) -> i64 {
        match self {
            PricePeriod::Week => 7,
            PricePeriod::Month => 30,
            PricePeriod::Quarter => 90,
            PricePeriod::Year => 365,
        }
    }

    /// Start of the lookback window ending at `now`.
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PricePeriod::Week => "week",
            PricePeriod::Month => "month",
            PricePeriod::Quarter => "quarter",
            PricePeriod::Year => "year",
        }
    }
}

impl fmt::Display for PricePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "week" | "7d" => Ok(PricePeriod::Week),
            "month" | "30d" => Ok(PricePeriod::Month),
            "quarter" | "90d" => Ok(PricePeriod::Quarter),
            "year" | "365d" => Ok(PricePeriod::Year),
            _ => Err(format!("Unknown period: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Down,
    Up,
    Stable,
    Volatile,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Down => write!(f, "down"),
            TrendDirection::Up => write!(f, "up"),
            TrendDirection::Stable => write!(f, "stable"),
            TrendDirection::Volatile => write!(f, "volatile"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTrend {
    pub direction: TrendDirection,
    /// 0.0–1.0
    pub strength: f64,
    pub percent_change: f64,
    /// 0.0–1.0
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStatistics {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Coefficient of variation (stddev / mean).
    pub volatility: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBest {
    pub price: f64,
    pub observed_at: DateTime<Utc>,
    pub supplier_id: Option<String>,
}

/// One observation of a price per canonical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub observed_at: DateTime<Utc>,
    pub supplier_id: Option<String>,
}

/// Aggregate statistics for a series. `None` when the series is empty.
pub fn summarize(points: &[PricePoint]) -> Option<PriceStatistics> {
    if points.is_empty() {
        return None;
    }
    let count = points.len() as f64;
    let average = points.iter().map(|p| p.price).sum::<f64>() / count;
    let variance = points
        .iter()
        .map(|p| (p.price - average).powi(2))
        .sum::<f64>()
        / count;
    let volatility = if average > 0.0 {
        variance.sqrt() / average
    } else {
        0.0
    };
    let min = points.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
    Some(PriceStatistics {
        average,
        min,
        max,
        volatility,
        sample_count: points.len(),
    })
}

/// Classify a series by comparing its oldest and newest observations.
/// `None` when fewer than two points exist.
pub fn classify_trend(points: &[PricePoint]) -> Option<PriceTrend> {
    if points.len() < 2 {
        return None;
    }
    let mut sorted: Vec<&PricePoint> = points.iter().collect();
    sorted.sort_by_key(|p| p.observed_at);

    let first = sorted.first()?.price;
    let last = sorted.last()?.price;
    if first <= 0.0 {
        return None;
    }
    let percent_change = (last - first) / first * 100.0;
    let stats = summarize(points)?;

    let direction = if stats.volatility > VOLATILE_CV {
        TrendDirection::Volatile
    } else if percent_change < -STABLE_BAND_PCT {
        TrendDirection::Down
    } else if percent_change > STABLE_BAND_PCT {
        TrendDirection::Up
    } else {
        TrendDirection::Stable
    };
    let strength = match direction {
        TrendDirection::Volatile => (stats.volatility / (2.0 * VOLATILE_CV)).min(1.0),
        _ => (percent_change.abs() / FULL_STRENGTH_PCT).min(1.0),
    };
    let confidence = (points.len() as f64 / FULL_CONFIDENCE_SAMPLES).min(1.0);

    Some(PriceTrend {
        direction,
        strength,
        percent_change,
        confidence,
    })
}

/// Lowest observed price; the most recent one wins ties.
pub fn best_point(points: &[PricePoint]) -> Option<HistoricalBest> {
    points
        .iter()
        .min_by(|a, b| {
            a.price
                .partial_cmp(&b.price)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.observed_at.cmp(&a.observed_at))
        })
        .map(|p| HistoricalBest {
            price: p.price,
            observed_at: p.observed_at,
            supplier_id: p.supplier_id.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(prices: &[f64]) -> Vec<PricePoint> {
        let start = Utc::now() - Duration::days(prices.len() as i64);
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| PricePoint {
                price: *p,
                observed_at: start + Duration::days(i as i64),
                supplier_id: None,
            })
            .collect()
    }

    #[test]
    fn test_falling_prices_trend_down() {
        let trend = classify_trend(&series(&[10.0, 9.8, 9.5, 9.2, 9.0])).unwrap();
        assert_eq!(trend.direction, TrendDirection::Down);
        assert!((trend.percent_change + 10.0).abs() < 1e-9);
        assert!((trend.strength - 0.5).abs() < 1e-9);
        assert!((trend.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_flat_prices_are_stable() {
        let trend = classify_trend(&series(&[5.0, 5.1, 4.9, 5.0])).unwrap();
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_swinging_prices_are_volatile() {
        let trend = classify_trend(&series(&[2.0, 8.0, 2.0, 8.0, 2.0])).unwrap();
        assert_eq!(trend.direction, TrendDirection::Volatile);
    }

    #[test]
    fn test_single_point_has_no_trend() {
        assert!(classify_trend(&series(&[3.0])).is_none());
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_best_point_prefers_latest_tie() {
        let points = series(&[4.0, 3.0, 5.0, 3.0]);
        let best = best_point(&points).unwrap();
        assert_eq!(best.price, 3.0);
        assert_eq!(best.observed_at, points[3].observed_at);
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("Quarter".parse::<PricePeriod>().unwrap(), PricePeriod::Quarter);
        assert!("fortnight".parse::<PricePeriod>().is_err());
    }
}
