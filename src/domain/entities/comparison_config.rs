use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Raw strategy options. Keys are sorted, so serialization is stable.
pub type StrategyOptions = serde_json::Map<String, Value>;

pub const DEFAULT_STRATEGY: &str = "price-per-canonical";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Lower score first.
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(format!("Unknown sort direction: {s}")),
        }
    }
}

/// A strategy blended into the primary score with the given weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryStrategy {
    pub strategy_id: String,
    pub weight: f64,
    #[serde(default)]
    pub options: StrategyOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalOptions {
    pub sort_direction: SortDirection,
    pub include_deleted: bool,
    pub max_results: Option<usize>,
    pub min_confidence: f64,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub use_cache: bool,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            sort_direction: SortDirection::Asc,
            include_deleted: false,
            max_results: None,
            min_confidence: 0.0,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            use_cache: true,
        }
    }
}

impl GlobalOptions {
    /// Every bound violation, in field order.
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_results == Some(0) {
            errors.push("max_results must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            errors.push(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            ));
        }
        if self.cache_max_entries == 0 {
            errors.push("cache_max_entries must be at least 1".to_string());
        }
        errors
    }
}

/// How a comparison run scores, filters and orders offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    pub primary_strategy: String,
    #[serde(default)]
    pub options: StrategyOptions,
    #[serde(default)]
    pub secondary: Vec<SecondaryStrategy>,
    #[serde(default)]
    pub global: GlobalOptions,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STRATEGY)
    }
}

impl ComparisonConfig {
    pub fn new(primary_strategy: &str) -> Self {
        Self {
            primary_strategy: primary_strategy.to_string(),
            options: StrategyOptions::new(),
            secondary: Vec::new(),
            global: GlobalOptions::default(),
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn with_secondary(mut self, strategy_id: &str, weight: f64) -> Self {
        self.secondary.push(SecondaryStrategy {
            strategy_id: strategy_id.to_string(),
            weight,
            options: StrategyOptions::new(),
        });
        self
    }

    pub fn with_global(mut self, global: GlobalOptions) -> Self {
        self.global = global;
        self
    }

    /// Cache identity: the item id plus the stable JSON form of this config.
    pub fn cache_key(&self, item_id: &str) -> String {
        let serialized = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        format!("{item_id}|{serialized}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_ignores_option_insertion_order() {
        let a = ComparisonConfig::new("total-price")
            .with_option("include_tax", false)
            .with_option("include_shipping", true);
        let b = ComparisonConfig::new("total-price")
            .with_option("include_shipping", true)
            .with_option("include_tax", false);
        assert_eq!(a.cache_key("item-1"), b.cache_key("item-1"));
        assert_ne!(a.cache_key("item-1"), a.cache_key("item-2"));
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: ComparisonConfig =
            serde_json::from_value(json!({"primary_strategy": "quality-adjusted"})).unwrap();
        assert_eq!(config.global.cache_ttl_secs, 300);
        assert_eq!(config.global.cache_max_entries, 100);
        assert!(config.global.use_cache);
        assert!(config.secondary.is_empty());
    }

    #[test]
    fn test_global_violations_are_collected() {
        let global = GlobalOptions {
            max_results: Some(0),
            min_confidence: 1.5,
            ..Default::default()
        };
        assert_eq!(global.violations().len(), 2);
        assert!(GlobalOptions::default().violations().is_empty());
    }
}
