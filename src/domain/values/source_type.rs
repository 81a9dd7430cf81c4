use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where an offer observation came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Entered by hand
    #[default]
    Manual,
    /// Seen on a web shop
    Online,
    /// Captured from a till receipt
    Receipt,
    /// Printed or digital promotional flyer
    Flyer,
    /// Bulk import from another system
    Import,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Online => "online",
            Self::Receipt => "receipt",
            Self::Flyer => "flyer",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "online" | "web" => Ok(Self::Online),
            "receipt" => Ok(Self::Receipt),
            "flyer" => Ok(Self::Flyer),
            "import" => Ok(Self::Import),
            _ => Err(format!(
                "Invalid source type: '{}'. Use manual, online, receipt, flyer or import",
                s
            )),
        }
    }
}
