use crate::domain::values::unit::ConversionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid options for strategy '{strategy_id}': {message}")]
    InvalidOptions { strategy_id: String, message: String },

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Strategy not found: {0}")]
    StrategyNotFound(String),

    #[error("Comparison failed in strategy '{strategy_id}': {source}")]
    Comparison {
        strategy_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("History service error: {0}")]
    History(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidInput(_) => "INVALID_INPUT",
            DomainError::InvalidConfig(_) => "INVALID_CONFIG",
            DomainError::InvalidOptions { .. } => "INVALID_OPTIONS",
            DomainError::ItemNotFound(_) => "ITEM_NOT_FOUND",
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::StrategyNotFound(_) => "STRATEGY_NOT_FOUND",
            DomainError::Comparison { .. } => "COMPARISON_ERROR",
            DomainError::Database(_) => "DATABASE_ERROR",
            DomainError::History(_) => "HISTORY_ERROR",
            DomainError::Parse(_) => "PARSE_ERROR",
        }
    }

    pub fn comparison(
        strategy_id: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        DomainError::Comparison {
            strategy_id: strategy_id.into(),
            source: source.into(),
        }
    }

    pub fn invalid_options(strategy_id: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::InvalidOptions {
            strategy_id: strategy_id.into(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<ConversionError> for DomainError {
    fn from(e: ConversionError) -> Self {
        DomainError::InvalidInput(e.to_string())
    }
}

impl From<&str> for DomainError {
    fn from(s: &str) -> Self {
        DomainError::InvalidInput(s.to_string())
    }
}
