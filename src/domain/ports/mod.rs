pub mod find_options;
pub mod item_repository;
pub mod offer_repository;
pub mod price_history;
pub mod strategy;
pub mod supplier_repository;
