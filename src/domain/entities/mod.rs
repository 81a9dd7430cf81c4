pub mod comparison;
pub mod comparison_config;
pub mod inventory_item;
pub mod offer;
pub mod supplier;
