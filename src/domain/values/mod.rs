pub mod confidence;
pub mod flag;
pub mod ranking_metric;
pub mod source_type;
pub mod trend;
pub mod unit;
