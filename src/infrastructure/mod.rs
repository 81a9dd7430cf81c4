pub mod history;
pub mod sqlite;
