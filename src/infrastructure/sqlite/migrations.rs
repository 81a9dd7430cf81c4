use crate::domain::error::DomainError;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<(), DomainError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            canonical_dimension TEXT NOT NULL,
            canonical_unit TEXT NOT NULL,
            equivalence_factor REAL NOT NULL DEFAULT 1.0,
            is_perishable INTEGER NOT NULL DEFAULT 0,
            shelf_life_days INTEGER,
            notes TEXT,
            deleted_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS suppliers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            website TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS offers (
            id TEXT PRIMARY KEY,
            item_id TEXT NOT NULL REFERENCES items(id),
            supplier_id TEXT NOT NULL,
            supplier_name TEXT NOT NULL,
            total_price REAL NOT NULL,
            currency TEXT NOT NULL,
            is_tax_included INTEGER NOT NULL DEFAULT 0,
            tax_rate REAL,
            shipping_cost REAL,
            shipping_included INTEGER NOT NULL DEFAULT 0,
            amount REAL NOT NULL,
            amount_unit TEXT NOT NULL,
            canonical_amount REAL,
            price_per_canonical_excluding REAL,
            price_per_canonical_including REAL,
            effective_price_per_canonical REAL,
            quality_rating INTEGER,
            source_url TEXT,
            source_type TEXT NOT NULL DEFAULT 'manual',
            notes TEXT,
            observed_at TEXT NOT NULL,
            deleted_at TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_offers_item ON offers(item_id);
        CREATE INDEX IF NOT EXISTS idx_offers_supplier ON offers(supplier_id);
        CREATE INDEX IF NOT EXISTS idx_offers_observed ON offers(observed_at);
        CREATE INDEX IF NOT EXISTS idx_items_name ON items(name);
        ",
    )
    .map_err(|e| DomainError::Database(format!("Migration failed: {e}")))
}
