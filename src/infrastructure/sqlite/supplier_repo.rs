use crate::domain::entities::supplier::Supplier;
use crate::domain::error::DomainError;
use crate::domain::ports::find_options::{FindOptions, OrderHint};
use crate::domain::ports::supplier_repository::SupplierRepository;
use crate::infrastructure::sqlite::{from_db_time, lock, to_db_time, SharedConnection};
use async_trait::async_trait;
use rusqlite::params;

const SELECT_COLS: &str = "id, name, website, notes, created_at";

pub struct SqliteSupplierRepo {
    conn: SharedConnection,
}

impl SqliteSupplierRepo {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn row_to_supplier(row: &rusqlite::Row) -> Result<Supplier, rusqlite::Error> {
        let created_str: String = row.get(4)?;
        Ok(Supplier {
            id: row.get(0)?,
            name: row.get(1)?,
            website: row.get(2)?,
            notes: row.get(3)?,
            created_at: from_db_time(&created_str),
        })
    }
}

#[async_trait]
impl SupplierRepository for SqliteSupplierRepo {
    async fn add(&self, supplier: &Supplier) -> Result<(), DomainError> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO suppliers (id, name, website, notes, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                supplier.id,
                supplier.name,
                supplier.website,
                supplier.notes,
                to_db_time(&supplier.created_at),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to add supplier: {e}")))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Supplier>, DomainError> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!("SELECT {SELECT_COLS} FROM suppliers WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id], Self::row_to_supplier)?;
        Ok(rows.next().transpose()?)
    }

    async fn find_all(&self, options: &FindOptions) -> Result<Vec<Supplier>, DomainError> {
        let order = match options.order {
            OrderHint::Newest => "created_at DESC",
            OrderHint::Oldest => "created_at ASC",
            OrderHint::Name => "name ASC",
        };
        let mut sql = format!("SELECT {SELECT_COLS} FROM suppliers ORDER BY {order}");
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&sql)?;
        let suppliers = stmt
            .query_map([], Self::row_to_supplier)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(suppliers)
    }
}
