use crate::domain::entities::inventory_item::InventoryItem;
use crate::domain::error::DomainError;
use crate::domain::ports::find_options::{FindOptions, OrderHint};
use crate::domain::ports::item_repository::ItemRepository;
use crate::infrastructure::sqlite::sql_builder::SqlBuilder;
use crate::infrastructure::sqlite::{from_db_time, lock, to_db_time, SharedConnection};
use async_trait::async_trait;
use rusqlite::params;

const SELECT_COLS: [&str; 11] = [
    "id",
    "name",
    "canonical_dimension",
    "canonical_unit",
    "equivalence_factor",
    "is_perishable",
    "shelf_life_days",
    "notes",
    "deleted_at",
    "created_at",
    "updated_at",
];

pub struct SqliteItemRepo {
    conn: SharedConnection,
}

impl SqliteItemRepo {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn row_to_item(row: &rusqlite::Row) -> Result<InventoryItem, rusqlite::Error> {
        let dimension_str: String = row.get(2)?;
        let deleted_str: Option<String> = row.get(8)?;
        let created_str: String = row.get(9)?;
        let updated_str: String = row.get(10)?;

        let canonical_dimension = dimension_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
        })?;

        Ok(InventoryItem {
            id: row.get(0)?,
            name: row.get(1)?,
            canonical_dimension,
            canonical_unit: row.get(3)?,
            equivalence_factor: row.get(4)?,
            is_perishable: row.get::<_, i32>(5)? != 0,
            shelf_life_days: row.get(6)?,
            notes: row.get(7)?,
            deleted_at: deleted_str.as_deref().map(from_db_time),
            created_at: from_db_time(&created_str),
            updated_at: from_db_time(&updated_str),
        })
    }

    fn query(&self, builder: &SqlBuilder) -> Result<Vec<InventoryItem>, DomainError> {
        let (sql, params) = builder.build();
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), Self::row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }
}

#[async_trait]
impl ItemRepository for SqliteItemRepo {
    async fn add(&self, item: &InventoryItem) -> Result<(), DomainError> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO items (id, name, canonical_dimension, canonical_unit, equivalence_factor,
                is_perishable, shelf_life_days, notes, deleted_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                item.id,
                item.name,
                item.canonical_dimension.to_string(),
                item.canonical_unit,
                item.equivalence_factor,
                item.is_perishable as i32,
                item.shelf_life_days,
                item.notes,
                item.deleted_at.as_ref().map(to_db_time),
                to_db_time(&item.created_at),
                to_db_time(&item.updated_at),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to add item: {e}")))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<InventoryItem>, DomainError> {
        let mut builder = SqlBuilder::new("items");
        builder.select(&SELECT_COLS).where_eq("id", id);
        Ok(self.query(&builder)?.into_iter().next())
    }

    async fn find_all(&self, options: &FindOptions) -> Result<Vec<InventoryItem>, DomainError> {
        let mut builder = SqlBuilder::new("items");
        builder.select(&SELECT_COLS);
        if !options.include_deleted {
            builder.where_null("deleted_at");
        }
        match options.order {
            OrderHint::Newest => builder.order_by(&["created_at DESC"]),
            OrderHint::Oldest => builder.order_by(&["created_at ASC"]),
            OrderHint::Name => builder.order_by(&["name ASC"]),
        };
        if let Some(limit) = options.limit {
            builder.limit(limit);
        }
        self.query(&builder)
    }
}
