use crate::domain::entities::offer::Offer;
use crate::domain::error::DomainError;
use crate::domain::ports::find_options::{FindOptions, OrderHint};
use crate::domain::ports::offer_repository::{BulkRankingQuery, OfferFilter, OfferRepository, RankedOffer};
use crate::domain::values::source_type::SourceType;
use crate::infrastructure::sqlite::sql_builder::{SqlBuilder, SqlParam};
use crate::infrastructure::sqlite::{from_db_time, lock, to_db_time, SharedConnection};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params;

/// Offer columns in the order `row_to_offer` reads them.
pub(crate) const OFFER_COLUMNS: [&str; 23] = [
    "id",
    "item_id",
    "supplier_id",
    "supplier_name",
    "total_price",
    "currency",
    "is_tax_included",
    "tax_rate",
    "shipping_cost",
    "shipping_included",
    "amount",
    "amount_unit",
    "canonical_amount",
    "price_per_canonical_excluding",
    "price_per_canonical_including",
    "effective_price_per_canonical",
    "quality_rating",
    "source_url",
    "source_type",
    "notes",
    "observed_at",
    "deleted_at",
    "created_at",
];

/// `OFFER_COLUMNS` qualified with a table alias.
pub(crate) fn qualified_columns(alias: &str) -> Vec<String> {
    OFFER_COLUMNS.iter().map(|c| format!("{alias}.{c}")).collect()
}

pub struct SqliteOfferRepo {
    conn: SharedConnection,
}

impl SqliteOfferRepo {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub(crate) fn row_to_offer(row: &rusqlite::Row) -> Result<Offer, rusqlite::Error> {
        let source_type_str: String = row.get(18)?;
        let observed_str: String = row.get(20)?;
        let deleted_str: Option<String> = row.get(21)?;
        let created_str: String = row.get(22)?;

        Ok(Offer {
            id: row.get(0)?,
            item_id: row.get(1)?,
            supplier_id: row.get(2)?,
            supplier_name: row.get(3)?,
            total_price: row.get(4)?,
            currency: row.get(5)?,
            is_tax_included: row.get::<_, i32>(6)? != 0,
            tax_rate: row.get(7)?,
            shipping_cost: row.get(8)?,
            shipping_included: row.get::<_, i32>(9)? != 0,
            amount: row.get(10)?,
            amount_unit: row.get(11)?,
            canonical_amount: row.get(12)?,
            price_per_canonical_excluding: row.get(13)?,
            price_per_canonical_including: row.get(14)?,
            effective_price_per_canonical: row.get(15)?,
            quality_rating: row.get(16)?,
            source_url: row.get(17)?,
            source_type: source_type_str.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %source_type_str, "invalid source_type in offer, defaulting to manual");
                SourceType::default()
            }),
            notes: row.get(19)?,
            observed_at: from_db_time(&observed_str),
            deleted_at: deleted_str.as_deref().map(from_db_time),
            created_at: from_db_time(&created_str),
        })
    }

    fn query(&self, builder: &SqlBuilder) -> Result<Vec<Offer>, DomainError> {
        let (sql, params) = builder.build();
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&sql)?;
        let offers = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), Self::row_to_offer)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(offers)
    }
}

/// Add the filter's predicates on an offers table aliased `alias`.
pub(crate) fn apply_filter(builder: &mut SqlBuilder, filter: &OfferFilter, alias: &str) {
    let col = |name: &str| format!("{alias}.{name}");
    if !filter.item_ids.is_empty() {
        builder.where_in(&col("item_id"), filter.item_ids.iter().map(|s| SqlParam::from(s.as_str())).collect());
    }
    if !filter.supplier_ids.is_empty() {
        builder.where_in(
            &col("supplier_id"),
            filter.supplier_ids.iter().map(|s| SqlParam::from(s.as_str())).collect(),
        );
    }
    if let Some(from) = &filter.observed_from {
        builder.where_gte(&col("observed_at"), to_db_time(from));
    }
    if let Some(to) = &filter.observed_to {
        builder.where_lte(&col("observed_at"), to_db_time(to));
    }
    if let Some(min) = filter.min_price {
        builder.where_gte(&col("total_price"), min);
    }
    if let Some(max) = filter.max_price {
        builder.where_lte(&col("total_price"), max);
    }
    if let Some(min) = filter.min_quality {
        builder.where_gte(&col("quality_rating"), min);
    }
    if let Some(max) = filter.max_quality {
        builder.where_lte(&col("quality_rating"), max);
    }
    if !filter.currencies.is_empty() {
        builder.where_in(
            &col("currency"),
            filter.currencies.iter().map(|c| SqlParam::from(c.to_uppercase())).collect(),
        );
    }
    if !filter.source_types.is_empty() {
        builder.where_in(
            &col("source_type"),
            filter.source_types.iter().map(|s| SqlParam::from(s.as_str())).collect(),
        );
    }
}

fn apply_find_options(builder: &mut SqlBuilder, options: &FindOptions) {
    if !options.include_deleted {
        builder.where_null("o.deleted_at");
    }
    match options.order {
        OrderHint::Newest => builder.order_by(&["o.observed_at DESC", "o.created_at DESC"]),
        OrderHint::Oldest => builder.order_by(&["o.observed_at ASC", "o.created_at ASC"]),
        OrderHint::Name => builder.order_by(&["o.supplier_name ASC", "o.observed_at DESC"]),
    };
    if let Some(limit) = options.limit {
        builder.limit(limit);
    }
}

#[async_trait]
impl OfferRepository for SqliteOfferRepo {
    async fn add(&self, offer: &Offer) -> Result<(), DomainError> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO offers (id, item_id, supplier_id, supplier_name, total_price, currency,
                is_tax_included, tax_rate, shipping_cost, shipping_included, amount, amount_unit,
                canonical_amount, price_per_canonical_excluding, price_per_canonical_including,
                effective_price_per_canonical, quality_rating, source_url, source_type, notes,
                observed_at, deleted_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22, ?23)",
            params![
                offer.id,
                offer.item_id,
                offer.supplier_id,
                offer.supplier_name,
                offer.total_price,
                offer.currency,
                offer.is_tax_included as i32,
                offer.tax_rate,
                offer.shipping_cost,
                offer.shipping_included as i32,
                offer.amount,
                offer.amount_unit,
                offer.canonical_amount,
                offer.price_per_canonical_excluding,
                offer.price_per_canonical_including,
                offer.effective_price_per_canonical,
                offer.quality_rating,
                offer.source_url,
                offer.source_type.as_str(),
                offer.notes,
                to_db_time(&offer.observed_at),
                offer.deleted_at.as_ref().map(to_db_time),
                to_db_time(&offer.created_at),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to add offer: {e}")))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Offer>, DomainError> {
        let columns = qualified_columns("o");
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        let mut builder = SqlBuilder::new("offers o");
        builder.select(&columns).where_eq("o.id", id);
        Ok(self.query(&builder)?.into_iter().next())
    }

    async fn find_all(&self, options: &FindOptions) -> Result<Vec<Offer>, DomainError> {
        self.find_where(&OfferFilter::default(), options).await
    }

    async fn find_where(&self, filter: &OfferFilter, options: &FindOptions) -> Result<Vec<Offer>, DomainError> {
        let columns = qualified_columns("o");
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        let mut builder = SqlBuilder::new("offers o");
        builder.select(&columns);
        apply_filter(&mut builder, filter, "o");
        apply_find_options(&mut builder, options);
        self.query(&builder)
    }

    async fn soft_delete(&self, id: &str) -> Result<(), DomainError> {
        let conn = lock(&self.conn)?;
        let changed = conn.execute(
            "UPDATE offers SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![to_db_time(&Utc::now()), id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("offer {id}")));
        }
        Ok(())
    }

    async fn ranked_offers(&self, query: &BulkRankingQuery) -> Result<Vec<RankedOffer>, DomainError> {
        let (sql, params) = query.to_sql();
        tracing::debug!(metric = %query.metric, best_per_item = query.best_per_item, "ranking offers in SQL");
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&sql)?;
        let score_index = OFFER_COLUMNS.len();
        let ranked = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok(RankedOffer {
                    offer: Self::row_to_offer(row)?,
                    score: row.get(score_index)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ranked)
    }
}
