//! Set-oriented offer ranking in SQL.
//!
//! Each [`RankingMetric`] compiles to a score expression equal to its
//! strategy at default options: shipping and tax included unless already
//! part of the price, no currency rate, equivalence factor dividing the price
//! per canonical unit. Offers whose amount could not be converted carry no
//! canonical amount; the per-canonical metrics leave them out, while the
//! display-unit metrics rank them like their strategies do.

use crate::application::strategies::quality_adjusted::DEFAULT_QUALITY_FACTOR;
use crate::domain::entities::comparison_config::SortDirection;
use crate::domain::ports::offer_repository::BulkRankingQuery;
use crate::domain::values::ranking_metric::RankingMetric;
use crate::infrastructure::sqlite::offer_repo::{apply_filter, qualified_columns, OFFER_COLUMNS};
use crate::infrastructure::sqlite::sql_builder::{SqlBuilder, SqlParam};

/// Base price plus shipping and tax, each only when not already included.
const TOTAL_COST: &str = "(o.total_price \
     + CASE WHEN o.shipping_included = 0 THEN COALESCE(o.shipping_cost, 0) ELSE 0 END \
     + CASE WHEN o.is_tax_included = 0 THEN o.total_price * COALESCE(o.tax_rate, 0) ELSE 0 END)";

/// SQL expression scoring one offer row (`o`) joined to its item (`i`).
pub fn score_expression(metric: RankingMetric) -> String {
    let per_canonical = format!("({TOTAL_COST} / o.canonical_amount / i.equivalence_factor)");
    match metric {
        RankingMetric::PricePerCanonical => per_canonical,
        RankingMetric::TotalPrice => TOTAL_COST.to_string(),
        RankingMetric::PricePerUnit => format!("({TOTAL_COST} / o.amount)"),
        RankingMetric::QualityAdjusted => format!(
            "({per_canonical} * CASE WHEN o.quality_rating IS NULL THEN 1.0 \
             ELSE 1.0 - (1.0 - o.quality_rating / 5.0) * {DEFAULT_QUALITY_FACTOR:?} END)"
        ),
    }
}

/// Qualified offer columns followed by `extra`.
fn columns_with(extra: &[String]) -> Vec<String> {
    let mut columns = qualified_columns("o");
    columns.extend(extra.iter().cloned());
    columns
}

fn as_strs(columns: &[String]) -> Vec<&str> {
    columns.iter().map(String::as_str).collect()
}

fn direction_sql(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

impl BulkRankingQuery {
    /// The query this request describes.
    pub fn to_sql(&self) -> (String, Vec<SqlParam>) {
        if self.best_per_item {
            self.best_per_item_sql()
        } else {
            self.ranked_sql()
        }
    }

    /// Every matching offer, ordered by score then newest first.
    pub fn ranked_sql(&self) -> (String, Vec<SqlParam>) {
        let score = score_expression(self.metric);
        let dir = direction_sql(self.direction);
        let by_score = format!("score {dir}");
        let mut builder = self.scored_offers(&score);
        builder.order_by(&[by_score.as_str(), "o.observed_at DESC", "o.id ASC"]);
        self.apply_page(&mut builder);
        builder.build()
    }

    /// The single best offer of each item.
    pub fn best_per_item_sql(&self) -> (String, Vec<SqlParam>) {
        let score = score_expression(self.metric);
        let dir = direction_sql(self.direction);
        let mut inner = self.scored_offers(&score);
        let inner_columns = columns_with(&[
            format!("{score} AS score"),
            format!(
                "ROW_NUMBER() OVER (PARTITION BY o.item_id ORDER BY {score} {dir}, o.observed_at DESC, o.id ASC) AS rn"
            ),
        ]);
        inner.select(&as_strs(&inner_columns));

        let by_score = format!("score {dir}");
        let mut outer_columns: Vec<&str> = OFFER_COLUMNS.to_vec();
        outer_columns.push("score");
        let mut builder = SqlBuilder::new("ranked");
        builder
            .with("ranked", inner.build())
            .select(&outer_columns)
            .where_eq("rn", 1_i64)
            .order_by(&[by_score.as_str(), "item_id ASC"]);
        self.apply_page(&mut builder);
        builder.build()
    }

    fn scored_offers(&self, score: &str) -> SqlBuilder {
        let columns = columns_with(&[format!("{score} AS score")]);
        let mut builder = SqlBuilder::new("offers o");
        builder
            .select(&as_strs(&columns))
            .join("JOIN items i ON i.id = o.item_id");
        if self.metric.needs_canonical_amount() {
            builder
                .where_not_null("o.canonical_amount")
                .where_clause("o.canonical_amount > 0", Vec::new());
        }
        if !self.include_deleted {
            builder.where_null("o.deleted_at").where_null("i.deleted_at");
        }
        apply_filter(&mut builder, &self.filter, "o");
        builder
    }

    fn apply_page(&self, builder: &mut SqlBuilder) {
        if let Some(limit) = self.page.limit {
            builder.limit(limit);
        }
        if let Some(offset) = self.page.offset {
            builder.offset(offset);
        }
    }
}
