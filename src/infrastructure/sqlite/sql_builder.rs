//! Parameterized SELECT builder for SQLite.
//!
//! Values are always bound through `?` placeholders, never interpolated.
//! Builder methods return `&mut Self` for chaining.
//!
//! # Example
//!
//! ```
//! use pricewise::infrastructure::sqlite::sql_builder::{SqlBuilder, SqlParam};
//! let (sql, params) = SqlBuilder::new("offers o")
//!     .where_eq("o.item_id", "item-1")
//!     .where_gte("o.total_price", 2.5)
//!     .order_by(&["o.observed_at DESC"])
//!     .limit(10)
//!     .build();
//! assert!(sql.starts_with("SELECT *\nFROM offers o"));
//! assert_eq!(params.len(), 2);
//! ```

use rusqlite::types::{ToSql, ToSqlOutput, Value};

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Real(f64),
    Integer(i64),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::Text(s) => ToSqlOutput::Owned(Value::Text(s.clone())),
            SqlParam::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlParam::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
        })
    }
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        SqlParam::Text(s.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        SqlParam::Text(s)
    }
}

impl From<f64> for SqlParam {
    fn from(f: f64) -> Self {
        SqlParam::Real(f)
    }
}

impl From<i64> for SqlParam {
    fn from(i: i64) -> Self {
        SqlParam::Integer(i)
    }
}

impl From<u8> for SqlParam {
    fn from(i: u8) -> Self {
        SqlParam::Integer(i64::from(i))
    }
}

pub struct SqlBuilder {
    ctes: Vec<(String, String)>,
    cte_params: Vec<SqlParam>,
    select_cols: Vec<String>,
    from_table: String,
    joins: Vec<String>,
    where_clauses: Vec<String>,
    params: Vec<SqlParam>,
    order_by_cols: Vec<String>,
    limit_val: Option<usize>,
    offset_val: Option<usize>,
}

impl SqlBuilder {
    /// Create a builder selecting from a table, alias or CTE name.
    pub fn new(table: &str) -> Self {
        Self {
            ctes: Vec::new(),
            cte_params: Vec::new(),
            select_cols: vec!["*".to_string()],
            from_table: table.to_string(),
            joins: Vec::new(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_by_cols: Vec::new(),
            limit_val: None,
            offset_val: None,
        }
    }

    /// Prepend `WITH {name} AS ({query})`. The sub-query's parameters bind
    /// before this builder's own.
    pub fn with(&mut self, name: &str, query: (String, Vec<SqlParam>)) -> &mut Self {
        let (sql, params) = query;
        self.ctes.push((name.to_string(), sql));
        self.cte_params.extend(params);
        self
    }

    /// Replace the default `*` column list.
    pub fn select(&mut self, cols: &[&str]) -> &mut Self {
        self.select_cols = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add a full JOIN expression, e.g. `"JOIN items i ON i.id = o.item_id"`.
    pub fn join(&mut self, clause: &str) -> &mut Self {
        self.joins.push(clause.to_string());
        self
    }

    /// Add a WHERE condition using one `?` per parameter, in order.
    pub fn where_clause(&mut self, condition: &str, params: Vec<SqlParam>) -> &mut Self {
        self.where_clauses.push(condition.to_string());
        self.params.extend(params);
        self
    }

    pub fn where_eq(&mut self, column: &str, value: impl Into<SqlParam>) -> &mut Self {
        self.where_clause(&format!("{column} = ?"), vec![value.into()])
    }

    pub fn where_gte(&mut self, column: &str, value: impl Into<SqlParam>) -> &mut Self {
        self.where_clause(&format!("{column} >= ?"), vec![value.into()])
    }

    pub fn where_lte(&mut self, column: &str, value: impl Into<SqlParam>) -> &mut Self {
        self.where_clause(&format!("{column} <= ?"), vec![value.into()])
    }

    /// `{column} IN (?, ...)`. An empty list matches nothing.
    pub fn where_in(&mut self, column: &str, values: Vec<SqlParam>) -> &mut Self {
        if values.is_empty() {
            self.where_clauses.push("0".to_string());
            return self;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.where_clause(&format!("{column} IN ({placeholders})"), values)
    }

    pub fn where_null(&mut self, column: &str) -> &mut Self {
        self.where_clauses.push(format!("{column} IS NULL"));
        self
    }

    pub fn where_not_null(&mut self, column: &str) -> &mut Self {
        self.where_clauses.push(format!("{column} IS NOT NULL"));
        self
    }

    /// Add ORDER BY terms (e.g. `"score ASC"`).
    pub fn order_by(&mut self, clauses: &[&str]) -> &mut Self {
        self.order_by_cols.extend(clauses.iter().map(|c| c.to_string()));
        self
    }

    pub fn limit(&mut self, n: usize) -> &mut Self {
        self.limit_val = Some(n);
        self
    }

    pub fn offset(&mut self, n: usize) -> &mut Self {
        self.offset_val = Some(n);
        self
    }

    /// The SQL text and its parameters in binding order.
    pub fn build(&self) -> (String, Vec<SqlParam>) {
        let mut parts = Vec::new();
        if !self.ctes.is_empty() {
            let ctes: Vec<String> = self
                .ctes
                .iter()
                .map(|(name, sql)| format!("{name} AS (\n{sql}\n)"))
                .collect();
            parts.push(format!("WITH {}", ctes.join(",\n")));
        }

        parts.push(format!("SELECT {}", self.select_cols.join(", ")));
        parts.push(format!("FROM {}", self.from_table));
        parts.extend(self.joins.iter().cloned());

        if !self.where_clauses.is_empty() {
            parts.push(format!("WHERE {}", self.where_clauses.join(" AND ")));
        }
        if !self.order_by_cols.is_empty() {
            parts.push(format!("ORDER BY {}", self.order_by_cols.join(", ")));
        }
        // SQLite only accepts OFFSET after a LIMIT.
        match (self.limit_val, self.offset_val) {
            (Some(n), Some(o)) => parts.push(format!("LIMIT {n} OFFSET {o}")),
            (Some(n), None) => parts.push(format!("LIMIT {n}")),
            (None, Some(o)) => parts.push(format!("LIMIT -1 OFFSET {o}")),
            (None, None) => {}
        }

        let mut params = self.cte_params.clone();
        params.extend(self.params.iter().cloned());
        (parts.join("\n"), params)
    }
}
