//! # List Filters
//!
//! Structured predicates for list queries. Column names come only from the
//! entity's whitelist; values are always bound, never spliced into SQL.
//!
//! ```text
//! GET /v1/sale_products?sale_id=…&search=cola&limit=20
//!        │
//!        ▼
//! ListParams { limit: 20, offset: 0, search: Some("cola"),
//!              filters: [Eq("sale_id", Text(…))] }
//!        │
//!        ▼
//! SELECT … FROM sale_product
//!  WHERE 1 = 1
//!    AND (product_name LIKE ? ESCAPE '\' OR barcode LIKE ? ESCAPE '\')
//!    AND sale_id = ?
//!  ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?
//! ```

use market_core::validation::{validate_page, validate_search_query};
use market_core::{ValidationError, DEFAULT_LIST_LIMIT};
use sqlx::{QueryBuilder, Sqlite};

use super::bind::Bind;
use super::Record;
use crate::error::DbResult;

/// Storage type of a filterable column, used to parse query-string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Text,
    Bool,
}

/// One predicate on a whitelisted column.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, Bind),
    NotEq(&'static str, Bind),
    In(&'static str, Vec<Bind>),
    IsNull(&'static str),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<Bind>) -> Self {
        Filter::Eq(column, value.into())
    }

    fn column(&self) -> &'static str {
        match self {
            Filter::Eq(c, _) | Filter::NotEq(c, _) | Filter::In(c, _) | Filter::IsNull(c) => *c,
        }
    }

    /// Builds an equality filter from a query-string pair, if `key` is one
    /// of the entity's filter columns.
    pub fn from_query<E: Record>(key: &str, value: &str) -> Option<Result<Filter, ValidationError>> {
        let (column, kind) = E::FILTERS.iter().find(|(c, _)| *c == key)?;
        let parsed = match kind {
            FilterKind::Text => Ok(Bind::Text(value.to_string())),
            FilterKind::Bool => match value {
                "true" | "1" => Ok(Bind::Bool(true)),
                "false" | "0" => Ok(Bind::Bool(false)),
                _ => Err(ValidationError::InvalidFormat {
                    field: key.to_string(),
                    reason: "must be true or false".to_string(),
                }),
            },
        };
        Some(parsed.map(|bind| Filter::Eq(*column, bind)))
    }

    fn push_to(self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Filter::Eq(column, value) => {
                qb.push(" AND ").push(column).push(" = ");
                value.push_to(qb);
            }
            Filter::NotEq(column, value) => {
                qb.push(" AND ").push(column).push(" <> ");
                value.push_to(qb);
            }
            Filter::In(_, values) if values.is_empty() => {
                // Nothing can match an empty set.
                qb.push(" AND 0");
            }
            Filter::In(column, values) => {
                qb.push(" AND ").push(column).push(" IN (");
                for (i, value) in values.into_iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    value.push_to(qb);
                }
                qb.push(")");
            }
            Filter::IsNull(column) => {
                qb.push(" AND ").push(column).push(" IS NULL");
            }
        }
    }
}

/// Pagination, search and filters for a list query.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub limit: i64,
    pub offset: i64,
    pub search: Option<String>,
    pub filters: Vec<Filter>,
}

impl Default for ListParams {
    fn default() -> Self {
        ListParams {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
            search: None,
            filters: Vec::new(),
        }
    }
}

impl ListParams {
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Checks pagination, search length and that every filter column is
    /// whitelisted for `E`.
    pub(crate) fn validate<E: Record>(&self) -> DbResult<()> {
        validate_page(self.limit, self.offset)?;
        if let Some(term) = &self.search {
            validate_search_query(term)?;
        }
        for filter in &self.filters {
            let column = filter.column();
            if !E::FILTERS.iter().any(|(c, _)| *c == column) {
                return Err(ValidationError::NotAllowed {
                    field: "filter".to_string(),
                    allowed: E::FILTERS.iter().map(|(c, _)| c.to_string()).collect(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Appends ` WHERE …` for search and filters.
    pub(crate) fn push_where<E: Record>(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");

        let term = self.search.as_deref().map(str::trim).unwrap_or_default();
        if !term.is_empty() && !E::SEARCH.is_empty() {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(" AND (");
            for (i, column) in E::SEARCH.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(*column).push(" LIKE ");
                qb.push_bind(pattern.clone());
                qb.push(" ESCAPE '\\'");
            }
            qb.push(")");
        }

        for filter in self.filters.iter().cloned() {
            filter.push_to(qb);
        }
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
