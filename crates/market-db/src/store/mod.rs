//! # Record Store
//!
//! One generic implementation of create / get / list / update / delete for
//! every table. Entities describe themselves through [`Record`]; request
//! payloads describe their columns through [`NewRecord`] and [`Changeset`].
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RecordStore<E>            pool-backed, used by plain CRUD handlers     │
//! │        │ acquire()                                                     │
//! │        ▼                                                                │
//! │  insert / fetch / list     take &mut SqliteConnection, so workflows    │
//! │  update / delete           can call them inside their own transaction  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  QueryBuilder<Sqlite>      table and column names from `Record` consts │
//! │                            values always bound as parameters           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod bind;
pub mod entities;
pub mod filter;

use std::marker::PhantomData;

use chrono::Utc;
use market_core::ListResponse;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

pub use bind::Bind;
pub use filter::{Filter, FilterKind, ListParams};

/// A table-backed entity.
pub trait Record: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static {
    /// Name used in NotFound messages.
    const ENTITY: &'static str;
    const TABLE: &'static str;
    /// Select list, in struct field order.
    const COLUMNS: &'static str;
    /// Columns matched by `search`.
    const SEARCH: &'static [&'static str] = &[];
    /// Columns accepted as equality filters on list endpoints.
    const FILTERS: &'static [(&'static str, FilterKind)] = &[];
    const ORDER_BY: &'static str = "created_at DESC, rowid DESC";
}

/// A create payload: the column values for a new row, excluding id and
/// timestamps.
pub trait NewRecord {
    type Target: Record;

    fn values(&self) -> Vec<(&'static str, Bind)>;
}

/// An update payload: only the columns that change.
pub trait Changeset {
    type Target: Record;

    fn changes(&self) -> Vec<(&'static str, Bind)>;
}

// =============================================================================
// Connection-level operations
// =============================================================================

/// Inserts a row with a fresh UUID and timestamps, returning it.
pub async fn insert<N: NewRecord>(conn: &mut SqliteConnection, new: &N) -> DbResult<N::Target> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let values = new.values();

    let mut qb = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (id", N::Target::TABLE));
    for (column, _) in &values {
        qb.push(", ").push(*column);
    }
    qb.push(", created_at, updated_at) VALUES (");
    qb.push_bind(id.clone());
    for (_, value) in values {
        qb.push(", ");
        value.push_to(&mut qb);
    }
    qb.push(", ").push_bind(now).push(", ").push_bind(now).push(")");

    qb.build().execute(&mut *conn).await?;

    debug!(entity = N::Target::ENTITY, id = %id, "Inserted");
    fetch::<N::Target>(conn, &id).await
}

/// Loads a row by id, if present.
pub async fn find<E: Record>(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<E>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?", E::COLUMNS, E::TABLE);
    let row = sqlx::query_as::<_, E>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Loads a row by id, failing with NotFound.
pub async fn fetch<E: Record>(conn: &mut SqliteConnection, id: &str) -> DbResult<E> {
    find::<E>(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found(E::ENTITY, id))
}

/// Loads every row matching `filters`, in the entity's default order.
pub async fn fetch_all<E: Record>(conn: &mut SqliteConnection, filters: Vec<Filter>) -> DbResult<Vec<E>> {
    let params = ListParams {
        filters,
        ..ListParams::default()
    };
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM {}", E::COLUMNS, E::TABLE));
    params.push_where::<E>(&mut qb);
    qb.push(" ORDER BY ").push(E::ORDER_BY);

    let rows = qb.build_query_as::<E>().fetch_all(&mut *conn).await?;
    Ok(rows)
}

/// One page of rows plus the total count matching the same predicates.
pub async fn list<E: Record>(conn: &mut SqliteConnection, params: &ListParams) -> DbResult<ListResponse<E>> {
    params.validate::<E>()?;

    let mut count_qb = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", E::TABLE));
    params.push_where::<E>(&mut count_qb);
    let count: i64 = count_qb.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM {}", E::COLUMNS, E::TABLE));
    params.push_where::<E>(&mut qb);
    qb.push(" ORDER BY ").push(E::ORDER_BY);
    qb.push(" LIMIT ").push_bind(params.limit);
    qb.push(" OFFSET ").push_bind(params.offset);

    let items = qb.build_query_as::<E>().fetch_all(&mut *conn).await?;

    debug!(entity = E::ENTITY, count, returned = items.len(), "Listed");
    Ok(ListResponse { count, items })
}

/// Applies a changeset. Zero rows affected is NotFound.
pub async fn update<C: Changeset>(conn: &mut SqliteConnection, id: &str, changes: &C) -> DbResult<C::Target> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET updated_at = ", C::Target::TABLE));
    qb.push_bind(Utc::now());
    for (column, value) in changes.changes() {
        qb.push(", ").push(column).push(" = ");
        value.push_to(&mut qb);
    }
    qb.push(" WHERE id = ").push_bind(id.to_string());

    let result = qb.build().execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found(C::Target::ENTITY, id));
    }

    debug!(entity = C::Target::ENTITY, id = %id, "Updated");
    fetch::<C::Target>(conn, id).await
}

/// Bumps `updated_at` on a row, failing with NotFound.
///
/// Workflows call this first: the write takes SQLite's write lock up front,
/// so the reads that follow see the latest committed state and concurrent
/// workflows on the same database queue behind this one.
pub async fn touch<E: Record>(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let sql = format!("UPDATE {} SET updated_at = ? WHERE id = ?", E::TABLE);
    let result = sqlx::query(&sql)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found(E::ENTITY, id));
    }
    Ok(())
}

/// Deletes a row. Zero rows affected is NotFound.
pub async fn delete<E: Record>(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = ?", E::TABLE);
    let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found(E::ENTITY, id));
    }

    debug!(entity = E::ENTITY, id = %id, "Deleted");
    Ok(())
}

// =============================================================================
// Pool-backed store
// =============================================================================

/// Record store for one entity type.
///
/// ## Usage
/// ```rust,ignore
/// let branch = db.store::<Branch>().create(&CreateBranch { .. }).await?;
/// let page = db.store::<Branch>().get_list(&ListParams::default()).await?;
/// ```
#[derive(Debug)]
pub struct RecordStore<E> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for RecordStore<E> {
    fn clone(&self) -> Self {
        RecordStore {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Record> RecordStore<E> {
    pub fn new(pool: SqlitePool) -> Self {
        RecordStore {
            pool,
            _entity: PhantomData,
        }
    }

    pub async fn create<N>(&self, new: &N) -> DbResult<E>
    where
        N: NewRecord<Target = E>,
    {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, new).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<E> {
        let mut conn = self.pool.acquire().await?;
        fetch::<E>(&mut conn, id).await
    }

    pub async fn get_list(&self, params: &ListParams) -> DbResult<ListResponse<E>> {
        let mut conn = self.pool.acquire().await?;
        list::<E>(&mut conn, params).await
    }

    pub async fn update<C>(&self, id: &str, changes: &C) -> DbResult<E>
    where
        C: Changeset<Target = E>,
    {
        let mut conn = self.pool.acquire().await?;
        update(&mut conn, id, changes).await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        delete::<E>(&mut conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use market_core::{Branch, CreateBranch, CreateSupplier, Supplier, UpdateBranch};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn branch(code: &str, name: &str) -> CreateBranch {
        CreateBranch {
            branch_code: code.to_string(),
            name: name.to_string(),
            address: "Chilonzor 9".to_string(),
            phone: "+998901234567".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = db().await;
        let store = db.store::<Branch>();

        let created = store.create(&branch("B1", "Chilonzor")).await.unwrap();
        let loaded = store.get_by_id(&created.id).await.unwrap();

        assert_eq!(loaded.branch_code, "B1");
        assert_eq!(loaded.name, "Chilonzor");
    }

    #[tokio::test]
    async fn test_duplicate_is_unique_violation() {
        let db = db().await;
        let store = db.store::<Branch>();

        store.create(&branch("B1", "One")).await.unwrap();
        let err = store.create(&branch("B1", "Two")).await.unwrap_err();

        assert!(err.is_unique_on("branch.branch_code"), "got {err:?}");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let db = db().await;
        let err = db.store::<Branch>().get_by_id("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity, .. } if entity == "Branch"));
    }

    #[tokio::test]
    async fn test_update_applies_only_given_fields() {
        let db = db().await;
        let store = db.store::<Branch>();
        let created = store.create(&branch("B1", "Old")).await.unwrap();

        let updated = store
            .update(
                &created.id,
                &UpdateBranch {
                    name: Some("New".to_string()),
                    ..UpdateBranch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "New");
        assert_eq!(updated.address, "Chilonzor 9");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_are_not_found() {
        let db = db().await;
        let store = db.store::<Branch>();

        let err = store
            .update("missing", &UpdateBranch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = store.delete("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_paginates_searches_and_sorts_by_name() {
        let db = db().await;
        let store = db.store::<Branch>();
        for (code, name) in [("B1", "Yunusobod"), ("B2", "Chilonzor"), ("B3", "Sergeli")] {
            store.create(&branch(code, name)).await.unwrap();
        }

        let page = store
            .get_list(&ListParams::default().page(2, 0))
            .await
            .unwrap();
        assert_eq!(page.count, 3);
        let names: Vec<_> = page.items.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Chilonzor", "Sergeli"]);

        let found = store
            .get_list(&ListParams::default().search("yunus"))
            .await
            .unwrap();
        assert_eq!(found.count, 1);
        assert_eq!(found.items[0].branch_code, "B1");
    }

    #[tokio::test]
    async fn test_list_bool_filter() {
        let db = db().await;
        let store = db.store::<Supplier>();
        for (name, is_active) in [("Coca-Cola Ichimligi", true), ("Old Supplier", false)] {
            store
                .create(&CreateSupplier {
                    name: name.to_string(),
                    phone_number: String::new(),
                    is_active,
                })
                .await
                .unwrap();
        }

        let active = store
            .get_list(&ListParams::default().filter(Filter::eq("is_active", true)))
            .await
            .unwrap();
        assert_eq!(active.count, 1);
        assert_eq!(active.items[0].name, "Coca-Cola Ichimligi");
    }

    #[tokio::test]
    async fn test_list_rejects_bad_page() {
        let db = db().await;
        let err = db
            .store::<Branch>()
            .get_list(&ListParams::default().page(0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(_)));
    }
}
