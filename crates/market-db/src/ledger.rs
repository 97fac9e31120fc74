//! # Inventory Ledger
//!
//! Stock levels per (branch, barcode) and the supplier deliveries that
//! raise them.
//!
//! ## Stock Movements
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Income (open) ──► IncomeProduct lines ──► apply_delivery ──► finished │
//! │                                                │                        │
//! │                                                ▼ upsert, += quantity    │
//! │                                  ┌───────────────────────────┐          │
//! │                                  │ Remainder(branch,barcode) │          │
//! │                                  │   quantity >= 0 (CHECK)   │          │
//! │                                  └───────────────────────────┘          │
//! │                                                ▲ -= quantity            │
//! │                                                │ only WHERE quantity>=n │
//! │  Sale (finalize) ──► SaleProduct lines ──► decrement_for_sale           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function takes the caller's connection; [`crate::reconcile`] runs
//! them inside one transaction.

use chrono::Utc;
use market_core::{
    CoreError, CreateIncomeProduct, Income, IncomeProduct, IncomeStatus, PostedIncome, Remainder,
    ValidationError,
};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::store::{self, Filter, Record};

/// Point lookup on the unique (branch_id, barcode) index.
pub async fn find_stock(
    conn: &mut SqliteConnection,
    branch_id: &str,
    barcode: &str,
) -> DbResult<Option<Remainder>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE branch_id = ? AND barcode = ?",
        Remainder::COLUMNS,
        Remainder::TABLE
    );
    let row = sqlx::query_as::<_, Remainder>(&sql)
        .bind(branch_id)
        .bind(barcode)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Takes `quantity` units out of stock, never below zero.
///
/// A single conditional UPDATE; concurrent sales cannot both pass the check.
///
/// ## Errors
/// - `InsufficientStock` if the row holds fewer than `quantity`
/// - `ProductNotFound` if the branch has no row for the barcode
pub async fn decrement_for_sale(
    conn: &mut SqliteConnection,
    branch_id: &str,
    barcode: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE remainder SET quantity = quantity - ?, updated_at = ? \
         WHERE branch_id = ? AND barcode = ? AND quantity >= ?",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(branch_id)
    .bind(barcode)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        debug!(branch_id = %branch_id, barcode = %barcode, quantity, "Stock decremented");
        return Ok(());
    }

    let err = match find_stock(conn, branch_id, barcode).await? {
        Some(stock) => CoreError::InsufficientStock {
            barcode: barcode.to_string(),
            available: stock.quantity,
            requested: quantity,
        },
        None => CoreError::ProductNotFound {
            branch_id: branch_id.to_string(),
            barcode: barcode.to_string(),
        },
    };
    Err(err.into())
}

/// Adds a delivered line to the branch's stock.
///
/// An existing row keeps its income price and category; a new row takes
/// them from the line.
pub async fn receive(
    conn: &mut SqliteConnection,
    branch_id: &str,
    line: &IncomeProduct,
) -> DbResult<Remainder> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO remainder \
         (id, branch_id, category_id, product_name, barcode, price_income, quantity, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(branch_id, barcode) DO UPDATE SET \
         quantity = quantity + excluded.quantity, updated_at = excluded.updated_at \
         RETURNING {}",
        Remainder::COLUMNS
    );
    let stock = sqlx::query_as::<_, Remainder>(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(branch_id)
        .bind(&line.category_id)
        .bind(&line.product_name)
        .bind(&line.barcode)
        .bind(line.income_price)
        .bind(line.quantity)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    debug!(
        branch_id = %branch_id,
        barcode = %line.barcode,
        added = line.quantity,
        quantity = stock.quantity,
        "Stock received"
    );
    Ok(stock)
}

pub async fn income_lines(conn: &mut SqliteConnection, income_id: &str) -> DbResult<Vec<IncomeProduct>> {
    store::fetch_all::<IncomeProduct>(conn, vec![Filter::eq("income_id", income_id)]).await
}

fn ensure_open(income: &Income, operation: &str) -> Result<(), CoreError> {
    if income.status != IncomeStatus::Open {
        return Err(CoreError::invalid_state(
            "Income",
            &income.id,
            income.status.as_str(),
            operation,
        ));
    }
    Ok(())
}

/// Adds a line to a delivery that has not been posted yet.
pub async fn add_income_line(
    conn: &mut SqliteConnection,
    req: &CreateIncomeProduct,
) -> DbResult<IncomeProduct> {
    store::touch::<Income>(conn, &req.income_id).await?;
    let income = store::fetch::<Income>(conn, &req.income_id).await?;
    ensure_open(&income, "add lines")?;

    store::insert(conn, req).await
}

/// Drops a line from a delivery that has not been posted yet.
///
/// ## Errors
/// - `NotFound` if the line does not exist
/// - `InvalidState` if its income was posted
pub async fn remove_income_line(conn: &mut SqliteConnection, line_id: &str) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE income SET updated_at = ? WHERE id = (SELECT income_id FROM income_product WHERE id = ?)",
    )
    .bind(Utc::now())
    .bind(line_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found(IncomeProduct::ENTITY, line_id));
    }

    let line = store::fetch::<IncomeProduct>(conn, line_id).await?;
    let income = store::fetch::<Income>(conn, &line.income_id).await?;
    ensure_open(&income, "remove lines")?;

    store::delete::<IncomeProduct>(conn, line_id).await
}

/// Deletes a delivery that has not been posted, with its lines.
pub async fn delete_income(conn: &mut SqliteConnection, income_id: &str) -> DbResult<()> {
    store::touch::<Income>(conn, income_id).await?;
    let income = store::fetch::<Income>(conn, income_id).await?;
    ensure_open(&income, "delete")?;

    store::delete::<Income>(conn, income_id).await
}

/// Posts a delivery into stock and marks it finished.
///
/// ## Errors
/// - `NotFound` if the income does not exist
/// - `InvalidState` if it was already posted
/// - `Validation` if it has no lines
pub async fn apply_delivery(conn: &mut SqliteConnection, income_id: &str) -> DbResult<PostedIncome> {
    store::touch::<Income>(conn, income_id).await?;
    let income = store::fetch::<Income>(conn, income_id).await?;
    ensure_open(&income, "post")?;

    let lines = income_lines(conn, income_id).await?;
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "income_product".to_string(),
        }
        .into());
    }

    let mut remainders = Vec::with_capacity(lines.len());
    for line in &lines {
        remainders.push(receive(conn, &income.branch_id, line).await?);
    }

    let result = sqlx::query("UPDATE income SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(IncomeStatus::Finished)
        .bind(Utc::now())
        .bind(income_id)
        .bind(IncomeStatus::Open)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::Rule(CoreError::invalid_state(
            "Income",
            income_id,
            IncomeStatus::Finished.as_str(),
            "post",
        )));
    }

    let income = store::fetch::<Income>(conn, income_id).await?;
    Ok(PostedIncome { income, remainders })
}
