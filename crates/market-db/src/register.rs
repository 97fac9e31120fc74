//! # Shift Register
//!
//! Shift lifecycle and the per-shift cash register (`transactions` row).
//!
//! ```text
//!   create_shift ──► new ──open──► open ──close──► closed
//!                               │
//!                               └─► Transaction { all tenders 0 }
//!                                        ▲
//!                      finalize_sale ────┘ credit(+= payment tenders)
//! ```
//!
//! A partial unique index (`shift(branch_id) WHERE status <> 'closed'`)
//! backs the one-live-shift-per-branch rule.

use chrono::Utc;
use market_core::{
    Branch, CoreError, CreateShift, SalePoint, Shift, ShiftMethod, ShiftStatus, Tenders,
    Transaction, ValidationError,
};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::store::{self, Bind, NewRecord, Record};

/// Most recently created shift of a branch, whatever its status.
pub async fn latest_shift(conn: &mut SqliteConnection, branch_id: &str) -> DbResult<Option<Shift>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE branch_id = ? ORDER BY created_at DESC, rowid DESC LIMIT 1",
        Shift::COLUMNS,
        Shift::TABLE
    );
    let row = sqlx::query_as::<_, Shift>(&sql)
        .bind(branch_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// The branch's shift that is `new` or `open`, if any.
pub async fn live_shift(conn: &mut SqliteConnection, branch_id: &str) -> DbResult<Option<Shift>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE branch_id = ? AND status <> ?",
        Shift::COLUMNS,
        Shift::TABLE
    );
    let row = sqlx::query_as::<_, Shift>(&sql)
        .bind(branch_id)
        .bind(ShiftStatus::Closed)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Fails with `Mismatch` when the till belongs to another branch.
///
/// A missing till is left to the foreign key on insert.
pub async fn ensure_sale_point_in_branch(
    conn: &mut SqliteConnection,
    sale_point_id: &str,
    branch_id: &str,
) -> DbResult<()> {
    match store::find::<SalePoint>(conn, sale_point_id).await? {
        Some(point) if point.branch_id != branch_id => Err(ValidationError::Mismatch {
            field: "sale_point_id".to_string(),
            reason: format!("sale point {sale_point_id} belongs to another branch"),
        }
        .into()),
        _ => Ok(()),
    }
}

/// Starts a shift in status `new`.
///
/// ## Errors
/// - `NotFound` if the branch does not exist
/// - `Validation` if the sale point belongs to another branch
/// - `ShiftAlreadyOpen` if the branch has a shift that is not closed
pub async fn create_shift(conn: &mut SqliteConnection, req: &CreateShift) -> DbResult<Shift> {
    store::touch::<Branch>(conn, &req.branch_id).await?;
    ensure_sale_point_in_branch(conn, &req.sale_point_id, &req.branch_id).await?;

    if let Some(existing) = live_shift(conn, &req.branch_id).await? {
        debug!(branch_id = %req.branch_id, shift_id = %existing.id, "Branch already has a live shift");
        return Err(already_open(&req.branch_id));
    }

    store::insert(conn, req).await.map_err(|e| {
        if e.is_unique_on("shift.branch_id") {
            already_open(&req.branch_id)
        } else {
            e
        }
    })
}

fn already_open(branch_id: &str) -> DbError {
    DbError::Rule(CoreError::ShiftAlreadyOpen {
        branch_id: branch_id.to_string(),
    })
}

/// Moves a shift along its lifecycle.
///
/// Opening also creates the shift's zeroed register.
///
/// ## Errors
/// - `NotFound` if the shift does not exist
/// - `InvalidState` if the shift is not in the status `method` starts from
pub async fn set_method(conn: &mut SqliteConnection, shift_id: &str, method: ShiftMethod) -> DbResult<Shift> {
    store::touch::<Shift>(conn, shift_id).await?;
    let shift = store::fetch::<Shift>(conn, shift_id).await?;

    let (expected, next) = ShiftStatus::transition(method);
    if shift.status != expected {
        return Err(CoreError::invalid_state("Shift", shift_id, shift.status.as_str(), method.as_str()).into());
    }

    let now = Utc::now();
    let stamp_column = match method {
        ShiftMethod::Open => {
            open_register(conn, shift_id).await?;
            "open_shift"
        }
        ShiftMethod::Close => "close_shift",
    };

    let sql = format!(
        "UPDATE shift SET status = ?, {stamp_column} = ?, updated_at = ? WHERE id = ? AND status = ?"
    );
    let result = sqlx::query(&sql)
        .bind(next)
        .bind(now)
        .bind(now)
        .bind(shift_id)
        .bind(expected)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CoreError::invalid_state("Shift", shift_id, "changed", method.as_str()).into());
    }

    store::fetch::<Shift>(conn, shift_id).await
}

/// The register row of a shift, present once the shift has been opened.
pub async fn register_for_shift(conn: &mut SqliteConnection, shift_id: &str) -> DbResult<Option<Transaction>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE shift_id = ?",
        Transaction::COLUMNS,
        Transaction::TABLE
    );
    let row = sqlx::query_as::<_, Transaction>(&sql)
        .bind(shift_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

struct NewRegister<'a> {
    shift_id: &'a str,
}

impl NewRecord for NewRegister<'_> {
    type Target = Transaction;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        let mut values = vec![("shift_id", Bind::from(self.shift_id))];
        values.extend(
            Tenders::default()
                .entries()
                .into_iter()
                .map(|(column, amount)| (column, Bind::Int(amount))),
        );
        values.push(("total_amount", Bind::Int(0)));
        values
    }
}

/// Creates the zeroed register for a shift.
pub async fn open_register(conn: &mut SqliteConnection, shift_id: &str) -> DbResult<Transaction> {
    store::insert(conn, &NewRegister { shift_id }).await
}

/// Adds a payment's tenders to the shift's register.
///
/// Additive in SQL, so the register never loses a concurrent credit.
///
/// ## Errors
/// - `NoOpenRegister` if the shift has no register
pub async fn credit(conn: &mut SqliteConnection, shift_id: &str, tenders: &Tenders) -> DbResult<Transaction> {
    let sql = format!(
        "UPDATE transactions SET \
         cash = cash + ?, uzcard = uzcard + ?, payme = payme + ?, \
         click = click + ?, humo = humo + ?, apelsin = apelsin + ?, \
         total_amount = total_amount + ?, updated_at = ? \
         WHERE shift_id = ? RETURNING {}",
        Transaction::COLUMNS
    );
    let mut query = sqlx::query_as::<_, Transaction>(&sql);
    for (_, amount) in tenders.entries() {
        query = query.bind(amount);
    }
    let register = query
        .bind(tenders.total().minor())
        .bind(Utc::now())
        .bind(shift_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::NoOpenRegister {
            shift_id: shift_id.to_string(),
        })?;

    debug!(shift_id = %shift_id, total = register.total_amount, "Register credited");
    Ok(register)
}
