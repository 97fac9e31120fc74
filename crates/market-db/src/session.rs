//! # Sale Session
//!
//! Cart building and checkout for one sale.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. CREATE      create_sale()    bound to the branch's open shift      │
//! │                                                                         │
//! │  2. BUILD CART  scan_barcode()   one line per barcode, +1 per scan     │
//! │                 set_line_discount() / remove_line()                    │
//! │                                                                         │
//! │  3. PAY         add_payment()    tenders recorded, sale still `new`    │
//! │                                                                         │
//! │  4. FINALIZE    finalize_sale()                                        │
//! │                 ├── earliest payment ──► shift register (credit)       │
//! │                 ├── every line ────────► stock (conditional decrement) │
//! │                 └── status new ────────► finished                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write path starts by updating the sale row, which takes SQLite's
//! write lock before anything is read.

use chrono::Utc;
use market_core::cart::{line_total, plan_scan, ScanPlan};
use market_core::validation::validate_discount;
use market_core::{
    Branch, CoreError, CreatePayment, CreateSale, FinalizedSale, Money, Payment, Remainder, Sale,
    SaleProduct, SaleStatus, ScanAction, ScanOutcome, ShiftStatus, UpdateSaleProduct,
    ValidationError,
};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::ledger;
use crate::register;
use crate::store::{self, Bind, Filter, NewRecord, Record};

// =============================================================================
// Guards
// =============================================================================

fn ensure_new(sale: &Sale, operation: &str) -> Result<(), CoreError> {
    if sale.status != SaleStatus::New {
        return Err(CoreError::invalid_state("Sale", &sale.id, sale.status.as_str(), operation));
    }
    Ok(())
}

fn ensure_branch(sale: &Sale, branch_id: &str) -> Result<(), CoreError> {
    if sale.branch_id != branch_id {
        return Err(ValidationError::Mismatch {
            field: "branch_id".to_string(),
            reason: format!("sale {} belongs to another branch", sale.id),
        }
        .into());
    }
    Ok(())
}

/// Locks and loads a sale that can still change.
async fn lock_open_sale(conn: &mut SqliteConnection, sale_id: &str, operation: &str) -> DbResult<Sale> {
    store::touch::<Sale>(conn, sale_id).await?;
    let sale = store::fetch::<Sale>(conn, sale_id).await?;
    ensure_new(&sale, operation)?;
    Ok(sale)
}

/// Locks the sale that owns a child row of `child_table`, failing with
/// NotFound for `child_entity` when the child does not exist.
async fn lock_parent_sale(
    conn: &mut SqliteConnection,
    child_table: &str,
    child_entity: &str,
    child_id: &str,
) -> DbResult<()> {
    let sql = format!("UPDATE sale SET updated_at = ? WHERE id = (SELECT sale_id FROM {child_table} WHERE id = ?)");
    let result = sqlx::query(&sql)
        .bind(Utc::now())
        .bind(child_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found(child_entity, child_id));
    }
    Ok(())
}

/// Locks the sale owning a cart line, then loads both.
async fn lock_line(conn: &mut SqliteConnection, line_id: &str, operation: &str) -> DbResult<(Sale, SaleProduct)> {
    lock_parent_sale(conn, SaleProduct::TABLE, SaleProduct::ENTITY, line_id).await?;

    let line = store::fetch::<SaleProduct>(conn, line_id).await?;
    let sale = store::fetch::<Sale>(conn, &line.sale_id).await?;
    ensure_new(&sale, operation)?;
    Ok((sale, line))
}

// =============================================================================
// Sale
// =============================================================================

struct NewSale<'a> {
    req: &'a CreateSale,
    shift_id: &'a str,
}

impl NewRecord for NewSale<'_> {
    type Target = Sale;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("branch_id", self.req.branch_id.as_str().into()),
            ("sale_point_id", self.req.sale_point_id.as_str().into()),
            ("shift_id", self.shift_id.into()),
            ("employee_id", self.req.employee_id.as_str().into()),
            ("barcode", self.req.barcode.clone().into()),
            ("status", SaleStatus::New.as_str().into()),
        ]
    }
}

/// Opens a cart on the branch's current shift.
///
/// ## Errors
/// - `NotFound` if the branch does not exist
/// - `Validation` if the sale point belongs to another branch
/// - `NoOpenShift` if the branch's latest shift is not open, or the request
///   names a different shift
pub async fn create_sale(conn: &mut SqliteConnection, req: &CreateSale) -> DbResult<Sale> {
    store::touch::<Branch>(conn, &req.branch_id).await?;
    register::ensure_sale_point_in_branch(conn, &req.sale_point_id, &req.branch_id).await?;

    let no_open_shift = || {
        DbError::Rule(CoreError::NoOpenShift {
            branch_id: req.branch_id.clone(),
        })
    };

    let shift = register::latest_shift(conn, &req.branch_id)
        .await?
        .filter(|shift| shift.status == ShiftStatus::Open)
        .ok_or_else(no_open_shift)?;

    if let Some(requested) = &req.shift_id {
        if *requested != shift.id {
            debug!(requested = %requested, open = %shift.id, "Sale names a shift that is not the open one");
            return Err(no_open_shift());
        }
    }

    store::insert(
        conn,
        &NewSale {
            req,
            shift_id: &shift.id,
        },
    )
    .await
}

/// Deletes a cart that was never finalized, with its lines and payments.
///
/// ## Errors
/// - `NotFound` if the sale does not exist
/// - `InvalidState` if it is finished
pub async fn delete_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<()> {
    lock_open_sale(conn, sale_id, "delete").await?;
    store::delete::<Sale>(conn, sale_id).await
}

// =============================================================================
// Cart
// =============================================================================

struct NewLine<'a> {
    sale_id: &'a str,
    stock: &'a Remainder,
    remaining_quantity: i64,
    price: Money,
    total_amount: Money,
}

impl NewRecord for NewLine<'_> {
    type Target = SaleProduct;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("sale_id", self.sale_id.into()),
            ("category_id", self.stock.category_id.clone().into()),
            ("product_name", self.stock.product_name.as_str().into()),
            ("barcode", self.stock.barcode.as_str().into()),
            ("remaining_quantity", self.remaining_quantity.into()),
            ("quantity", Bind::Int(1)),
            ("allow_discount", false.into()),
            ("discount_type", Bind::Null),
            ("discount", Bind::Int(0)),
            ("price", self.price.minor().into()),
            ("total_amount", self.total_amount.minor().into()),
        ]
    }
}

/// The cart line for `barcode`, if the sale has one.
pub async fn find_line(
    conn: &mut SqliteConnection,
    sale_id: &str,
    barcode: &str,
) -> DbResult<Option<SaleProduct>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE sale_id = ? AND barcode = ?",
        SaleProduct::COLUMNS,
        SaleProduct::TABLE
    );
    let row = sqlx::query_as::<_, SaleProduct>(&sql)
        .bind(sale_id)
        .bind(barcode)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn lines(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleProduct>> {
    store::fetch_all::<SaleProduct>(conn, vec![Filter::eq("sale_id", sale_id)]).await
}

/// Adds one unit of `barcode` to the cart.
///
/// ## Errors
/// - `NotFound` / `InvalidState` if the sale is missing or finished
/// - `Validation` if the sale belongs to another branch
/// - `ProductNotFound` if the branch does not stock the barcode
/// - `LimitExceeded` if the cart would hold more than the branch has
pub async fn scan_barcode(
    conn: &mut SqliteConnection,
    sale_id: &str,
    branch_id: &str,
    barcode: &str,
) -> DbResult<ScanOutcome> {
    let sale = lock_open_sale(conn, sale_id, "scan").await?;
    ensure_branch(&sale, branch_id)?;

    let stock = ledger::find_stock(conn, branch_id, barcode)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound {
            branch_id: branch_id.to_string(),
            barcode: barcode.to_string(),
        })?;
    let existing = find_line(conn, sale_id, barcode).await?;

    match plan_scan(&stock, existing.as_ref())? {
        ScanPlan::Create {
            remaining_quantity,
            price,
            total_amount,
        } => {
            let line = store::insert(
                conn,
                &NewLine {
                    sale_id,
                    stock: &stock,
                    remaining_quantity,
                    price,
                    total_amount,
                },
            )
            .await?;
            debug!(sale_id = %sale_id, barcode = %barcode, "Cart line created");
            Ok(ScanOutcome {
                action: ScanAction::Created,
                line,
            })
        }
        ScanPlan::Increment {
            line_id,
            from_quantity,
            quantity,
            remaining_quantity,
            total_amount,
        } => {
            let result = sqlx::query(
                "UPDATE sale_product SET quantity = ?, remaining_quantity = ?, total_amount = ?, \
                 updated_at = ? WHERE id = ? AND quantity = ?",
            )
            .bind(quantity)
            .bind(remaining_quantity)
            .bind(total_amount.minor())
            .bind(Utc::now())
            .bind(&line_id)
            .bind(from_quantity)
            .execute(&mut *conn)
            .await?;
            if result.rows_affected() == 0 {
                return Err(CoreError::invalid_state("SaleProduct", &line_id, "changed", "scan").into());
            }

            debug!(sale_id = %sale_id, barcode = %barcode, quantity, "Cart line incremented");
            let line = store::fetch::<SaleProduct>(conn, &line_id).await?;
            Ok(ScanOutcome {
                action: ScanAction::Updated,
                line,
            })
        }
    }
}

/// Changes a line's discount and recomputes its total.
pub async fn set_line_discount(
    conn: &mut SqliteConnection,
    line_id: &str,
    changes: &UpdateSaleProduct,
) -> DbResult<SaleProduct> {
    let (_, mut line) = lock_line(conn, line_id, "edit lines").await?;

    if let Some(allow) = changes.allow_discount {
        line.allow_discount = allow;
    }
    if changes.discount_type.is_some() {
        line.discount_type = changes.discount_type;
    }
    if let Some(discount) = changes.discount {
        line.discount = discount;
    }
    validate_discount(line.discount_type, line.discount)?;

    let total = line_total(line.price(), line.quantity, line.discount_rule())?;

    sqlx::query(
        "UPDATE sale_product SET allow_discount = ?, discount_type = ?, discount = ?, \
         total_amount = ?, updated_at = ? WHERE id = ?",
    )
    .bind(line.allow_discount)
    .bind(line.discount_type)
    .bind(line.discount)
    .bind(total.minor())
    .bind(Utc::now())
    .bind(line_id)
    .execute(&mut *conn)
    .await?;

    store::fetch::<SaleProduct>(conn, line_id).await
}

/// Drops a line from a cart that is still open.
pub async fn remove_line(conn: &mut SqliteConnection, line_id: &str) -> DbResult<()> {
    lock_line(conn, line_id, "remove lines").await?;
    store::delete::<SaleProduct>(conn, line_id).await
}

// =============================================================================
// Payment & Checkout
// =============================================================================

/// Records a payment against a cart that is still open.
pub async fn add_payment(conn: &mut SqliteConnection, req: &CreatePayment) -> DbResult<Payment> {
    lock_open_sale(conn, &req.sale_id, "take payment").await?;
    store::insert(conn, req).await
}

/// Withdraws a payment while its sale is still open.
///
/// ## Errors
/// - `NotFound` if the payment does not exist
/// - `InvalidState` if the sale is finished
pub async fn remove_payment(conn: &mut SqliteConnection, payment_id: &str) -> DbResult<()> {
    lock_parent_sale(conn, Payment::TABLE, Payment::ENTITY, payment_id).await?;
    let payment = store::fetch::<Payment>(conn, payment_id).await?;
    let sale = store::fetch::<Sale>(conn, &payment.sale_id).await?;
    ensure_new(&sale, "remove payments")?;

    store::delete::<Payment>(conn, payment_id).await
}

/// The sale's first recorded payment.
pub async fn first_payment(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Option<Payment>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE sale_id = ? ORDER BY {} LIMIT 1",
        Payment::COLUMNS,
        Payment::TABLE,
        Payment::ORDER_BY
    );
    let row = sqlx::query_as::<_, Payment>(&sql)
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Commits a cart: credits the register, takes stock, finishes the sale.
///
/// ## Errors
/// - `NotFound` if the sale does not exist
/// - `InvalidState` if it is already finished
/// - `Validation` if it belongs to another branch
/// - `PaymentRequired` if no payment was recorded
/// - `NoOpenRegister` if the sale's shift has no register
/// - `InsufficientStock` / `ProductNotFound` from the stock decrement
pub async fn finalize_sale(
    conn: &mut SqliteConnection,
    sale_id: &str,
    branch_id: &str,
) -> DbResult<FinalizedSale> {
    let sale = lock_open_sale(conn, sale_id, "finalize").await?;
    ensure_branch(&sale, branch_id)?;

    let payment = first_payment(conn, sale_id)
        .await?
        .ok_or_else(|| CoreError::PaymentRequired {
            sale_id: sale_id.to_string(),
        })?;

    let register = register::credit(conn, &sale.shift_id, &payment.tenders).await?;

    for line in lines(conn, sale_id).await? {
        ledger::decrement_for_sale(conn, &sale.branch_id, &line.barcode, line.quantity).await?;
    }

    let result = sqlx::query("UPDATE sale SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(SaleStatus::Finished)
        .bind(Utc::now())
        .bind(sale_id)
        .bind(SaleStatus::New)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CoreError::invalid_state("Sale", sale_id, SaleStatus::Finished.as_str(), "finalize").into());
    }

    let sale = store::fetch::<Sale>(conn, sale_id).await?;
    Ok(FinalizedSale { sale, register })
}
