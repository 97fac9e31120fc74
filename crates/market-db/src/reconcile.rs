//! # Reconciliation Workflows
//!
//! The operations that touch more than one table. Each one begins a
//! transaction, runs the ledger / session / register steps on that single
//! connection and commits. Any error returns before `commit`, and dropping
//! the transaction rolls every step back.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reconciler::finalize_sale(sale, branch)                                │
//! │                                                                         │
//! │   BEGIN                                                                 │
//! │    ├── UPDATE sale (lock) ─► load, status new, same branch             │
//! │    ├── earliest payment ───────────────► PaymentRequired               │
//! │    ├── UPDATE transactions += tenders ─► NoOpenRegister                │
//! │    ├── UPDATE remainder -= qty (each) ─► InsufficientStock             │
//! │    └── UPDATE sale status = finished                                    │
//! │   COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use market_core::{
    CreateIncomeProduct, CreatePayment, CreateSale, CreateShift, FinalizedSale, IncomeProduct,
    Payment, PostedIncome, Sale, SaleProduct, ScanOutcome, Shift, ShiftMethod, UpdateSaleProduct,
    Validate,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use crate::{ledger, register, session};

/// Runs the cross-table workflows, one transaction per call.
#[derive(Debug, Clone)]
pub struct Reconciler {
    pool: SqlitePool,
}

impl Reconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Reconciler { pool }
    }

    /// Adds one unit of a barcode to a cart.
    pub async fn scan_barcode(&self, sale_id: &str, branch_id: &str, barcode: &str) -> DbResult<ScanOutcome> {
        let mut tx = self.pool.begin().await?;
        let outcome = session::scan_barcode(&mut tx, sale_id, branch_id, barcode.trim()).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            barcode = %outcome.line.barcode,
            quantity = outcome.line.quantity,
            action = ?outcome.action,
            "Barcode scanned"
        );
        Ok(outcome)
    }

    /// Commits a paid cart into the register and stock.
    pub async fn finalize_sale(&self, sale_id: &str, branch_id: &str) -> DbResult<FinalizedSale> {
        let mut tx = self.pool.begin().await?;
        let finalized = session::finalize_sale(&mut tx, sale_id, branch_id).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            shift_id = %finalized.sale.shift_id,
            register_total = finalized.register.total_amount,
            "Sale finalized"
        );
        Ok(finalized)
    }

    /// Posts a supplier delivery into stock.
    pub async fn post_income(&self, income_id: &str) -> DbResult<PostedIncome> {
        let mut tx = self.pool.begin().await?;
        let posted = ledger::apply_delivery(&mut tx, income_id).await?;
        tx.commit().await?;

        info!(income_id = %income_id, lines = posted.remainders.len(), "Income posted");
        Ok(posted)
    }

    /// Opens or closes a shift.
    pub async fn set_shift_method(&self, shift_id: &str, method: ShiftMethod) -> DbResult<Shift> {
        let mut tx = self.pool.begin().await?;
        let shift = register::set_method(&mut tx, shift_id, method).await?;
        tx.commit().await?;

        info!(shift_id = %shift_id, status = shift.status.as_str(), "Shift status changed");
        Ok(shift)
    }

    pub async fn create_shift(&self, req: &CreateShift) -> DbResult<Shift> {
        req.validate()?;

        let mut tx = self.pool.begin().await?;
        let shift = register::create_shift(&mut tx, req).await?;
        tx.commit().await?;

        info!(shift_id = %shift.id, branch_id = %shift.branch_id, "Shift created");
        Ok(shift)
    }

    pub async fn create_sale(&self, req: &CreateSale) -> DbResult<Sale> {
        req.validate()?;

        let mut tx = self.pool.begin().await?;
        let sale = session::create_sale(&mut tx, req).await?;
        tx.commit().await?;

        info!(sale_id = %sale.id, shift_id = %sale.shift_id, "Sale created");
        Ok(sale)
    }

    pub async fn add_payment(&self, req: &CreatePayment) -> DbResult<Payment> {
        req.validate()?;

        let mut tx = self.pool.begin().await?;
        let payment = session::add_payment(&mut tx, req).await?;
        tx.commit().await?;

        info!(sale_id = %payment.sale_id, total = payment.total_amount, "Payment recorded");
        Ok(payment)
    }

    pub async fn add_income_line(&self, req: &CreateIncomeProduct) -> DbResult<IncomeProduct> {
        req.validate()?;

        let mut tx = self.pool.begin().await?;
        let line = ledger::add_income_line(&mut tx, req).await?;
        tx.commit().await?;
        Ok(line)
    }

    pub async fn update_line(&self, line_id: &str, changes: &UpdateSaleProduct) -> DbResult<SaleProduct> {
        changes.validate()?;

        let mut tx = self.pool.begin().await?;
        let line = session::set_line_discount(&mut tx, line_id, changes).await?;
        tx.commit().await?;
        Ok(line)
    }

    pub async fn remove_line(&self, line_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        session::remove_line(&mut tx, line_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Deletes a sale that has not been finalized.
    pub async fn delete_sale(&self, sale_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        session::delete_sale(&mut tx, sale_id).await?;
        tx.commit().await?;

        info!(sale_id = %sale_id, "Sale deleted");
        Ok(())
    }

    pub async fn remove_payment(&self, payment_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        session::remove_payment(&mut tx, payment_id).await?;
        tx.commit().await?;

        info!(payment_id = %payment_id, "Payment removed");
        Ok(())
    }

    pub async fn remove_income_line(&self, line_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        ledger::remove_income_line(&mut tx, line_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Deletes an income that has not been posted.
    pub async fn delete_income(&self, income_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        ledger::delete_income(&mut tx, income_id).await?;
        tx.commit().await?;

        info!(income_id = %income_id, "Income deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::store::{Filter, ListParams};
    use market_core::{
        Branch, CoreError, CreateBranch, CreateIncome, CreateRemainder, CreateSalePoint,
        CreateSupplier, DiscountType, Income, IncomeStatus, Remainder, SalePoint, SaleStatus,
        ScanAction, ShiftStatus, Supplier, Tenders, Transaction, UpdateRemainder, ValidationError,
    };
    use uuid::Uuid;

    struct Fixture {
        db: Database,
        branch: Branch,
        sale_point: SalePoint,
        cashier_id: String,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = Database::new(DbConfig::in_memory()).await.unwrap();
            let branch = db
                .store::<Branch>()
                .create(&CreateBranch {
                    branch_code: "B1".to_string(),
                    name: "Chilonzor".to_string(),
                    address: String::new(),
                    phone: String::new(),
                })
                .await
                .unwrap();
            let sale_point = db
                .store::<SalePoint>()
                .create(&CreateSalePoint {
                    branch_id: branch.id.clone(),
                    name: "Kassa 1".to_string(),
                })
                .await
                .unwrap();
            Fixture {
                db,
                branch,
                sale_point,
                cashier_id: Uuid::new_v4().to_string(),
            }
        }

        fn flow(&self) -> Reconciler {
            self.db.reconcile()
        }

        async fn stock(&self, barcode: &str, quantity: i64) -> Remainder {
            self.db
                .store::<Remainder>()
                .create(&CreateRemainder {
                    branch_id: self.branch.id.clone(),
                    category_id: None,
                    product_name: format!("Item {barcode}"),
                    barcode: barcode.to_string(),
                    price_income: 4500,
                    quantity,
                })
                .await
                .unwrap()
        }

        async fn stock_level(&self, barcode: &str) -> i64 {
            let page = self
                .db
                .store::<Remainder>()
                .get_list(
                    &ListParams::default()
                        .filter(Filter::eq("branch_id", self.branch.id.as_str()))
                        .filter(Filter::eq("barcode", barcode)),
                )
                .await
                .unwrap();
            page.items[0].quantity
        }

        async fn shift(&self) -> Shift {
            self.flow()
                .create_shift(&CreateShift {
                    branch_id: self.branch.id.clone(),
                    user_id: self.cashier_id.clone(),
                    sale_point_id: self.sale_point.id.clone(),
                })
                .await
                .unwrap()
        }

        async fn open_shift(&self) -> Shift {
            let shift = self.shift().await;
            self.flow().set_shift_method(&shift.id, ShiftMethod::Open).await.unwrap()
        }

        fn sale_request(&self) -> CreateSale {
            CreateSale {
                branch_id: self.branch.id.clone(),
                sale_point_id: self.sale_point.id.clone(),
                shift_id: None,
                employee_id: self.cashier_id.clone(),
                barcode: None,
            }
        }

        async fn sale(&self) -> Sale {
            self.flow().create_sale(&self.sale_request()).await.unwrap()
        }

        async fn scan(&self, sale: &Sale, barcode: &str) -> DbResult<ScanOutcome> {
            self.flow().scan_barcode(&sale.id, &self.branch.id, barcode).await
        }

        async fn pay(&self, sale: &Sale, tenders: Tenders) -> Payment {
            self.flow()
                .add_payment(&CreatePayment {
                    sale_id: sale.id.clone(),
                    tenders,
                })
                .await
                .unwrap()
        }

        async fn supplier(&self) -> Supplier {
            self.db
                .store::<Supplier>()
                .create(&CreateSupplier {
                    name: "Coca-Cola Ichimligi".to_string(),
                    phone_number: String::new(),
                    is_active: true,
                })
                .await
                .unwrap()
        }

        async fn income(&self, lines: &[(&str, i64)]) -> Income {
            let supplier = self.supplier().await;
            let income = self
                .db
                .store::<Income>()
                .create(&CreateIncome {
                    branch_id: self.branch.id.clone(),
                    supplier_id: supplier.id,
                    date_time: None,
                })
                .await
                .unwrap();
            for (barcode, quantity) in lines {
                self.flow()
                    .add_income_line(&CreateIncomeProduct {
                        income_id: income.id.clone(),
                        category_id: None,
                        product_name: format!("Item {barcode}"),
                        barcode: barcode.to_string(),
                        quantity: *quantity,
                        income_price: 3900,
                    })
                    .await
                    .unwrap();
            }
            income
        }
    }

    fn cash(amount: i64) -> Tenders {
        Tenders {
            cash: amount,
            ..Tenders::default()
        }
    }

    fn rule(err: DbError) -> CoreError {
        match err {
            DbError::Rule(rule) => rule,
            other => panic!("expected a rule violation, got {other:?}"),
        }
    }

    // -------------------------------------------------------------------------
    // Scanning
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_scan_stops_at_stock_level() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        fx.open_shift().await;
        let sale = fx.sale().await;

        for expected in 1..=5 {
            let outcome = fx.scan(&sale, "123").await.unwrap();
            assert_eq!(outcome.line.quantity, expected);
        }

        let err = rule(fx.scan(&sale, "123").await.unwrap_err());
        assert!(matches!(err, CoreError::LimitExceeded { available: 5, requested: 6, .. }));

        let lines = fx.db.store::<SaleProduct>().get_list(&ListParams::default()).await.unwrap();
        assert_eq!(lines.count, 1);
        assert_eq!(lines.items[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_repeat_scans_merge_into_one_line() {
        let fx = Fixture::new().await;
        fx.stock("123", 10).await;
        fx.open_shift().await;
        let sale = fx.sale().await;

        let first = fx.scan(&sale, "123").await.unwrap();
        let second = fx.scan(&sale, "123").await.unwrap();

        assert_eq!(first.action, ScanAction::Created);
        assert_eq!(second.action, ScanAction::Updated);
        assert_eq!(first.line.id, second.line.id);
        assert_eq!(second.line.quantity, 2);
        assert_eq!(second.line.price, 4500);
        assert_eq!(second.line.total_amount, 9000);
        assert_eq!(second.line.remaining_quantity, 10);
    }

    #[tokio::test]
    async fn test_scan_unknown_barcode() {
        let fx = Fixture::new().await;
        fx.open_shift().await;
        let sale = fx.sale().await;

        let err = rule(fx.scan(&sale, "999").await.unwrap_err());
        assert!(matches!(err, CoreError::ProductNotFound { .. }));
    }

    #[tokio::test]
    async fn test_scan_with_empty_stock_is_limit_exceeded() {
        let fx = Fixture::new().await;
        fx.stock("123", 0).await;
        fx.open_shift().await;
        let sale = fx.sale().await;

        let err = rule(fx.scan(&sale, "123").await.unwrap_err());
        assert!(matches!(err, CoreError::LimitExceeded { requested: 1, .. }));
    }

    #[tokio::test]
    async fn test_scan_rejects_other_branch() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        fx.open_shift().await;
        let sale = fx.sale().await;

        let err = fx
            .flow()
            .scan_barcode(&sale.id, &Uuid::new_v4().to_string(), "123")
            .await
            .unwrap_err();
        assert!(matches!(
            rule(err),
            CoreError::Validation(ValidationError::Mismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_discount_edit_recomputes_total() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        fx.open_shift().await;
        let sale = fx.sale().await;
        fx.scan(&sale, "123").await.unwrap();
        let line = fx.scan(&sale, "123").await.unwrap().line;

        let edited = fx
            .flow()
            .update_line(
                &line.id,
                &UpdateSaleProduct {
                    allow_discount: Some(true),
                    discount_type: Some(DiscountType::Percent),
                    discount: Some(10),
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.total_amount, 8100);

        // Further scans keep applying the discount
        let next = fx.scan(&sale, "123").await.unwrap().line;
        assert_eq!(next.quantity, 3);
        assert_eq!(next.total_amount, 12150);
    }

    #[tokio::test]
    async fn test_remove_line_only_while_sale_is_new() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        fx.stock("456", 5).await;
        fx.open_shift().await;
        let sale = fx.sale().await;
        let keep = fx.scan(&sale, "123").await.unwrap().line;
        let drop = fx.scan(&sale, "456").await.unwrap().line;

        fx.flow().remove_line(&drop.id).await.unwrap();
        fx.pay(&sale, cash(4500)).await;
        fx.flow().finalize_sale(&sale.id, &fx.branch.id).await.unwrap();

        let err = rule(fx.flow().remove_line(&keep.id).await.unwrap_err());
        assert!(matches!(err, CoreError::InvalidState { .. }));
        assert_eq!(fx.stock_level("456").await, 5);
    }

    // -------------------------------------------------------------------------
    // Shifts
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sale_requires_open_shift() {
        let fx = Fixture::new().await;

        let err = rule(fx.flow().create_sale(&fx.sale_request()).await.unwrap_err());
        assert!(matches!(err, CoreError::NoOpenShift { .. }));

        let shift = fx.shift().await;
        let err = rule(fx.flow().create_sale(&fx.sale_request()).await.unwrap_err());
        assert!(matches!(err, CoreError::NoOpenShift { .. }));

        let shift = fx.flow().set_shift_method(&shift.id, ShiftMethod::Open).await.unwrap();
        let sale = fx.sale().await;
        assert_eq!(sale.shift_id, shift.id);
        assert_eq!(sale.status, SaleStatus::New);

        fx.flow().set_shift_method(&shift.id, ShiftMethod::Close).await.unwrap();
        let err = rule(fx.flow().create_sale(&fx.sale_request()).await.unwrap_err());
        assert!(matches!(err, CoreError::NoOpenShift { .. }));
    }

    #[tokio::test]
    async fn test_sale_naming_another_shift_is_rejected() {
        let fx = Fixture::new().await;
        fx.open_shift().await;

        let mut req = fx.sale_request();
        req.shift_id = Some(Uuid::new_v4().to_string());
        let err = rule(fx.flow().create_sale(&req).await.unwrap_err());
        assert!(matches!(err, CoreError::NoOpenShift { .. }));
    }

    #[tokio::test]
    async fn test_one_live_shift_per_branch() {
        let fx = Fixture::new().await;
        let first = fx.shift().await;

        let err = rule(
            fx.flow()
                .create_shift(&CreateShift {
                    branch_id: fx.branch.id.clone(),
                    user_id: fx.cashier_id.clone(),
                    sale_point_id: fx.sale_point.id.clone(),
                })
                .await
                .unwrap_err(),
        );
        assert!(matches!(err, CoreError::ShiftAlreadyOpen { .. }));

        fx.flow().set_shift_method(&first.id, ShiftMethod::Open).await.unwrap();
        fx.flow().set_shift_method(&first.id, ShiftMethod::Close).await.unwrap();

        let second = fx.shift().await;
        assert_eq!(second.status, ShiftStatus::New);
    }

    #[tokio::test]
    async fn test_shift_transitions() {
        let fx = Fixture::new().await;
        let shift = fx.shift().await;

        let err = rule(
            fx.flow()
                .set_shift_method(&shift.id, ShiftMethod::Close)
                .await
                .unwrap_err(),
        );
        assert!(matches!(err, CoreError::InvalidState { .. }));

        let opened = fx.flow().set_shift_method(&shift.id, ShiftMethod::Open).await.unwrap();
        assert_eq!(opened.status, ShiftStatus::Open);
        assert!(opened.open_shift.is_some());
        assert!(opened.close_shift.is_none());

        let registers = fx
            .db
            .store::<Transaction>()
            .get_list(&ListParams::default().filter(Filter::eq("shift_id", shift.id.as_str())))
            .await
            .unwrap();
        assert_eq!(registers.count, 1);
        assert_eq!(registers.items[0].total_amount, 0);

        let err = rule(
            fx.flow()
                .set_shift_method(&shift.id, ShiftMethod::Open)
                .await
                .unwrap_err(),
        );
        assert!(matches!(err, CoreError::InvalidState { .. }));

        let closed = fx.flow().set_shift_method(&shift.id, ShiftMethod::Close).await.unwrap();
        assert_eq!(closed.status, ShiftStatus::Closed);
        assert!(closed.close_shift.is_some());

        let err = fx
            .flow()
            .set_shift_method("missing", ShiftMethod::Open)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    // -------------------------------------------------------------------------
    // Finalize
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_finalize_credits_register() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        let shift = fx.open_shift().await;

        // An earlier sale leaves 50 cash in the register
        let earlier = fx.sale().await;
        fx.scan(&earlier, "123").await.unwrap();
        fx.pay(&earlier, cash(50)).await;
        fx.flow().finalize_sale(&earlier.id, &fx.branch.id).await.unwrap();

        let sale = fx.sale().await;
        fx.scan(&sale, "123").await.unwrap();
        fx.pay(&sale, cash(100)).await;
        let finalized = fx.flow().finalize_sale(&sale.id, &fx.branch.id).await.unwrap();

        assert_eq!(finalized.sale.status, SaleStatus::Finished);
        assert_eq!(finalized.register.shift_id, shift.id);
        assert_eq!(finalized.register.tenders.cash, 150);
        assert_eq!(finalized.register.total_amount, 150);
        assert_eq!(fx.stock_level("123").await, 3);
    }

    #[tokio::test]
    async fn test_finalize_splits_tenders() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        fx.open_shift().await;
        let sale = fx.sale().await;
        fx.scan(&sale, "123").await.unwrap();
        fx.pay(
            &sale,
            Tenders {
                cash: 2000,
                uzcard: 1500,
                payme: 1000,
                ..Tenders::default()
            },
        )
        .await;

        let register = fx.flow().finalize_sale(&sale.id, &fx.branch.id).await.unwrap().register;
        assert_eq!(register.tenders.cash, 2000);
        assert_eq!(register.tenders.uzcard, 1500);
        assert_eq!(register.tenders.payme, 1000);
        assert_eq!(register.tenders.humo, 0);
        assert_eq!(register.total_amount, 4500);
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        fx.open_shift().await;
        let sale = fx.sale().await;
        fx.scan(&sale, "123").await.unwrap();
        fx.scan(&sale, "123").await.unwrap();
        fx.pay(&sale, cash(9000)).await;

        let first = fx.flow().finalize_sale(&sale.id, &fx.branch.id).await.unwrap();
        let err = rule(fx.flow().finalize_sale(&sale.id, &fx.branch.id).await.unwrap_err());
        assert!(matches!(err, CoreError::InvalidState { .. }));

        assert_eq!(fx.stock_level("123").await, 3);
        let register = fx.db.store::<Transaction>().get_by_id(&first.register.id).await.unwrap();
        assert_eq!(register.total_amount, 9000);
    }

    #[tokio::test]
    async fn test_finalize_requires_payment() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        fx.open_shift().await;
        let sale = fx.sale().await;
        fx.scan(&sale, "123").await.unwrap();

        let err = rule(fx.flow().finalize_sale(&sale.id, &fx.branch.id).await.unwrap_err());
        assert!(matches!(err, CoreError::PaymentRequired { .. }));

        let reloaded = fx.db.store::<Sale>().get_by_id(&sale.id).await.unwrap();
        assert_eq!(reloaded.status, SaleStatus::New);
    }

    #[tokio::test]
    async fn test_finalize_rolls_back_on_short_stock() {
        let fx = Fixture::new().await;
        let stock = fx.stock("123", 5).await;
        let shift = fx.open_shift().await;
        let sale = fx.sale().await;
        for _ in 0..3 {
            fx.scan(&sale, "123").await.unwrap();
        }
        fx.pay(&sale, cash(13500)).await;

        // Stock sold elsewhere after the cart was built
        fx.db
            .store::<Remainder>()
            .update(
                &stock.id,
                &UpdateRemainder {
                    quantity: Some(2),
                    ..UpdateRemainder::default()
                },
            )
            .await
            .unwrap();

        let err = rule(fx.flow().finalize_sale(&sale.id, &fx.branch.id).await.unwrap_err());
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 2, requested: 3, .. }
        ));

        assert_eq!(fx.stock_level("123").await, 2);
        let reloaded = fx.db.store::<Sale>().get_by_id(&sale.id).await.unwrap();
        assert_eq!(reloaded.status, SaleStatus::New);
        let registers = fx
            .db
            .store::<Transaction>()
            .get_list(&ListParams::default().filter(Filter::eq("shift_id", shift.id.as_str())))
            .await
            .unwrap();
        assert_eq!(registers.items[0].total_amount, 0);
    }

    #[tokio::test]
    async fn test_payment_after_finalize_is_rejected() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        fx.open_shift().await;
        let sale = fx.sale().await;
        fx.scan(&sale, "123").await.unwrap();
        fx.pay(&sale, cash(4500)).await;
        fx.flow().finalize_sale(&sale.id, &fx.branch.id).await.unwrap();

        let err = fx
            .flow()
            .add_payment(&CreatePayment {
                sale_id: sale.id.clone(),
                tenders: cash(100),
            })
            .await
            .unwrap_err();
        assert!(matches!(rule(err), CoreError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_finalized_sale_keeps_its_payment() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        fx.open_shift().await;
        let sale = fx.sale().await;
        fx.scan(&sale, "123").await.unwrap();
        let payment = fx.pay(&sale, cash(4500)).await;
        fx.flow().finalize_sale(&sale.id, &fx.branch.id).await.unwrap();

        let err = fx.flow().remove_payment(&payment.id).await.unwrap_err();
        assert!(matches!(rule(err), CoreError::InvalidState { .. }));
        let err = fx.flow().delete_sale(&sale.id).await.unwrap_err();
        assert!(matches!(rule(err), CoreError::InvalidState { .. }));

        fx.db.store::<Payment>().get_by_id(&payment.id).await.unwrap();
        let lines = fx
            .db
            .store::<SaleProduct>()
            .get_list(&ListParams::default().filter(Filter::eq("sale_id", sale.id.as_str())))
            .await
            .unwrap();
        assert_eq!(lines.count, 1);
    }

    #[tokio::test]
    async fn test_open_sale_payment_and_cart_can_be_dropped() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        fx.open_shift().await;
        let sale = fx.sale().await;
        fx.scan(&sale, "123").await.unwrap();
        let payment = fx.pay(&sale, cash(4500)).await;

        fx.flow().remove_payment(&payment.id).await.unwrap();
        let err = fx.flow().remove_payment(&payment.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        fx.flow().delete_sale(&sale.id).await.unwrap();
        let err = fx.db.store::<Sale>().get_by_id(&sale.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        // Stock is untouched by a cart that never finalized
        assert_eq!(fx.stock_level("123").await, 5);
    }

    #[tokio::test]
    async fn test_sale_point_must_belong_to_branch() {
        let fx = Fixture::new().await;
        let other = fx
            .db
            .store::<Branch>()
            .create(&CreateBranch {
                branch_code: "B2".to_string(),
                name: "Yunusobod".to_string(),
                address: String::new(),
                phone: String::new(),
            })
            .await
            .unwrap();
        let foreign_point = fx
            .db
            .store::<SalePoint>()
            .create(&CreateSalePoint {
                branch_id: other.id.clone(),
                name: "Kassa 9".to_string(),
            })
            .await
            .unwrap();

        let err = fx
            .flow()
            .create_shift(&CreateShift {
                branch_id: fx.branch.id.clone(),
                user_id: fx.cashier_id.clone(),
                sale_point_id: foreign_point.id.clone(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            rule(err),
            CoreError::Validation(ValidationError::Mismatch { ref field, .. }) if field == "sale_point_id"
        ));

        fx.open_shift().await;
        let mut req = fx.sale_request();
        req.sale_point_id = foreign_point.id.clone();
        let err = fx.flow().create_sale(&req).await.unwrap_err();
        assert!(matches!(
            rule(err),
            CoreError::Validation(ValidationError::Mismatch { ref field, .. }) if field == "sale_point_id"
        ));
    }

    // -------------------------------------------------------------------------
    // Incomes
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_post_income_adds_to_existing_stock() {
        let fx = Fixture::new().await;
        fx.stock("123", 5).await;
        let income = fx.income(&[("123", 10)]).await;

        let posted = fx.flow().post_income(&income.id).await.unwrap();
        assert_eq!(posted.income.status, IncomeStatus::Finished);
        assert_eq!(posted.remainders.len(), 1);
        assert_eq!(posted.remainders[0].quantity, 15);
        // Existing rows keep their income price
        assert_eq!(posted.remainders[0].price_income, 4500);
        assert_eq!(fx.stock_level("123").await, 15);

        let err = rule(fx.flow().post_income(&income.id).await.unwrap_err());
        assert!(matches!(err, CoreError::InvalidState { .. }));
        assert_eq!(fx.stock_level("123").await, 15);
    }

    #[tokio::test]
    async fn test_post_income_creates_missing_stock_rows() {
        let fx = Fixture::new().await;
        let income = fx.income(&[("777", 4), ("888", 6)]).await;

        let posted = fx.flow().post_income(&income.id).await.unwrap();
        assert_eq!(posted.remainders.len(), 2);
        assert_eq!(fx.stock_level("777").await, 4);
        assert_eq!(fx.stock_level("888").await, 6);
        assert!(posted.remainders.iter().all(|r| r.price_income == 3900));
    }

    #[tokio::test]
    async fn test_post_income_edge_cases() {
        let fx = Fixture::new().await;

        let err = fx.flow().post_income("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let empty = fx.income(&[]).await;
        let err = rule(fx.flow().post_income(&empty.id).await.unwrap_err());
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));

        let reloaded = fx.db.store::<Income>().get_by_id(&empty.id).await.unwrap();
        assert_eq!(reloaded.status, IncomeStatus::Open);
    }

    #[tokio::test]
    async fn test_lines_cannot_be_added_to_posted_income() {
        let fx = Fixture::new().await;
        let income = fx.income(&[("123", 1)]).await;
        fx.flow().post_income(&income.id).await.unwrap();

        let err = fx
            .flow()
            .add_income_line(&CreateIncomeProduct {
                income_id: income.id.clone(),
                category_id: None,
                product_name: "Late".to_string(),
                barcode: "321".to_string(),
                quantity: 1,
                income_price: 100,
            })
            .await
            .unwrap_err();
        assert!(matches!(rule(err), CoreError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_posted_income_lines_are_frozen() {
        let fx = Fixture::new().await;
        let income = fx.income(&[("123", 4), ("456", 2)]).await;
        let lines = fx
            .db
            .store::<IncomeProduct>()
            .get_list(&ListParams::default().filter(Filter::eq("income_id", income.id.as_str())))
            .await
            .unwrap();
        assert_eq!(lines.count, 2);
        let line = |barcode: &str| {
            lines
                .items
                .iter()
                .find(|l| l.barcode == barcode)
                .map(|l| l.id.clone())
                .unwrap()
        };
        let kept = line("123");

        // Open incomes can still be edited
        fx.flow().remove_income_line(&line("456")).await.unwrap();

        fx.flow().post_income(&income.id).await.unwrap();

        let err = fx.flow().remove_income_line(&kept).await.unwrap_err();
        assert!(matches!(rule(err), CoreError::InvalidState { .. }));
        let err = fx.flow().delete_income(&income.id).await.unwrap_err();
        assert!(matches!(rule(err), CoreError::InvalidState { .. }));

        fx.db.store::<IncomeProduct>().get_by_id(&kept).await.unwrap();
        assert_eq!(fx.stock_level("123").await, 4);

        let err = fx.flow().remove_income_line("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_open_income_can_be_deleted() {
        let fx = Fixture::new().await;
        let income = fx.income(&[("123", 4)]).await;

        fx.flow().delete_income(&income.id).await.unwrap();
        let err = fx.db.store::<Income>().get_by_id(&income.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
