//! Table bindings for every domain entity and request payload.

use chrono::Utc;
use market_core::{
    Branch, Category, CreateBranch, CreateCategory, CreateIncome, CreateIncomeProduct,
    CreatePayment, CreateProduct, CreateRemainder, CreateSalePoint, CreateShift, CreateSupplier,
    Income, IncomeProduct, IncomeStatus, Payment, Product, Remainder, Sale, SalePoint,
    SaleProduct, Shift, ShiftStatus, Supplier, Transaction, UpdateBranch, UpdateCategory,
    UpdateIncome, UpdateProduct, UpdateRemainder, UpdateSalePoint, UpdateSupplier, User,
};

use super::bind::{trimmed, Bind};
use super::filter::FilterKind::{Bool, Text};
use super::{Changeset, NewRecord, Record};

/// Collects `(column, value)` pairs for the fields that are `Some`.
macro_rules! some_changes {
    ($($column:literal => $value:expr),* $(,)?) => {{
        let mut changes: Vec<(&'static str, Bind)> = Vec::new();
        $(
            if let Some(value) = $value {
                changes.push(($column, Bind::from(value)));
            }
        )*
        changes
    }};
}

// =============================================================================
// Records
// =============================================================================

impl Record for Branch {
    const ENTITY: &'static str = "Branch";
    const TABLE: &'static str = "branch";
    const COLUMNS: &'static str = "id, branch_code, name, address, phone, created_at, updated_at";
    const SEARCH: &'static [&'static str] = &["name", "branch_code", "phone"];
    const FILTERS: &'static [(&'static str, super::FilterKind)] = &[("branch_code", Text)];
    const ORDER_BY: &'static str = "name ASC, rowid DESC";
}

impl Record for SalePoint {
    const ENTITY: &'static str = "SalePoint";
    const TABLE: &'static str = "sale_point";
    const COLUMNS: &'static str = "id, branch_id, name, created_at, updated_at";
    const SEARCH: &'static [&'static str] = &["name"];
    const FILTERS: &'static [(&'static str, super::FilterKind)] = &[("branch_id", Text)];
}

impl Record for Category {
    const ENTITY: &'static str = "Category";
    const TABLE: &'static str = "category";
    const COLUMNS: &'static str = "id, title, parent_id, created_at, updated_at";
    const SEARCH: &'static [&'static str] = &["title"];
    const FILTERS: &'static [(&'static str, super::FilterKind)] = &[("parent_id", Text)];
}

impl Record for Product {
    const ENTITY: &'static str = "Product";
    const TABLE: &'static str = "product";
    const COLUMNS: &'static str =
        "id, photo, title, category_id, barcode, price, created_at, updated_at";
    const SEARCH: &'static [&'static str] = &["title", "barcode"];
    const FILTERS: &'static [(&'static str, super::FilterKind)] =
        &[("category_id", Text), ("barcode", Text)];
}

impl Record for Supplier {
    const ENTITY: &'static str = "Supplier";
    const TABLE: &'static str = "supplier";
    const COLUMNS: &'static str = "id, name, phone_number, is_active, created_at, updated_at";
    const SEARCH: &'static [&'static str] = &["name", "phone_number"];
    const FILTERS: &'static [(&'static str, super::FilterKind)] = &[("is_active", Bool)];
    const ORDER_BY: &'static str = "name ASC, rowid DESC";
}

impl Record for User {
    const ENTITY: &'static str = "User";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, first_name, last_name, login, password_hash, active, \
                                   client_type, created_at, updated_at";
    const SEARCH: &'static [&'static str] = &["first_name", "last_name", "login"];
    const FILTERS: &'static [(&'static str, super::FilterKind)] =
        &[("client_type", Text), ("active", Bool)];
}

impl Record for Remainder {
    const ENTITY: &'static str = "Remainder";
    const TABLE: &'static str = "remainder";
    const COLUMNS: &'static str = "id, branch_id, category_id, product_name, barcode, \
                                   price_income, quantity, created_at, updated_at";
    const SEARCH: &'static [&'static str] = &["product_name", "barcode"];
    const FILTERS: &'static [(&'static str, super::FilterKind)] =
        &[("branch_id", Text), ("barcode", Text), ("category_id", Text)];
}

impl Record for Income {
    const ENTITY: &'static str = "Income";
    const TABLE: &'static str = "income";
    const COLUMNS: &'static str =
        "id, branch_id, supplier_id, date_time, status, created_at, updated_at";
    const FILTERS: &'static [(&'static str, super::FilterKind)] =
        &[("branch_id", Text), ("supplier_id", Text), ("status", Text)];
}

impl Record for IncomeProduct {
    const ENTITY: &'static str = "IncomeProduct";
    const TABLE: &'static str = "income_product";
    const COLUMNS: &'static str = "id, income_id, category_id, product_name, barcode, quantity, \
                                   income_price, created_at, updated_at";
    const SEARCH: &'static [&'static str] = &["product_name", "barcode"];
    const FILTERS: &'static [(&'static str, super::FilterKind)] =
        &[("income_id", Text), ("barcode", Text)];
}

impl Record for Shift {
    const ENTITY: &'static str = "Shift";
    const TABLE: &'static str = "shift";
    const COLUMNS: &'static str = "id, branch_id, sale_point_id, user_id, status, open_shift, \
                                   close_shift, created_at, updated_at";
    const FILTERS: &'static [(&'static str, super::FilterKind)] = &[
        ("branch_id", Text),
        ("sale_point_id", Text),
        ("user_id", Text),
        ("status", Text),
    ];
}

impl Record for Transaction {
    const ENTITY: &'static str = "Transaction";
    const TABLE: &'static str = "transactions";
    const COLUMNS: &'static str = "id, shift_id, cash, uzcard, payme, click, humo, apelsin, \
                                   total_amount, created_at, updated_at";
    const FILTERS: &'static [(&'static str, super::FilterKind)] = &[("shift_id", Text)];
}

impl Record for Sale {
    const ENTITY: &'static str = "Sale";
    const TABLE: &'static str = "sale";
    const COLUMNS: &'static str = "id, branch_id, sale_point_id, shift_id, employee_id, barcode, \
                                   status, created_at, updated_at";
    const SEARCH: &'static [&'static str] = &["barcode"];
    const FILTERS: &'static [(&'static str, super::FilterKind)] = &[
        ("branch_id", Text),
        ("sale_point_id", Text),
        ("shift_id", Text),
        ("employee_id", Text),
        ("status", Text),
    ];
}

impl Record for SaleProduct {
    const ENTITY: &'static str = "SaleProduct";
    const TABLE: &'static str = "sale_product";
    const COLUMNS: &'static str = "id, sale_id, category_id, product_name, barcode, \
                                   remaining_quantity, quantity, allow_discount, discount_type, \
                                   discount, price, total_amount, created_at, updated_at";
    const SEARCH: &'static [&'static str] = &["product_name", "barcode"];
    const FILTERS: &'static [(&'static str, super::FilterKind)] =
        &[("sale_id", Text), ("barcode", Text)];
}

impl Record for Payment {
    const ENTITY: &'static str = "Payment";
    const TABLE: &'static str = "payment";
    const COLUMNS: &'static str = "id, sale_id, cash, uzcard, payme, click, humo, apelsin, \
                                   total_amount, created_at, updated_at";
    const FILTERS: &'static [(&'static str, super::FilterKind)] = &[("sale_id", Text)];
    const ORDER_BY: &'static str = "created_at ASC, rowid ASC";
}

// =============================================================================
// Create payloads
// =============================================================================

impl NewRecord for CreateBranch {
    type Target = Branch;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("branch_code", trimmed(&self.branch_code)),
            ("name", trimmed(&self.name)),
            ("address", trimmed(&self.address)),
            ("phone", trimmed(&self.phone)),
        ]
    }
}

impl NewRecord for CreateSalePoint {
    type Target = SalePoint;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("branch_id", self.branch_id.clone().into()),
            ("name", trimmed(&self.name)),
        ]
    }
}

impl NewRecord for CreateCategory {
    type Target = Category;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("title", trimmed(&self.title)),
            ("parent_id", self.parent_id.clone().into()),
        ]
    }
}

impl NewRecord for CreateProduct {
    type Target = Product;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("photo", self.photo.clone().into()),
            ("title", trimmed(&self.title)),
            ("category_id", self.category_id.clone().into()),
            ("barcode", trimmed(&self.barcode)),
            ("price", self.price.into()),
        ]
    }
}

impl NewRecord for CreateSupplier {
    type Target = Supplier;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("name", trimmed(&self.name)),
            ("phone_number", trimmed(&self.phone_number)),
            ("is_active", self.is_active.into()),
        ]
    }
}

impl NewRecord for CreateRemainder {
    type Target = Remainder;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("branch_id", self.branch_id.clone().into()),
            ("category_id", self.category_id.clone().into()),
            ("product_name", trimmed(&self.product_name)),
            ("barcode", trimmed(&self.barcode)),
            ("price_income", self.price_income.into()),
            ("quantity", self.quantity.into()),
        ]
    }
}

impl NewRecord for CreateIncome {
    type Target = Income;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("branch_id", self.branch_id.clone().into()),
            ("supplier_id", self.supplier_id.clone().into()),
            ("date_time", self.date_time.unwrap_or_else(Utc::now).into()),
            ("status", IncomeStatus::Open.as_str().into()),
        ]
    }
}

impl NewRecord for CreateIncomeProduct {
    type Target = IncomeProduct;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("income_id", self.income_id.clone().into()),
            ("category_id", self.category_id.clone().into()),
            ("product_name", trimmed(&self.product_name)),
            ("barcode", trimmed(&self.barcode)),
            ("quantity", self.quantity.into()),
            ("income_price", self.income_price.into()),
        ]
    }
}

impl NewRecord for CreateShift {
    type Target = Shift;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        vec![
            ("branch_id", self.branch_id.clone().into()),
            ("sale_point_id", self.sale_point_id.clone().into()),
            ("user_id", self.user_id.clone().into()),
            ("status", ShiftStatus::New.as_str().into()),
        ]
    }
}

impl NewRecord for CreatePayment {
    type Target = Payment;

    fn values(&self) -> Vec<(&'static str, Bind)> {
        let mut values: Vec<(&'static str, Bind)> = vec![("sale_id", self.sale_id.clone().into())];
        values.extend(
            self.tenders
                .entries()
                .into_iter()
                .map(|(column, amount)| (column, Bind::Int(amount))),
        );
        values.push(("total_amount", self.tenders.total().minor().into()));
        values
    }
}

// =============================================================================
// Update payloads
// =============================================================================

impl Changeset for UpdateBranch {
    type Target = Branch;

    fn changes(&self) -> Vec<(&'static str, Bind)> {
        some_changes! {
            "branch_code" => self.branch_code.as_deref().map(str::trim),
            "name" => self.name.as_deref().map(str::trim),
            "address" => self.address.as_deref().map(str::trim),
            "phone" => self.phone.as_deref().map(str::trim),
        }
    }
}

impl Changeset for UpdateSalePoint {
    type Target = SalePoint;

    fn changes(&self) -> Vec<(&'static str, Bind)> {
        some_changes! {
            "name" => self.name.as_deref().map(str::trim),
        }
    }
}

impl Changeset for UpdateCategory {
    type Target = Category;

    fn changes(&self) -> Vec<(&'static str, Bind)> {
        some_changes! {
            "title" => self.title.as_deref().map(str::trim),
            "parent_id" => self.parent_id.clone(),
        }
    }
}

impl Changeset for UpdateProduct {
    type Target = Product;

    fn changes(&self) -> Vec<(&'static str, Bind)> {
        some_changes! {
            "photo" => self.photo.clone(),
            "title" => self.title.as_deref().map(str::trim),
            "category_id" => self.category_id.clone(),
            "barcode" => self.barcode.as_deref().map(str::trim),
            "price" => self.price,
        }
    }
}

impl Changeset for UpdateSupplier {
    type Target = Supplier;

    fn changes(&self) -> Vec<(&'static str, Bind)> {
        some_changes! {
            "name" => self.name.as_deref().map(str::trim),
            "phone_number" => self.phone_number.as_deref().map(str::trim),
            "is_active" => self.is_active,
        }
    }
}

impl Changeset for UpdateRemainder {
    type Target = Remainder;

    fn changes(&self) -> Vec<(&'static str, Bind)> {
        some_changes! {
            "category_id" => self.category_id.clone(),
            "product_name" => self.product_name.as_deref().map(str::trim),
            "price_income" => self.price_income,
            "quantity" => self.quantity,
        }
    }
}

impl Changeset for UpdateIncome {
    type Target = Income;

    fn changes(&self) -> Vec<(&'static str, Bind)> {
        some_changes! {
            "supplier_id" => self.supplier_id.clone(),
            "date_time" => self.date_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::Tenders;

    #[test]
    fn test_payment_total_is_sum_of_tenders() {
        let payment = CreatePayment {
            sale_id: "s1".to_string(),
            tenders: Tenders {
                cash: 100,
                payme: 40,
                ..Tenders::default()
            },
        };
        let values = payment.values();
        assert!(values.contains(&("total_amount", Bind::Int(140))));
        assert!(values.contains(&("humo", Bind::Int(0))));
    }

    #[test]
    fn test_changes_skip_missing_fields() {
        let changes = UpdateSupplier {
            is_active: Some(false),
            ..UpdateSupplier::default()
        }
        .changes();
        assert_eq!(changes, vec![("is_active", Bind::Bool(false))]);
    }

    #[test]
    fn test_create_values_are_trimmed() {
        let values = CreateSalePoint {
            branch_id: "b1".to_string(),
            name: "  Kassa 1 ".to_string(),
        }
        .values();
        assert!(values.contains(&("name", Bind::Text("Kassa 1".to_string()))));
    }
}
