//! # Domain Types
//!
//! Entities, statuses and request payloads for the back-office.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                            Branch                                       │
//! │        ┌──────────┬──────────┼───────────┬──────────────┐               │
//! │        ▼          ▼          ▼           ▼              ▼               │
//! │   SalePoint     Shift    Remainder     Income          Sale             │
//! │                   │     (branch +       │               │               │
//! │                   ▼      barcode)       ▼          ┌────┴─────┐         │
//! │              Transaction          IncomeProduct    ▼          ▼         │
//! │              (register)                       SaleProduct  Payment      │
//! │                                                                         │
//! │   Reference data: Category, Product, Supplier, User                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every id is a UUID v4 string. Every amount is `i64` minor units, exposed
//! as [`Money`] through accessors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Statuses
// =============================================================================

/// Who the bearer of a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum ClientType {
    #[serde(rename = "SUPER-ADMIN")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SUPER-ADMIN"))]
    SuperAdmin,
    #[serde(rename = "CASSIER")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "CASSIER"))]
    Cassier,
    #[serde(rename = "BRANCH")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "BRANCH"))]
    Branch,
}

impl ClientType {
    pub const ALL: [ClientType; 3] = [ClientType::SuperAdmin, ClientType::Cassier, ClientType::Branch];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ClientType::SuperAdmin => "SUPER-ADMIN",
            ClientType::Cassier => "CASSIER",
            ClientType::Branch => "BRANCH",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supplier delivery lifecycle: `open` → `finished`, one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IncomeStatus {
    #[default]
    Open,
    Finished,
}

impl IncomeStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            IncomeStatus::Open => "open",
            IncomeStatus::Finished => "finished",
        }
    }
}

/// Till session lifecycle: `new` → `open` → `closed`.
///
/// ```text
///   create_shift        method=open            method=close
///  ──────────────► new ─────────────► open ──────────────► closed
///                        + zero register
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    #[default]
    New,
    Open,
    Closed,
}

impl ShiftStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::New => "new",
            ShiftStatus::Open => "open",
            ShiftStatus::Closed => "closed",
        }
    }

    /// Label shown on the cashier's shift table.
    pub const fn label(&self) -> &'static str {
        match self {
            ShiftStatus::New => "Новая",
            ShiftStatus::Open => "Открытая",
            ShiftStatus::Closed => "Закрытая",
        }
    }

    /// Status a shift must currently have for `method` to apply, and the
    /// status it moves to.
    pub const fn transition(method: ShiftMethod) -> (ShiftStatus, ShiftStatus) {
        match method {
            ShiftMethod::Open => (ShiftStatus::New, ShiftStatus::Open),
            ShiftMethod::Close => (ShiftStatus::Open, ShiftStatus::Closed),
        }
    }
}

/// The `method` query parameter of the shift table endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShiftMethod {
    Open,
    Close,
}

impl ShiftMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ShiftMethod::Open => "open",
            ShiftMethod::Close => "close",
        }
    }
}

impl FromStr for ShiftMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "open" => Ok(ShiftMethod::Open),
            "close" => Ok(ShiftMethod::Close),
            _ => Err(ValidationError::NotAllowed {
                field: "method".to_string(),
                allowed: vec!["open".to_string(), "close".to_string()],
            }),
        }
    }
}

/// Cart lifecycle: `new` → `finished`, one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    New,
    Finished,
}

impl SaleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::New => "new",
            SaleStatus::Finished => "finished",
        }
    }
}

/// How `SaleProduct::discount` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Fixed amount in minor units off the line.
    Sum,
    /// Whole percent (0-100) off the line.
    Percent,
}

impl DiscountType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Sum => "sum",
            DiscountType::Percent => "percent",
        }
    }
}

// =============================================================================
// Tenders
// =============================================================================

/// Per-tender amounts shared by `Payment` and the shift register.
///
/// ## Tender Types
/// Cash plus the card/wallet rails accepted at the till: Uzcard, Payme,
/// Click, Humo and Apelsin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tenders {
    #[serde(default)]
    pub cash: i64,
    #[serde(default)]
    pub uzcard: i64,
    #[serde(default)]
    pub payme: i64,
    #[serde(default)]
    pub click: i64,
    #[serde(default)]
    pub humo: i64,
    #[serde(default)]
    pub apelsin: i64,
}

impl Tenders {
    /// Column name and amount for each tender, in storage order.
    pub fn entries(&self) -> [(&'static str, i64); 6] {
        [
            ("cash", self.cash),
            ("uzcard", self.uzcard),
            ("payme", self.payme),
            ("click", self.click),
            ("humo", self.humo),
            ("apelsin", self.apelsin),
        ]
    }

    /// Sum across all tenders, saturating at the i64 bounds.
    ///
    /// Validated tenders never reach the bound; see [`Tenders::checked_total`].
    pub fn total(&self) -> Money {
        self.entries()
            .into_iter()
            .map(|(_, amount)| Money::from_minor(amount))
            .sum()
    }

    /// Sum across all tenders, `None` on overflow.
    pub fn checked_total(&self) -> Option<Money> {
        self.entries()
            .into_iter()
            .try_fold(Money::zero(), |acc, (_, amount)| acc.checked_add(Money::from_minor(amount)))
    }
}

// =============================================================================
// Reference Data
// =============================================================================

/// A physical store location.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Branch {
    pub id: String,
    pub branch_code: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A till inside a branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalePoint {
    pub id: String,
    pub branch_id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub title: String,
    pub parent_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Catalog entry. Not branch-scoped; stock lives in [`Remainder`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub photo: Option<String>,
    pub title: String,
    pub category_id: Option<String>,
    pub barcode: String,
    pub price: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_minor(self.price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A back-office or till user.
///
/// The password hash is loaded for login checks but never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub login: String,
    #[serde(skip, default)]
    pub password_hash: String,
    pub active: bool,
    pub client_type: ClientType,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

/// Current stock of one barcode at one branch.
///
/// ## Invariants
/// - `quantity >= 0` (CHECK constraint, conditional decrements)
/// - One row per `(branch_id, barcode)` (UNIQUE index)
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Remainder {
    pub id: String,
    pub branch_id: String,
    pub category_id: Option<String>,
    pub product_name: String,
    pub barcode: String,
    pub price_income: i64,
    pub quantity: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Remainder {
    #[inline]
    pub fn price_income(&self) -> Money {
        Money::from_minor(self.price_income)
    }

    /// Whether `qty` units can leave this row without going negative.
    #[inline]
    pub fn can_take(&self, qty: i64) -> bool {
        self.quantity - qty >= 0
    }
}

/// A supplier delivery waiting to be posted into stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Income {
    pub id: String,
    pub branch_id: String,
    pub supplier_id: String,
    #[ts(as = "String")]
    pub date_time: DateTime<Utc>,
    pub status: IncomeStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One delivered product line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct IncomeProduct {
    pub id: String,
    pub income_id: String,
    pub category_id: Option<String>,
    pub product_name: String,
    pub barcode: String,
    pub quantity: i64,
    pub income_price: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Shift Register
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Shift {
    pub id: String,
    pub branch_id: String,
    pub sale_point_id: String,
    pub user_id: String,
    pub status: ShiftStatus,
    #[ts(as = "Option<String>")]
    pub open_shift: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub close_shift: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Running per-tender totals of one shift's cash register.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub shift_id: String,
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub tenders: Tenders,
    pub total_amount: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_minor(self.total_amount)
    }
}

// =============================================================================
// Sale Session
// =============================================================================

/// A cart header.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub branch_id: String,
    pub sale_point_id: String,
    pub shift_id: String,
    pub employee_id: String,
    pub barcode: Option<String>,
    pub status: SaleStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A cart line. One per barcode per sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleProduct {
    pub id: String,
    pub sale_id: String,
    pub category_id: Option<String>,
    pub product_name: String,
    pub barcode: String,
    /// Stock on hand when the line was last scanned.
    pub remaining_quantity: i64,
    pub quantity: i64,
    pub allow_discount: bool,
    pub discount_type: Option<DiscountType>,
    pub discount: i64,
    pub price: i64,
    pub total_amount: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SaleProduct {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_minor(self.price)
    }

    /// The discount to apply to this line, if any.
    pub fn discount_rule(&self) -> Option<Discount> {
        if !self.allow_discount {
            return None;
        }
        self.discount_type.map(|kind| Discount {
            kind,
            value: self.discount,
        })
    }
}

/// A discount as configured on a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discount {
    pub kind: DiscountType,
    pub value: i64,
}

/// A payment recorded against a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub tenders: Tenders,
    pub total_amount: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateBranch {
    pub branch_code: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateBranch {
    pub branch_code: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateSalePoint {
    pub branch_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateSalePoint {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateCategory {
    pub title: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateCategory {
    pub title: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateProduct {
    pub photo: Option<String>,
    pub title: String,
    pub category_id: Option<String>,
    pub barcode: String,
    pub price: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateProduct {
    pub photo: Option<String>,
    pub title: Option<String>,
    pub category_id: Option<String>,
    pub barcode: Option<String>,
    pub price: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateSupplier {
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateSupplier {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: Option<bool>,
}

/// New user as submitted by an admin. The password is hashed before storage.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateUser {
    pub first_name: String,
    pub last_name: String,
    pub login: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub active: bool,
    pub client_type: ClientType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub active: Option<bool>,
    pub client_type: Option<ClientType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateRemainder {
    pub branch_id: String,
    pub category_id: Option<String>,
    pub product_name: String,
    pub barcode: String,
    pub price_income: i64,
    pub quantity: i64,
}

/// Manual stock correction. Barcode and branch are the row's identity and
/// cannot change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateRemainder {
    pub category_id: Option<String>,
    pub product_name: Option<String>,
    pub price_income: Option<i64>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateIncome {
    pub branch_id: String,
    pub supplier_id: String,
    #[ts(as = "Option<String>")]
    pub date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateIncome {
    pub supplier_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateIncomeProduct {
    pub income_id: String,
    pub category_id: Option<String>,
    pub product_name: String,
    pub barcode: String,
    pub quantity: i64,
    pub income_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateShift {
    pub branch_id: String,
    pub user_id: String,
    pub sale_point_id: String,
}

/// New cart. `shift_id` may be omitted; the branch's open shift is used.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateSale {
    pub branch_id: String,
    pub sale_point_id: String,
    pub shift_id: Option<String>,
    pub employee_id: String,
    pub barcode: Option<String>,
}

/// Discount edit on a cart line. Totals are recomputed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateSaleProduct {
    pub allow_discount: Option<bool>,
    pub discount_type: Option<DiscountType>,
    pub discount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreatePayment {
    pub sale_id: String,
    #[serde(flatten)]
    pub tenders: Tenders,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Responses
// =============================================================================

/// A page of records plus the total matching count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub count: i64,
    pub items: Vec<T>,
}

/// Whether a scan started a new cart line or added to an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScanAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScanOutcome {
    pub action: ScanAction,
    pub line: SaleProduct,
}

/// Result of committing a cart.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinalizedSale {
    pub sale: Sale,
    pub register: Transaction,
}

/// Result of posting a delivery.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PostedIncome {
    pub income: Income,
    pub remainders: Vec<Remainder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_type_wire_names() {
        let json = serde_json::to_string(&ClientType::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER-ADMIN\"");
        let parsed: ClientType = serde_json::from_str("\"CASSIER\"").unwrap();
        assert_eq!(parsed, ClientType::Cassier);
    }

    #[test]
    fn test_shift_transitions() {
        assert_eq!(
            ShiftStatus::transition(ShiftMethod::Open),
            (ShiftStatus::New, ShiftStatus::Open)
        );
        assert_eq!(
            ShiftStatus::transition(ShiftMethod::Close),
            (ShiftStatus::Open, ShiftStatus::Closed)
        );
        assert_eq!(ShiftStatus::Open.label(), "Открытая");
        assert_eq!(ShiftStatus::Closed.label(), "Закрытая");
    }

    #[test]
    fn test_shift_method_parse() {
        assert_eq!("open".parse::<ShiftMethod>().unwrap(), ShiftMethod::Open);
        assert_eq!("close".parse::<ShiftMethod>().unwrap(), ShiftMethod::Close);
        assert!("reopen".parse::<ShiftMethod>().is_err());
    }

    #[test]
    fn test_tenders_total() {
        let tenders = Tenders {
            cash: 100,
            uzcard: 20,
            click: 5,
            ..Tenders::default()
        };
        assert_eq!(tenders.total().minor(), 125);
        assert_eq!(tenders.checked_total(), Some(Money::from_minor(125)));
    }

    #[test]
    fn test_tenders_total_overflow() {
        let tenders = Tenders {
            cash: i64::MAX,
            uzcard: 1,
            ..Tenders::default()
        };
        assert_eq!(tenders.checked_total(), None);
        assert_eq!(tenders.total(), Money::from_minor(i64::MAX));
    }

    #[test]
    fn test_payment_request_flattens_tenders() {
        let req: CreatePayment =
            serde_json::from_str(r#"{"sale_id":"s1","cash":100,"payme":50}"#).unwrap();
        assert_eq!(req.tenders.cash, 100);
        assert_eq!(req.tenders.payme, 50);
        assert_eq!(req.tenders.humo, 0);
    }

    #[test]
    fn test_user_never_serializes_hash() {
        let user = User {
            id: "u1".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            login: "ab".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            active: true,
            client_type: ClientType::Cassier,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }
}
