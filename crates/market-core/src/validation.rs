//! # Validation
//!
//! Input checks run before any request touches storage.
//!
//! Every request payload implements [`Validate`]; handlers call it first and
//! turn the error into a 400.

use crate::error::ValidationError;
use crate::types::{
    CreateBranch, CreateCategory, CreateIncome, CreateIncomeProduct, CreatePayment, CreateProduct,
    CreateRemainder, CreateSale, CreateSalePoint, CreateShift, CreateSupplier, CreateUser,
    DiscountType, Tenders, UpdateBranch, UpdateCategory, UpdateIncome, UpdateProduct,
    UpdateRemainder, UpdateSaleProduct, UpdateSalePoint, UpdateSupplier, UpdateUser,
};
use crate::{MAX_AMOUNT, MAX_LIST_LIMIT, MIN_PASSWORD_LEN};

pub type ValidationResult<T> = Result<T, ValidationError>;

/// A request payload that can check itself.
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a UUID-formatted identifier.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates an optional UUID reference.
pub fn validate_optional_uuid(field: &str, id: Option<&str>) -> ValidationResult<()> {
    match id {
        Some(id) => validate_uuid(field, id),
        None => Ok(()),
    }
}

/// Validates a required free-text field.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a barcode (EAN-13, UPC-A, internal codes).
///
/// ## Rules
/// - Required, at most 64 characters
/// - Letters, digits and hyphens only
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    validate_text("barcode", barcode, 64)?;

    if !barcode
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters, digits and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates an amount in minor units: `0..=MAX_AMOUNT`.
pub fn validate_amount(field: &str, amount: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT).contains(&amount) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT,
        });
    }

    Ok(())
}

/// Validates a delivered quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock level set by hand.
pub fn validate_stock_level(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates pagination parameters.
pub fn validate_page(limit: i64, offset: i64) -> ValidationResult<()> {
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_LIST_LIMIT,
        });
    }

    if offset < 0 {
        return Err(ValidationError::OutOfRange {
            field: "offset".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a search term and returns it trimmed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a login name.
pub fn validate_login(login: &str) -> ValidationResult<()> {
    validate_text("login", login, 64)?;

    if login.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "login".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }

    Ok(())
}

/// Validates a discount as configured on a cart line.
pub fn validate_discount(kind: Option<DiscountType>, value: i64) -> ValidationResult<()> {
    match kind {
        Some(DiscountType::Percent) if !(0..=100).contains(&value) => {
            Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: 100,
            })
        }
        _ => validate_amount("discount", value),
    }
}

fn validate_tenders(tenders: &Tenders) -> ValidationResult<()> {
    for (field, amount) in tenders.entries() {
        validate_amount(field, amount)?;
    }

    let total = tenders
        .checked_total()
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "total_amount".to_string(),
            min: 0,
            max: MAX_AMOUNT,
        })?;
    validate_amount("total_amount", total.minor())?;

    if total.is_zero() {
        return Err(ValidationError::MustBePositive {
            field: "total_amount".to_string(),
        });
    }

    Ok(())
}

fn validate_if<T>(
    value: Option<&T>,
    check: impl FnOnce(&T) -> ValidationResult<()>,
) -> ValidationResult<()>
where
    T: ?Sized,
{
    value.map_or(Ok(()), check)
}

// =============================================================================
// Request Validation
// =============================================================================

impl Validate for CreateBranch {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("branch_code", &self.branch_code, 32)?;
        validate_text("name", &self.name, 200)
    }
}

impl Validate for UpdateBranch {
    fn validate(&self) -> ValidationResult<()> {
        validate_if(self.branch_code.as_deref(), |v| validate_text("branch_code", v, 32))?;
        validate_if(self.name.as_deref(), |v| validate_text("name", v, 200))
    }
}

impl Validate for CreateSalePoint {
    fn validate(&self) -> ValidationResult<()> {
        validate_uuid("branch_id", &self.branch_id)?;
        validate_text("name", &self.name, 200)
    }
}

impl Validate for UpdateSalePoint {
    fn validate(&self) -> ValidationResult<()> {
        validate_if(self.name.as_deref(), |v| validate_text("name", v, 200))
    }
}

impl Validate for CreateCategory {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("title", &self.title, 200)?;
        validate_optional_uuid("parent_id", self.parent_id.as_deref())
    }
}

impl Validate for UpdateCategory {
    fn validate(&self) -> ValidationResult<()> {
        validate_if(self.title.as_deref(), |v| validate_text("title", v, 200))?;
        validate_optional_uuid("parent_id", self.parent_id.as_deref())
    }
}

impl Validate for CreateProduct {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("title", &self.title, 200)?;
        validate_barcode(&self.barcode)?;
        validate_amount("price", self.price)?;
        validate_optional_uuid("category_id", self.category_id.as_deref())
    }
}

impl Validate for UpdateProduct {
    fn validate(&self) -> ValidationResult<()> {
        validate_if(self.title.as_deref(), |v| validate_text("title", v, 200))?;
        validate_if(self.barcode.as_deref(), validate_barcode)?;
        validate_if(self.price.as_ref(), |v| validate_amount("price", *v))?;
        validate_optional_uuid("category_id", self.category_id.as_deref())
    }
}

impl Validate for CreateSupplier {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("name", &self.name, 200)
    }
}

impl Validate for UpdateSupplier {
    fn validate(&self) -> ValidationResult<()> {
        validate_if(self.name.as_deref(), |v| validate_text("name", v, 200))
    }
}

impl Validate for CreateUser {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("first_name", &self.first_name, 100)?;
        validate_text("last_name", &self.last_name, 100)?;
        validate_login(&self.login)?;
        validate_password(&self.password)
    }
}

impl Validate for UpdateUser {
    fn validate(&self) -> ValidationResult<()> {
        validate_if(self.first_name.as_deref(), |v| validate_text("first_name", v, 100))?;
        validate_if(self.last_name.as_deref(), |v| validate_text("last_name", v, 100))?;
        validate_if(self.password.as_deref(), validate_password)
    }
}

impl Validate for CreateRemainder {
    fn validate(&self) -> ValidationResult<()> {
        validate_uuid("branch_id", &self.branch_id)?;
        validate_optional_uuid("category_id", self.category_id.as_deref())?;
        validate_text("product_name", &self.product_name, 200)?;
        validate_barcode(&self.barcode)?;
        validate_amount("price_income", self.price_income)?;
        validate_stock_level(self.quantity)
    }
}

impl Validate for UpdateRemainder {
    fn validate(&self) -> ValidationResult<()> {
        validate_optional_uuid("category_id", self.category_id.as_deref())?;
        validate_if(self.product_name.as_deref(), |v| {
            validate_text("product_name", v, 200)
        })?;
        validate_if(self.price_income.as_ref(), |v| validate_amount("price_income", *v))?;
        validate_if(self.quantity.as_ref(), |v| validate_stock_level(*v))
    }
}

impl Validate for CreateIncome {
    fn validate(&self) -> ValidationResult<()> {
        validate_uuid("branch_id", &self.branch_id)?;
        validate_uuid("supplier_id", &self.supplier_id)
    }
}

impl Validate for UpdateIncome {
    fn validate(&self) -> ValidationResult<()> {
        validate_optional_uuid("supplier_id", self.supplier_id.as_deref())
    }
}

impl Validate for CreateIncomeProduct {
    fn validate(&self) -> ValidationResult<()> {
        validate_uuid("income_id", &self.income_id)?;
        validate_optional_uuid("category_id", self.category_id.as_deref())?;
        validate_text("product_name", &self.product_name, 200)?;
        validate_barcode(&self.barcode)?;
        validate_quantity(self.quantity)?;
        validate_amount("income_price", self.income_price)
    }
}

impl Validate for CreateShift {
    fn validate(&self) -> ValidationResult<()> {
        validate_uuid("branch_id", &self.branch_id)?;
        validate_uuid("user_id", &self.user_id)?;
        validate_uuid("sale_point_id", &self.sale_point_id)
    }
}

impl Validate for CreateSale {
    fn validate(&self) -> ValidationResult<()> {
        validate_uuid("branch_id", &self.branch_id)?;
        validate_uuid("sale_point_id", &self.sale_point_id)?;
        validate_optional_uuid("shift_id", self.shift_id.as_deref())?;
        validate_uuid("employee_id", &self.employee_id)?;
        validate_if(self.barcode.as_deref(), validate_barcode)
    }
}

impl Validate for UpdateSaleProduct {
    fn validate(&self) -> ValidationResult<()> {
        validate_if(self.discount.as_ref(), |v| {
            validate_discount(self.discount_type, *v)
        })
    }
}

impl Validate for CreatePayment {
    fn validate(&self) -> ValidationResult<()> {
        validate_uuid("sale_id", &self.sale_id)?;
        validate_tenders(&self.tenders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientType;

    const ID: &str = "6f1c1f5e-8a3a-4d7e-9f43-2b8b1a7c9d10";

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", ID).is_ok());
        assert!(matches!(
            validate_uuid("sale_id", "not-a-uuid"),
            Err(ValidationError::InvalidFormat { field, .. }) if field == "sale_id"
        ));
        assert!(matches!(
            validate_uuid("sale_id", "  "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_barcode() {
        assert!(validate_barcode("4780001234567").is_ok());
        assert!(validate_barcode("INT-001").is_ok());
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("12 34").is_err());
        assert!(validate_barcode(&"9".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(10, 0).is_ok());
        assert!(validate_page(0, 0).is_err());
        assert!(validate_page(MAX_LIST_LIMIT + 1, 0).is_err());
        assert!(validate_page(10, -1).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(Some(DiscountType::Percent), 100).is_ok());
        assert!(validate_discount(Some(DiscountType::Percent), 101).is_err());
        assert!(validate_discount(Some(DiscountType::Sum), 50_000).is_ok());
        assert!(validate_discount(Some(DiscountType::Sum), -1).is_err());
    }

    #[test]
    fn test_payment_requires_positive_total() {
        let empty = CreatePayment {
            sale_id: ID.to_string(),
            tenders: Tenders::default(),
        };
        assert!(matches!(
            empty.validate(),
            Err(ValidationError::MustBePositive { .. })
        ));

        let negative = CreatePayment {
            sale_id: ID.to_string(),
            tenders: Tenders {
                cash: 100,
                humo: -5,
                ..Tenders::default()
            },
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_payment_amounts_are_bounded() {
        let overflowing = CreatePayment {
            sale_id: ID.to_string(),
            tenders: Tenders {
                cash: i64::MAX,
                uzcard: 1,
                ..Tenders::default()
            },
        };
        assert!(matches!(
            overflowing.validate(),
            Err(ValidationError::OutOfRange { field, max, .. }) if field == "cash" && max == MAX_AMOUNT
        ));

        // Each tender fits, the sum does not.
        let over_total = CreatePayment {
            sale_id: ID.to_string(),
            tenders: Tenders {
                cash: MAX_AMOUNT,
                humo: 1,
                ..Tenders::default()
            },
        };
        assert!(matches!(
            over_total.validate(),
            Err(ValidationError::OutOfRange { field, .. }) if field == "total_amount"
        ));

        let at_limit = CreatePayment {
            sale_id: ID.to_string(),
            tenders: Tenders {
                cash: MAX_AMOUNT,
                ..Tenders::default()
            },
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_amount_bounds() {
        assert!(validate_amount("price", 0).is_ok());
        assert!(validate_amount("price", MAX_AMOUNT).is_ok());
        assert!(validate_amount("price", MAX_AMOUNT + 1).is_err());
        assert!(validate_amount("price", -1).is_err());
    }

    #[test]
    fn test_user_password_length() {
        let user = CreateUser {
            first_name: "Aziz".to_string(),
            last_name: "Karimov".to_string(),
            login: "aziz".to_string(),
            password: "12345".to_string(),
            active: true,
            client_type: ClientType::Cassier,
        };
        assert!(matches!(
            user.validate(),
            Err(ValidationError::TooShort { min, .. }) if min == MIN_PASSWORD_LEN
        ));
    }

    #[test]
    fn test_income_line_quantity_must_be_positive() {
        let line = CreateIncomeProduct {
            income_id: ID.to_string(),
            category_id: None,
            product_name: "Cola".to_string(),
            barcode: "123".to_string(),
            quantity: 0,
            income_price: 4500,
        };
        assert!(matches!(
            line.validate(),
            Err(ValidationError::MustBePositive { .. })
        ));
    }
}
