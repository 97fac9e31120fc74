//! # Cart Rules
//!
//! Pure decisions behind barcode scanning. The database layer loads the
//! stock row and the existing cart line, asks [`plan_scan`] what to do, then
//! applies the plan with a conditional write.
//!
//! ## Scan Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  scan "123" into sale S1 at branch B1                                  │
//! │                                                                         │
//! │  Remainder(B1, "123") ──► none ──────────────► ProductNotFound         │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  SaleProduct(S1, "123")                                                │
//! │     ├── none ─► stock ≥ 1 ? ─► Create { qty 1, total = price }         │
//! │     │                 └──────► LimitExceeded                            │
//! │     └── qty n ─► stock - (n+1) ≥ 0 ? ─► Increment { qty n+1 }          │
//! │                               └───────► LimitExceeded                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Discount, DiscountType, Remainder, SaleProduct};
use crate::MAX_AMOUNT;

/// What a scan should do to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPlan {
    /// Start a new line with one unit, priced at the stock's income price.
    Create {
        remaining_quantity: i64,
        price: Money,
        total_amount: Money,
    },
    /// Add one unit to the existing line. `from_quantity` is what the line
    /// held when it was read; the write must only apply if it still does.
    Increment {
        line_id: String,
        from_quantity: i64,
        quantity: i64,
        remaining_quantity: i64,
        total_amount: Money,
    },
}

/// Decides how a scan changes the cart.
///
/// ## Errors
/// - `LimitExceeded` if the cart would hold more units than the branch has
/// - `Validation` if the line total leaves the amount range
pub fn plan_scan(stock: &Remainder, existing: Option<&SaleProduct>) -> CoreResult<ScanPlan> {
    match existing {
        None => {
            if !stock.can_take(1) {
                return Err(CoreError::LimitExceeded {
                    barcode: stock.barcode.clone(),
                    available: stock.quantity,
                    requested: 1,
                });
            }
            let price = stock.price_income();
            Ok(ScanPlan::Create {
                remaining_quantity: stock.quantity,
                price,
                total_amount: line_total(price, 1, None)?,
            })
        }
        Some(line) => {
            let quantity = line.quantity + 1;
            if !stock.can_take(quantity) {
                return Err(CoreError::LimitExceeded {
                    barcode: stock.barcode.clone(),
                    available: stock.quantity,
                    requested: quantity,
                });
            }
            Ok(ScanPlan::Increment {
                line_id: line.id.clone(),
                from_quantity: line.quantity,
                quantity,
                remaining_quantity: stock.quantity,
                total_amount: line_total(line.price(), quantity, line.discount_rule())?,
            })
        }
    }
}

/// Line total: `price × quantity`, less the discount if one applies.
///
/// Never negative. Fails with `Validation` when `price × quantity` overflows
/// or exceeds `MAX_AMOUNT`.
pub fn line_total(price: Money, quantity: i64, discount: Option<Discount>) -> CoreResult<Money> {
    let gross = price
        .multiply_quantity(quantity)
        .filter(|gross| gross.minor() <= MAX_AMOUNT)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "total_amount".to_string(),
            min: 0,
            max: MAX_AMOUNT,
        })?;

    Ok(match discount {
        None => gross,
        Some(Discount {
            kind: DiscountType::Sum,
            value,
        }) => (gross - Money::from_minor(value)).floor_zero(),
        Some(Discount {
            kind: DiscountType::Percent,
            value,
        }) => {
            let bps = value.clamp(0, 100) as u32 * 100;
            gross.apply_percentage_discount(bps).floor_zero()
        }
    })
}
