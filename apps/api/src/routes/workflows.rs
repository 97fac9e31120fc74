//! Reconciliation endpoints.
//!
//! ```text
//! GET  /v1/sale/scan-barcode?sale_id&branch_id&barcode  201 {action, line}
//! GET  /v1/dosale?sale_id&branch_id                      200 {sale, register}
//! POST /v1/doincome/{coming_id}                          200 {income, remainders}
//! PUT  /v1/shift_table/{id}?method=open|close            200 shift
//! ```

use axum::extract::{Path, State};
use market_core::validation::{validate_barcode, validate_uuid};
use market_core::{FinalizedSale, PostedIncome, ScanOutcome, Shift, ShiftMethod};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::response::Envelope;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    pub sale_id: String,
    pub branch_id: String,
    pub barcode: String,
}

#[derive(Debug, Deserialize)]
pub struct SaleQuery {
    pub sale_id: String,
    pub branch_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MethodQuery {
    pub method: String,
}

pub async fn scan_barcode(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<ScanQuery>,
) -> ApiResult<Envelope<ScanOutcome>> {
    validate_uuid("sale_id", &q.sale_id)?;
    validate_uuid("branch_id", &q.branch_id)?;
    validate_barcode(q.barcode.trim())?;

    let outcome = state
        .within(state.db.reconcile().scan_barcode(&q.sale_id, &q.branch_id, &q.barcode))
        .await?;
    Ok(Envelope::created(outcome))
}

pub async fn finalize_sale(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<SaleQuery>,
) -> ApiResult<Envelope<FinalizedSale>> {
    validate_uuid("sale_id", &q.sale_id)?;
    validate_uuid("branch_id", &q.branch_id)?;

    let finalized = state
        .within(state.db.reconcile().finalize_sale(&q.sale_id, &q.branch_id))
        .await?;
    Ok(Envelope::ok(finalized))
}

pub async fn post_income(
    State(state): State<AppState>,
    Path(coming_id): Path<String>,
) -> ApiResult<Envelope<PostedIncome>> {
    validate_uuid("coming_id", &coming_id)?;

    let posted = state.within(state.db.reconcile().post_income(&coming_id)).await?;
    Ok(Envelope::ok(posted))
}

pub async fn set_shift_method(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(q): ApiQuery<MethodQuery>,
) -> ApiResult<Envelope<Shift>> {
    validate_uuid("id", &id)?;
    let method: ShiftMethod = q.method.parse()?;

    let shift = state.within(state.db.reconcile().set_shift_method(&id, method)).await?;
    Ok(Envelope::ok(shift))
}
