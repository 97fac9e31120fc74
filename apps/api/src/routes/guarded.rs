//! Writes that must respect cross-table rules, so they go through the
//! reconcile workflows rather than the plain record store.
//!
//! - `POST /v1/sale` needs the branch's open shift
//! - `POST /v1/shift` allows one unclosed shift per branch
//! - `POST /v1/payment` only on a sale that is still `new`
//! - `POST /v1/income_product` only on an income that is still `open`
//! - `PUT|DELETE /v1/sale_products/{id}` only while the sale is `new`
//! - `DELETE /v1/sale/{id}` and `DELETE /v1/payment/{id}` only while the sale
//!   is `new`
//! - `DELETE /v1/income/{id}` and `DELETE /v1/income_product/{id}` only while
//!   the income is `open`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use market_core::{
    CreateIncomeProduct, CreatePayment, CreateSale, CreateShift, IncomeProduct, Payment, Sale,
    SaleProduct, Shift, UpdateSaleProduct,
};

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::response::Envelope;
use crate::AppState;

pub async fn create_sale(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateSale>,
) -> ApiResult<Envelope<Sale>> {
    let sale = state.within(state.db.reconcile().create_sale(&req)).await?;
    Ok(Envelope::created(sale))
}

pub async fn create_shift(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateShift>,
) -> ApiResult<Envelope<Shift>> {
    let shift = state.within(state.db.reconcile().create_shift(&req)).await?;
    Ok(Envelope::created(shift))
}

pub async fn create_payment(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreatePayment>,
) -> ApiResult<Envelope<Payment>> {
    let payment = state.within(state.db.reconcile().add_payment(&req)).await?;
    Ok(Envelope::created(payment))
}

pub async fn create_income_product(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateIncomeProduct>,
) -> ApiResult<Envelope<IncomeProduct>> {
    let line = state.within(state.db.reconcile().add_income_line(&req)).await?;
    Ok(Envelope::created(line))
}

/// Discount edit; totals are recomputed.
pub async fn update_sale_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateSaleProduct>,
) -> ApiResult<Envelope<SaleProduct>> {
    let line = state.within(state.db.reconcile().update_line(&id, &req)).await?;
    Ok(Envelope::accepted(line))
}

pub async fn delete_sale_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.within(state.db.reconcile().remove_line(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_sale(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.within(state.db.reconcile().delete_sale(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.within(state.db.reconcile().remove_payment(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_income(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.within(state.db.reconcile().delete_income(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_income_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.within(state.db.reconcile().remove_income_line(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
