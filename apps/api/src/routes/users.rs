//! User management. Every endpoint requires a SUPER-ADMIN caller.

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use market_core::{ClientType, CreateUser, UpdateUser, User};
use serde_json::Value;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::response::Envelope;
use crate::routes::crud;
use crate::AppState;

pub async fn create(
    caller: CurrentUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUser>,
) -> ApiResult<Envelope<User>> {
    caller.require(ClientType::SuperAdmin)?;
    let user = state.within(state.db.users().create(&req)).await?;
    Ok(Envelope::created(user))
}

pub async fn list(
    caller: CurrentUser,
    state: State<AppState>,
    query: RawQuery,
) -> ApiResult<Envelope<Value>> {
    caller.require(ClientType::SuperAdmin)?;
    crud::list::<User>(state, query).await
}

pub async fn get(
    caller: CurrentUser,
    state: State<AppState>,
    id: Path<String>,
) -> ApiResult<Envelope<User>> {
    caller.require(ClientType::SuperAdmin)?;
    crud::get::<User>(state, id).await
}

/// Rehashes the password when one is given.
pub async fn update(
    caller: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateUser>,
) -> ApiResult<Envelope<User>> {
    caller.require(ClientType::SuperAdmin)?;
    let user = state.within(state.db.users().update(&id, &req)).await?;
    Ok(Envelope::accepted(user))
}

pub async fn delete(
    caller: CurrentUser,
    state: State<AppState>,
    id: Path<String>,
) -> ApiResult<StatusCode> {
    caller.require(ClientType::SuperAdmin)?;
    crud::delete::<User>(state, id).await
}
