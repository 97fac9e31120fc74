//! `POST /login`: trades a login and password for an access token.

use axum::extract::State;
use market_core::User;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::response::Envelope;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Envelope<LoginResponse>> {
    if req.login.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("login and password are required".to_string()));
    }

    let user = state
        .within(state.db.users().authenticate(&req.login, &req.password))
        .await?;

    let Some(user) = user else {
        warn!(login = %req.login.trim(), "Login rejected");
        return Err(ApiError::Unauthorized("invalid login or password".to_string()));
    };

    let access_token = state.jwt.issue(&user)?;
    info!(user_id = %user.id, client_type = %user.client_type, "User logged in");

    Ok(Envelope::ok(LoginResponse { access_token, user }))
}
