//! JWT authentication module.
//!
//! Issues access tokens at login and guards everything under `/v1`.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! require_auth ── missing / malformed / expired / forged ──► 401
//!        │
//!        ▼
//! CurrentUser in request extensions ──► handler
//!        │
//!        └── user management: require(SUPER-ADMIN) ──► 403
//! ```

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use market_core::{ClientType, User, TOKEN_TTL_HOURS};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,

    pub client_type: ClientType,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// JWT token manager.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl JwtManager {
    /// Create a manager issuing tokens valid for `TOKEN_TTL_HOURS`.
    pub fn new(secret: &str) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(TOKEN_TTL_HOURS),
        }
    }

    /// Generate an access token for a user.
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user.id.clone(),
            client_type: user.client_type,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, ApiError> {
        encode(&Header::default(), claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {e}")))
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::Unauthorized("token expired".to_string()),
                _ => ApiError::Unauthorized("invalid token".to_string()),
            })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
    pub client_type: ClientType,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        CurrentUser {
            user_id: claims.user_id,
            client_type: claims.client_type,
        }
    }
}

impl CurrentUser {
    /// Fails `Forbidden` unless the caller has the given client type.
    pub fn require(&self, client_type: ClientType) -> Result<(), ApiError> {
        if self.client_type == client_type {
            return Ok(());
        }
        warn!(
            user_id = %self.user_id,
            client_type = %self.client_type,
            required = %client_type,
            "Permission denied"
        );
        Err(ApiError::Forbidden(format!("{client_type} access required")))
    }
}

/// Reads the user that `require_auth` stored on the request.
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("user not authenticated".to_string()))
    }
}

/// Middleware for the `/v1` routes: validates the bearer token and stores
/// the caller in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(header) = header else {
        warn!(uri = %req.uri(), "Missing authorization header");
        return Err(ApiError::Unauthorized("user not authenticated".to_string()));
    };

    let token = extract_bearer_token(header)
        .ok_or_else(|| ApiError::Unauthorized("invalid authorization header".to_string()))?;

    match state.jwt.validate(token) {
        Ok(claims) => {
            req.extensions_mut().insert(CurrentUser::from(claims));
            Ok(next.run(req).await)
        }
        Err(e) => {
            warn!(uri = %req.uri(), error = %e, "Token rejected");
            Err(e)
        }
    }
}
