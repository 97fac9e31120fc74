//! Response envelope shared by every endpoint.
//!
//! ```json
//! { "status": 201, "description": "success", "data": { ... } }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `{status, description, data}`, with `description` derived from the
/// status class.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip)]
    code: StatusCode,
    status: u16,
    description: &'static str,
    data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(code: StatusCode, data: T) -> Self {
        let description = if code.as_u16() < 400 { "success" } else { "error" };
        Envelope {
            code,
            status: code.as_u16(),
            description,
            data,
        }
    }

    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, data)
    }

    pub fn created(data: T) -> Self {
        Self::new(StatusCode::CREATED, data)
    }

    /// Updates answer 202.
    pub fn accepted(data: T) -> Self {
        Self::new(StatusCode::ACCEPTED, data)
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}
