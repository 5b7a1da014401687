//! HTTP response types and utilities

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::defaults::DEFAULT_AUTH_REALM;
use crate::errors::AuthError;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(self)).into_response()
    }
}

/// JSON error envelope with an explicit status
pub fn api_error<S: Into<String>>(status: StatusCode, message: S) -> Response {
    (status, Json(ApiResponse::<()>::error(message.into()))).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::UserExists { .. } => StatusCode::CONFLICT,
            AuthError::UserNotFound { .. } => StatusCode::NOT_FOUND,
            AuthError::Hash(_) | AuthError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        api_error(status, self.to_string())
    }
}

/// Generic failure with no detail, used when the gateway fails closed
pub fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

pub fn access_denied() -> Response {
    (StatusCode::FORBIDDEN, "Access Denied").into_response()
}

/// 401 with a Basic challenge
pub fn unauthorized() -> Response {
    let challenge = format!("Basic realm=\"{DEFAULT_AUTH_REALM}\"");
    let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, value);
    }
    response
}
