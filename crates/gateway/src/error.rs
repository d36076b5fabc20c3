use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use chatwire_common::types::ErrorBody;

/// Request-terminating errors.
///
/// Every variant maps onto the one rejection shape the surface ever
/// produces: `{ "success": false, "error": "<message>" }` plus a status
/// code. Guard rejections and handler failures both funnel through here;
/// nothing in the gateway aborts the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Missing or mismatching access token.
    #[error("Invalid Access Token")]
    Auth,

    /// Malformed session identifier in the path.
    #[error("Session should be alphanumerical or -")]
    Validation,

    /// The engine does not know the session; its message is surfaced
    /// verbatim.
    #[error("{0}")]
    NotFound(String),

    /// Admission control rejected the request.
    #[error("{0}")]
    RateLimited(String),

    /// A readiness wait ran out of budget.
    #[error("{0}")]
    Timeout(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
