//! HTTP error mapping.

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use toolyard_core::ToolyardError;
use utoipa::ToSchema;

use crate::billing::BillingError;

/// Error response payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub message: String,
}

/// Error returned by handlers; rendered as [`ErrorResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Malformed or invalid input.
    BadRequest(String),
    /// Missing or unknown session.
    Unauthorized(String),
    /// Authenticated but not allowed.
    Forbidden(String),
    /// Missing record.
    NotFound(String),
    /// Collides with existing state.
    Conflict(String),
    /// Payment provider failure.
    Payment(String),
    /// Anything else.
    Internal(String),
}

impl ApiError {
    /// Build a not-found error for an entity.
    pub fn not_found(entity: &str, key: &str) -> Self {
        Self::NotFound(format!("{entity} {key} not found"))
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Payment(message)
            | Self::Internal(message) => message,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::Internal(message) = self {
            log::error!("request failed: {message}");
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            message: self.message().to_string(),
        })
    }
}

impl From<ToolyardError> for ApiError {
    fn from(err: ToolyardError) -> Self {
        let message = err.to_string();
        match err {
            ToolyardError::Validation(_) => Self::BadRequest(message),
            ToolyardError::NotFound(_) => Self::NotFound(message),
            ToolyardError::Conflict(_) => Self::Conflict(message),
            ToolyardError::Other(_) => Self::Internal(message),
        }
    }
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound("record not found".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::Conflict(format!("already exists: {}", info.message()))
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                Self::BadRequest(format!("unknown reference: {}", info.message()))
            }
            other => Self::Internal(format!("database error: {other}")),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        log::error!("payment provider failed: {err}");
        Self::Payment(format!("payment provider error: {err}"))
    }
}

impl From<diesel::r2d2::PoolError> for ApiError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::Internal(format!("database pool error: {err}"))
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        Self::Internal(format!("blocking task failed: {err}"))
    }
}

/// Handler result.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn core_errors_map_to_status_codes() {
        let cases = [
            (ToolyardError::validation("bad"), StatusCode::BAD_REQUEST),
            (ToolyardError::not_found("tool"), StatusCode::NOT_FOUND),
            (ToolyardError::conflict("taken"), StatusCode::CONFLICT),
            (ToolyardError::Other("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn diesel_not_found_maps_to_404() {
        let err = ApiError::from(DieselError::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Payment("down".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[actix_web::test]
    async fn error_response_renders_json_message() {
        let response = ApiError::Conflict("slug taken".to_string()).error_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = to_bytes(response.into_body()).await.expect("body");
        let parsed: ErrorResponse = serde_json::from_slice(&body).expect("json");
        assert_eq!(parsed.message, "slug taken");
    }
}
