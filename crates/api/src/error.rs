//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CategoryError, DomainError, StockError};
use ledger::LedgerError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Stock(stock_err) => match stock_err {
            StockError::NotRegistered => (StatusCode::NOT_FOUND, err.to_string()),
            StockError::AlreadyRegistered
            | StockError::InsufficientStock { .. }
            | StockError::ReservationExceedsStock { .. }
            | StockError::ReleaseExceedsReserved { .. } => (StatusCode::CONFLICT, err.to_string()),
            StockError::InvalidQuantity { .. } | StockError::InvalidThresholds { .. } => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
        },
        DomainError::Category(category_err) => match category_err {
            CategoryError::NotFound(_) | CategoryError::ParentNotFound(_) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            CategoryError::Cycle(_)
            | CategoryError::HasChildren(_)
            | CategoryError::HasProducts(_) => (StatusCode::CONFLICT, err.to_string()),
        },
        DomainError::Ledger(LedgerError::ProductNotFound(_)) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        DomainError::Ledger(LedgerError::SequenceConflict { .. })
        | DomainError::Conflict { .. } => (StatusCode::CONFLICT, err.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CategoryId, ProductId};

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn stock_errors_map_to_expected_statuses() {
        assert_eq!(
            status_of(DomainError::Stock(StockError::NotRegistered).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                DomainError::Stock(StockError::InsufficientStock {
                    requested: 10,
                    available: 3,
                })
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::Stock(StockError::InvalidQuantity { quantity: 0 }).into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn category_errors_map_to_expected_statuses() {
        let id = CategoryId::new();
        assert_eq!(
            status_of(DomainError::Category(CategoryError::NotFound(id)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::Category(CategoryError::Cycle(id)).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::Category(CategoryError::HasChildren(id)).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn conflict_and_internal_statuses() {
        assert_eq!(
            status_of(
                DomainError::Conflict {
                    product_id: ProductId::new(),
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
