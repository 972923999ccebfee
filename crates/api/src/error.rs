//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{BookingError, CatalogError, DomainError, SeatingError};
use event_store::EventStoreError;
use settlement::{InvoiceError, SettlementError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Settlement error.
    Settlement(SettlementError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Settlement(err) => settlement_error_to_response(err),
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
        DomainError::Booking(booking_err) => match booking_err {
            // Distinct signal: the hold collapsed before the action landed.
            BookingError::HoldLapsed => (StatusCode::GONE, err.to_string()),
            BookingError::InvalidStateTransition { .. } => {
                (StatusCode::CONFLICT, err.to_string())
            }
            BookingError::HoldStillActive => (StatusCode::CONFLICT, err.to_string()),
            BookingError::AlreadyCreated
            | BookingError::InvalidSeatCount { .. }
            | BookingError::GuestCannotRedeem
            | BookingError::InsufficientPoints { .. }
            | BookingError::DiscountExceedsCap { .. }
            | BookingError::DuplicateSeat { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        },
        DomainError::Seating(seating_err) => match seating_err {
            // Contention: the client should re-render and pick again.
            SeatingError::SeatsUnavailable { .. } => (StatusCode::CONFLICT, err.to_string()),
            // Layout violation gets its own status so clients can show the
            // orphan-seat explanation.
            SeatingError::Orphan(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            SeatingError::UnknownSeat { .. } | SeatingError::EmptyLayout => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            SeatingError::NotOpen | SeatingError::NothingHeld { .. } => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            SeatingError::AlreadyOpen => (StatusCode::CONFLICT, err.to_string()),
        },
        DomainError::Catalog(catalog_err) => match catalog_err {
            CatalogError::ScreeningNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
            CatalogError::MovieArchived(_) | CatalogError::ComboNotFound(_) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
        },
        DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        DomainError::AggregateNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::Loyalty(_) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn settlement_error_to_response(err: SettlementError) -> (StatusCode, String) {
    match &err {
        SettlementError::SignatureRejected => (StatusCode::UNAUTHORIZED, err.to_string()),
        SettlementError::BadReference(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        SettlementError::BookingNotFound(_) | SettlementError::InvoiceNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        SettlementError::BookingExpired => (StatusCode::GONE, err.to_string()),
        SettlementError::BookingNotPayable(_) | SettlementError::NothingToRefund(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        SettlementError::Invoice(InvoiceError::InvalidStatus { .. }) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        // Reuse the domain mapping for wrapped booking/seating errors.
        SettlementError::Domain(inner) => domain_error_to_response_ref(inner, err.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn domain_error_to_response_ref(err: &DomainError, message: String) -> (StatusCode, String) {
    let status = match err {
        DomainError::Booking(BookingError::HoldLapsed) => StatusCode::GONE,
        DomainError::Booking(BookingError::InvalidStateTransition { .. }) => StatusCode::CONFLICT,
        DomainError::Booking(_) => StatusCode::BAD_REQUEST,
        DomainError::Seating(SeatingError::SeatsUnavailable { .. }) => StatusCode::CONFLICT,
        DomainError::Seating(SeatingError::Orphan(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Catalog(CatalogError::ScreeningNotFound(_)) => StatusCode::NOT_FOUND,
        DomainError::Catalog(_) => StatusCode::BAD_REQUEST,
        DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
            StatusCode::CONFLICT
        }
        DomainError::AggregateNotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, message)
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        ApiError::Settlement(err)
    }
}
