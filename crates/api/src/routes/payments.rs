//! Checkout, gateway callback sinks and refunds.
//!
//! The two callback sinks (user redirect and server notification) are
//! deliberately identical in behavior: both verify the signature before any
//! state is touched, and both may deliver the same payment — the settlement
//! fence turns the duplicate into a success-no-op.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use event_store::EventStore;
use serde::{Deserialize, Serialize};
use settlement::{
    CallbackVerifier, GatewayCallback, GatewayOutcome, RefundOutcome, SettlementOutcome,
};

use crate::error::ApiError;
use crate::routes::bookings::{AppState, parse_aggregate_id};

// -- Request/response types --

#[derive(Deserialize)]
pub struct CallbackRequest {
    pub transaction_ref: String,
    pub outcome: GatewayOutcome,
    pub signature: String,
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub booking_id: String,
    pub invoice_id: String,
    pub transaction_ref: String,
    pub amount_minor: i64,
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub status: String,
    pub tickets: Option<usize>,
}

#[derive(Serialize)]
pub struct RefundResponse {
    pub status: String,
    pub points_reversed: Option<i64>,
}

// -- Handlers --

/// POST /bookings/{id}/checkout — open the invoice and register a payment
/// attempt for the gateway redirect.
#[tracing::instrument(skip(state))]
pub async fn checkout<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let booking_id = parse_aggregate_id(&id)?;
    let session = state.settlement.begin_payment(booking_id, Utc::now()).await?;

    Ok(Json(CheckoutResponse {
        booking_id: session.booking_id.to_string(),
        invoice_id: session.invoice_id.to_string(),
        transaction_ref: session.transaction_ref,
        amount_minor: session.amount.minor(),
    }))
}

/// POST /payments/return — the user-redirect callback sink.
#[tracing::instrument(skip(state, req))]
pub async fn return_callback<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, ApiError> {
    apply_callback(&state, req).await
}

/// POST /payments/notify — the server-to-server notification sink.
#[tracing::instrument(skip(state, req))]
pub async fn notify_callback<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, ApiError> {
    apply_callback(&state, req).await
}

async fn apply_callback<S: EventStore + Clone + 'static>(
    state: &AppState<S>,
    req: CallbackRequest,
) -> Result<Json<CallbackResponse>, ApiError> {
    let callback = GatewayCallback {
        transaction_ref: req.transaction_ref.clone(),
        outcome: req.outcome,
        signature: req.signature,
    };
    state.verifier.verify(&callback)?;

    let now = Utc::now();
    match req.outcome {
        GatewayOutcome::Success => {
            let outcome = state.settlement.settle(&req.transaction_ref, now).await?;
            let response = match outcome {
                SettlementOutcome::Settled { tickets, .. } => CallbackResponse {
                    status: "settled".to_string(),
                    tickets: Some(tickets),
                },
                SettlementOutcome::AlreadyProcessed => CallbackResponse {
                    status: "already_processed".to_string(),
                    tickets: None,
                },
            };
            Ok(Json(response))
        }
        GatewayOutcome::Failure => {
            let reason = req.reason.as_deref().unwrap_or("gateway failure");
            state
                .settlement
                .fail(&req.transaction_ref, reason, now)
                .await?;
            Ok(Json(CallbackResponse {
                status: "recorded".to_string(),
                tickets: None,
            }))
        }
    }
}

/// POST /bookings/{id}/refund — admin refund of a paid booking.
#[tracing::instrument(skip(state))]
pub async fn refund<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<RefundResponse>, ApiError> {
    let booking_id = parse_aggregate_id(&id)?;
    let outcome = state.settlement.refund(booking_id, Utc::now()).await?;

    let response = match outcome {
        RefundOutcome::Refunded {
            points_reversed, ..
        } => RefundResponse {
            status: "refunded".to_string(),
            points_reversed: Some(points_reversed),
        },
        RefundOutcome::AlreadyProcessed => RefundResponse {
            status: "already_processed".to_string(),
            points_reversed: None,
        },
    };

    Ok(Json(response))
}
