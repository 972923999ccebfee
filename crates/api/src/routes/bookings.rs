//! Booking lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use common::{AggregateId, CustomerId, ScreeningId};
use domain::{
    Booking, BookingService, CancelBooking, ComboSelection, HoldSeats, InMemoryCatalog,
    InMemoryLoyaltyService, RedeemPoints, SetCombos,
};
use event_store::EventStore;
use projections::{DailyRevenueView, MovieRevenueView, ProjectionProcessor, TicketsView};
use serde::{Deserialize, Serialize};
use settlement::{
    InMemoryNotifier, InMemoryProcessingLog, SettlementCoordinator, SharedSecretVerifier,
};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore + Clone> {
    pub bookings: Arc<BookingService<S, InMemoryCatalog, InMemoryLoyaltyService>>,
    pub settlement: SettlementCoordinator<
        S,
        InMemoryCatalog,
        InMemoryLoyaltyService,
        InMemoryProcessingLog,
        InMemoryNotifier,
    >,
    pub verifier: SharedSecretVerifier,
    pub daily_revenue: DailyRevenueView,
    pub movie_revenue: MovieRevenueView,
    pub tickets: TicketsView,
    pub event_store: S,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct HoldSeatsRequest {
    pub screening_id: String,
    pub seat_ids: Vec<String>,
    pub customer_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ComboItemRequest {
    pub combo_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct SetCombosRequest {
    pub items: Vec<ComboItemRequest>,
}

#[derive(Deserialize)]
pub struct RedeemPointsRequest {
    pub points: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct SeatResponse {
    pub seat_id: String,
    pub row: String,
    pub number: u32,
    pub seat_type: String,
    pub price_minor: i64,
}

#[derive(Serialize)]
pub struct ComboResponse {
    pub combo_id: String,
    pub name: String,
    pub quantity: u32,
    pub remaining: u32,
    pub unit_price_minor: i64,
}

#[derive(Serialize)]
pub struct TicketResponse {
    pub code: String,
    pub seat_id: String,
    pub expires_at: String,
}

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub customer_id: Option<String>,
    pub screening_id: Option<String>,
    pub state: String,
    pub seats: Vec<SeatResponse>,
    pub combos: Vec<ComboResponse>,
    pub subtotal_minor: i64,
    pub discount_minor: i64,
    pub total_minor: i64,
    pub expires_at: Option<String>,
    pub tickets: Vec<TicketResponse>,
}

impl BookingResponse {
    pub(crate) fn from_booking(id: AggregateId, booking: &Booking) -> Self {
        Self {
            id: id.to_string(),
            customer_id: booking.customer().map(|c| c.to_string()),
            screening_id: booking.screening().map(|s| s.screening_id.to_string()),
            state: booking.state().to_string(),
            seats: booking
                .seats()
                .iter()
                .map(|seat| SeatResponse {
                    seat_id: seat.seat_id.to_string(),
                    row: seat.row.clone(),
                    number: seat.number,
                    seat_type: seat.seat_type.to_string(),
                    price_minor: seat.price.minor(),
                })
                .collect(),
            combos: booking
                .combos()
                .iter()
                .map(|line| ComboResponse {
                    combo_id: line.combo_id.clone(),
                    name: line.name.clone(),
                    quantity: line.quantity,
                    remaining: line.remaining,
                    unit_price_minor: line.unit_price.minor(),
                })
                .collect(),
            subtotal_minor: booking.subtotal().minor(),
            discount_minor: booking.discount().minor(),
            total_minor: booking.total().minor(),
            expires_at: booking.expires_at().map(|at| at.to_rfc3339()),
            tickets: booking
                .tickets()
                .iter()
                .map(|ticket| TicketResponse {
                    code: ticket.code.clone(),
                    seat_id: ticket.seat_id.to_string(),
                    expires_at: ticket.expires_at.to_rfc3339(),
                })
                .collect(),
        }
    }
}

pub(crate) fn parse_aggregate_id(raw: &str) -> Result<AggregateId, ApiError> {
    let uuid = uuid::Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid id: {e}")))?;
    Ok(AggregateId::from_uuid(uuid))
}

// -- Handlers --

/// POST /bookings — validate, hold seats and open the booking.
#[tracing::instrument(skip(state, req))]
pub async fn hold<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<HoldSeatsRequest>,
) -> Result<(axum::http::StatusCode, Json<BookingResponse>), ApiError> {
    let screening_uuid = uuid::Uuid::parse_str(&req.screening_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid screening_id: {e}")))?;
    let screening_id = ScreeningId::from_uuid(screening_uuid);

    let customer = match &req.customer_id {
        Some(raw) => {
            let uuid = uuid::Uuid::parse_str(raw)
                .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
            Some(CustomerId::from_uuid(uuid))
        }
        None => None,
    };

    let seat_ids = req.seat_ids.iter().map(|s| s.as_str().into()).collect();

    let cmd = HoldSeats::new(screening_id, seat_ids, customer);
    let booking_id = cmd.booking_id;
    let result = state.bookings.hold_seats(cmd, Utc::now()).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(BookingResponse::from_booking(booking_id, &result.aggregate)),
    ))
}

/// GET /bookings/{id} — load a booking aggregate by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_aggregate_id(&id)?;
    let booking = state
        .bookings
        .get_booking(booking_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))?;

    Ok(Json(BookingResponse::from_booking(booking_id, &booking)))
}

/// POST /bookings/{id}/cancel — cancel a held booking, releasing seats.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_aggregate_id(&id)?;
    let result = state
        .bookings
        .cancel(CancelBooking::new(booking_id), Utc::now())
        .await?;

    Ok(Json(BookingResponse::from_booking(
        booking_id,
        &result.aggregate,
    )))
}

/// PUT /bookings/{id}/combos — replace combo line items wholesale.
#[tracing::instrument(skip(state, req))]
pub async fn set_combos<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<SetCombosRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_aggregate_id(&id)?;
    let selections = req
        .items
        .into_iter()
        .map(|item| ComboSelection {
            combo_id: item.combo_id,
            quantity: item.quantity,
        })
        .collect();

    let result = state
        .bookings
        .set_combos(SetCombos::new(booking_id, selections), Utc::now())
        .await?;

    Ok(Json(BookingResponse::from_booking(
        booking_id,
        &result.aggregate,
    )))
}

/// POST /bookings/{id}/points — redeem loyalty points into a discount.
#[tracing::instrument(skip(state, req))]
pub async fn redeem_points<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<RedeemPointsRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_aggregate_id(&id)?;

    if req.points <= 0 {
        return Err(ApiError::BadRequest(
            "points must be positive".to_string(),
        ));
    }

    let result = state
        .bookings
        .redeem_points(RedeemPoints::new(booking_id, req.points), Utc::now())
        .await?;

    Ok(Json(BookingResponse::from_booking(
        booking_id,
        &result.aggregate,
    )))
}
