//! Seat map query.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ScreeningId;
use event_store::EventStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::bookings::AppState;

#[derive(Serialize)]
pub struct SeatMapSeat {
    pub seat_id: String,
    pub row: String,
    pub number: u32,
    pub seat_type: String,
    pub status: String,
    pub hold_expires_at: Option<String>,
}

#[derive(Serialize)]
pub struct SeatMapResponse {
    pub screening_id: String,
    pub seats: Vec<SeatMapSeat>,
    pub available: usize,
}

/// GET /screenings/{id}/seats — per-seat status for re-rendering selection.
#[tracing::instrument(skip(state))]
pub async fn seat_map<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SeatMapResponse>, ApiError> {
    let uuid = uuid::Uuid::parse_str(&id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid screening id: {e}")))?;
    let screening_id = ScreeningId::from_uuid(uuid);

    let seating = state
        .bookings
        .seat_map(screening_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No seating for screening {id}")))?;

    let seats: Vec<SeatMapSeat> = seating
        .seats()
        .map(|seat| SeatMapSeat {
            seat_id: seat.seat_id.to_string(),
            row: seat.row.clone(),
            number: seat.number,
            seat_type: seat.seat_type.to_string(),
            status: seat.status.to_string(),
            hold_expires_at: seat.hold_expires_at.map(|at| at.to_rfc3339()),
        })
        .collect();

    Ok(Json(SeatMapResponse {
        screening_id: id,
        available: seating.available_count(),
        seats,
    }))
}
