use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{PriceQuote, ReservationSelection};
use crate::services::reservation::{self, ReservationIntent};
use crate::services::{pricing, venues};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ReservationResponse<'a> {
    pub status: &'static str,
    pub reservation_id: Option<String>,
    pub reservation: ReservationIntent<'a>,
    pub quote: Option<PriceQuote>,
    pub message: &'static str,
}

// POST /api/reservations
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    Json(selection): Json<ReservationSelection>,
) -> Result<Json<serde_json::Value>, AppError> {
    // bad input is rejected before the venue is even looked up
    selection.validate(None)?;

    let key = format!(
        "reserve:{}:{:?}:{:?}:{:?}:{}",
        selection.venue_id, selection.date, selection.start_time, selection.end_time, selection.headcount
    );
    let _guard = state
        .in_flight
        .try_acquire(key)
        .ok_or(AppError::DuplicateSubmission)?;

    let venue = venues::live_venue(&state, &selection.venue_id).await?;
    let submitted = reservation::submit(state.backend.as_ref(), &selection, venue.capacity).await?;

    let response = ReservationResponse {
        status: "accepted",
        reservation_id: submitted.reservation_id.clone(),
        reservation: ReservationIntent::from(&submitted.selection),
        quote: pricing::quote_selection(&submitted.selection, &venue),
        message: "reservation request received; it is confirmed once payment completes",
    };
    serde_json::to_value(response)
        .map(Json)
        .map_err(|e| AppError::Internal(e.to_string()))
}
