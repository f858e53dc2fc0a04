use serde::Serialize;

use crate::errors::AppError;
use crate::models::{ReservationOutcome, ReservationSelection, ValidatedSelection};
use crate::services::backend::BookingBackend;

#[derive(Debug, Clone)]
pub struct SubmittedReservation {
    pub selection: ValidatedSelection,
    pub reservation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReservationIntent<'a> {
    pub venue_id: &'a str,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub headcount: u32,
}

impl<'a> From<&'a ValidatedSelection> for ReservationIntent<'a> {
    fn from(s: &'a ValidatedSelection) -> Self {
        Self {
            venue_id: &s.venue_id,
            date: s.date.format("%Y-%m-%d").to_string(),
            start_time: s.start_time.format("%H:%M").to_string(),
            end_time: s.end_time.format("%H:%M").to_string(),
            headcount: s.headcount,
        }
    }
}

/// Validates locally, then sends the reservation intent. Nothing reaches the
/// backend unless validation passes. Acceptance is not a confirmation: the
/// booking only stands once payment is approved.
pub async fn submit(
    backend: &dyn BookingBackend,
    selection: &ReservationSelection,
    capacity: Option<u32>,
) -> Result<SubmittedReservation, AppError> {
    let validated = selection.validate(capacity)?;

    let outcome = backend.submit_reservation(&validated).await.map_err(|e| {
        tracing::error!(venue_id = %validated.venue_id, error = %e, "reservation submission failed");
        AppError::from(e)
    })?;

    match outcome {
        ReservationOutcome::Accepted { reservation_id } => {
            tracing::info!(
                venue_id = %validated.venue_id,
                date = %validated.date,
                reservation_id = ?reservation_id,
                "reservation intent accepted"
            );
            Ok(SubmittedReservation {
                selection: validated,
                reservation_id,
            })
        }
        ReservationOutcome::Rejected { reason } => {
            tracing::warn!(venue_id = %validated.venue_id, reason = %reason, "reservation intent rejected");
            Err(AppError::ReservationRejected(reason))
        }
    }
}
