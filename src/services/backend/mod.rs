pub mod envelope;
pub mod http;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{ReservationOutcome, TimeSlot, ValidatedSelection, Venue};

#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("backend returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("unexpected backend response: {0}")]
    Decode(String),
}

/// The booking backend: venues, availability and reservation intents.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn venue(&self, venue_id: &str) -> Result<Venue, BackendError>;

    /// Start times still bookable on `date`. An empty list is a valid answer.
    async fn availability(
        &self,
        venue_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, BackendError>;

    async fn submit_reservation(
        &self,
        selection: &ValidatedSelection,
    ) -> Result<ReservationOutcome, BackendError>;
}
