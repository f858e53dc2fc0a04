use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::AppError;
use crate::models::{PriceQuote, SlotSet, TimeSlot};
use crate::services::availability::{resolve_slots, Resolution};
use crate::services::{pricing, venues};
use crate::state::AppState;

// GET /api/venues/:id
pub async fn get_venue(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
) -> Result<Json<venues::VenueLookup>, AppError> {
    Ok(Json(venues::display_venue(&state, &venue_id).await?))
}

// GET /api/venues/:id/slots
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
    /// Viewer id; results for a viewer apply in request-start order.
    pub view: Option<String>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    #[serde(flatten)]
    pub set: SlotSet,
    pub authoritative: bool,
    pub message: Option<&'static str>,
}

impl From<SlotSet> for SlotsResponse {
    fn from(set: SlotSet) -> Self {
        let authoritative = set.is_authoritative();
        let message = if !authoritative {
            Some("live availability is unavailable; these times are not confirmed")
        } else if set.slots.is_empty() {
            Some("no available times")
        } else {
            None
        };
        Self {
            set,
            authoritative,
            message,
        }
    }
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let view = query.view.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let set = match view {
        Some(view) => {
            let board = state.slot_boards.board(view);
            match board.refresh(state.backend.as_ref(), &venue_id, query.date).await {
                Resolution::Applied(set) => set,
                Resolution::Superseded { .. } => return Err(AppError::Superseded),
            }
        }
        None => resolve_slots(state.backend.as_ref(), &venue_id, query.date).await,
    };
    Ok(Json(set.into()))
}

// GET /api/venues/:id/quote
#[derive(Deserialize)]
pub struct QuoteQuery {
    pub date: NaiveDate,
    pub start_time: Option<TimeSlot>,
    pub end_time: Option<TimeSlot>,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    pub computable: bool,
    #[serde(flatten)]
    pub quote: Option<PriceQuote>,
}

pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let lookup = venues::display_venue(&state, &venue_id).await?;
    let quote = pricing::quote(
        query.date,
        query.start_time.map(|t| t.time()),
        query.end_time.map(|t| t.time()),
        lookup.venue.unit_price_per_hour,
    );
    let mut body = serde_json::to_value(QuoteResponse {
        computable: quote.is_some(),
        quote,
    })
    .map_err(|e| AppError::Internal(e.to_string()))?;
    body["authoritative"] = json!(lookup.authoritative);
    Ok(Json(body))
}
