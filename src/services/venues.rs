use anyhow::Context;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{RawVenue, Venue};
use crate::services::backend::envelope::unwrap_envelope;
use crate::services::backend::BackendError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct VenueLookup {
    pub venue: Venue,
    /// False when the venue came from the local mock file.
    pub authoritative: bool,
}

fn backend_error(venue_id: &str, err: BackendError) -> AppError {
    match err {
        BackendError::Server { status: 404, .. } => AppError::NotFound(format!("venue {venue_id}")),
        other => AppError::from(other),
    }
}

/// Venue as the backend reports it. Used wherever money or capacity depends
/// on the answer, so there is no fallback.
pub async fn live_venue(state: &AppState, venue_id: &str) -> Result<Venue, AppError> {
    state
        .backend
        .venue(venue_id)
        .await
        .map_err(|e| backend_error(venue_id, e))
}

/// Venue for display. Falls back to the mock venue file when the backend is
/// down and one is configured.
pub async fn display_venue(state: &AppState, venue_id: &str) -> Result<VenueLookup, AppError> {
    let err = match state.backend.venue(venue_id).await {
        Ok(venue) => {
            return Ok(VenueLookup {
                venue,
                authoritative: true,
            })
        }
        Err(e) => e,
    };

    let Some(path) = state.config.mock_venues_path.as_deref() else {
        return Err(backend_error(venue_id, err));
    };

    tracing::warn!(venue_id, error = %err, path, "venue fetch failed, trying mock venues");
    match load_mock_venue(path, venue_id, state.config.default_unit_price).await {
        Ok(Some(venue)) => Ok(VenueLookup {
            venue,
            authoritative: false,
        }),
        Ok(None) => Err(AppError::NotFound(format!("venue {venue_id}"))),
        Err(e) => {
            tracing::error!(error = %e, path, "failed to read mock venues");
            Err(backend_error(venue_id, err))
        }
    }
}

async fn load_mock_venue(
    path: &str,
    venue_id: &str,
    default_unit_price: i64,
) -> anyhow::Result<Option<Venue>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {path}"))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {path}"))?;
    let venues: Vec<RawVenue> = serde_json::from_value(unwrap_envelope(value))
        .with_context(|| format!("{path} is not a list of venues"))?;

    Ok(venues
        .into_iter()
        .find(|v| v.id_string().as_deref() == Some(venue_id))
        .map(|v| v.into_venue(venue_id, default_unit_price)))
}
