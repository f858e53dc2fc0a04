use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use super::envelope::{flag, message_of, unwrap_envelope};
use super::{BackendError, BookingBackend};
use crate::models::{RawVenue, ReservationOutcome, TimeSlot, ValidatedSelection, Venue};

pub struct HttpBookingBackend {
    base_url: String,
    default_unit_price: i64,
    client: reqwest::Client,
}

impl HttpBookingBackend {
    pub fn new(base_url: String, timeout_secs: u64, default_unit_price: i64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build backend HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_unit_price,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn transport(e: reqwest::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}

/// Reads the body and normalizes the envelope. Any 5xx is a server error.
async fn read_json(resp: reqwest::Response) -> Result<(reqwest::StatusCode, Value), BackendError> {
    let status = resp.status();
    let text = resp.text().await.map_err(transport)?;
    if status.is_server_error() {
        return Err(BackendError::Server {
            status: status.as_u16(),
            body: text,
        });
    }
    let value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))?
    };
    Ok((status, value))
}

#[async_trait]
impl BookingBackend for HttpBookingBackend {
    async fn venue(&self, venue_id: &str) -> Result<Venue, BackendError> {
        let resp = self
            .client
            .get(self.url(&format!("/stages/{venue_id}")))
            .send()
            .await
            .map_err(transport)?;

        let (status, body) = read_json(resp).await?;
        if !status.is_success() {
            return Err(BackendError::Server {
                status: status.as_u16(),
                body: message_of(&body).unwrap_or_default(),
            });
        }

        let raw: RawVenue = serde_json::from_value(unwrap_envelope(body))
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(raw.into_venue(venue_id, self.default_unit_price))
    }

    async fn availability(
        &self,
        venue_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, BackendError> {
        let resp = self
            .client
            .get(self.url(&format!("/stages/{venue_id}/availability")))
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await
            .map_err(transport)?;

        let (status, body) = read_json(resp).await?;
        if !status.is_success() {
            return Err(BackendError::Server {
                status: status.as_u16(),
                body: message_of(&body).unwrap_or_default(),
            });
        }

        let entries = match unwrap_envelope(body) {
            Value::Array(entries) => entries,
            other => {
                return Err(BackendError::Decode(format!(
                    "availability is not a list: {other}"
                )))
            }
        };

        let mut slots = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.as_str().and_then(TimeSlot::parse) {
                Some(slot) => slots.push(slot),
                None => tracing::warn!(venue_id, entry = %entry, "skipping unparseable slot"),
            }
        }
        Ok(slots)
    }

    async fn submit_reservation(
        &self,
        selection: &ValidatedSelection,
    ) -> Result<ReservationOutcome, BackendError> {
        let body = json!({
            "stageId": selection.venue_id,
            "date": selection.date.format("%Y-%m-%d").to_string(),
            "startTime": selection.start_time.format("%H:%M").to_string(),
            "endTime": selection.end_time.format("%H:%M").to_string(),
            "people": selection.headcount,
            "note": selection.note,
        });

        let resp = self
            .client
            .post(self.url("/reservations"))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let (status, body) = read_json(resp).await?;
        if status.is_client_error() || flag(&body, "ok") == Some(false) {
            return Ok(ReservationOutcome::Rejected {
                reason: message_of(&body)
                    .unwrap_or_else(|| format!("reservation rejected ({status})")),
            });
        }

        let payload = unwrap_envelope(body);
        let reservation_id = ["reservationId", "id"].iter().find_map(|key| match payload.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });
        Ok(ReservationOutcome::Accepted { reservation_id })
    }
}
