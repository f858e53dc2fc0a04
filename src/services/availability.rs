use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::models::{SlotSet, SlotSource, TimeSlot};
use crate::services::backend::BookingBackend;

/// Shown when the backend cannot be reached. Never authoritative.
pub const FALLBACK_SLOTS: [&str; 8] = [
    "09:00", "10:00", "11:00", "13:00", "14:00", "15:00", "19:00", "20:00",
];

pub fn fallback_slots() -> Vec<TimeSlot> {
    FALLBACK_SLOTS.iter().filter_map(|s| TimeSlot::parse(s)).collect()
}

/// Fetches slots for `(venue, date)`. A successful empty answer means fully
/// booked and is returned as is; only a failed fetch substitutes defaults.
pub async fn resolve_slots(
    backend: &dyn BookingBackend,
    venue_id: &str,
    date: NaiveDate,
) -> SlotSet {
    match backend.availability(venue_id, date).await {
        Ok(slots) => SlotSet {
            venue_id: venue_id.to_string(),
            date,
            slots,
            source: SlotSource::Live,
        },
        Err(e) => {
            tracing::warn!(venue_id, %date, error = %e, "availability fetch failed, using fallback slots");
            SlotSet {
                venue_id: venue_id.to_string(),
                date,
                slots: fallback_slots(),
                source: SlotSource::Fallback {
                    reason: e.to_string(),
                },
            }
        }
    }
}

/// One viewer's slot picker. Requests are numbered when they start; a result
/// lands only if no newer request has started since.
#[derive(Default)]
pub struct SlotBoard {
    latest: AtomicU64,
    current: Mutex<Option<SlotSet>>,
}

#[derive(Debug)]
pub enum Resolution {
    Applied(SlotSet),
    Superseded { seq: u64, latest: u64 },
}

impl SlotBoard {
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn apply(&self, seq: u64, set: SlotSet) -> Resolution {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let latest = self.latest.load(Ordering::SeqCst);
        if seq != latest {
            return Resolution::Superseded { seq, latest };
        }
        *current = Some(set.clone());
        Resolution::Applied(set)
    }

    pub fn current(&self) -> Option<SlotSet> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub async fn refresh(
        &self,
        backend: &dyn BookingBackend,
        venue_id: &str,
        date: NaiveDate,
    ) -> Resolution {
        let seq = self.begin();
        let set = resolve_slots(backend, venue_id, date).await;
        let resolution = self.apply(seq, set);
        if let Resolution::Superseded { latest, .. } = &resolution {
            tracing::debug!(venue_id, %date, seq, latest, "dropping stale availability result");
        }
        resolution
    }
}

/// Slot boards keyed by viewer id. A board lives only while some request
/// for its view is in flight.
#[derive(Default)]
pub struct SlotBoards {
    boards: Mutex<HashMap<String, Arc<SlotBoard>>>,
}

impl SlotBoards {
    pub fn board(&self, view: &str) -> BoardLease<'_> {
        let mut boards = self.boards.lock().unwrap_or_else(|e| e.into_inner());
        let board = Arc::clone(boards.entry(view.to_string()).or_default());
        BoardLease {
            boards: self,
            view: view.to_string(),
            board,
        }
    }

    pub fn len(&self) -> usize {
        self.boards.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A request's hold on a board. The last lease to drop removes the board.
pub struct BoardLease<'a> {
    boards: &'a SlotBoards,
    view: String,
    board: Arc<SlotBoard>,
}

impl Deref for BoardLease<'_> {
    type Target = SlotBoard;

    fn deref(&self) -> &SlotBoard {
        &self.board
    }
}

impl Drop for BoardLease<'_> {
    fn drop(&mut self) {
        let mut boards = self.boards.boards.lock().unwrap_or_else(|e| e.into_inner());
        let Some(held) = boards.get(&self.view) else {
            return;
        };
        // leases are only handed out under this lock, so the count is exact
        if Arc::ptr_eq(held, &self.board) && Arc::strong_count(&self.board) == 2 {
            boards.remove(&self.view);
        }
    }
}
