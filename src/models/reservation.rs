use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::TimeSlot;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("please choose a date")]
    MissingDate,

    #[error("please choose a start and end time")]
    MissingTime,

    #[error("end time must be after start time")]
    EndNotAfterStart,

    #[error("headcount must be at least 1")]
    NonPositiveHeadcount,

    #[error("headcount {headcount} exceeds venue capacity of {capacity}")]
    ExceedsCapacity { headcount: i64, capacity: u32 },
}

/// What the visitor has picked so far. Every field except the venue may still
/// be missing while the form is being filled in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationSelection {
    pub venue_id: String,
    pub date: Option<NaiveDate>,
    pub start_time: Option<TimeSlot>,
    pub end_time: Option<TimeSlot>,
    #[serde(default)]
    pub headcount: i64,
    pub note: Option<String>,
}

/// A selection that passed local validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSelection {
    pub venue_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub headcount: u32,
    pub note: Option<String>,
}

impl ReservationSelection {
    pub fn validate(&self, capacity: Option<u32>) -> Result<ValidatedSelection, ValidationError> {
        let date = self.date.ok_or(ValidationError::MissingDate)?;
        let (start, end) = match (self.start_time, self.end_time) {
            (Some(s), Some(e)) => (s.time(), e.time()),
            _ => return Err(ValidationError::MissingTime),
        };
        if end <= start {
            return Err(ValidationError::EndNotAfterStart);
        }
        if self.headcount <= 0 {
            return Err(ValidationError::NonPositiveHeadcount);
        }
        if let Some(capacity) = capacity {
            if self.headcount > i64::from(capacity) {
                return Err(ValidationError::ExceedsCapacity {
                    headcount: self.headcount,
                    capacity,
                });
            }
        }
        let headcount =
            u32::try_from(self.headcount).map_err(|_| ValidationError::ExceedsCapacity {
                headcount: self.headcount,
                capacity: u32::MAX,
            })?;

        Ok(ValidatedSelection {
            venue_id: self.venue_id.clone(),
            date,
            start_time: start,
            end_time: end,
            headcount,
            note: self
                .note
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReservationOutcome {
    Accepted { reservation_id: Option<String> },
    Rejected { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(start: &str, end: &str, headcount: i64) -> ReservationSelection {
        ReservationSelection {
            venue_id: "7".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1),
            start_time: TimeSlot::parse(start),
            end_time: TimeSlot::parse(end),
            headcount,
            note: None,
        }
    }

    #[test]
    fn test_valid_selection() {
        let validated = selection("10:00", "12:30", 4).validate(Some(10)).unwrap();
        assert_eq!(validated.headcount, 4);
        assert_eq!(validated.start_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn test_missing_date() {
        let mut sel = selection("10:00", "11:00", 1);
        sel.date = None;
        assert_eq!(sel.validate(None), Err(ValidationError::MissingDate));
    }

    #[test]
    fn test_missing_times() {
        let mut sel = selection("10:00", "11:00", 1);
        sel.end_time = None;
        assert_eq!(sel.validate(None), Err(ValidationError::MissingTime));
    }

    #[test]
    fn test_end_must_follow_start() {
        assert_eq!(
            selection("12:00", "12:00", 1).validate(None),
            Err(ValidationError::EndNotAfterStart)
        );
        assert_eq!(
            selection("13:00", "12:00", 1).validate(None),
            Err(ValidationError::EndNotAfterStart)
        );
    }

    #[test]
    fn test_headcount_bounds() {
        assert_eq!(
            selection("10:00", "11:00", 0).validate(None),
            Err(ValidationError::NonPositiveHeadcount)
        );
        assert_eq!(
            selection("10:00", "11:00", 12).validate(Some(10)),
            Err(ValidationError::ExceedsCapacity { headcount: 12, capacity: 10 })
        );
        assert!(selection("10:00", "11:00", 10).validate(Some(10)).is_ok());
        assert!(selection("10:00", "11:00", 500).validate(None).is_ok());
    }

    #[test]
    fn test_blank_note_dropped() {
        let mut sel = selection("10:00", "11:00", 1);
        sel.note = Some("   ".to_string());
        assert_eq!(sel.validate(None).unwrap().note, None);
    }
}
