use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A bookable start time, venue-local, rendered as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot(pub NaiveTime);

impl TimeSlot {
    /// Accepts `HH:MM` and `HH:MM:SS`; the backend uses both.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
            .map(TimeSlot)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl std::fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimeSlot::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {raw}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotSource {
    /// Answered by the backend; empty means fully booked.
    Live,
    /// Backend unreachable; default slots substituted.
    Fallback { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotSet {
    pub venue_id: String,
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
    pub source: SlotSource,
}

impl SlotSet {
    pub fn is_authoritative(&self) -> bool {
        matches!(self.source, SlotSource::Live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_seconds() {
        assert_eq!(TimeSlot::parse("10:00:00"), TimeSlot::parse("10:00"));
        assert_eq!(TimeSlot::parse(" 09:30 ").map(|s| s.to_string()), Some("09:30".to_string()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(TimeSlot::parse("25:00").is_none());
        assert!(TimeSlot::parse("noon").is_none());
    }

    #[test]
    fn test_serializes_as_hh_mm() {
        let slot = TimeSlot::parse("19:00").unwrap();
        assert_eq!(serde_json::to_string(&slot).unwrap(), "\"19:00\"");
        let back: TimeSlot = serde_json::from_str("\"19:00:00\"").unwrap();
        assert_eq!(back, slot);
    }
}
