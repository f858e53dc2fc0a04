use serde::{Deserialize, Serialize};

pub const DEFAULT_OPEN_HOURS: &str = "09:00-22:00";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub location: String,
    pub capacity: Option<u32>,
    pub unit_price_per_hour: i64,
    pub open_hours: String,
}

/// Wire shape of a venue as the backend and the mock file send it. Field
/// names drifted over time, so several aliases are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVenue {
    #[serde(alias = "id")]
    pub stage_id: Option<serde_json::Value>,
    #[serde(alias = "name")]
    pub stage_name: Option<String>,
    #[serde(alias = "address")]
    pub location: Option<String>,
    #[serde(alias = "maxPeople", alias = "max_people")]
    pub capacity: Option<u32>,
    pub price: Option<i64>,
    pub hours: Option<String>,
}

impl RawVenue {
    pub fn into_venue(self, fallback_id: &str, default_unit_price: i64) -> Venue {
        let id = match self.stage_id {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => fallback_id.to_string(),
        };
        Venue {
            id,
            name: self
                .stage_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Venue".to_string()),
            location: self.location.unwrap_or_default(),
            capacity: self.capacity.filter(|c| *c > 0),
            unit_price_per_hour: self.price.unwrap_or(default_unit_price),
            open_hours: self
                .hours
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_OPEN_HOURS.to_string()),
        }
    }

    /// Identifier as a string, for matching against a requested id.
    pub fn id_string(&self) -> Option<String> {
        match &self.stage_id {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}
