use chrono::Utc;
use uuid::Uuid;

use crate::models::OrderId;

/// Mints order ids of the form `<prefix>-<unix millis>-<12 hex chars>`.
#[derive(Debug, Clone)]
pub struct OrderIdGenerator {
    prefix: String,
}

impl OrderIdGenerator {
    pub fn new(prefix: &str) -> Self {
        let prefix: String = prefix
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(16)
            .collect();
        Self {
            prefix: if prefix.is_empty() { "ORD".to_string() } else { prefix },
        }
    }

    pub fn next(&self) -> OrderId {
        let millis = Utc::now().timestamp_millis();
        let random = Uuid::new_v4().simple().to_string();
        OrderId::from_generated(format!("{}-{millis}-{}", self.prefix, &random[..12]))
    }
}
