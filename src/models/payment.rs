use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Client-generated identifier correlating one payment attempt across the
/// gateway redirect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub const MAX_LEN: usize = 64;

    /// Validates an id that arrived from outside (callback URL, retry body).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let well_formed = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        well_formed.then(|| OrderId(raw.to_string()))
    }

    pub(crate) fn from_generated(id: String) -> Self {
        OrderId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub venue_id: String,
    pub item_name: String,
    pub quantity: u32,
    pub total_amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Created,
    Pending,
    Approved,
    Cancelled,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Created => "created",
            PaymentState::Pending => "pending",
            PaymentState::Approved => "approved",
            PaymentState::Cancelled => "cancelled",
            PaymentState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(PaymentState::Created),
            "pending" => Some(PaymentState::Pending),
            "approved" => Some(PaymentState::Approved),
            "cancelled" => Some(PaymentState::Cancelled),
            "failed" => Some(PaymentState::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentState::Approved | PaymentState::Cancelled | PaymentState::Failed
        )
    }

    pub fn can_transition_to(&self, next: PaymentState) -> bool {
        use PaymentState::*;
        matches!(
            (self, next),
            (Created, Pending) | (Pending, Approved) | (Pending, Cancelled) | (Pending, Failed)
        )
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid payment transition from {from} to {to}")]
pub struct TransitionError {
    pub from: PaymentState,
    pub to: PaymentState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSession {
    pub order_id: OrderId,
    pub state: PaymentState,
    pub redirect_url: Option<String>,
    pub failure_reason: Option<String>,
}

impl PaymentSession {
    pub fn created(order_id: OrderId) -> Self {
        Self {
            order_id,
            state: PaymentState::Created,
            redirect_url: None,
            failure_reason: None,
        }
    }

    /// A session rebuilt from a gateway callback. Reaching a callback means
    /// the browser was sent to the gateway, so the session is `Pending`.
    pub fn rehydrate(order_id: OrderId) -> Self {
        Self {
            order_id,
            state: PaymentState::Pending,
            redirect_url: None,
            failure_reason: None,
        }
    }

    fn transition(&mut self, next: PaymentState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn mark_pending(&mut self, redirect_url: String) -> Result<(), TransitionError> {
        self.transition(PaymentState::Pending)?;
        self.redirect_url = Some(redirect_url);
        Ok(())
    }

    pub fn approve(&mut self) -> Result<(), TransitionError> {
        self.transition(PaymentState::Approved)
    }

    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        self.transition(PaymentState::Cancelled)
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(PaymentState::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }
}

/// Ledger row for one order. Advisory: callbacks are resolved from their URL
/// even when no row exists.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub order_id: OrderId,
    pub venue_id: String,
    pub item_name: String,
    pub quantity: u32,
    pub total_amount: Option<i64>,
    pub state: PaymentState,
    pub redirect_url: Option<String>,
    #[serde(skip)]
    pub approval_token: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PaymentRecord {
    pub fn order(&self) -> Option<Order> {
        Some(Order {
            id: self.order_id.clone(),
            venue_id: self.venue_id.clone(),
            item_name: self.item_name.clone(),
            quantity: self.quantity,
            total_amount: self.total_amount?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_id() -> OrderId {
        OrderId::parse("NSTG-1-abc").unwrap()
    }

    #[test]
    fn test_order_id_parse() {
        assert!(OrderId::parse("NSTG-1700000000000-0a1b2c3d4e5f").is_some());
        assert!(OrderId::parse("").is_none());
        assert!(OrderId::parse("has space").is_none());
        assert!(OrderId::parse("<script>").is_none());
        assert!(OrderId::parse(&"x".repeat(65)).is_none());
    }

    #[test]
    fn test_happy_path() {
        let mut session = PaymentSession::created(order_id());
        session.mark_pending("https://gateway.test/pay".to_string()).unwrap();
        assert_eq!(session.state, PaymentState::Pending);
        session.approve().unwrap();
        assert_eq!(session.state, PaymentState::Approved);
    }

    #[test]
    fn test_no_pending_to_pending() {
        let mut session = PaymentSession::created(order_id());
        session.mark_pending("a".to_string()).unwrap();
        let err = session.mark_pending("b".to_string()).unwrap_err();
        assert_eq!(err.from, PaymentState::Pending);
        assert_eq!(session.redirect_url.as_deref(), Some("a"));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for settle in [
            PaymentSession::approve as fn(&mut PaymentSession) -> Result<(), TransitionError>,
            PaymentSession::cancel,
        ] {
            let mut session = PaymentSession::rehydrate(order_id());
            settle(&mut session).unwrap();
            assert!(session.state.is_terminal());
            assert!(session.mark_pending("x".to_string()).is_err());
            assert!(session.fail("late").is_err());
        }
    }

    #[test]
    fn test_created_cannot_settle() {
        let mut session = PaymentSession::created(order_id());
        assert!(session.approve().is_err());
        assert!(session.cancel().is_err());
        assert_eq!(session.state, PaymentState::Created);
    }

    #[test]
    fn test_fail_records_reason() {
        let mut session = PaymentSession::rehydrate(order_id());
        session.fail("card declined").unwrap();
        assert_eq!(session.failure_reason.as_deref(), Some("card declined"));
    }

    #[test]
    fn test_state_round_trip_strings() {
        for state in [
            PaymentState::Created,
            PaymentState::Pending,
            PaymentState::Approved,
            PaymentState::Cancelled,
            PaymentState::Failed,
        ] {
            assert_eq!(PaymentState::parse(state.as_str()), Some(state));
        }
        assert_eq!(PaymentState::parse("bogus"), None);
    }
}
