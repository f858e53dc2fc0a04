// Payment gateway seam.
//
// The gateway is an out-of-process provider reached by full-page redirect.
// The orchestrator only sees this trait: ask for a session ("ready"), then
// confirm an approval with the token the gateway handed back.

pub mod kakao;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Order, OrderId};

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway unreachable: {0}")]
    Transport(String),

    #[error("payment gateway refused the request: {0}")]
    Refused(String),

    #[error("payment gateway not ready: {0}")]
    NotReady(String),
}

/// Session request. Each callback URL already carries the order id.
#[derive(Debug, Clone, Serialize)]
pub struct ReadyRequest {
    pub order: Order,
    pub approve_url: String,
    pub cancel_url: String,
    pub fail_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    Approved,
    /// The gateway settled this order earlier; no new charge was made.
    AlreadyApproved,
    Rejected { reason: String },
}

#[async_trait]
pub trait PaymentGatewayClient: Send + Sync {
    /// Idempotent readiness check, run before the first session request.
    async fn ensure_ready(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    /// Opens a gateway session and returns the URL to send the browser to.
    async fn ready(&self, request: &ReadyRequest) -> Result<String, GatewayError>;

    async fn approve(
        &self,
        gateway_token: &str,
        order_id: &OrderId,
    ) -> Result<ApprovalOutcome, GatewayError>;
}
