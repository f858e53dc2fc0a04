use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use super::{ApprovalOutcome, GatewayError, PaymentGatewayClient, ReadyRequest};
use crate::models::OrderId;
use crate::services::backend::envelope::{flag, message_of, unwrap_envelope};

/// Gateway error code for an order that was already paid.
const ALREADY_PAID_CODE: i64 = -702;

/// KakaoPay, reached through the backend's `/pay/kakao/*` proxy endpoints.
pub struct KakaoPayGateway {
    base_url: String,
    client: reqwest::Client,
    ready: OnceCell<()>,
}

impl KakaoPayGateway {
    pub fn new(base_url: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build gateway HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            ready: OnceCell::new(),
        })
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

async fn read_body(resp: reqwest::Response) -> Result<(reqwest::StatusCode, Value), GatewayError> {
    let status = resp.status();
    let text = resp.text().await.map_err(transport)?;
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok((status, body))
}

/// `next_redirect_pc_url` lives either in the envelope or in the bare body.
fn redirect_url(body: &Value) -> Option<String> {
    let payload = unwrap_envelope(body.clone());
    ["next_redirect_pc_url", "redirectUrl"]
        .iter()
        .find_map(|key| {
            payload
                .get(key)
                .or_else(|| body.get(key))
                .and_then(Value::as_str)
        })
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

fn already_paid(body: &Value) -> bool {
    let payload = unwrap_envelope(body.clone());
    flag(body, "alreadyApproved") == Some(true)
        || payload.get("code").and_then(Value::as_i64) == Some(ALREADY_PAID_CODE)
        || body.get("code").and_then(Value::as_i64) == Some(ALREADY_PAID_CODE)
}

#[async_trait]
impl PaymentGatewayClient for KakaoPayGateway {
    async fn ensure_ready(&self) -> Result<(), GatewayError> {
        self.ready
            .get_or_try_init(|| async {
                reqwest::Url::parse(&self.base_url)
                    .map(|_| ())
                    .map_err(|e| GatewayError::NotReady(format!("bad gateway base url: {e}")))
            })
            .await
            .map(|_| ())
    }

    async fn ready(&self, request: &ReadyRequest) -> Result<String, GatewayError> {
        let body = json!({
            "orderId": request.order.id,
            "itemName": request.order.item_name,
            "quantity": request.order.quantity,
            "totalAmount": request.order.total_amount,
            "approvalUrl": request.approve_url,
            "cancelUrl": request.cancel_url,
            "failUrl": request.fail_url,
        });

        let resp = self
            .client
            .post(format!("{}/pay/kakao/ready", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let (status, body) = read_body(resp).await?;
        if !status.is_success() {
            return Err(GatewayError::Refused(
                message_of(&body).unwrap_or_else(|| format!("ready failed ({status})")),
            ));
        }

        redirect_url(&body).ok_or_else(|| {
            GatewayError::Refused("ready response carried no redirect url".to_string())
        })
    }

    async fn approve(
        &self,
        gateway_token: &str,
        order_id: &OrderId,
    ) -> Result<ApprovalOutcome, GatewayError> {
        let resp = self
            .client
            .get(format!("{}/pay/kakao/approve", self.base_url))
            .query(&[("pg_token", gateway_token), ("orderId", order_id.as_str())])
            .send()
            .await
            .map_err(transport)?;

        let (status, body) = read_body(resp).await?;
        if already_paid(&body) {
            return Ok(ApprovalOutcome::AlreadyApproved);
        }
        if status.is_server_error() {
            return Err(GatewayError::Transport(format!(
                "approval endpoint returned {status}"
            )));
        }
        if status.is_success() && flag(&body, "ok") == Some(true) {
            return Ok(ApprovalOutcome::Approved);
        }

        Ok(ApprovalOutcome::Rejected {
            reason: message_of(&body).unwrap_or_else(|| "payment approval was declined".to_string()),
        })
    }
}
