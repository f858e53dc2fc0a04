// Payment session orchestration.
//
// Starting a payment mints an order, opens a gateway session and hands back
// the URL the browser must navigate to. The outcome arrives later as a fresh
// page load on one of the callback routes; `settle_callback` rebuilds the
// session from that URL alone and drives it to a terminal state. The ledger
// only guards against replays, it is never required to resolve a callback.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    Order, OrderId, PaymentSession, PaymentState, PriceQuote, ReservationSelection, TimeSlot,
    TransitionError, ValidationError,
};
use crate::services::gateway::{ApprovalOutcome, ReadyRequest};
use crate::services::{pricing, venues};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartPayment {
    #[serde(default)]
    pub venue_id: String,
    pub date: Option<NaiveDate>,
    pub start_time: Option<TimeSlot>,
    pub end_time: Option<TimeSlot>,
    #[serde(default)]
    pub headcount: i64,
    pub note: Option<String>,
    /// Set when retrying after a failed setup; reused only while `Created`.
    pub order_id: Option<String>,
}

impl StartPayment {
    pub fn selection(&self) -> ReservationSelection {
        ReservationSelection {
            venue_id: self.venue_id.clone(),
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            headcount: self.headcount,
            note: self.note.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedPayment {
    pub session: PaymentSession,
    pub order: Order,
    pub quote: Option<PriceQuote>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackRoute {
    Approve,
    Cancel,
    Fail,
}

impl CallbackRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackRoute::Approve => "approve",
            CallbackRoute::Cancel => "cancel",
            CallbackRoute::Fail => "fail",
        }
    }
}

/// Query parameters of a gateway callback. Empty values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(rename = "orderId", alias = "order_id")]
    pub order_id: Option<String>,
    #[serde(rename = "gatewayToken", alias = "pg_token")]
    pub gateway_token: Option<String>,
    pub error: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    pub order_id: Option<OrderId>,
    pub state: PaymentState,
    /// The order had already been settled (or claimed) before this callback.
    pub already_processed: bool,
    pub reason: Option<String>,
}

/// Callback URL for `route` with the order id appended, so the id survives
/// the round trip through the gateway.
pub fn callback_url(state: &AppState, route: CallbackRoute, order_id: &OrderId) -> Result<String, AppError> {
    let base = state.config.callback_base(route.as_str());
    let mut url = reqwest::Url::parse(&base)
        .map_err(|e| AppError::Internal(format!("invalid {} callback url {base}: {e}", route.as_str())))?;
    url.query_pairs_mut().append_pair("orderId", order_id.as_str());
    Ok(url.to_string())
}

fn in_flight_key(request: &StartPayment) -> String {
    if let Some(order_id) = present(&request.order_id) {
        return format!("pay:order:{order_id}");
    }
    format!(
        "pay:{}:{}:{}:{}:{}",
        request.venue_id,
        request.date.map(|d| d.to_string()).unwrap_or_default(),
        request.start_time.map(|t| t.to_string()).unwrap_or_default(),
        request.end_time.map(|t| t.to_string()).unwrap_or_default(),
        request.headcount,
    )
}

/// `Created → Pending`. On a gateway failure the order stays `Created` and
/// the error carries its id so the visitor can retry without a new order.
pub async fn start_payment(state: &AppState, request: &StartPayment) -> Result<StartedPayment, AppError> {
    let _guard = state
        .in_flight
        .try_acquire(in_flight_key(request))
        .ok_or(AppError::DuplicateSubmission)?;

    let (order, quote) = match reusable_order(state, request)? {
        Some(order) => (order, None),
        None => {
            let (order, quote) = fresh_order(state, &request.selection()).await?;
            (order, Some(quote))
        }
    };

    let mut session = PaymentSession::created(order.id.clone());
    let redirect_url = open_gateway_session(state, &order).await?;

    session.mark_pending(redirect_url.clone())?;
    let marked = state.with_db(|conn| queries::mark_pending(conn, &order.id, &redirect_url))?;
    if !marked {
        tracing::warn!(order_id = %order.id, "ledger row was not in created state when marking pending");
    }

    tracing::info!(order_id = %order.id, amount = order.total_amount, "payment session pending, redirecting to gateway");
    Ok(StartedPayment {
        session,
        order,
        quote,
    })
}

/// The order named in a retry, if it can be reused. Orders that already
/// reached a terminal state are never reused; a new one is minted instead.
fn reusable_order(state: &AppState, request: &StartPayment) -> Result<Option<Order>, AppError> {
    let Some(raw) = present(&request.order_id) else {
        return Ok(None);
    };
    let order_id =
        OrderId::parse(raw).ok_or_else(|| AppError::NotFound(format!("order {raw}")))?;
    let record = state
        .with_db(|conn| queries::get_order(conn, &order_id))?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

    match record.state {
        PaymentState::Created => Ok(record.order()),
        PaymentState::Pending => Err(TransitionError {
            from: PaymentState::Pending,
            to: PaymentState::Pending,
        }
        .into()),
        settled => {
            tracing::info!(order_id = %order_id, state = %settled, "retry of a settled order, minting a new one");
            Ok(None)
        }
    }
}

async fn fresh_order(
    state: &AppState,
    selection: &ReservationSelection,
) -> Result<(Order, PriceQuote), AppError> {
    // everything checkable without the venue is checked before any call
    selection.validate(None)?;
    let venue = venues::live_venue(state, &selection.venue_id).await?;
    let validated = selection.validate(venue.capacity)?;
    let quote =
        pricing::quote_selection(&validated, &venue).ok_or(ValidationError::EndNotAfterStart)?;

    let item_name = if venue.name.trim().is_empty() {
        state.config.default_item_name.clone()
    } else {
        venue.name.clone()
    };
    let order = Order {
        id: state.order_ids.next(),
        venue_id: venue.id.clone(),
        item_name,
        quantity: 1,
        total_amount: quote.total_amount,
    };
    state.with_db(|conn| queries::insert_order(conn, &order))?;
    tracing::info!(order_id = %order.id, venue_id = %order.venue_id, amount = order.total_amount, "order created");

    Ok((order, quote))
}

async fn open_gateway_session(state: &AppState, order: &Order) -> Result<String, AppError> {
    let setup_error = |reason: String| {
        tracing::error!(order_id = %order.id, reason = %reason, "payment setup failed");
        AppError::PaymentSetup {
            order_id: order.id.clone(),
            reason,
        }
    };

    state
        .gateway
        .ensure_ready()
        .await
        .map_err(|e| setup_error(e.to_string()))?;

    let request = ReadyRequest {
        order: order.clone(),
        approve_url: callback_url(state, CallbackRoute::Approve, &order.id)?,
        cancel_url: callback_url(state, CallbackRoute::Cancel, &order.id)?,
        fail_url: callback_url(state, CallbackRoute::Fail, &order.id)?,
    };

    state
        .gateway
        .ready(&request)
        .await
        .map_err(|e| setup_error(e.to_string()))
}

/// `Pending → Approved | Cancelled | Failed`, resolved from the callback URL.
pub async fn settle_callback(
    state: &AppState,
    route: CallbackRoute,
    params: &CallbackParams,
) -> Result<Settlement, AppError> {
    match route {
        CallbackRoute::Approve => settle_approve(state, params).await,
        CallbackRoute::Cancel => settle_without_approval(state, params, PaymentState::Cancelled, None),
        CallbackRoute::Fail => settle_without_approval(
            state,
            params,
            PaymentState::Failed,
            Some("the payment failed at the gateway"),
        ),
    }
}

fn callback_order_id(params: &CallbackParams) -> Result<Option<OrderId>, AppError> {
    match present(&params.order_id) {
        None => Ok(None),
        Some(raw) => OrderId::parse(raw)
            .map(Some)
            .ok_or(AppError::MissingCallbackParameter("orderId")),
    }
}

fn settled_elsewhere(state: &AppState, order_id: &OrderId) -> Result<Settlement, AppError> {
    let record = state.with_db(|conn| queries::get_order(conn, order_id))?;
    let (state, reason) = record
        .map(|r| (r.state, r.failure_reason))
        .unwrap_or((PaymentState::Pending, None));
    tracing::info!(order_id = %order_id, state = %state, "duplicate payment callback");
    Ok(Settlement {
        order_id: Some(order_id.clone()),
        state,
        already_processed: true,
        reason,
    })
}

fn settle_without_approval(
    state: &AppState,
    params: &CallbackParams,
    target: PaymentState,
    reason: Option<&str>,
) -> Result<Settlement, AppError> {
    let order_id = callback_order_id(params)?;
    let Some(order_id) = order_id else {
        tracing::warn!(state = %target, "payment callback without order id");
        return Ok(Settlement {
            order_id: None,
            state: target,
            already_processed: false,
            reason: reason.map(str::to_string),
        });
    };

    let mut session = PaymentSession::rehydrate(order_id.clone());
    match target {
        PaymentState::Cancelled => session.cancel()?,
        _ => session.fail(reason.unwrap_or("payment failed"))?,
    }

    // an order whose approval is in flight belongs to the approve callback
    let settled = state.with_db(|conn| {
        queries::ensure_callback_row(conn, &order_id)?;
        queries::settle_unclaimed(conn, &order_id, session.state, session.failure_reason.as_deref())
    })?;
    if !settled {
        return settled_elsewhere(state, &order_id);
    }

    tracing::info!(order_id = %order_id, state = %session.state, "payment ended without approval");
    Ok(Settlement {
        order_id: Some(order_id),
        state: session.state,
        already_processed: false,
        reason: session.failure_reason,
    })
}

async fn settle_approve(state: &AppState, params: &CallbackParams) -> Result<Settlement, AppError> {
    let order_id = callback_order_id(params)?;

    if let Some(error) = present(&params.error) {
        let reason = format!("the gateway reported an error: {error}");
        return match order_id {
            Some(order_id) => {
                let failed = CallbackParams {
                    order_id: Some(order_id.to_string()),
                    ..CallbackParams::default()
                };
                settle_without_approval(state, &failed, PaymentState::Failed, Some(&reason))
            }
            None => Ok(Settlement {
                order_id: None,
                state: PaymentState::Failed,
                already_processed: false,
                reason: Some(reason),
            }),
        };
    }

    let Some(order_id) = order_id else {
        tracing::warn!("approve callback without order id");
        return Err(AppError::MissingCallbackParameter("orderId"));
    };
    let Some(token) = present(&params.gateway_token) else {
        tracing::warn!(order_id = %order_id, "approve callback without gateway token");
        state.with_db(|conn| {
            queries::settle_unclaimed(
                conn,
                &order_id,
                PaymentState::Failed,
                Some("approval callback carried no gateway token"),
            )
        })?;
        return Err(AppError::MissingCallbackParameter("gatewayToken"));
    };

    let claimed = state.with_db(|conn| {
        queries::ensure_callback_row(conn, &order_id)?;
        queries::claim_approval(conn, &order_id, token)
    })?;
    if !claimed {
        return settled_elsewhere(state, &order_id);
    }

    let mut session = PaymentSession::rehydrate(order_id.clone());
    let outcome = state.gateway.approve(token, &order_id).await;

    let (already_processed, failure) = match outcome {
        Ok(ApprovalOutcome::Approved) => (false, None),
        Ok(ApprovalOutcome::AlreadyApproved) => (true, None),
        Ok(ApprovalOutcome::Rejected { reason }) => {
            tracing::warn!(order_id = %order_id, reason = %reason, "payment approval rejected");
            (false, Some(AppError::ApprovalRejected(reason)))
        }
        Err(e) => {
            tracing::error!(order_id = %order_id, error = %e, "payment approval call failed");
            (false, Some(AppError::Transport(e.to_string())))
        }
    };

    match failure {
        None => session.approve()?,
        Some(ref err) => session.fail(err.to_string())?,
    }
    let settled = state.with_db(|conn| {
        queries::settle_order(conn, &order_id, session.state, session.failure_reason.as_deref())
    })?;
    if !settled {
        tracing::warn!(order_id = %order_id, outcome = %session.state, "order settled by another callback during approval");
        return settled_elsewhere(state, &order_id);
    }

    if let Some(err) = failure {
        return Err(err);
    }

    tracing::info!(order_id = %order_id, already_processed, "payment approved");
    Ok(Settlement {
        order_id: Some(order_id),
        state: PaymentState::Approved,
        already_processed,
        reason: None,
    })
}
