use std::sync::Arc;

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{OrderId, PaymentRecord, PaymentState, PriceQuote};
use crate::services::payment::{self, CallbackParams, CallbackRoute, Settlement, StartPayment};
use crate::state::AppState;

#[derive(Serialize)]
pub struct StartPaymentResponse {
    pub order_id: OrderId,
    pub state: PaymentState,
    pub redirect_url: String,
    pub total_amount: i64,
    pub quote: Option<PriceQuote>,
}

// POST /api/payments
pub async fn start_payment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartPayment>,
) -> Result<Json<StartPaymentResponse>, AppError> {
    let started = payment::start_payment(&state, &request).await?;
    let redirect_url = started
        .session
        .redirect_url
        .clone()
        .ok_or_else(|| AppError::Internal("pending session without redirect url".to_string()))?;

    Ok(Json(StartPaymentResponse {
        order_id: started.order.id,
        state: started.session.state,
        redirect_url,
        total_amount: started.order.total_amount,
        quote: started.quote,
    }))
}

// POST /payment/checkout, a plain form post answered with a full-page redirect
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Form(request): Form<StartPayment>,
) -> Response {
    let redirect_url = payment::start_payment(&state, &request)
        .await
        .and_then(|started| {
            started
                .session
                .redirect_url
                .ok_or_else(|| AppError::Internal("pending session without redirect url".to_string()))
        });
    match redirect_url {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => checkout_error_page(&state, &e),
    }
}

// GET /api/payments/:order_id
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<PaymentRecord>, AppError> {
    let order_id =
        OrderId::parse(&raw_id).ok_or_else(|| AppError::NotFound(format!("order {raw_id}")))?;
    state
        .with_db(|conn| queries::get_order(conn, &order_id))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))
}

// GET /payment/approve
pub async fn approve_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    callback(&state, CallbackRoute::Approve, params).await
}

// GET /payment/cancel
pub async fn cancel_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    callback(&state, CallbackRoute::Cancel, params).await
}

// GET /payment/fail
pub async fn fail_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    callback(&state, CallbackRoute::Fail, params).await
}

async fn callback(state: &AppState, route: CallbackRoute, params: CallbackParams) -> Response {
    match payment::settle_callback(state, route, &params).await {
        Ok(settlement) if settlement.state == PaymentState::Approved => {
            Redirect::to(&confirmation_url(&state.config.confirmation_url, &settlement)).into_response()
        }
        Ok(settlement) => settlement_page(state, &settlement),
        Err(e) => error_page(state, route, params.order_id.as_deref(), &e),
    }
}

fn confirmation_url(base: &str, settlement: &Settlement) -> String {
    let status = if settlement.already_processed {
        "already_processed"
    } else {
        "approved"
    };
    let sep = if base.contains('?') { '&' } else { '?' };
    match &settlement.order_id {
        Some(id) => format!("{base}{sep}payment={status}&orderId={id}"),
        None => format!("{base}{sep}payment={status}"),
    }
}

#[derive(Template)]
#[template(path = "payment_result.html")]
struct PaymentResultPage<'a> {
    title: &'a str,
    message: &'a str,
    order_id: Option<&'a str>,
    home: &'a str,
    /// Offers a resubmit of the same order when set.
    retry_order_id: Option<&'a str>,
}

fn settlement_page(state: &AppState, settlement: &Settlement) -> Response {
    let (title, message) = match (settlement.state, settlement.already_processed) {
        (PaymentState::Pending, _) | (PaymentState::Created, _) => (
            "Payment in progress",
            "This payment is already being processed. Please wait a moment and check your reservations.".to_string(),
        ),
        (PaymentState::Cancelled, false) => (
            "Payment cancelled",
            "The payment was cancelled. No charge was made; you can start a new payment at any time.".to_string(),
        ),
        (PaymentState::Failed, false) => (
            "Payment failed",
            format!(
                "{}. No charge was made; you can start a new payment.",
                settlement.reason.as_deref().unwrap_or("The payment could not be completed")
            ),
        ),
        (settled, _) => (
            "Payment already processed",
            format!("This payment was already processed and is {settled}."),
        ),
    };
    render(
        StatusCode::OK,
        PaymentResultPage {
            title,
            message: &message,
            order_id: settlement.order_id.as_ref().map(OrderId::as_str),
            home: &state.config.confirmation_url,
            retry_order_id: None,
        },
    )
}

fn error_page(state: &AppState, route: CallbackRoute, order_id: Option<&str>, err: &AppError) -> Response {
    tracing::warn!(route = route.as_str(), error = %err, "payment callback ended in error");
    let (title, message) = match err {
        AppError::MissingCallbackParameter(param) => (
            "Payment information incomplete",
            format!("The payment provider did not send {param}, so the payment was not confirmed."),
        ),
        AppError::ApprovalRejected(reason) => (
            "Payment not approved",
            format!("The payment was declined: {reason}. You can start a new payment."),
        ),
        AppError::Transport(_) => (
            "Payment not confirmed",
            "We could not confirm the payment with the provider. It has been marked as failed; please start a new payment.".to_string(),
        ),
        other => ("Payment error", other.to_string()),
    };
    let order_id = order_id.and_then(OrderId::parse);
    render(
        err.status(),
        PaymentResultPage {
            title,
            message: &message,
            order_id: order_id.as_ref().map(OrderId::as_str),
            home: &state.config.confirmation_url,
            retry_order_id: None,
        },
    )
}

fn checkout_error_page(state: &AppState, err: &AppError) -> Response {
    tracing::warn!(error = %err, kind = err.kind(), "checkout failed");
    let (title, message, retry_order_id) = match err {
        AppError::PaymentSetup { order_id, .. } => (
            "Payment could not be started",
            format!("{err}. No charge was made; you can try again with the same order."),
            Some(order_id.as_str()),
        ),
        AppError::Validation(e) => (
            "Check your reservation",
            format!("{e}. Please adjust your selection and try again."),
            None,
        ),
        AppError::DuplicateSubmission => (
            "Payment in progress",
            "This payment is already being started. Please wait a moment.".to_string(),
            None,
        ),
        other => ("Payment error", other.to_string(), None),
    };
    render(
        err.status(),
        PaymentResultPage {
            title,
            message: &message,
            order_id: retry_order_id,
            home: &state.config.confirmation_url,
            retry_order_id,
        },
    )
}

fn render(status: StatusCode, page: PaymentResultPage<'_>) -> Response {
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => AppError::Internal(format!("failed to render payment page: {e}")).into_response(),
    }
}
