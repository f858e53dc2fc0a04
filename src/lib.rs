pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/venues/:id", get(handlers::venues::get_venue))
        .route("/api/venues/:id/slots", get(handlers::venues::get_slots))
        .route("/api/venues/:id/quote", get(handlers::venues::get_quote))
        .route(
            "/api/reservations",
            post(handlers::reservations::create_reservation),
        )
        .route("/api/payments", post(handlers::payments::start_payment))
        .route(
            "/api/payments/:order_id",
            get(handlers::payments::get_payment),
        )
        .route("/payment/checkout", post(handlers::payments::checkout))
        .route("/payment/approve", get(handlers::payments::approve_callback))
        .route("/payment/cancel", get(handlers::payments::cancel_callback))
        .route("/payment/fail", get(handlers::payments::fail_callback))
        .with_state(state)
}
