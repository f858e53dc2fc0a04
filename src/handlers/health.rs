use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let gateway_ready = state.gateway.ensure_ready().await.is_ok();
    Json(json!({
        "status": "ok",
        "gateway_ready": gateway_ready,
    }))
}
