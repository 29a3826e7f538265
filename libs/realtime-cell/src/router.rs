// libs/realtime-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use shared_state::AppState;

use crate::handlers;

pub fn realtime_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(handlers::websocket_handler))
        .with_state(state)
}
