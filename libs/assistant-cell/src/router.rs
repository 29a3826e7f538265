// libs/assistant-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_state::AppState;

use crate::handlers;

pub fn assistant_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/book", post(handlers::book_appointment))
        .route("/today", get(handlers::today))
        .route("/patient/{phone}", get(handlers::patient_appointments))
        .route("/week", get(handlers::week_overview))
        .route("/upcoming", get(handlers::upcoming))
        .route("/next-available", get(handlers::next_available))
        .route("/check-date/{date}", get(handlers::check_date))
        .route("/suggest-times", get(handlers::suggest_times))
        .with_state(state)
}
