// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use shared_state::AppState;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/", post(handlers::create_appointment))
        .route("/calendar", get(handlers::calendar_events))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", put(handlers::update_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        .with_state(state)
}

pub fn availability_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/next", get(handlers::next_available))
        .route("/suggestions", get(handlers::suggestions))
        .route("/{date}", get(handlers::check_availability))
        .with_state(state)
}
