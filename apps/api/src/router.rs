use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::{appointment_routes, availability_routes};
use assistant_cell::router::assistant_routes;
use realtime_cell::router::realtime_routes;
use shared_state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Dental Calendar API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/assistant", assistant_routes(state.clone()))
        .merge(realtime_routes(state))
}
