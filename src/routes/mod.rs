pub mod submit;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(liveness))
        .route("/api/osd/submit", post(submit::submit))
}

async fn liveness() -> &'static str {
    "OSD server running"
}
