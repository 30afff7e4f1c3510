pub mod admin;
pub mod health;

pub use admin::{admin_stats, hard_delete_photo, run_purge};
pub use health::health_check;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Operational router: health and admin endpoints
pub fn router(state: AppState) -> Router {
    let log_requests = state.config.log_requests;

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/admin/stats", get(admin_stats))
        .route("/admin/purge", post(run_purge))
        .route("/admin/photos/:user_id/:image_id", delete(hard_delete_photo))
        .with_state(state);

    if log_requests {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}
