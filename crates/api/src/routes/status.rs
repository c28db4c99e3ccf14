use axum::routing::get;
use axum::Router;

use crate::handlers::status;
use crate::state::AppState;

/// Routes mounted under `/api`.
///
/// ```text
/// GET  /status            -> status
/// GET  /stats             -> stats
/// GET  /projects          -> list_projects
/// GET  /projects/{slug}   -> get_project
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status::status))
        .route("/stats", get(status::stats))
        .route("/projects", get(status::list_projects))
        .route("/projects/{slug}", get(status::get_project))
}
