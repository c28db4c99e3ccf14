pub mod dashboard;
pub mod dispatch;
pub mod health;
pub mod status;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /generate                 one dispatch attempt (GET, POST)
/// /cron                     same, behind the optional cron secret (GET, POST)
///
/// /status                   committed state and remaining budget
/// /stats                    post counts and most recent posts
/// /projects                 catalog with per-project post counts
/// /projects/{slug}          one project with its recent posts
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(dispatch::router())
        .merge(status::router())
}
