use axum::routing::get;
use axum::Router;

use crate::handlers::dispatch;
use crate::state::AppState;

/// Routes mounted under `/api`.
///
/// ```text
/// GET|POST  /generate   -> generate
/// GET|POST  /cron       -> cron
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", get(dispatch::generate).post(dispatch::generate))
        .route("/cron", get(dispatch::cron).post(dispatch::cron))
}
