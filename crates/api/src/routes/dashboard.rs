use axum::routing::get;
use axum::Router;

use crate::handlers::dashboard;
use crate::state::AppState;

/// Mount the HTML status page at `/`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard::index))
}
