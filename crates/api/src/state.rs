use std::sync::Arc;

use chaincast_pipeline::Dispatcher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Runs dispatch attempts and owns the catalog and state store.
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<ServerConfig>,
}
