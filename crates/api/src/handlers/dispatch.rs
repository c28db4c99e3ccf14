//! Handlers that trigger one dispatch attempt.
//!
//! `/api/generate` and `/api/cron` share the same semantics; the cron route
//! additionally checks `Authorization: Bearer <CRON_SECRET>` when a secret
//! is configured.

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, RETRY_AFTER};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chaincast_core::dispatch::DispatchOutcome;
use serde_json::json;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET|POST /api/generate
pub async fn generate(State(state): State<AppState>) -> AppResult<Response> {
    run_dispatch(&state, "manual").await
}

/// GET|POST /api/cron
pub async fn cron(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    authorize_cron(&state.config, &headers)?;
    run_dispatch(&state, "cron").await
}

async fn run_dispatch(state: &AppState, trigger: &'static str) -> AppResult<Response> {
    tracing::info!(trigger, "Dispatch triggered");
    let outcome = state.dispatcher.dispatch().await?;
    Ok(outcome_response(outcome))
}

/// Both outcomes answer 200; a rate-limited attempt is expected, not an
/// error.
fn outcome_response(outcome: DispatchOutcome) -> Response {
    match outcome {
        DispatchOutcome::Published(published) => Json(json!({
            "success": true,
            "outcome": "published",
            "data": published,
        }))
        .into_response(),
        DispatchOutcome::RateLimited(limited) => {
            let mut response = Json(json!({
                "success": false,
                "outcome": "rate_limited",
                "reason": limited.reason,
                "retry_after_secs": limited.retry_after_secs,
            }))
            .into_response();
            if let Some(secs) = limited.retry_after_secs {
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(secs));
            }
            response
        }
    }
}

fn authorize_cron(config: &ServerConfig, headers: &HeaderMap) -> AppResult<()> {
    let Some(secret) = config.cron_secret.as_deref() else {
        return Ok(());
    };

    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(secret) {
        Ok(())
    } else {
        tracing::warn!("Rejected cron trigger with missing or wrong secret");
        Err(AppError::Unauthorized)
    }
}
