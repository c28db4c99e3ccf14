//! Read-only views of committed state and post history.

use axum::extract::{Path, State};
use axum::Json;
use chaincast_core::catalog::ContentUnit;
use chaincast_core::cursor::{remaining_budget, select_next, DispatchState, RateBudget};
use chaincast_core::dispatch::PublishedPost;
use chaincast_core::types::Timestamp;
use chrono::Utc;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Window the history endpoints count posts over.
pub const STATS_WINDOW_DAYS: i64 = 30;

/// Most recent posts listed by `/api/stats`.
const STATS_RECENT_POSTS: i64 = 10;

/// Recent posts listed on a project detail.
const PROJECT_RECENT_POSTS: i64 = 5;

#[derive(Debug, Serialize)]
pub struct RateLimitSummary {
    pub limit: u32,
    pub window_secs: i64,
}

/// Committed dispatch state plus what it implies for the next attempt.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub bot_id: String,
    /// `false` until the first dispatch attempt creates the record.
    pub initialized: bool,
    pub state: DispatchState,
    pub version: i64,
    pub next_index: usize,
    pub next_unit: ContentUnit,
    pub budget: RateBudget,
    pub rate_limit: RateLimitSummary,
    pub catalog_size: usize,
}

#[derive(Debug, Serialize)]
pub struct ProjectCount {
    pub slug: String,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub window_days: i64,
    pub total_posts: i64,
    pub per_project: Vec<ProjectCount>,
    pub recent_posts: Vec<PublishedPost>,
}

#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub unit: ContentUnit,
    pub posts_last_30_days: i64,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub unit: ContentUnit,
    pub posts_last_30_days: i64,
    pub recent_posts: Vec<PublishedPost>,
}

/// Build the status view at `now`. Shared with the HTML dashboard.
pub(crate) async fn status_snapshot(state: &AppState, now: Timestamp) -> AppResult<StatusResponse> {
    let dispatcher = &state.dispatcher;
    let config = dispatcher.config();
    let catalog = dispatcher.catalog();

    let loaded = dispatcher.store().load(&config.bot_id).await?;
    let initialized = loaded.is_some();
    let (current, version) = match loaded {
        Some(v) => (v.state, v.version),
        None => (dispatcher.initial_state(), 0),
    };

    let next_index = select_next(&current, catalog.len());
    Ok(StatusResponse {
        bot_id: config.bot_id.clone(),
        initialized,
        state: current,
        version,
        next_index,
        next_unit: catalog.units()[next_index].clone(),
        budget: remaining_budget(&current, now, &config.rate_limit),
        rate_limit: RateLimitSummary {
            limit: config.rate_limit.limit(),
            window_secs: config.rate_limit.window().num_seconds(),
        },
        catalog_size: catalog.len(),
    })
}

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> AppResult<Json<DataResponse<StatusResponse>>> {
    let data = status_snapshot(&state, Utc::now()).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<DataResponse<StatsResponse>>> {
    let dispatcher = &state.dispatcher;
    let bot_id = dispatcher.config().bot_id.as_str();
    let since = Utc::now() - chrono::Duration::days(STATS_WINDOW_DAYS);

    let counts = dispatcher.store().post_counts_since(bot_id, since).await?;
    let recent_posts = dispatcher
        .store()
        .recent_posts(bot_id, None, STATS_RECENT_POSTS)
        .await?;

    let per_project: Vec<ProjectCount> = counts
        .into_iter()
        .map(|c| ProjectCount {
            name: dispatcher
                .catalog()
                .find_by_slug(&c.unit_slug)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| c.unit_slug.clone()),
            slug: c.unit_slug,
            count: c.count,
        })
        .collect();

    Ok(Json(DataResponse {
        data: StatsResponse {
            window_days: STATS_WINDOW_DAYS,
            total_posts: per_project.iter().map(|p| p.count).sum(),
            per_project,
            recent_posts,
        },
    }))
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ProjectSummary>>>> {
    let dispatcher = &state.dispatcher;
    let since = Utc::now() - chrono::Duration::days(STATS_WINDOW_DAYS);
    let counts = dispatcher
        .store()
        .post_counts_since(&dispatcher.config().bot_id, since)
        .await?;

    let data = dispatcher
        .catalog()
        .units()
        .iter()
        .map(|unit| ProjectSummary {
            posts_last_30_days: counts
                .iter()
                .find(|c| c.unit_slug == unit.slug)
                .map_or(0, |c| c.count),
            unit: unit.clone(),
        })
        .collect();

    Ok(Json(DataResponse { data }))
}

/// GET /api/projects/{slug}
pub async fn get_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    let dispatcher = &state.dispatcher;
    let unit = dispatcher.catalog().require_slug(&slug)?.clone();
    let bot_id = dispatcher.config().bot_id.as_str();
    let since = Utc::now() - chrono::Duration::days(STATS_WINDOW_DAYS);

    let posts_last_30_days = dispatcher
        .store()
        .post_counts_since(bot_id, since)
        .await?
        .into_iter()
        .find(|c| c.unit_slug == unit.slug)
        .map_or(0, |c| c.count);
    let recent_posts = dispatcher
        .store()
        .recent_posts(bot_id, Some(&unit.slug), PROJECT_RECENT_POSTS)
        .await?;

    Ok(Json(DataResponse {
        data: ProjectDetail {
            unit,
            posts_last_30_days,
            recent_posts,
        },
    }))
}
