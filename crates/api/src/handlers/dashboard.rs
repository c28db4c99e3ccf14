//! GET / : a small HTML page over the committed state.

use std::fmt::Write as _;

use axum::extract::State;
use axum::response::Html;
use chaincast_core::types::Timestamp;
use chrono::Utc;

use crate::error::AppResult;
use crate::handlers::status::{status_snapshot, StatusResponse};
use crate::state::AppState;

const DASHBOARD_RECENT_POSTS: i64 = 5;

/// Minimal HTML escaping for text nodes and attribute values.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn format_time(ts: Option<Timestamp>) -> String {
    ts.map_or_else(
        || "never".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

fn render(status: &StatusResponse, recent: &[(String, String, Timestamp)]) -> String {
    let mut page = String::with_capacity(4096);
    page.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>chaincast</title>\n<style>\
         body{font-family:system-ui,sans-serif;max-width:720px;margin:2rem auto;padding:0 1rem}\
         table{border-collapse:collapse}td{padding:.25rem .75rem;border-bottom:1px solid #ddd}\
         li{margin-bottom:.75rem;white-space:pre-wrap}\
         </style>\n</head>\n<body>\n",
    );
    let _ = writeln!(page, "<h1>chaincast: {}</h1>", escape(&status.bot_id));

    if !status.initialized {
        page.push_str("<p>No dispatch has run yet.</p>\n");
    }

    let state = &status.state;
    let rows = [
        ("Last index", state.last_index.to_string()),
        ("Last dispatch", format_time(state.last_dispatch_at)),
        (
            "Next project",
            format!("{} ({})", status.next_unit.name, status.next_unit.handle),
        ),
        (
            "Budget",
            format!(
                "{} of {} left in a {}s window",
                status.budget.remaining, status.rate_limit.limit, status.rate_limit.window_secs
            ),
        ),
        ("Next slot", format_time(Some(status.budget.next_slot_at))),
        ("State version", status.version.to_string()),
        ("Catalog size", status.catalog_size.to_string()),
    ];
    page.push_str("<table>\n");
    for (label, value) in rows {
        let _ = writeln!(page, "<tr><td>{label}</td><td>{}</td></tr>", escape(&value));
    }
    page.push_str("</table>\n");

    if !recent.is_empty() {
        page.push_str("<h2>Recent posts</h2>\n<ul>\n");
        for (slug, content, published_at) in recent {
            let _ = writeln!(
                page,
                "<li><strong>{}</strong> <small>{}</small><br>{}</li>",
                escape(slug),
                format_time(Some(*published_at)),
                escape(content)
            );
        }
        page.push_str("</ul>\n");
    }

    page.push_str("</body>\n</html>\n");
    page
}

/// GET /
pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let status = status_snapshot(&state, Utc::now()).await?;
    let recent: Vec<_> = state
        .dispatcher
        .store()
        .recent_posts(&status.bot_id, None, DASHBOARD_RECENT_POSTS)
        .await?
        .into_iter()
        .map(|p| (p.unit_slug, p.content, p.published_at))
        .collect();

    Ok(Html(render(&status, &recent)))
}
