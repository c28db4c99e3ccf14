//! Integration tests for the read-only routes: status, stats, projects and
//! the HTML dashboard.

mod common;

use axum::http::StatusCode;
use common::{body_bytes, body_json, build_test_app, get, post};

#[tokio::test]
async fn status_before_first_dispatch_reports_initial_state() {
    let test = build_test_app();
    let response = get(test.app(), "/api/status").await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["bot_id"], common::BOT);
    assert_eq!(data["initialized"], false);
    assert_eq!(data["version"], 0);
    assert_eq!(data["state"]["last_index"], 2);
    assert_eq!(data["next_index"], 0);
    assert_eq!(data["next_unit"]["name"], "Alpha");
    assert_eq!(data["budget"]["remaining"], 1);
    assert_eq!(data["rate_limit"]["limit"], 1);
    assert_eq!(data["rate_limit"]["window_secs"], 3600);
    assert_eq!(data["catalog_size"], 3);
}

#[tokio::test]
async fn status_reflects_committed_dispatch() {
    let test = build_test_app();
    post(test.app(), "/api/generate").await;

    let data = &body_json(get(test.app(), "/api/status").await).await["data"];
    assert_eq!(data["initialized"], true);
    assert_eq!(data["version"], 1);
    assert_eq!(data["state"]["last_index"], 0);
    assert_eq!(data["state"]["window_count"], 1);
    assert_eq!(data["next_index"], 1);
    assert_eq!(data["next_unit"]["name"], "Beta");
    assert_eq!(data["budget"]["used"], 1);
    assert_eq!(data["budget"]["remaining"], 0);
    assert!(data["budget"]["window_resets_at"].is_string());
}

#[tokio::test]
async fn stats_count_recent_posts_per_project() {
    let test = build_test_app();
    post(test.app(), "/api/generate").await;

    let data = &body_json(get(test.app(), "/api/stats").await).await["data"];
    assert_eq!(data["window_days"], 30);
    assert_eq!(data["total_posts"], 1);
    assert_eq!(data["per_project"][0]["slug"], "alpha");
    assert_eq!(data["per_project"][0]["name"], "Alpha");
    assert_eq!(data["per_project"][0]["count"], 1);
    assert_eq!(data["recent_posts"].as_array().unwrap().len(), 1);
    assert_eq!(data["recent_posts"][0]["origin"], "generated");
}

#[tokio::test]
async fn projects_list_the_whole_catalog_with_counts() {
    let test = build_test_app();
    post(test.app(), "/api/generate").await;

    let data = body_json(get(test.app(), "/api/projects").await).await["data"].clone();
    let projects = data.as_array().unwrap();
    assert_eq!(projects.len(), 3);
    assert_eq!(projects[0]["slug"], "alpha");
    assert_eq!(projects[0]["handle"], "@Alpha");
    assert_eq!(projects[0]["posts_last_30_days"], 1);
    assert_eq!(projects[1]["posts_last_30_days"], 0);
}

#[tokio::test]
async fn project_detail_includes_recent_posts() {
    let test = build_test_app();
    post(test.app(), "/api/generate").await;

    let response = get(test.app(), "/api/projects/alpha").await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["name"], "Alpha");
    assert_eq!(data["posts_last_30_days"], 1);
    assert_eq!(data["recent_posts"][0]["unit_slug"], "alpha");
}

#[tokio::test]
async fn unknown_project_returns_404() {
    let test = build_test_app();
    let response = get(test.app(), "/api/projects/nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Project 'nope' not found");
}

#[tokio::test]
async fn read_routes_return_503_when_store_is_down() {
    let test = build_test_app();
    test.store.set_unavailable(true).await;

    for uri in ["/api/status", "/api/stats", "/api/projects", "/"] {
        let response = get(test.app(), uri).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "{uri}");
    }
}

#[tokio::test]
async fn dashboard_renders_html_status() {
    let test = build_test_app();

    let response = get(test.app(), "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let page = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(page.contains("No dispatch has run yet."));
    assert!(page.contains("Alpha (@Alpha)"));
    assert!(!page.contains("Recent posts"));

    post(test.app(), "/api/generate").await;
    let page = String::from_utf8(body_bytes(get(test.app(), "/").await).await).unwrap();
    assert!(page.contains("Recent posts"));
    assert!(page.contains("Beta (@Beta)"));
    assert!(!page.contains("No dispatch has run yet."));
}
