use axum::http::StatusCode;
use cms_text_search::core::config::{CmsConfig, SearchConfig, ENV_TOKEN};
use cms_text_search::{http, AppState, StaticSource};
use serde_json::{json, Value};
use std::sync::Arc;

fn fixture() -> StaticSource {
    StaticSource::from_response(json!({
        "stories": [
            {
                "id": 1,
                "name": "Bike repair",
                "full_slug": "services/repair",
                "content": {
                    "component": "page",
                    "headline": "Flat tyre? We fix it.",
                    "headline__i18n__fr": "Pneu crevé ? On répare.",
                    "text": "Walk-in repairs for city bikes and e-bikes."
                }
            },
            {
                "id": 2,
                "name": "Rentals",
                "full_slug": "services/rentals",
                "content": {"component": "page", "text": "Rent a city bike by the hour."}
            }
        ]
    }))
}

async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_service() -> String {
    let state = AppState::with_source(
        reqwest::Client::new(),
        SearchConfig::default(),
        Arc::new(fixture()),
    );
    serve(http::router(Arc::new(state))).await
}

/// Service backed by a real `CmsClient` with the given CMS settings.
async fn spawn_cms_backed_service(cms: CmsConfig) -> String {
    let config = SearchConfig {
        cms,
        ..Default::default()
    };
    let state = AppState::new(reqwest::Client::new(), config);
    serve(http::router(Arc::new(state))).await
}

async fn search_status(base: &str) -> (StatusCode, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}/search", base))
        .json(&json!({"query": "bike"}))
        .send()
        .await
        .unwrap();
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn health_reports_service_name() {
    let base = spawn_service().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "cms-text-search");
}

#[tokio::test]
async fn search_returns_ranked_hits() {
    let base = spawn_service().await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/search", base))
        .json(&json!({"query": "city bike", "highlight": {"pre": "[", "post": "]"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["query"], "city bike");
    assert_eq!(body["indexed_documents"], 2);
    assert_eq!(body["total"], 3);

    let hits = body["hits"].as_array().unwrap();
    // exact phrase in the shorter rental text beats the "city bikes" repair text
    assert_eq!(hits[0]["document_slug"], "services/rentals");
    assert_eq!(hits[0]["excerpt"], "Rent a [city] [bike] by the hour.");
    assert_eq!(hits[1]["document_slug"], "services/repair");
    assert_eq!(hits[1]["path"], "content.text");
    assert_eq!(hits[2]["path"], "name");
}

#[tokio::test]
async fn whole_word_mode_over_http() {
    let base = spawn_service().await;
    let body: Value = reqwest::Client::new()
        .post(format!("{}/search", base))
        .json(&json!({"query": "bike", "mode": "whole_word"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // "bikes" and "e-bikes" in the repair text are not whole words
    assert_eq!(body["total"], 2);
    let paths: Vec<(&str, &str)> = body["hits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| (h["document_slug"].as_str().unwrap(), h["path"].as_str().unwrap()))
        .collect();
    assert!(paths.contains(&("services/rentals", "content.text")));
    assert!(paths.contains(&("services/repair", "name")));
}

#[tokio::test]
async fn empty_query_is_bad_request() {
    let base = spawn_service().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/search", base))
        .json(&json!({"query": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("query"));
}

#[tokio::test]
async fn refresh_rebuilds_locale_index() {
    let base = spawn_service().await;
    let client = reqwest::Client::new();

    let refreshed: Value = client
        .post(format!("{}/refresh", base))
        .json(&json!({"locale": "fr"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(refreshed["locale"], "fr");
    assert_eq!(refreshed["documents"], 2);
    assert!(refreshed["refreshed_at"].as_str().is_some());

    let body: Value = client
        .post(format!("{}/search", base))
        .json(&json!({"query": "pneu", "locale": "fr"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["hits"][0]["locale"], "fr");
    assert_eq!(body["hits"][0]["field"], "headline");
}

#[tokio::test]
async fn rejected_cms_request_is_bad_gateway() {
    let cms = serve(axum::Router::new().fallback(|| async {
        (StatusCode::UNAUTHORIZED, "invalid token")
    }))
    .await;
    let base = spawn_cms_backed_service(CmsConfig {
        base_url: Some(format!("{}/v2/cdn", cms)),
        token: Some("revoked".into()),
        max_retry_secs: Some(1),
        ..Default::default()
    })
    .await;

    let (status, body) = search_status(&base).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("401"), "error: {}", message);
    assert!(!message.contains("revoked"));
}

#[tokio::test]
async fn unreachable_cms_is_bad_gateway() {
    // bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = spawn_cms_backed_service(CmsConfig {
        base_url: Some(format!("http://{}/v2/cdn", addr)),
        token: Some("t".into()),
        max_retry_secs: Some(1),
        ..Default::default()
    })
    .await;

    let (status, _) = search_status(&base).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn local_misconfiguration_is_internal_error() {
    std::env::remove_var(ENV_TOKEN);

    let no_token = spawn_cms_backed_service(CmsConfig {
        base_url: Some("http://127.0.0.1:9/v2/cdn".into()),
        ..Default::default()
    })
    .await;
    let (status, body) = search_status(&no_token).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("token"));

    let bad_base = spawn_cms_backed_service(CmsConfig {
        base_url: Some("ftp://cms.example.com".into()),
        token: Some("t".into()),
        ..Default::default()
    })
    .await;
    let (status, _) = search_status(&bad_base).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
