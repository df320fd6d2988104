//! End-to-end pipeline: download → reorder → analyze → simulate → replay,
//! plus the same flow driven through the HTTP API.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use secrecy::SecretString;
use std::sync::Arc;
use tower::ServiceExt;

use crash_analytics::analytics::{run_analytics, AnalyticsParams};
use crash_analytics::credentials::{CredentialStore, MemoryCredentialStore};
use crash_analytics::history::fetch_history;
use crash_analytics::server::{build_router, ServerState};
use crash_analytics::storage;
use crash_analytics::types::{into_chronological, GatewayError, HeaderBlob};

use crate::mock_history::MockHistory;

/// Oldest first: L L W L W W L L L W at threshold 2.0.
const ROUNDS: [f64; 10] = [1.2, 1.4, 2.5, 1.1, 3.0, 5.0, 1.3, 1.9, 1.0, 2.0];

fn auth_headers() -> HeaderBlob {
    let mut headers = HeaderBlob::new();
    headers.insert("x-access-token".into(), "tok".into());
    headers
}

fn doubling() -> AnalyticsParams {
    AnalyticsParams {
        threshold: 2.0,
        start_bet: 1.0,
        escalation_pct: 100.0,
        bankroll: 1000.0,
        ..AnalyticsParams::default()
    }
}

#[tokio::test]
async fn test_download_and_analyze() {
    let source = MockHistory::from_chronological(&ROUNDS);

    let newest_first = fetch_history(&source, &auth_headers(), 100, 4).await.unwrap();
    assert_eq!(newest_first.len(), 10);
    assert_eq!(newest_first[0].id, "round-9");
    // Pages of 4 until the source runs dry.
    assert_eq!(source.requests(), vec![(4, 0), (4, 4), (4, 8), (4, 10)]);

    let records = into_chronological(newest_first);
    let result = run_analytics(&records, &doubling());

    let analysis = &result.analysis;
    assert_eq!(analysis.total_wins, 4);
    assert_eq!(analysis.total_losses, 6);
    assert_eq!(analysis.wins_after_win, 1);
    assert_eq!(analysis.wins_after_loss, 3);
    assert_eq!(analysis.max_gap, 4);
    assert_eq!(analysis.loss_streaks.count(3), 1);
    assert_eq!(analysis.win_streaks.count(1), 2);
    assert_eq!(analysis.win_streaks.count(2), 1);
    assert_eq!(analysis.records[9].gap_label.as_deref(), Some("4th"));

    // Bet count tuned to the longest gap: 1, 2, 4, 8.
    assert_eq!(result.bet_count_cap, 4);
    assert_eq!(result.simulation.effective_length, 4);
    assert_eq!(result.simulation.bankroll_needed, 15.0);
    assert_eq!(result.projected_profit_loss, 4.0);
}

#[tokio::test]
async fn test_download_truncates_to_target() {
    let source = MockHistory::from_chronological(&ROUNDS);
    let records = fetch_history(&source, &auth_headers(), 5, 3).await.unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(source.requests(), vec![(3, 0), (2, 3)]);
}

#[tokio::test]
async fn test_download_propagates_upstream_error() {
    let source = MockHistory::from_chronological(&ROUNDS);
    source.fail_with(429);
    let err = fetch_history(&source, &auth_headers(), 10, 5).await.unwrap_err();
    assert!(matches!(err, GatewayError::Upstream { status: 429, .. }));
}

#[tokio::test]
async fn test_saved_history_reanalyzes_identically() {
    let source = MockHistory::from_chronological(&ROUNDS);
    let records = into_chronological(fetch_history(&source, &auth_headers(), 10, 50).await.unwrap());

    let mut path = std::env::temp_dir();
    path.push(format!("crash_pipeline_{}.json", uuid::Uuid::new_v4()));
    storage::save_records(&records, &path).unwrap();
    let loaded = storage::load_records(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    let before = run_analytics(&records, &doubling());
    let after = run_analytics(&loaded, &doubling());
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_api_headers_then_history() {
    let store = Arc::new(MemoryCredentialStore::new());
    let state = Arc::new(ServerState {
        store: store.clone(),
        fetcher: Arc::new(MockHistory::from_chronological(&ROUNDS)),
        api_key: SecretString::new("k".to_string()),
        defaults: doubling(),
    });

    // Before headers are stored the proxy has nothing to authenticate with.
    let resp = build_router(state.clone())
        .oneshot(Request::builder().uri("/api/crash-history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = build_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/crash-history/headers")
                .header("content-type", "application/json")
                .header("app-api-key", "k")
                .body(Body::from(r#"{"headers": {"x-access-token": "tok"}}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(store.get().is_ok());

    let resp = build_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/crash-history?limit=3&offset=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["round-9", "round-8", "round-7"]);
}

#[tokio::test]
async fn test_api_analytics_falls_back_to_server_defaults() {
    let state = Arc::new(ServerState {
        store: Arc::new(MemoryCredentialStore::new()),
        fetcher: Arc::new(MockHistory::from_chronological(&[])),
        api_key: SecretString::new("k".to_string()),
        defaults: doubling(),
    });

    let records: Vec<serde_json::Value> = ROUNDS
        .iter()
        .map(|p| serde_json::json!({ "crashpoint": p }))
        .collect();
    let body = serde_json::json!({ "records": records }).to_string();

    let resp = build_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analytics")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["projected_profit_loss"], 4.0);
    assert_eq!(json["simulation"]["ledger"].as_array().unwrap().len(), 4);
}
