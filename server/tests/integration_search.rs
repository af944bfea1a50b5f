use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use guidex_core::acronym::AcronymMatcher;
use guidex_core::acronym_store::MemoryAcronymStore;
use guidex_core::reload::{ChangeSignal, SharedIndex};
use guidex_server::catalog::Catalog;
use guidex_server::loader::{self, FileWatch};
use guidex_server::{build_app, AppState};

struct TestServer {
    _temp: TempDir,
    state: AppState,
    app: Router,
}

fn guide_json() -> Value {
    json!({
        "folders": [
            {
                "main_folder": "Finance",
                "sub_folder": "Invoices",
                "document_type": "Financial",
                "identification_rules": "Contains invoice number",
                "supporting_information": "Retain two years"
            },
            {
                "main_folder": "Finance",
                "sub_folder": "Receipts",
                "document_type": "Financial",
                "identification_rules": "Shows amount paid",
                "supporting_information": ""
            },
            {
                "main_folder": "Legal",
                "sub_folder": "Contracts",
                "document_type": "Agreement",
                "identification_rules": "Signed by both parties",
                "supporting_information": ""
            }
        ],
        "updates": [
            {
                "reference": "REF-1",
                "date": "2024-01-05",
                "main_folder": "Finance",
                "category": "Invoices",
                "description": "Renamed from Bills"
            },
            {
                "reference": "REF-2",
                "date": "2024-02-10",
                "main_folder": "Legal",
                "category": "Contracts",
                "description": "New retention period"
            }
        ]
    })
}

fn write_guide(path: &Path, content: &Value) {
    fs::write(path, serde_json::to_string_pretty(content).unwrap()).unwrap();
}

fn setup() -> TestServer {
    let temp = tempfile::tempdir().unwrap();
    let data_path = temp.path().join("guide.json");
    write_guide(&data_path, &guide_json());

    let state = AppState {
        index: SharedIndex::new(),
        catalog: Arc::new(Catalog::new()),
        acronyms: Arc::new(AcronymMatcher::new(Arc::new(MemoryAcronymStore::new()))),
        watch: Arc::new(FileWatch::new(&data_path)),
        change: Arc::new(ChangeSignal::new()),
    };
    loader::load_data(state.watch.path(), &state.catalog, &state.index).unwrap();

    let app = build_app(state.clone());
    TestServer { _temp: temp, state, app }
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let server = setup();
    let (status, body) = get(server.app, "/search?query=invoice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exact"], json!(true));
    assert_eq!(body["message"], json!("Showing results"));

    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    let top = &matches[0];
    assert_eq!(top["main_folder"], json!("Finance"));
    assert_eq!(top["sub_folder"], json!("Invoices"));
    assert_eq!(top["document_type_identification_rules"], json!("Contains invoice number"));
    assert_eq!(top["match_type"], json!("Exact Match"));
    // Token hit in the rules (3 * 3) plus a substring hit in the name (1.5 * 2).
    assert!((top["score"].as_f64().unwrap() - 12.0).abs() < 1e-6);
    assert_eq!(body["acronym_matches"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn empty_query_is_answered_without_matching() {
    let server = setup();
    let (status, body) = get(server.app, "/search?query=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exact"], json!(false));
    assert_eq!(body["message"], json!("No query provided."));
    assert_eq!(body["matches"].as_array().unwrap().len(), 0);
    // The early return carries no acronym key at all.
    assert!(body.get("acronym_matches").is_none());
}

#[tokio::test]
async fn absent_query_parameter_behaves_like_empty() {
    let server = setup();
    let (status, body) = get(server.app, "/search").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("No query provided."));
}

#[tokio::test]
async fn unmatched_query_reports_no_matches() {
    let server = setup();
    let (status, body) = get(server.app, "/search?query=zzzzz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exact"], json!(false));
    assert_eq!(body["message"], json!("No matches found."));
    assert_eq!(body["matches"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn weak_matches_are_labelled_partial() {
    let server = setup();
    // "retain" appears only in Invoices' supporting_information, so the
    // score is 1.0 * 3 and stays under the exact cut.
    let (status, body) = get(server.app, "/search?query=retain").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exact"], json!(false));
    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["match_type"], json!("Partial Match"));
    assert!((matches[0]["score"].as_f64().unwrap() - 3.0).abs() < 1e-6);
}

#[tokio::test]
async fn search_responses_include_acronym_matches() {
    let server = setup();
    server
        .state
        .acronyms
        .suggest("INV", "Invoice", Some("Finance"))
        .unwrap();

    let (status, body) = get(server.app, "/search?query=inv").await;
    assert_eq!(status, StatusCode::OK);

    let acronyms = body["acronym_matches"].as_array().unwrap();
    assert_eq!(acronyms.len(), 1);
    assert_eq!(acronyms[0]["acronym"], json!("INV"));
    assert_eq!(acronyms[0]["expansion"], json!("Invoice"));
}

#[tokio::test]
async fn updates_feed_is_newest_first() {
    let server = setup();
    let (status, body) = get(server.app, "/updates").await;

    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["category"], json!("Contracts"));
    assert_eq!(entries[0]["date"], json!("2024-02-10"));
    assert_eq!(entries[0]["new"], json!(false));
    assert_eq!(entries[1]["category"], json!("Invoices"));
}

#[tokio::test]
async fn acronym_suggest_then_search() {
    let server = setup();

    let (status, body) = post_json(
        server.app.clone(),
        "/api/acronyms/suggest",
        json!({"acronym": "po", "expansion": "Purchase Order", "context": "Procurement"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Acronym successfully added or updated"));

    let (status, body) = get(server.app, "/api/acronyms/search?query=PO").await;
    assert_eq!(status, StatusCode::OK);
    let matches = body.as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["acronym"], json!("PO"));
    assert_eq!(matches[0]["context"], json!("Procurement"));
}

#[tokio::test]
async fn acronym_suggest_requires_both_fields() {
    let server = setup();
    let (status, body) = post_json(
        server.app,
        "/api/acronyms/suggest",
        json!({"acronym": "PO"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Acronym and expansion are required"));
}

#[tokio::test]
async fn approving_an_unknown_id_still_succeeds() {
    let server = setup();
    let (status, body) = post_json(server.app, "/api/acronyms/9999/approve", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Acronym approval recorded"));
}

#[tokio::test]
async fn manual_reload_picks_up_new_data() {
    let server = setup();

    let mut updated = guide_json();
    updated["folders"].as_array_mut().unwrap().push(json!({
        "main_folder": "Finance",
        "sub_folder": "Credit notes",
        "document_type": "Financial",
        "identification_rules": "References an invoice",
        "supporting_information": ""
    }));
    write_guide(server.state.watch.path(), &updated);

    let (status, body) = post_json(server.app.clone(), "/reload_data", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Data loaded successfully and search index updated."));

    let (_, body) = get(server.app, "/search?query=credit").await;
    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["sub_folder"], json!("Credit notes"));
}

#[tokio::test]
async fn change_signal_triggers_reload_on_next_request() {
    let server = setup();

    let mut updated = guide_json();
    updated["folders"].as_array_mut().unwrap().push(json!({
        "main_folder": "Finance",
        "sub_folder": "Statements",
        "document_type": "Financial",
        "identification_rules": "Monthly bank statement",
        "supporting_information": ""
    }));
    write_guide(server.state.watch.path(), &updated);

    // Not visible yet: nothing has signalled a change.
    let (_, body) = get(server.app.clone(), "/search?query=statement").await;
    assert_eq!(body["matches"].as_array().unwrap().len(), 0);

    server.state.change.mark_changed();
    let (_, body) = get(server.app.clone(), "/search?query=statement").await;
    assert_eq!(body["matches"].as_array().unwrap().len(), 1);

    // The flag is consumed by the reload.
    assert!(!server.state.change.is_set());
}

#[tokio::test]
async fn reload_failure_keeps_serving_previous_data() {
    let server = setup();

    fs::write(server.state.watch.path(), "not json").unwrap();
    server.state.change.mark_changed();

    let (status, body) = get(server.app.clone(), "/search?query=invoice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matches"].as_array().unwrap().len(), 1);

    // A manual reload reports the failure explicitly.
    let (status, body) = post_json(server.app, "/reload_data", json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("An error occurred during data reload"));
}

#[tokio::test]
async fn health_endpoint() {
    let server = setup();
    let response = server
        .app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
