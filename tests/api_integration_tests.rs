//! Integration Tests for the HTTP transport
//!
//! Drives the full router with mocked CEDAR and BioPortal upstreams and a
//! real on-disk search cache.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cedar_mcp::{
    api::create_router,
    cache::{CacheStore, ManualClock, SearchCache, CACHED_FIELD, CACHE_AGE_FIELD},
    clients::{BioPortalClient, CedarClient},
    config::CacheConfig,
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// == Helper Functions ==

fn state_with_cache(upstream: &MockServer, cache: SearchCache) -> AppState {
    AppState {
        cache,
        bioportal: Arc::new(BioPortalClient::new(&upstream.uri(), "bp-key").unwrap()),
        cedar: Arc::new(
            CedarClient::new(&upstream.uri(), "https://repo.metadatacenter.org", "cedar-key")
                .unwrap(),
        ),
    }
}

fn disk_cache(dir: &TempDir) -> SearchCache {
    SearchCache::open(&CacheConfig::new(dir.path(), 3600))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn tool_call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

/// Decodes the JSON payload carried in a tool result's text content.
fn tool_payload(response: &Value) -> Value {
    assert_eq!(response["result"]["isError"], false, "tool failed: {response}");
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

async fn mount_search(upstream: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "aspirin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "collection": [{"@id": "http://purl.obolibrary.org/obo/CHEBI_15365", "prefLabel": "aspirin"}]
        })))
        .expect(expected_calls)
        .mount(upstream)
        .await;
}

// == Health and Stats ==

#[tokio::test]
async fn test_health_endpoint() {
    let upstream = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let app = create_router(state_with_cache(&upstream, disk_cache(&dir)));

    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["cache_available"], true);
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_stats_reflect_hits_and_misses() {
    let upstream = MockServer::start().await;
    mount_search(&upstream, 1).await;
    let dir = TempDir::new().unwrap();
    let app = create_router(state_with_cache(&upstream, disk_cache(&dir)));

    let args = json!({"search_string": "aspirin", "ontology_acronym": "CHEBI"});
    for id in 0..3 {
        let (status, _) = send(&app, "POST", "/mcp", Some(tool_call(id, "term_search_from_ontology", args.clone()))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["hits"], 2);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["writes"], 1);
    assert_eq!(stats["total_entries"], 1);
    assert_eq!(stats["ttl_seconds"], 3600);
}

// == MCP Endpoint ==

#[tokio::test]
async fn test_tools_list() {
    let upstream = MockServer::start().await;
    let app = create_router(state_with_cache(&upstream, SearchCache::bypass(60)));

    let (status, json) = send(
        &app,
        "POST",
        "/mcp",
        Some(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"term_search_from_branch"));
    assert!(names.contains(&"remove_stale_cache_entries"));
    assert!(names.contains(&"clear_cache"));
}

#[tokio::test]
async fn test_identical_searches_hit_upstream_once() {
    let upstream = MockServer::start().await;
    mount_search(&upstream, 1).await;
    let dir = TempDir::new().unwrap();
    let app = create_router(state_with_cache(&upstream, disk_cache(&dir)));

    let (_, first) = send(
        &app,
        "POST",
        "/mcp",
        Some(tool_call(1, "term_search_from_ontology", json!({"search_string": "aspirin", "ontology_acronym": "CHEBI"}))),
    )
    .await;
    let first = tool_payload(&first);
    assert!(first.get(CACHED_FIELD).is_none());

    let (_, second) = send(
        &app,
        "POST",
        "/mcp",
        Some(tool_call(2, "term_search_from_ontology", json!({"ontology_acronym": "CHEBI", "search_string": " aspirin  ", "page_size": 50}))),
    )
    .await;
    let second = tool_payload(&second);
    assert_eq!(second[CACHED_FIELD], true);
    assert!(second[CACHE_AGE_FIELD].as_i64().unwrap() >= 0);
    assert_eq!(second["collection"], first["collection"]);
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let upstream = MockServer::start().await;
    mount_search(&upstream, 1).await;
    let dir = TempDir::new().unwrap();
    let args = json!({"search_string": "aspirin", "ontology_acronym": "CHEBI"});

    {
        let app = create_router(state_with_cache(&upstream, disk_cache(&dir)));
        let (_, response) = send(&app, "POST", "/mcp", Some(tool_call(1, "term_search_from_ontology", args.clone()))).await;
        tool_payload(&response);
    }

    let app = create_router(state_with_cache(&upstream, disk_cache(&dir)));
    let (_, response) = send(&app, "POST", "/mcp", Some(tool_call(2, "term_search_from_ontology", args))).await;
    assert_eq!(tool_payload(&response)[CACHED_FIELD], true);
}

#[tokio::test]
async fn test_different_pages_are_cached_separately() {
    let upstream = MockServer::start().await;
    mount_search(&upstream, 2).await;
    let dir = TempDir::new().unwrap();
    let app = create_router(state_with_cache(&upstream, disk_cache(&dir)));

    for (id, page) in [(1, 1), (2, 2)] {
        let (_, response) = send(
            &app,
            "POST",
            "/mcp",
            Some(tool_call(id, "term_search_from_ontology", json!({"search_string": "aspirin", "ontology_acronym": "CHEBI", "page": page}))),
        )
        .await;
        assert!(tool_payload(&response).get(CACHED_FIELD).is_none());
    }
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    let upstream = MockServer::start().await;
    mount_search(&upstream, 2).await;
    let clock = ManualClock::at(1_700_000_000);
    let store = CacheStore::open_in_memory(clock.shared()).unwrap();
    let app = create_router(state_with_cache(&upstream, SearchCache::with_store(store, 60)));
    let args = json!({"search_string": "aspirin", "ontology_acronym": "CHEBI"});

    let (_, response) = send(&app, "POST", "/mcp", Some(tool_call(1, "term_search_from_ontology", args.clone()))).await;
    tool_payload(&response);

    clock.advance(60);
    let (_, response) = send(&app, "POST", "/mcp", Some(tool_call(2, "term_search_from_ontology", args))).await;
    assert!(tool_payload(&response).get(CACHED_FIELD).is_none());
}

#[tokio::test]
async fn test_unknown_tool_returns_rpc_error() {
    let upstream = MockServer::start().await;
    let app = create_router(state_with_cache(&upstream, SearchCache::bypass(60)));

    let (status, json) = send(&app, "POST", "/mcp", Some(tool_call(9, "nonexistent", json!({})))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 9);
    assert_eq!(json["error"]["code"], -32601);
}

#[tokio::test]
async fn test_upstream_failure_is_tool_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstream)
        .await;
    let app = create_router(state_with_cache(&upstream, SearchCache::bypass(60)));

    let (status, json) = send(
        &app,
        "POST",
        "/mcp",
        Some(tool_call(1, "get_template", json!({"template_id": "e019284e-48d1-4494-bc83-ddefd28dfbac"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"]["isError"], true);
}

// == Cache Maintenance ==

#[tokio::test]
async fn test_clear_cache_tool_and_endpoint() {
    let upstream = MockServer::start().await;
    mount_search(&upstream, 2).await;
    let dir = TempDir::new().unwrap();
    let app = create_router(state_with_cache(&upstream, disk_cache(&dir)));
    let args = json!({"search_string": "aspirin", "ontology_acronym": "CHEBI"});

    let (_, response) = send(&app, "POST", "/mcp", Some(tool_call(1, "term_search_from_ontology", args.clone()))).await;
    tool_payload(&response);

    let (_, cleared) = send(&app, "POST", "/mcp", Some(tool_call(2, "clear_cache", json!({})))).await;
    assert_eq!(tool_payload(&cleared), json!({"cleared_count": 1}));

    let (_, response) = send(&app, "POST", "/mcp", Some(tool_call(3, "term_search_from_ontology", args))).await;
    assert!(tool_payload(&response).get(CACHED_FIELD).is_none());

    let (status, json) = send(&app, "DELETE", "/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cleared_count"], 1);
}

#[tokio::test]
async fn test_sweep_endpoint() {
    let upstream = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let app = create_router(state_with_cache(&upstream, disk_cache(&dir)));

    let (status, json) = send(&app, "POST", "/cache/sweep", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"removed_count": 0, "remaining_count": 0}));
}

#[tokio::test]
async fn test_bypass_mode_searches_still_work() {
    let upstream = MockServer::start().await;
    mount_search(&upstream, 2).await;
    let app = create_router(state_with_cache(&upstream, SearchCache::bypass(60)));
    let args = json!({"search_string": "aspirin", "ontology_acronym": "CHEBI"});

    for id in 0..2 {
        let (_, response) = send(&app, "POST", "/mcp", Some(tool_call(id, "term_search_from_ontology", args.clone()))).await;
        assert!(tool_payload(&response).get(CACHED_FIELD).is_none());
    }

    let (status, json) = send(&app, "POST", "/cache/sweep", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].as_str().unwrap().contains("unavailable"));
}
