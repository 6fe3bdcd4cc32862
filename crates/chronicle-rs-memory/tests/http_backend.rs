//! HTTP backend tests against a local axum server.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chronicle_rs_memory::{
    BackendError, ContentType, GameTime, HttpMemoryBackend, MemoryBackend, MetadataFields,
    SearchRequest, WriteRequest, build_metadata,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
struct Seen {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn record(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) {
    if let Some(value) = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
    {
        seen.auth.lock().push(value.to_string());
    }
    seen.bodies.lock().push(body);
}

async fn write_ok(state: State<Seen>, headers: HeaderMap, body: Json<Value>) -> Json<Value> {
    record(state, headers, body).await;
    Json(json!({ "id": "mem-1" }))
}

async fn search_ok(state: State<Seen>, headers: HeaderMap, body: Json<Value>) -> Json<Value> {
    record(state, headers, body).await;
    Json(json!({
        "results": [
            { "memory": "first", "metadata": { "type": "message" } },
            { "memory": "second" }
        ]
    }))
}

fn backend(addr: SocketAddr, timeout: Duration) -> HttpMemoryBackend {
    HttpMemoryBackend::new(format!("http://{addr}/"), timeout, Some("secret".to_string()))
        .expect("backend")
}

fn world_message() -> WriteRequest {
    WriteRequest {
        content: "Message: alice: Looking for the sword! GameTime: 10 Day".to_string(),
        container_tag: "sess1-world".to_string(),
        metadata: build_metadata(
            ContentType::Message,
            MetadataFields {
                speaker: Some("alice".to_string()),
                participants: Some(vec!["alice".to_string(), "bob".to_string()]),
                game_time: Some(GameTime::new(10, "Day")),
                ..MetadataFields::default()
            },
        )
        .expect("metadata"),
    }
}

#[tokio::test]
async fn write_posts_wire_body_with_bearer_token() {
    let seen = Seen::default();
    let app = Router::new()
        .route("/memories", post(write_ok))
        .with_state(seen.clone());
    let addr = spawn(app).await;

    let response = backend(addr, Duration::from_secs(5))
        .write(world_message())
        .await
        .expect("write");

    assert_eq!(response.id, "mem-1");
    assert_eq!(seen.auth.lock().clone(), vec!["Bearer secret".to_string()]);
    assert_eq!(
        seen.bodies.lock()[0],
        json!({
            "content": "Message: alice: Looking for the sword! GameTime: 10 Day",
            "containerTag": "sess1-world",
            "metadata": {
                "type": "message",
                "speaker": "alice",
                "participants": ["alice", "bob"],
                "gameTime": 10,
                "gameTimeInterval": "Day"
            }
        })
    );
}

#[tokio::test]
async fn search_decodes_results() {
    let seen = Seen::default();
    let app = Router::new()
        .route("/search", post(search_ok))
        .with_state(seen.clone());
    let addr = spawn(app).await;

    let response = backend(addr, Duration::from_secs(5))
        .search(SearchRequest {
            q: "sword".to_string(),
            container_tag: "sess1-alice".to_string(),
            limit: 3,
            filter: None,
        })
        .await
        .expect("search");

    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].memory, "first");
    assert_eq!(response.results[1].metadata, None);
    assert_eq!(
        seen.bodies.lock()[0],
        json!({ "q": "sword", "containerTag": "sess1-alice", "limit": 3 })
    );
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let app = Router::new().route(
        "/memories",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let addr = spawn(app).await;

    let err = backend(addr, Duration::from_secs(5))
        .write(world_message())
        .await
        .unwrap_err();
    match err {
        BackendError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn undecodable_body_is_malformed() {
    let app = Router::new().route("/search", post(|| async { "not json" }));
    let addr = spawn(app).await;

    let err = backend(addr, Duration::from_secs(5))
        .search(SearchRequest {
            q: String::new(),
            container_tag: "sess1-world".to_string(),
            limit: 1,
            filter: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Malformed(_)));
}

#[tokio::test]
async fn slow_backend_times_out_as_transport_error() {
    let app = Router::new().route(
        "/memories",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "id": "late" }))
        }),
    );
    let addr = spawn(app).await;

    let err = backend(addr, Duration::from_millis(100))
        .write(world_message())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = backend(addr, Duration::from_secs(2))
        .write(world_message())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}
