//! Runs `ScimForwarder` against a local capture server.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::routing::{any, post};
use axum::{Json, Router};
use scim_sync::config::ForwardConfig;
use scim_sync::forward::{Forwarder, ResourceChange, ScimForwarder};
use scim_types::ResourceType;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Captured {
    method: Method,
    path: String,
    authorization: Option<String>,
    accept: Option<String>,
    body: Option<Value>,
}

type Log = Arc<Mutex<Vec<Captured>>>;

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn capture_create(
    State(log): State<Log>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    log.lock().unwrap().push(Captured {
        method: Method::POST,
        path: format!("/{}", endpoint),
        authorization: header_value(&headers, header::AUTHORIZATION),
        accept: header_value(&headers, header::ACCEPT),
        body: Some(body.clone()),
    });
    (StatusCode::CREATED, Json(body))
}

async fn capture_resource(
    State(log): State<Log>,
    Path((endpoint, id)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let status = if method == Method::DELETE {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::OK
    };
    log.lock().unwrap().push(Captured {
        method,
        path: format!("/{}/{}", endpoint, id),
        authorization: header_value(&headers, header::AUTHORIZATION),
        accept: header_value(&headers, header::ACCEPT),
        body: serde_json::from_str(&body).ok(),
    });
    status
}

async fn start_capture_server() -> (String, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/:endpoint", post(capture_create))
        .route("/:endpoint/:id", any(capture_resource))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), log)
}

fn forward_config(url: &str) -> ForwardConfig {
    ForwardConfig {
        url: Some(url.to_string()),
        auth_token: "secret-token".to_string(),
        entitlements: vec!["00eao000000cSL6".to_string()],
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_add_posts_with_entitlements() {
    let (url, log) = start_capture_server().await;
    let forwarder = ScimForwarder::new(&url, &forward_config(&url)).unwrap();

    let id = Uuid::new_v4();
    forwarder
        .forward(&ResourceChange::add(
            ResourceType::User,
            id,
            json!({"userName": "bjensen"}),
        ))
        .await
        .unwrap();

    let captured = log.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].method, Method::POST);
    assert_eq!(captured[0].path, "/Users");
    assert_eq!(captured[0].authorization.as_deref(), Some("Bearer secret-token"));
    assert_eq!(
        captured[0].accept.as_deref(),
        Some("application/scim+json; charset=utf-8")
    );
    assert_eq!(
        captured[0].body,
        Some(json!({"userName": "bjensen", "entitlements": [{"value": "00eao000000cSL6"}]}))
    );
}

#[tokio::test]
async fn test_replace_and_remove_target_the_resource() {
    let (url, log) = start_capture_server().await;
    let forwarder = ScimForwarder::new(&url, &forward_config(&url)).unwrap();
    let id = Uuid::new_v4();

    forwarder
        .forward(&ResourceChange::replace(
            ResourceType::Group,
            id,
            json!({"displayName": "Admins"}),
        ))
        .await
        .unwrap();
    forwarder
        .forward(&ResourceChange::remove(ResourceType::Group, id))
        .await
        .unwrap();

    let captured = log.lock().unwrap().clone();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].method, Method::PUT);
    assert_eq!(captured[0].path, format!("/Groups/{}", id));
    assert_eq!(captured[0].body, Some(json!({"displayName": "Admins"})));
    assert_eq!(captured[1].method, Method::DELETE);
    assert_eq!(captured[1].path, format!("/Groups/{}", id));
    assert_eq!(captured[1].body, None);
}

#[tokio::test]
async fn test_downstream_errors_are_reported() {
    let (url, log) = start_capture_server().await;
    // No route answers below an unknown prefix, so the server returns 404.
    let forwarder = ScimForwarder::new(&format!("{}/v1/scim", url), &ForwardConfig::default())
        .unwrap();

    let result = forwarder
        .forward(&ResourceChange::remove(ResourceType::User, Uuid::new_v4()))
        .await;
    assert!(result.is_err());
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_downstream_is_an_error() {
    let config = ForwardConfig {
        timeout_secs: 1,
        ..Default::default()
    };
    let forwarder = ScimForwarder::new("http://127.0.0.1:9", &config).unwrap();
    let result = forwarder
        .forward(&ResourceChange::remove(ResourceType::User, Uuid::new_v4()))
        .await;
    assert!(result.is_err());
}
