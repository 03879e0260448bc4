#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use scim_sync::config::Config;
use scim_sync::error::ServiceError;
use scim_sync::forward::{Forwarder, ResourceChange};
use scim_sync::{api, state::AppState};
use scim_types::schema::{GROUP_SCHEMA, USER_SCHEMA};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Forwarder that remembers every change it is handed.
#[derive(Default)]
pub struct RecordingForwarder {
    changes: Mutex<Vec<ResourceChange>>,
}

impl RecordingForwarder {
    pub fn changes(&self) -> Vec<ResourceChange> {
        self.changes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forwarder for RecordingForwarder {
    async fn forward(&self, change: &ResourceChange) -> Result<(), ServiceError> {
        self.changes.lock().unwrap().push(change.clone());
        Ok(())
    }
}

/// Forwarder whose downstream is always unavailable.
pub struct FailingForwarder;

#[async_trait]
impl Forwarder for FailingForwarder {
    async fn forward(&self, _change: &ResourceChange) -> Result<(), ServiceError> {
        Err(ServiceError::Forward("downstream unavailable".into()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub forwarder: Arc<RecordingForwarder>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let forwarder = Arc::new(RecordingForwarder::default());
        let state = AppState::new(config, forwarder.clone());
        Self {
            router: api::router(state),
            forwarder,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/scim+json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        send_request(&self.router, request.body(body).unwrap()).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    /// Creates a user and returns its id.
    pub async fn create_user(&self, user_name: &str, extra: Value) -> String {
        let mut body = json!({"schemas": [USER_SCHEMA], "userName": user_name});
        if let (Value::Object(target), Value::Object(extra)) = (&mut body, extra) {
            target.extend(extra);
        }
        let response = self.post("/scim/v2/Users", body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    pub async fn create_group(&self, display_name: &str) -> String {
        let response = self
            .post(
                "/scim/v2/Groups",
                json!({"schemas": [GROUP_SCHEMA], "displayName": display_name}),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Value,
}

pub async fn send_request(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    TestResponse {
        status,
        location,
        body,
    }
}
