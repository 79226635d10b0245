//! Reconciles against an in-memory stand-in for the data source API.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use datasource_reconciler::{
    host, Credentials, DesiredState, HostInput, HostResult, Resource, ResourceReconciler,
    TransportConfig,
};
use serde_json::{json, Value};

const API_KEY: &str = "glc_test";

#[derive(Default)]
struct Platform {
    next_id: i64,
    by_name: HashMap<String, (i64, Value)>,
    requests: Vec<String>,
}

type Shared = Arc<Mutex<Platform>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", API_KEY))
        .unwrap_or(false)
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    reply(StatusCode::UNAUTHORIZED, json!({"message": "Unauthorized"}))
}

async fn create(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut platform = state.lock().unwrap();
    platform.requests.push("POST".into());
    if !authorized(&headers) {
        return unauthorized();
    }
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if platform.by_name.contains_key(&name) {
        return reply(
            StatusCode::CONFLICT,
            json!({"message": "data source with the same name already exists"}),
        );
    }
    platform.next_id += 1;
    let id = platform.next_id;
    platform.by_name.insert(name.clone(), (id, body.clone()));
    reply(
        StatusCode::OK,
        json!({"id": id, "name": name, "message": "Datasource added", "datasource": body}),
    )
}

async fn lookup(State(state): State<Shared>, headers: HeaderMap, Path(name): Path<String>) -> Response {
    let mut platform = state.lock().unwrap();
    platform.requests.push("GET".into());
    if !authorized(&headers) {
        return unauthorized();
    }
    match platform.by_name.get(&name) {
        Some((id, _)) => reply(StatusCode::OK, json!({"id": id})),
        None => reply(StatusCode::NOT_FOUND, json!({"message": "Data source not found"})),
    }
}

async fn update(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut platform = state.lock().unwrap();
    platform.requests.push("PUT".into());
    if !authorized(&headers) {
        return unauthorized();
    }
    let Ok(id) = key.parse::<i64>() else {
        return reply(StatusCode::BAD_REQUEST, json!({"message": "id is invalid"}));
    };
    let Some(name) = platform
        .by_name
        .iter()
        .find(|(_, (existing, _))| *existing == id)
        .map(|(name, _)| name.clone())
    else {
        return reply(StatusCode::NOT_FOUND, json!({"message": "Data source not found"}));
    };
    platform.by_name.remove(&name);
    let new_name = body["name"].as_str().unwrap_or_default().to_string();
    platform.by_name.insert(new_name.clone(), (id, body.clone()));
    reply(
        StatusCode::OK,
        json!({"id": id, "name": new_name, "message": "Datasource updated", "datasource": body}),
    )
}

async fn delete(State(state): State<Shared>, headers: HeaderMap, Path(name): Path<String>) -> Response {
    let mut platform = state.lock().unwrap();
    platform.requests.push("DELETE".into());
    if !authorized(&headers) {
        return unauthorized();
    }
    match platform.by_name.remove(&name) {
        Some((id, _)) => reply(StatusCode::OK, json!({"id": id, "message": "Data source deleted"})),
        None => reply(StatusCode::NOT_FOUND, json!({"message": "Data source not found"})),
    }
}

async fn start() -> (ResourceReconciler, Shared) {
    let state = Shared::default();
    let app = Router::new()
        .route("/api/datasources", post(create))
        .route("/api/datasources/id/{name}", get(lookup))
        .route("/api/datasources/{key}", put(update).delete(delete))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = TransportConfig {
        stack_url_template: format!("http://{}", addr),
        ..Default::default()
    };
    (ResourceReconciler::from_config(&config).unwrap(), state)
}

fn credentials() -> Credentials {
    Credentials::new("mystack", API_KEY).unwrap()
}

fn requests(state: &Shared) -> Vec<String> {
    std::mem::take(&mut state.lock().unwrap().requests)
}

#[tokio::test]
async fn upsert_twice_creates_then_updates() {
    let (reconciler, state) = start().await;
    let resource =
        Resource::from_value(json!({"name": "prom", "type": "prometheus", "url": "http://a"}))
            .unwrap();

    let first = reconciler.upsert(&resource, &credentials()).await.unwrap();
    assert!(!first.is_error);
    assert!(first.changed);
    assert_eq!(first.payload["message"], "Datasource added");
    assert_eq!(requests(&state), vec!["POST"]);

    let second = reconciler.upsert(&resource, &credentials()).await.unwrap();
    assert!(!second.is_error);
    assert!(second.changed);
    assert_eq!(second.payload["message"], "Datasource updated");
    assert_eq!(second.payload["id"], first.payload["id"]);
    assert_eq!(requests(&state), vec!["POST", "GET", "PUT"]);

    assert_eq!(state.lock().unwrap().by_name.len(), 1);
}

#[tokio::test]
async fn upsert_applies_changed_body() {
    let (reconciler, state) = start().await;
    let original = Resource::from_value(json!({"name": "loki", "url": "http://old"})).unwrap();
    let changed = Resource::from_value(json!({"name": "loki", "url": "http://new"})).unwrap();

    reconciler.upsert(&original, &credentials()).await.unwrap();
    reconciler.upsert(&changed, &credentials()).await.unwrap();

    let platform = state.lock().unwrap();
    assert_eq!(platform.by_name["loki"].1["url"], "http://new");
}

#[tokio::test]
async fn delete_never_created_is_error() {
    let (reconciler, state) = start().await;
    let resource = Resource::from_value(json!({"name": "ghost"})).unwrap();

    let outcome = reconciler.delete(&resource, &credentials()).await.unwrap();

    assert!(outcome.is_error);
    assert!(!outcome.changed);
    assert_eq!(
        outcome.payload,
        json!({"status": 404, "response": "Data source not found"})
    );
    assert_eq!(requests(&state), vec!["DELETE"]);
}

#[tokio::test]
async fn delete_is_not_idempotent() {
    let (reconciler, _state) = start().await;
    let resource = Resource::from_value(json!({"name": "tempo"})).unwrap();

    reconciler.upsert(&resource, &credentials()).await.unwrap();
    let first = reconciler.delete(&resource, &credentials()).await.unwrap();
    let second = reconciler.delete(&resource, &credentials()).await.unwrap();

    assert!(!first.is_error && first.changed);
    assert!(second.is_error && !second.changed);
}

#[tokio::test]
async fn reserved_characters_round_trip_through_the_api() {
    let (reconciler, state) = start().await;
    let resource = Resource::from_value(json!({"name": "team a/prod?#1"})).unwrap();

    reconciler.upsert(&resource, &credentials()).await.unwrap();
    let updated = reconciler.upsert(&resource, &credentials()).await.unwrap();
    let deleted = reconciler.delete(&resource, &credentials()).await.unwrap();

    assert!(!updated.is_error, "{:?}", updated);
    assert!(!deleted.is_error, "{:?}", deleted);
    assert!(state.lock().unwrap().by_name.is_empty());
}

#[tokio::test]
async fn wrong_key_is_rejected_without_update() {
    let (reconciler, state) = start().await;
    let resource = Resource::from_value(json!({"name": "prom"})).unwrap();
    let credentials = Credentials::new("mystack", "wrong").unwrap();

    let outcome = reconciler.upsert(&resource, &credentials).await.unwrap();

    assert_eq!(
        outcome.payload,
        json!({"status": 401, "response": "Unauthorized"})
    );
    assert_eq!(requests(&state), vec!["POST"]);
}

#[tokio::test]
async fn host_dispatch_follows_desired_state() {
    let (reconciler, _state) = start().await;
    let mut input = HostInput::from_json(&format!(
        r#"{{"datasource":{{"name":"graphite","type":"graphite"}},"stack_slug":"mystack","cloud_api_key":"{}"}}"#,
        API_KEY
    ))
    .unwrap();

    let present = host::run(&reconciler, &input).await;
    assert!(matches!(present, HostResult::Success { changed: true, .. }));
    assert_eq!(present.exit_code(), 0);

    input.state = DesiredState::Absent;
    let absent = host::run(&reconciler, &input).await;
    assert!(matches!(absent, HostResult::Success { changed: true, .. }));

    let again = host::run(&reconciler, &input).await;
    assert_eq!(
        again,
        HostResult::failure(json!({"status": 404, "response": "Data source not found"}))
    );
    assert_eq!(again.exit_code(), 1);
}

#[tokio::test]
async fn host_reports_input_errors_as_failures() {
    let (reconciler, state) = start().await;
    let input = HostInput::from_json(
        r#"{"datasource":{"name":"prom"},"stack_slug":"not.a.label","cloud_api_key":"k"}"#,
    )
    .unwrap();

    let result = host::run(&reconciler, &input).await;

    match result {
        HostResult::Failure { failed, msg } => {
            assert!(failed);
            assert!(msg.as_str().unwrap().contains("not a valid DNS label"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(requests(&state).is_empty());
}
