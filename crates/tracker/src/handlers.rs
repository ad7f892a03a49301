//! `POST /t` and `POST /t/batch` handlers. Both routes share the same
//! validate -> enrich -> write pipeline; only the request/response shape
//! and batch-size bookkeeping differ.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::enrich::build_session_event;
use crate::error::TrackerError;
use crate::state::SharedState;
use crate::validate::validate_event;

const MAX_BATCH_SIZE: usize = 100;

/// Validate, enrich, and persist one event.
async fn write_one(state: &SharedState, raw: &Value) -> Result<(), TrackerError> {
    validate_event(raw, &state.allowed_domains).map_err(TrackerError::Validation)?;
    let event = build_session_event(raw);
    state
        .store
        .put_session_event(&state.sessions_table, &event)
        .await
        .inspect_err(|e| warn!(error = %e, "failed to write session event"))?;
    Ok(())
}

pub async fn track_single(State(state): State<SharedState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match write_one(&state, &body).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))),
        Err(e) => (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))),
    }
}

pub async fn track_batch(State(state): State<SharedState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let events = body.get("events").and_then(Value::as_array).cloned().unwrap_or_default();

    if events.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "No events provided"})));
    }
    if events.len() > MAX_BATCH_SIZE {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Maximum 100 events per batch"})));
    }

    let mut written = 0usize;
    let mut errors = 0usize;
    for raw in &events {
        match write_one(&state, raw).await {
            Ok(()) => written += 1,
            Err(_) => errors += 1,
        }
    }

    (StatusCode::OK, Json(json!({"status": "ok", "written": written, "errors": errors})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::Client;
    use beacon_store::DynamoDbStore;
    use std::sync::Arc;

    fn state() -> SharedState {
        // Builds without ever making a network call — handlers exercised
        // here only reach the validation short-circuit before touching the store.
        let config = aws_sdk_dynamodb::Config::builder()
            .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        let client = Client::from_conf(config);
        Arc::new(crate::state::AppState {
            store: DynamoDbStore::from_client(client, 90),
            sessions_table: "beacon-sessions".to_string(),
            allowed_domains: vec!["a.com".to_string()],
        })
    }

    #[tokio::test]
    async fn single_event_rejects_missing_field() {
        let state = state();
        let (status, body) = track_single(State(state), Json(json!({"domain": "a.com"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0["error"], "Missing required field: session_id");
    }

    #[tokio::test]
    async fn batch_rejects_empty_events() {
        let state = state();
        let (status, body) = track_batch(State(state), Json(json!({"events": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0["error"], "No events provided");
    }

    #[tokio::test]
    async fn batch_rejects_over_max_size() {
        let state = state();
        let events: Vec<Value> = (0..101)
            .map(|i| json!({"session_id": format!("s{i}"), "event_type": "pageview", "domain": "a.com", "path": "/"}))
            .collect();
        let (status, body) = track_batch(State(state), Json(json!({"events": events}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0["error"], "Maximum 100 events per batch");
    }

    #[tokio::test]
    async fn batch_counts_invalid_events_as_errors_without_failing_batch() {
        let state = state();
        let events = vec![
            json!({"domain": "a.com"}), // missing fields -> rejected
            json!({"session_id": "s1", "event_type": "bogus", "domain": "a.com", "path": "/"}), // bad type -> rejected
        ];
        let (status, body) = track_batch(State(state), Json(json!({"events": events}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0["status"], "ok");
        assert_eq!(body.0["written"], 0);
        assert_eq!(body.0["errors"], 2);
    }
}
