//! Builds a [`SessionEvent`] from a validated tracking payload, filling in
//! server-computed fields the client omitted.

use beacon_core::model::{EventType, SessionEvent};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

fn str_field(raw: &Value, field: &str) -> String {
    raw.get(field).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn opt_str(raw: &Value, field: &str) -> Option<String> {
    raw.get(field).and_then(Value::as_str).map(str::to_string)
}

fn opt_f64(raw: &Value, field: &str) -> Option<f64> {
    raw.get(field).and_then(Value::as_f64)
}

fn opt_i64(raw: &Value, field: &str) -> Option<i64> {
    raw.get(field).and_then(Value::as_i64)
}

fn opt_bool(raw: &Value, field: &str) -> Option<bool> {
    raw.get(field).and_then(Value::as_bool)
}

fn server_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn short_event_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Assumes `raw` already passed [`crate::validate::validate_event`].
pub fn build_session_event(raw: &Value) -> SessionEvent {
    let timestamp = raw
        .get("timestamp")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(server_timestamp);

    let event_id = raw
        .get("event_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(short_event_id);

    SessionEvent {
        session_id: str_field(raw, "session_id"),
        event_type: EventType::parse(&str_field(raw, "event_type")).expect("validated before enrichment"),
        domain: str_field(raw, "domain"),
        path: str_field(raw, "path"),
        timestamp,
        event_id,
        referrer: opt_str(raw, "referrer"),
        previous_path: opt_str(raw, "previous_path"),
        scroll_depth: opt_f64(raw, "scroll_depth"),
        time_on_page: opt_f64(raw, "time_on_page"),
        user_agent: opt_str(raw, "user_agent"),
        screen_width: opt_i64(raw, "screen_width"),
        screen_height: opt_i64(raw, "screen_height"),
        viewport_width: opt_i64(raw, "viewport_width"),
        viewport_height: opt_i64(raw, "viewport_height"),
        is_ai_pattern: opt_bool(raw, "is_ai_pattern"),
        matched_pattern: opt_str(raw, "matched_pattern"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fills_timestamp_and_event_id_when_absent() {
        let raw = json!({"session_id": "s1", "event_type": "pageview", "domain": "a.com", "path": "/"});
        let event = build_session_event(&raw);
        assert!(event.timestamp.ends_with('Z'));
        assert_eq!(event.event_id.len(), 8);
        assert_eq!(event.date(), &event.timestamp[0..10]);
    }

    #[test]
    fn preserves_client_supplied_timestamp_and_event_id() {
        let raw = json!({
            "session_id": "s1", "event_type": "pageview", "domain": "a.com", "path": "/",
            "timestamp": "2024-01-15T12:00:00Z", "event_id": "clientid",
        });
        let event = build_session_event(&raw);
        assert_eq!(event.timestamp, "2024-01-15T12:00:00Z");
        assert_eq!(event.event_id, "clientid");
    }

    #[test]
    fn copies_through_present_optional_fields_only() {
        let raw = json!({
            "session_id": "s1", "event_type": "scroll", "domain": "a.com", "path": "/",
            "scroll_depth": 0.5, "referrer": null, "user_agent": "ua",
        });
        let event = build_session_event(&raw);
        assert_eq!(event.scroll_depth, Some(0.5));
        assert_eq!(event.referrer, None);
        assert_eq!(event.user_agent, Some("ua".to_string()));
        assert_eq!(event.previous_path, None);
    }
}
