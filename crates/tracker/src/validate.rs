//! Validates an incoming tracking event payload before enrichment.

use beacon_core::model::EventType;
use serde_json::Value;

const REQUIRED_FIELDS: &[&str] = &["session_id", "event_type", "domain", "path"];

/// Returns `Err(message)` describing the first validation failure, mirroring
/// the order the original handler checked fields: presence, then domain
/// allow-list, then event type.
pub fn validate_event(raw: &Value, allowed_domains: &[String]) -> Result<(), String> {
    let obj = raw.as_object().ok_or_else(|| "Event must be a JSON object".to_string())?;

    for field in REQUIRED_FIELDS {
        if !obj.contains_key(*field) || obj.get(*field).is_some_and(Value::is_null) {
            return Err(format!("Missing required field: {field}"));
        }
    }

    let domain = obj.get("domain").and_then(Value::as_str).unwrap_or_default();
    if !allowed_domains.iter().any(|d| d == domain) {
        return Err(format!("Domain not allowed: {domain}"));
    }

    let event_type = obj.get("event_type").and_then(Value::as_str).unwrap_or_default();
    if EventType::parse(event_type).is_none() {
        return Err(format!("Invalid event type: {event_type}"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn domains() -> Vec<String> {
        vec!["myfantasy.ai".to_string()]
    }

    #[test]
    fn accepts_well_formed_event() {
        let event = json!({"session_id": "s1", "event_type": "pageview", "domain": "myfantasy.ai", "path": "/"});
        assert!(validate_event(&event, &domains()).is_ok());
    }

    #[test]
    fn rejects_missing_field() {
        let event = json!({"event_type": "pageview", "domain": "myfantasy.ai", "path": "/"});
        assert_eq!(validate_event(&event, &domains()).unwrap_err(), "Missing required field: session_id");
    }

    #[test]
    fn rejects_disallowed_domain() {
        let event = json!({"session_id": "s1", "event_type": "pageview", "domain": "evil.com", "path": "/"});
        assert_eq!(validate_event(&event, &domains()).unwrap_err(), "Domain not allowed: evil.com");
    }

    #[test]
    fn rejects_unknown_event_type() {
        let event = json!({"session_id": "s1", "event_type": "click", "domain": "myfantasy.ai", "path": "/"});
        assert_eq!(validate_event(&event, &domains()).unwrap_err(), "Invalid event type: click");
    }
}
