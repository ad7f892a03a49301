//! Shared domain types for analytics events, session events, and the
//! cache-row contract handed to the (external) query API.

use serde::{Deserialize, Serialize};

/// A single normalized request event, derived from one edge-CDN access log
/// line. Written by the ingestion controller under `PK = "{domain}#{date}"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    pub domain: String,
    pub date: String,
    pub timestamp: String,
    pub path: String,
    pub status: String,
    pub request_id: String,
    pub referrer: Option<String>,
    pub referrer_domain: Option<String>,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
}

impl EventRecord {
    pub fn pk(&self) -> String {
        format!("{}#{}", self.domain, self.date)
    }

    pub fn sk(&self) -> String {
        format!("{}#{}", self.timestamp, self.request_id)
    }

    pub fn gsi1pk(&self) -> String {
        format!("{}#{}", self.domain, self.path)
    }

    /// `(gsi2pk, gsi2sk)` is only present for external referrals.
    pub fn gsi2_keys(&self) -> Option<(String, String)> {
        self.referrer_domain
            .as_ref()
            .map(|rd| (format!("{}#{}", self.domain, rd), self.timestamp.clone()))
    }

    /// Two-digit UTC hour bucket, defaulting to "00" for a malformed timestamp.
    pub fn hour(&self) -> &str {
        self.timestamp.get(11..13).unwrap_or("00")
    }
}

/// The kind of client-emitted session event accepted by the journey tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SessionStart,
    Pageview,
    Navigation,
    Scroll,
    TimeOnPage,
    SessionEnd,
    /// 404 pages; doubles as the AI-hallucination-link detection signal.
    NotFound,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SessionStart => "session_start",
            EventType::Pageview => "pageview",
            EventType::Navigation => "navigation",
            EventType::Scroll => "scroll",
            EventType::TimeOnPage => "time_on_page",
            EventType::SessionEnd => "session_end",
            EventType::NotFound => "not_found",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "session_start" => Some(EventType::SessionStart),
            "pageview" => Some(EventType::Pageview),
            "navigation" => Some(EventType::Navigation),
            "scroll" => Some(EventType::Scroll),
            "time_on_page" => Some(EventType::TimeOnPage),
            "session_end" => Some(EventType::SessionEnd),
            "not_found" => Some(EventType::NotFound),
            _ => None,
        }
    }
}

/// A client-emitted session event, written under `PK = "SESSION#{session_id}"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub session_id: String,
    pub event_type: EventType,
    pub domain: String,
    pub path: String,
    pub timestamp: String,
    pub event_id: String,
    pub referrer: Option<String>,
    pub previous_path: Option<String>,
    pub scroll_depth: Option<f64>,
    pub time_on_page: Option<f64>,
    pub user_agent: Option<String>,
    pub screen_width: Option<i64>,
    pub screen_height: Option<i64>,
    pub viewport_width: Option<i64>,
    pub viewport_height: Option<i64>,
    pub is_ai_pattern: Option<bool>,
    pub matched_pattern: Option<String>,
}

impl SessionEvent {
    pub fn pk(&self) -> String {
        format!("SESSION#{}", self.session_id)
    }

    pub fn sk(&self) -> String {
        format!("EVENT#{}#{}", self.timestamp, self.event_id)
    }

    pub fn date(&self) -> &str {
        self.timestamp.get(0..10).unwrap_or(&self.timestamp)
    }

    pub fn gsi1_keys(&self) -> (String, String) {
        (
            format!("DOMAIN#{}#DATE#{}", self.domain, self.date()),
            format!("SESSION#{}", self.session_id),
        )
    }

    pub fn gsi2_keys(&self) -> (String, String) {
        (
            format!("DOMAIN#{}#PATH#{}", self.domain, self.path),
            self.timestamp.clone(),
        )
    }
}

/// Shape of a cache row as consumed by the (external, unimplemented) query
/// API. Kept here only so the rollup schema this core produces has a
/// documented, serializable contract type to hand off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRow {
    pub domain: String,
    pub kind: CacheRowKind,
    pub data: serde_json::Value,
    pub from_date: String,
    pub to_date: String,
    pub built_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheRowKind {
    Stats,
    Pages,
    Referrers,
    Hours,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> EventRecord {
        EventRecord {
            domain: "myfantasy.ai".into(),
            date: "2024-01-15".into(),
            timestamp: "2024-01-15T12:00:00Z".into(),
            path: "/".into(),
            status: "200".into(),
            request_id: "r1".into(),
            referrer: Some("https://google.com/".into()),
            referrer_domain: Some("google.com".into()),
            user_agent: None,
            client_ip: Some("1.2.3.4".into()),
        }
    }

    #[test]
    fn event_keys_match_schema() {
        let e = sample_event();
        assert_eq!(e.pk(), "myfantasy.ai#2024-01-15");
        assert_eq!(e.sk(), "2024-01-15T12:00:00Z#r1");
        assert_eq!(e.gsi1pk(), "myfantasy.ai#/");
        assert_eq!(
            e.gsi2_keys(),
            Some(("myfantasy.ai#google.com".to_string(), "2024-01-15T12:00:00Z".to_string()))
        );
        assert_eq!(e.hour(), "12");
    }

    #[test]
    fn event_without_referral_has_no_gsi2() {
        let mut e = sample_event();
        e.referrer_domain = None;
        assert_eq!(e.gsi2_keys(), None);
    }

    #[test]
    fn event_type_roundtrips() {
        for t in [
            EventType::SessionStart,
            EventType::Pageview,
            EventType::Navigation,
            EventType::Scroll,
            EventType::TimeOnPage,
            EventType::SessionEnd,
            EventType::NotFound,
        ] {
            assert_eq!(EventType::parse(t.as_str()), Some(t));
        }
        assert_eq!(EventType::parse("bogus"), None);
    }

    #[test]
    fn session_event_keys_match_schema() {
        let e = SessionEvent {
            session_id: "s1".into(),
            event_type: EventType::Pageview,
            domain: "myfantasy.ai".into(),
            path: "/home".into(),
            timestamp: "2024-01-15T12:00:00Z".into(),
            event_id: "abcd1234".into(),
            referrer: None,
            previous_path: None,
            scroll_depth: None,
            time_on_page: None,
            user_agent: None,
            screen_width: None,
            screen_height: None,
            viewport_width: None,
            viewport_height: None,
            is_ai_pattern: None,
            matched_pattern: None,
        };
        assert_eq!(e.pk(), "SESSION#s1");
        assert_eq!(e.sk(), "EVENT#2024-01-15T12:00:00Z#abcd1234");
        assert_eq!(e.date(), "2024-01-15");
        assert_eq!(
            e.gsi1_keys(),
            ("DOMAIN#myfantasy.ai#DATE#2024-01-15".to_string(), "SESSION#s1".to_string())
        );
        assert_eq!(
            e.gsi2_keys(),
            ("DOMAIN#myfantasy.ai#PATH#/home".to_string(), "2024-01-15T12:00:00Z".to_string())
        );
    }
}
