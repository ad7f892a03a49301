use std::env;

use serde::{Deserialize, Serialize};

use crate::error::BeaconError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_list(profile: &str, key: &str) -> Vec<String> {
    profiled_env_opt(profile, key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub env: String,
    pub log_level: String,
    pub aws: AwsConfig,
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub tracker: TrackerConfig,
    pub filter: FilterConfig,
}

/// Well-known env keys that identify a profile when prefixed.
const PROFILE_MARKER_KEYS: &[&str] = &["AWS_ACCESS_KEY_ID", "TABLE_NAME", "SESSIONS_TABLE", "QUEUE_URL"];

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `BEACON_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("BEACON_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            env: profiled_env_or(p, "ENV", "dev"),
            log_level: profiled_env_or(p, "LOG_LEVEL", "info"),
            aws: AwsConfig::from_env_profiled(p),
            store: StoreConfig::from_env_profiled(p),
            queue: QueueConfig::from_env_profiled(p),
            tracker: TrackerConfig::from_env_profiled(p),
            filter: FilterConfig::from_env_profiled(p),
        }
    }

    /// Discover available profiles by scanning env vars for `{PREFIX}_{MARKER_KEY}` patterns.
    /// Always includes "default" (the unprefixed config).
    pub fn available_profiles() -> Vec<String> {
        let mut profiles = std::collections::BTreeSet::new();
        profiles.insert("default".to_string());

        for (key, _) in env::vars() {
            for marker in PROFILE_MARKER_KEYS {
                if let Some(prefix) = key.strip_suffix(&format!("_{}", marker)) {
                    if !prefix.is_empty()
                        && prefix.chars().all(|c| c.is_ascii_uppercase() || c == '_')
                    {
                        profiles.insert(prefix.to_string());
                    }
                }
            }
        }

        profiles.into_iter().collect()
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Require that `key` was explicitly set (as `{PROFILE}_{KEY}` or
    /// unprefixed `{KEY}`), not merely defaulted by one of the `*Config`
    /// loaders. Call this at process startup for anything the service
    /// cannot run sensibly without — a missing `TABLE_NAME` or
    /// `SESSIONS_TABLE` should refuse to start rather than silently write
    /// to a table nobody configured.
    pub fn require_configured(&self, key: &str) -> Result<(), BeaconError> {
        profiled_env_opt(&self.profile, key).map(|_| ()).ok_or_else(|| {
            BeaconError::Config(format!("{key} is not set (required at startup, no default permitted)"))
        })
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}, env: {}):", self.profile_label(), self.env);
        tracing::info!("  aws:     region={}", self.aws.region);
        tracing::info!("  store:   table={}, sessions_table={}", self.store.table_name, self.store.sessions_table);
        tracing::info!("  queue:   url={}", self.queue.queue_url.as_deref().unwrap_or("(none)"));
        tracing::info!("  tracker: host={}, port={}, allowed_domains={}", self.tracker.host, self.tracker.port, self.tracker.allowed_domains.len());
        tracing::info!("  filter:  extensions={}, paths={}", self.filter.excluded_extensions.len(), self.filter.excluded_paths.len());
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "env": self.env,
            "aws": { "region": self.aws.region, "configured": self.aws.is_configured() },
            "store": { "table_name": self.store.table_name, "sessions_table": self.store.sessions_table },
            "tracker": { "host": self.tracker.host, "port": self.tracker.port, "allowed_domains": self.tracker.allowed_domains },
        })
    }
}

// ── AWS ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            region: profiled_env_or(p, "AWS_REGION", "us-east-1"),
            access_key_id: profiled_env_opt(p, "AWS_ACCESS_KEY_ID"),
            secret_access_key: profiled_env_opt(p, "AWS_SECRET_ACCESS_KEY"),
            session_token: profiled_env_opt(p, "AWS_SESSION_TOKEN"),
            endpoint_url: profiled_env_opt(p, "AWS_ENDPOINT_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.access_key_id.is_some()
    }
}

// ── Event Store ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Table holding request events and rollups.
    pub table_name: String,
    /// Table holding journey-tracker session events.
    pub sessions_table: String,
    /// TTL window for event and rollup rows, in days.
    pub ttl_days: i64,
}

impl StoreConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            table_name: profiled_env_or(p, "TABLE_NAME", "beacon-events"),
            sessions_table: profiled_env_or(p, "SESSIONS_TABLE", "beacon-sessions"),
            ttl_days: profiled_env_u32(p, "TTL_DAYS", 90) as i64,
        }
    }
}

// ── Delivery queue ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub queue_url: Option<String>,
    pub dlq_url: Option<String>,
    pub visibility_timeout_secs: u32,
}

impl QueueConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            queue_url: profiled_env_opt(p, "QUEUE_URL"),
            dlq_url: profiled_env_opt(p, "QUEUE_DLQ_URL"),
            visibility_timeout_secs: profiled_env_u32(p, "QUEUE_VISIBILITY_TIMEOUT_SECS", 30),
        }
    }
}

// ── Journey tracker HTTP service ──────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_domains: Vec<String>,
}

impl TrackerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "TRACKER_HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "TRACKER_PORT", 8080),
            allowed_domains: profiled_env_list(p, "ALLOWED_DOMAINS"),
        }
    }
}

// ── Path filter ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub excluded_extensions: Vec<String>,
    pub excluded_paths: Vec<String>,
}

impl FilterConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            excluded_extensions: profiled_env_list(p, "EXCLUDED_EXTENSIONS")
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
            excluded_paths: profiled_env_list(p, "EXCLUDED_PATHS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_has_sane_defaults() {
        let cfg = Config::for_profile("");
        assert_eq!(cfg.profile_label(), "default");
        assert_eq!(cfg.store.table_name, "beacon-events");
        assert_eq!(cfg.queue.visibility_timeout_secs, 30);
    }

    #[test]
    fn profiled_lookup_falls_back_to_unprefixed() {
        // SAFETY: tests run single-threaded per-process for env mutation here is acceptable
        std::env::set_var("TEST_MARKER_TABLE_NAME_FALLBACK", "unused");
        std::env::remove_var("TEST_MARKER_TABLE_NAME_FALLBACK");
        assert_eq!(profiled_env_or("NOPE", "TABLE_NAME", "fallback"), "fallback");
    }

    #[test]
    fn filter_config_lowercases_extensions() {
        std::env::set_var("EXCLUDED_EXTENSIONS", "CSS,.JS, .png");
        let filter = FilterConfig::from_env_profiled("");
        assert_eq!(filter.excluded_extensions, vec!["css", ".js", ".png"]);
        std::env::remove_var("EXCLUDED_EXTENSIONS");
    }

    #[test]
    fn require_configured_errors_when_absent_even_though_defaulted() {
        // StoreConfig::table_name defaults to "beacon-events" either way, but
        // require_configured must still refuse an unset TABLE_NAME.
        std::env::remove_var("TABLE_NAME");
        std::env::remove_var("REQUIRE_CONFIGURED_TEST_UNSET_MISSING_TABLE_NAME");
        let cfg = Config::for_profile("REQUIRE_CONFIGURED_TEST_UNSET");
        assert_eq!(cfg.store.table_name, "beacon-events");
        assert!(cfg.require_configured("TABLE_NAME").is_err());
    }

    #[test]
    fn require_configured_succeeds_when_present() {
        std::env::set_var("REQUIRE_CONFIGURED_TEST_PRESENT_TABLE_NAME", "real-table");
        let cfg = Config::for_profile("REQUIRE_CONFIGURED_TEST_PRESENT");
        assert!(cfg.require_configured("TABLE_NAME").is_ok());
        std::env::remove_var("REQUIRE_CONFIGURED_TEST_PRESENT_TABLE_NAME");
    }
}
