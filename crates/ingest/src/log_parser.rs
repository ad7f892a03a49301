//! Parses one tab-separated edge-CDN access-log line into a normalized
//! [`EventRecord`]. Comment lines and structurally short lines are skipped.

use beacon_core::model::EventRecord;
use tracing::warn;

const MIN_FIELDS: usize = 20;

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map(|c| c.into_owned()).unwrap_or_else(|_| raw.to_string())
}

fn normalize_host(host: &str) -> String {
    let lower = host.to_lowercase();
    lower.strip_prefix("www.").map(|s| s.to_string()).unwrap_or(lower)
}

/// Derive the referrer's domain, suppressing self-referrals.
///
/// Returns `None` when the referrer is absent, unparseable, or (after
/// lowercasing and stripping a leading `www.` on both sides) equal to
/// the request's own host.
fn referrer_domain(referrer: &str, host: &str) -> Option<String> {
    let parsed = url::Url::parse(referrer).ok()?;
    let raw = parsed.host_str()?;
    let normalized_ref = normalize_host(raw);
    let normalized_host = normalize_host(host);
    if normalized_ref.is_empty() || normalized_ref == normalized_host {
        None
    } else {
        Some(normalized_ref)
    }
}

/// Parse a single log line. Returns `None` for comments, short lines, or
/// any other line-local failure — never propagates an error, so one bad
/// line never aborts the rest of the object.
pub fn parse_log_line(line: &str) -> Option<EventRecord> {
    if line.starts_with('#') {
        return None;
    }

    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let date = fields[0];
    let time = fields[1];
    let client_ip = fields[4];
    let host = fields[6];
    let path = decode(fields[7]);
    let status = fields[8];
    let referrer = if fields[9] == "-" { None } else { Some(decode(fields[9])) };
    let user_agent = if fields[10] == "-" { None } else { Some(decode(fields[10])) };
    let request_id = fields[14];

    let referrer_domain = referrer.as_deref().and_then(|r| referrer_domain(r, host));

    Some(EventRecord {
        domain: host.to_string(),
        date: date.to_string(),
        timestamp: format!("{date}T{time}Z"),
        path,
        status: status.to_string(),
        request_id: request_id.to_string(),
        referrer,
        referrer_domain,
        user_agent,
        client_ip: if client_ip.is_empty() { None } else { Some(client_ip.to_string()) },
    })
}

/// Parse every line of a decoded log object, logging (but not failing on)
/// any unparseable lines.
pub fn parse_log_lines(content: &str) -> Vec<EventRecord> {
    let mut events = Vec::new();
    let mut skipped = 0u32;
    for line in content.split('\n') {
        if line.is_empty() {
            continue;
        }
        match parse_log_line(line) {
            Some(event) => events.push(event),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "skipped unparseable or comment log lines");
    }
    events
}

/// Extract the canonical site domain from a delivered object key
/// (`{domain}/YYYY/MM/DD/...`). `None` for a key with no path segments.
pub fn domain_from_key(key: &str) -> Option<&str> {
    key.split('/').next().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_line(referrer: &str, host: &str) -> String {
        format!(
            "2024-01-15\t12:00:00\tIAD89-C1\t1234\t1.2.3.4\tGET\t{host}\t/\t200\t{referrer}\tMozilla/5.0\t-\t-\tHit\trid-1\t{host}\thttp\t0\t0.001\t-\tTLSv1.3\tECDHE\tHit\tHTTP/2.0\t-\t-\t54321\t0.001\tMiss\ttext/html\t100\t-\t-"
        )
    }

    #[test]
    fn parses_well_formed_line() {
        let line = sample_line("https://google.com/", "myfantasy.ai");
        let event = parse_log_line(&line).unwrap();
        assert_eq!(event.domain, "myfantasy.ai");
        assert_eq!(event.date, "2024-01-15");
        assert_eq!(event.timestamp, "2024-01-15T12:00:00Z");
        assert_eq!(event.path, "/");
        assert_eq!(event.status, "200");
        assert_eq!(event.request_id, "rid-1");
        assert_eq!(event.referrer_domain.as_deref(), Some("google.com"));
        assert_eq!(event.client_ip.as_deref(), Some("1.2.3.4"));
    }

    #[test]
    fn self_referral_is_suppressed() {
        let line = sample_line("https://www.myfantasy.ai/home", "myfantasy.ai");
        let event = parse_log_line(&line).unwrap();
        assert_eq!(event.referrer_domain, None);
    }

    #[test]
    fn dash_referrer_and_user_agent_are_absent() {
        let line = sample_line("-", "myfantasy.ai");
        let event = parse_log_line(&line).unwrap();
        assert_eq!(event.referrer, None);
        assert_eq!(event.referrer_domain, None);
    }

    #[test]
    fn comment_lines_are_skipped() {
        assert!(parse_log_line("#Version: 1.0").is_none());
        assert!(parse_log_line("#Fields: date time").is_none());
    }

    #[test]
    fn short_lines_are_skipped() {
        assert!(parse_log_line("2024-01-15\t12:00:00").is_none());
    }

    #[test]
    fn path_is_url_decoded() {
        let line = sample_line("-", "myfantasy.ai").replacen("\t/\t", "\t/a%20b\t", 1);
        let event = parse_log_line(&line).unwrap();
        assert_eq!(event.path, "/a b");
    }

    #[test]
    fn domain_from_key_takes_first_segment() {
        assert_eq!(domain_from_key("example.com/2025/12/13/access.gz"), Some("example.com"));
        assert_eq!(domain_from_key(""), None);
    }

    #[test]
    fn parse_log_lines_skips_blank_and_comment_lines() {
        let content = format!("#Version: 1.0\n{}\n\n", sample_line("-", "a.com"));
        let events = parse_log_lines(&content);
        assert_eq!(events.len(), 1);
    }
}
