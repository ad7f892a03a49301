//! DynamoDB-backed Event Store: request events, session events, and the
//! four rollup counter families, all over a single wide-column schema
//! of `(PK, SK)` plus `GSI1`/`GSI2`.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use chrono::Utc;
use tracing::debug;

use beacon_core::config::AwsConfig;
use beacon_core::model::{EventRecord, EventType, SessionEvent};

use crate::client::build_client;
use crate::error::StoreError;

/// One page of a partition range query, with an opaque continuation token.
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<HashMap<String, AttributeValue>>,
}

pub struct DynamoDbStore {
    client: Client,
    ttl_days: i64,
}

impl DynamoDbStore {
    pub fn new(aws: &AwsConfig, ttl_days: i64) -> Self {
        Self { client: build_client(aws), ttl_days }
    }

    /// Construct directly from an already-built client (tests, or a caller
    /// that wants to share one client across multiple tables).
    pub fn from_client(client: Client, ttl_days: i64) -> Self {
        Self { client, ttl_days }
    }

    fn ttl_epoch(&self) -> i64 {
        Utc::now().timestamp() + self.ttl_days * 24 * 60 * 60
    }

    // ── Event rows ──────────────────────────────────────────────

    pub async fn put_event(&self, table: &str, event: &EventRecord) -> Result<(), StoreError> {
        let item = event_item(event, self.ttl_epoch());
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StoreError::Put(format!("{e:?}")))?;
        Ok(())
    }

    /// Batched put of up to 25 items per underlying request; retries
    /// unprocessed items (DynamoDB may partially fulfil a batch write).
    pub async fn batch_put_events(&self, table: &str, events: &[EventRecord]) -> Result<usize, StoreError> {
        let ttl = self.ttl_epoch();
        let mut written = 0usize;

        for chunk in events.chunks(25) {
            let requests: Vec<WriteRequest> = chunk
                .iter()
                .map(|e| -> Result<WriteRequest, StoreError> {
                    let put_request = PutRequest::builder()
                        .set_item(Some(event_item(e, ttl)))
                        .build()
                        .map_err(|err| StoreError::BatchPut(format!("{err:?}")))?;
                    Ok(WriteRequest::builder().put_request(put_request).build())
                })
                .collect::<Result<Vec<_>, StoreError>>()?;

            let mut unprocessed: HashMap<String, Vec<WriteRequest>> =
                HashMap::from([(table.to_string(), requests)]);

            while !unprocessed.is_empty() {
                let resp = self
                    .client
                    .batch_write_item()
                    .set_request_items(Some(unprocessed))
                    .send()
                    .await
                    .map_err(|e| StoreError::BatchPut(format!("{e:?}")))?;
                unprocessed = resp.unprocessed_items.unwrap_or_default();
            }

            written += chunk.len();
        }

        debug!(table, written, "batch_put_events complete");
        Ok(written)
    }

    // ── Rollup counters (atomic ADD) ────────────────────────────

    pub async fn add_daily_stats(
        &self,
        table: &str,
        domain: &str,
        date: &str,
        requests: i64,
        unique_ips: &[String],
    ) -> Result<(), StoreError> {
        let key = rollup_key(domain, &format!("STATS#{date}"));
        let mut expr = "SET #ttl = :ttl ADD requests :r".to_string();
        let names = HashMap::from([("#ttl".to_string(), "ttl".to_string())]);
        let mut values = HashMap::from([
            (":ttl".to_string(), AttributeValue::N(self.ttl_epoch().to_string())),
            (":r".to_string(), AttributeValue::N(requests.to_string())),
        ]);
        if !unique_ips.is_empty() {
            expr.push_str(", unique_ips :ips");
            values.insert(":ips".to_string(), AttributeValue::Ss(unique_ips.to_vec()));
        }
        self.update_rollup(table, key, &expr, names, values).await
    }

    pub async fn add_page_count(
        &self,
        table: &str,
        domain: &str,
        date: &str,
        path: &str,
        count: i64,
    ) -> Result<(), StoreError> {
        self.add_simple_counter(table, domain, &format!("PAGE#{date}#{path}"), count).await
    }

    pub async fn add_referrer_count(
        &self,
        table: &str,
        domain: &str,
        date: &str,
        referrer_domain: &str,
        count: i64,
    ) -> Result<(), StoreError> {
        self.add_simple_counter(table, domain, &format!("REF#{date}#{referrer_domain}"), count).await
    }

    pub async fn add_hour_count(
        &self,
        table: &str,
        domain: &str,
        date: &str,
        hour: &str,
        count: i64,
    ) -> Result<(), StoreError> {
        self.add_simple_counter(table, domain, &format!("HOUR#{date}#{hour}"), count).await
    }

    async fn add_simple_counter(
        &self,
        table: &str,
        domain: &str,
        sk: &str,
        count: i64,
    ) -> Result<(), StoreError> {
        let key = rollup_key(domain, sk);
        let names = HashMap::from([
            ("#ttl".to_string(), "ttl".to_string()),
            ("#count".to_string(), "count".to_string()),
        ]);
        let values = HashMap::from([
            (":ttl".to_string(), AttributeValue::N(self.ttl_epoch().to_string())),
            (":c".to_string(), AttributeValue::N(count.to_string())),
        ]);
        self.update_rollup(table, key, "SET #ttl = :ttl ADD #count :c", names, values).await
    }

    async fn update_rollup(
        &self,
        table: &str,
        key: HashMap<String, AttributeValue>,
        update_expression: &str,
        names: HashMap<String, String>,
        values: HashMap<String, AttributeValue>,
    ) -> Result<(), StoreError> {
        self.client
            .update_item()
            .table_name(table)
            .set_key(Some(key))
            .update_expression(update_expression)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .send()
            .await
            .map_err(|e| StoreError::Update(format!("{e:?}")))?;
        Ok(())
    }

    // ── Session events (journey tracker) ────────────────────────

    pub async fn put_session_event(&self, table: &str, event: &SessionEvent) -> Result<(), StoreError> {
        let item = session_event_item(event, self.ttl_epoch());
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StoreError::Put(format!("{e:?}")))?;
        Ok(())
    }

    /// Fetch every event for a session, sorted by `(timestamp, event_id)`
    /// — the store has no parent/child pointers, so journey reconstruction
    /// is a client-side sort over the full partition.
    pub async fn query_session_events(&self, table: &str, session_id: &str) -> Result<Vec<SessionEvent>, StoreError> {
        let mut items = Vec::new();
        let mut token = None;

        loop {
            let page = self.query_partition(table, "PK", &format!("SESSION#{session_id}"), Some("EVENT#"), token, 100).await?;
            for raw in page.items {
                items.push(parse_session_event(&raw)?);
            }
            match page.next_token {
                Some(t) => token = Some(t),
                None => break,
            }
        }

        items.sort_by(|a, b| (&a.timestamp, &a.event_id).cmp(&(&b.timestamp, &b.event_id)));
        Ok(items)
    }

    /// Generic partition range query: `PK = pk_value`, optional
    /// `SK begins_with sk_prefix`, paginated via an opaque continuation
    /// token (DynamoDB's `LastEvaluatedKey`).
    pub async fn query_partition(
        &self,
        table: &str,
        pk_attr: &str,
        pk_value: &str,
        sk_prefix: Option<&str>,
        exclusive_start_key: Option<HashMap<String, AttributeValue>>,
        limit: i32,
    ) -> Result<Page<HashMap<String, AttributeValue>>, StoreError> {
        let mut names = HashMap::from([("#pk".to_string(), pk_attr.to_string())]);
        let mut values = HashMap::from([(":pk".to_string(), AttributeValue::S(pk_value.to_string()))]);
        let mut key_cond = "#pk = :pk".to_string();

        if let Some(prefix) = sk_prefix {
            names.insert("#sk".to_string(), "SK".to_string());
            values.insert(":sk".to_string(), AttributeValue::S(prefix.to_string()));
            key_cond.push_str(" AND begins_with(#sk, :sk)");
        }

        let resp = self
            .client
            .query()
            .table_name(table)
            .key_condition_expression(&key_cond)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .set_exclusive_start_key(exclusive_start_key)
            .limit(limit)
            .send()
            .await
            .map_err(|e| StoreError::Query(format!("{e:?}")))?;

        Ok(Page {
            items: resp.items.unwrap_or_default(),
            next_token: resp.last_evaluated_key,
        })
    }
}

fn rollup_key(domain: &str, sk: &str) -> HashMap<String, AttributeValue> {
    HashMap::from([
        ("PK".to_string(), AttributeValue::S(format!("ROLLUP#{domain}"))),
        ("SK".to_string(), AttributeValue::S(sk.to_string())),
    ])
}

fn event_item(event: &EventRecord, ttl: i64) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::from([
        ("PK".to_string(), AttributeValue::S(event.pk())),
        ("SK".to_string(), AttributeValue::S(event.sk())),
        ("domain".to_string(), AttributeValue::S(event.domain.clone())),
        ("timestamp".to_string(), AttributeValue::S(event.timestamp.clone())),
        ("path".to_string(), AttributeValue::S(event.path.clone())),
        ("status".to_string(), AttributeValue::S(event.status.clone())),
        ("request_id".to_string(), AttributeValue::S(event.request_id.clone())),
        ("ttl".to_string(), AttributeValue::N(ttl.to_string())),
        ("GSI1PK".to_string(), AttributeValue::S(event.gsi1pk())),
        ("GSI1SK".to_string(), AttributeValue::S(event.timestamp.clone())),
    ]);

    if let Some(ref referrer) = event.referrer {
        item.insert("referrer".to_string(), AttributeValue::S(referrer.clone()));
    }
    if let Some((gsi2pk, gsi2sk)) = event.gsi2_keys() {
        item.insert("referrer_domain".to_string(), AttributeValue::S(event.referrer_domain.clone().unwrap()));
        item.insert("GSI2PK".to_string(), AttributeValue::S(gsi2pk));
        item.insert("GSI2SK".to_string(), AttributeValue::S(gsi2sk));
    }
    if let Some(ref ua) = event.user_agent {
        item.insert("user_agent".to_string(), AttributeValue::S(ua.clone()));
    }
    if let Some(ref ip) = event.client_ip {
        item.insert("client_ip".to_string(), AttributeValue::S(ip.clone()));
    }

    item
}

fn session_event_item(event: &SessionEvent, ttl: i64) -> HashMap<String, AttributeValue> {
    let (gsi1pk, gsi1sk) = event.gsi1_keys();
    let (gsi2pk, gsi2sk) = event.gsi2_keys();

    let mut item = HashMap::from([
        ("PK".to_string(), AttributeValue::S(event.pk())),
        ("SK".to_string(), AttributeValue::S(event.sk())),
        ("GSI1PK".to_string(), AttributeValue::S(gsi1pk)),
        ("GSI1SK".to_string(), AttributeValue::S(gsi1sk)),
        ("GSI2PK".to_string(), AttributeValue::S(gsi2pk)),
        ("GSI2SK".to_string(), AttributeValue::S(gsi2sk)),
        ("session_id".to_string(), AttributeValue::S(event.session_id.clone())),
        ("event_type".to_string(), AttributeValue::S(event.event_type.as_str().to_string())),
        ("domain".to_string(), AttributeValue::S(event.domain.clone())),
        ("path".to_string(), AttributeValue::S(event.path.clone())),
        ("timestamp".to_string(), AttributeValue::S(event.timestamp.clone())),
        ("ttl".to_string(), AttributeValue::N(ttl.to_string())),
    ]);

    macro_rules! put_opt_s {
        ($field:ident) => {
            if let Some(ref v) = event.$field {
                item.insert(stringify!($field).to_string(), AttributeValue::S(v.clone()));
            }
        };
    }
    macro_rules! put_opt_n {
        ($field:ident) => {
            if let Some(v) = event.$field {
                item.insert(stringify!($field).to_string(), AttributeValue::N(v.to_string()));
            }
        };
    }

    put_opt_s!(referrer);
    put_opt_s!(previous_path);
    put_opt_n!(scroll_depth);
    put_opt_n!(time_on_page);
    put_opt_s!(user_agent);
    put_opt_n!(screen_width);
    put_opt_n!(screen_height);
    put_opt_n!(viewport_width);
    put_opt_n!(viewport_height);
    put_opt_s!(matched_pattern);
    if let Some(v) = event.is_ai_pattern {
        item.insert("is_ai_pattern".to_string(), AttributeValue::Bool(v));
    }

    item
}

fn parse_session_event(item: &HashMap<String, AttributeValue>) -> Result<SessionEvent, StoreError> {
    let s = |k: &str| -> Result<String, StoreError> {
        item.get(k)
            .and_then(|v| v.as_s().ok())
            .map(|v| v.to_string())
            .ok_or_else(|| StoreError::Malformed(format!("missing string field {k}")))
    };
    let opt_s = |k: &str| item.get(k).and_then(|v| v.as_s().ok()).map(|v| v.to_string());
    let opt_n_i = |k: &str| item.get(k).and_then(|v| v.as_n().ok()).and_then(|v| v.parse::<i64>().ok());
    let opt_n_f = |k: &str| item.get(k).and_then(|v| v.as_n().ok()).and_then(|v| v.parse::<f64>().ok());
    let opt_bool = |k: &str| item.get(k).and_then(|v| v.as_bool().ok()).copied();

    let sk = s("SK")?;
    let event_id = sk.rsplit('#').next().unwrap_or_default().to_string();
    let event_type = EventType::parse(&s("event_type")?)
        .ok_or_else(|| StoreError::Malformed("unknown event_type".to_string()))?;

    Ok(SessionEvent {
        session_id: s("session_id")?,
        event_type,
        domain: s("domain")?,
        path: s("path")?,
        timestamp: s("timestamp")?,
        event_id,
        referrer: opt_s("referrer"),
        previous_path: opt_s("previous_path"),
        scroll_depth: opt_n_f("scroll_depth"),
        time_on_page: opt_n_f("time_on_page"),
        user_agent: opt_s("user_agent"),
        screen_width: opt_n_i("screen_width"),
        screen_height: opt_n_i("screen_height"),
        viewport_width: opt_n_i("viewport_width"),
        viewport_height: opt_n_i("viewport_height"),
        is_ai_pattern: opt_bool("is_ai_pattern"),
        matched_pattern: opt_s("matched_pattern"),
    })
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
            user_agent: Some("curl/8.0".into()),
            client_ip: Some("1.2.3.4".into()),
        }
    }

    #[test]
    fn event_item_includes_gsi2_only_for_external_referral() {
        let item = event_item(&sample_event(), 12345);
        assert_eq!(item.get("GSI2PK").unwrap().as_s().unwrap(), "myfantasy.ai#google.com");

        let mut no_referral = sample_event();
        no_referral.referrer_domain = None;
        let item2 = event_item(&no_referral, 12345);
        assert!(!item2.contains_key("GSI2PK"));
    }

    #[test]
    fn event_item_sets_ttl_and_keys() {
        let item = event_item(&sample_event(), 999);
        assert_eq!(item.get("PK").unwrap().as_s().unwrap(), "myfantasy.ai#2024-01-15");
        assert_eq!(item.get("SK").unwrap().as_s().unwrap(), "2024-01-15T12:00:00Z#r1");
        assert_eq!(item.get("ttl").unwrap().as_n().unwrap(), "999");
    }

    #[test]
    fn rollup_key_is_domain_scoped() {
        let key = rollup_key("myfantasy.ai", "STATS#2024-01-15");
        assert_eq!(key.get("PK").unwrap().as_s().unwrap(), "ROLLUP#myfantasy.ai");
        assert_eq!(key.get("SK").unwrap().as_s().unwrap(), "STATS#2024-01-15");
    }

    #[test]
    fn session_event_item_roundtrips_through_parse() {
        let event = SessionEvent {
            session_id: "s1".into(),
            event_type: EventType::Pageview,
            domain: "myfantasy.ai".into(),
            path: "/home".into(),
            timestamp: "2024-01-15T12:00:00Z".into(),
            event_id: "abcd1234".into(),
            referrer: Some("https://google.com".into()),
            previous_path: None,
            scroll_depth: Some(0.5),
            time_on_page: None,
            user_agent: None,
            screen_width: Some(1920),
            screen_height: None,
            viewport_width: None,
            viewport_height: None,
            is_ai_pattern: Some(true),
            matched_pattern: Some("gpt-crawler".into()),
        };
        let item = session_event_item(&event, 42);
        let parsed = parse_session_event(&item).unwrap();
        assert_eq!(parsed.session_id, "s1");
        assert_eq!(parsed.event_id, "abcd1234");
        assert_eq!(parsed.scroll_depth, Some(0.5));
        assert_eq!(parsed.screen_width, Some(1920));
        assert_eq!(parsed.is_ai_pattern, Some(true));
        assert_eq!(parsed.matched_pattern.as_deref(), Some("gpt-crawler"));
    }
}
