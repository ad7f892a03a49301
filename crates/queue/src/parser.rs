//! Parse queue message bodies carrying the log-object delivery envelope.
//!
//! Body shape: `{"records": [{"s3": {"bucket": {"name": "..."}, "object": {"key": "..."}}}]}`.

use serde::Deserialize;
use tracing::warn;

use crate::consumer::QueueMessage;
use crate::error::QueueError;

/// One delivered log object, ready to hand off to the ingestion controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub bucket: String,
    pub key: String,
}

#[derive(Deserialize)]
struct Envelope {
    records: Vec<EnvelopeRecord>,
}

#[derive(Deserialize)]
struct EnvelopeRecord {
    s3: S3Ref,
}

#[derive(Deserialize)]
struct S3Ref {
    bucket: BucketRef,
    object: ObjectRef,
}

#[derive(Deserialize)]
struct BucketRef {
    name: String,
}

#[derive(Deserialize)]
struct ObjectRef {
    key: String,
}

/// Parse a single queue message body into its delivery records.
///
/// A message with zero records is valid (empty result) but unusual; a
/// message whose body isn't the expected envelope shape is an
/// input-structural failure and is never retried.
pub fn parse_delivery_message(msg: &QueueMessage) -> Result<Vec<DeliveryRecord>, QueueError> {
    let envelope: Envelope = serde_json::from_str(&msg.body)
        .map_err(|e| QueueError::Parse(format!("message {} is not a delivery envelope: {e}", msg.id)))?;

    Ok(envelope
        .records
        .into_iter()
        .map(|r| DeliveryRecord { bucket: r.s3.bucket.name, key: r.s3.object.key })
        .collect())
}

/// Parse a batch of messages, separating successes from failures.
///
/// A message whose body doesn't parse is reported alongside its id so the
/// caller can acknowledge it (it can never succeed on retry) without
/// blocking the records from every other message in the batch.
pub fn parse_batch(messages: &[QueueMessage]) -> (Vec<(String, DeliveryRecord)>, Vec<(String, QueueError)>) {
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for msg in messages {
        match parse_delivery_message(msg) {
            Ok(recs) => records.extend(recs.into_iter().map(|r| (msg.id.clone(), r))),
            Err(e) => {
                warn!(message_id = %msg.id, error = %e, "Failed to parse delivery message");
                errors.push((msg.id.clone(), e));
            }
        }
    }

    (records, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_msg(id: &str, body: &str) -> QueueMessage {
        QueueMessage {
            id: id.to_string(),
            body: body.to_string(),
            receipt_handle: "handle-test".to_string(),
            timestamp: Utc::now(),
            attempt_count: 1,
        }
    }

    #[test]
    fn parses_single_record() {
        let body = r#"{"records":[{"s3":{"bucket":{"name":"logs-bucket"},"object":{"key":"myfantasy.ai/2024/01/15/E2ABC.2024-01-15-12.abc.gz"}}}]}"#;
        let msg = make_msg("m1", body);
        let records = parse_delivery_message(&msg).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bucket, "logs-bucket");
        assert_eq!(records[0].key, "myfantasy.ai/2024/01/15/E2ABC.2024-01-15-12.abc.gz");
    }

    #[test]
    fn parses_multiple_records() {
        let body = r#"{"records":[
            {"s3":{"bucket":{"name":"b"},"object":{"key":"a.com/k1.gz"}}},
            {"s3":{"bucket":{"name":"b"},"object":{"key":"a.com/k2.gz"}}}
        ]}"#;
        let msg = make_msg("m2", body);
        let records = parse_delivery_message(&msg).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn rejects_malformed_envelope() {
        let msg = make_msg("m-bad", "not json");
        let err = parse_delivery_message(&msg).unwrap_err();
        assert!(matches!(err, QueueError::Parse(_)));
    }

    #[test]
    fn batch_tolerates_partial_failure() {
        let messages = vec![
            make_msg("good", r#"{"records":[{"s3":{"bucket":{"name":"b"},"object":{"key":"a.com/k.gz"}}}]}"#),
            make_msg("bad", "{}"),
        ];
        let (records, errors) = parse_batch(&messages);
        assert_eq!(records.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "bad");
    }
}
