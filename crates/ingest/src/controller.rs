//! Orchestrates reader -> parser -> filter -> event writer -> rollup
//! writer for one delivered log object.

use beacon_core::config::{FilterConfig, StoreConfig};
use beacon_store::DynamoDbStore;
use tracing::{info, warn};

use crate::error::IngestError;
use crate::event_writer::EventWriter;
use crate::log_parser::{domain_from_key, parse_log_lines};
use crate::log_reader::LogObjectReader;
use crate::path_filter::should_exclude_path;
use crate::rollup_writer::RollupWriter;

pub struct IngestionController<'a> {
    reader: &'a LogObjectReader,
    store: &'a DynamoDbStore,
    store_config: &'a StoreConfig,
    filter: &'a FilterConfig,
}

#[derive(Debug, Default)]
pub struct IngestionSummary {
    pub processed: usize,
    pub written: usize,
    pub skipped: usize,
}

impl<'a> IngestionController<'a> {
    pub fn new(
        reader: &'a LogObjectReader,
        store: &'a DynamoDbStore,
        store_config: &'a StoreConfig,
        filter: &'a FilterConfig,
    ) -> Self {
        Self { reader, store, store_config, filter }
    }

    /// Process one delivered `(bucket, key)`. A fatal reader/store error
    /// propagates so the caller can fail the whole invocation and let the
    /// platform redeliver; per-line parse failures never do.
    pub async fn process(&self, bucket: &str, key: &str) -> Result<IngestionSummary, IngestError> {
        let actual_domain = match domain_from_key(key) {
            Some(d) => d,
            None => {
                warn!(key, "could not extract domain from key, skipping object");
                return Ok(IngestionSummary::default());
            }
        };

        let content = self.reader.read_object(bucket, key).await?;

        let mut events = parse_log_lines(&content);
        let before = events.len();
        events.retain(|e| !should_exclude_path(&e.path, self.filter));
        let skipped = before - events.len();
        for event in &mut events {
            event.domain = actual_domain.to_string();
        }

        let processed = events.len();
        if events.is_empty() {
            info!(bucket, key, processed, skipped, "no events to write");
            return Ok(IngestionSummary { processed, written: 0, skipped });
        }

        let writer = EventWriter::new(self.store, self.store_config.table_name.clone());
        let written = writer.write(&events).await?;

        let rollups = RollupWriter::new(self.store, self.store_config.table_name.clone());
        rollups.write(&events).await;

        info!(bucket, key, processed, written, skipped, "ingestion complete");
        Ok(IngestionSummary { processed, written, skipped })
    }
}
