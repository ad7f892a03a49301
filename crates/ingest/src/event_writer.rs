//! Batched, idempotent write of normalized events.

use beacon_core::model::EventRecord;
use beacon_store::DynamoDbStore;
use tracing::info;

use crate::error::IngestError;

pub struct EventWriter<'a> {
    store: &'a DynamoDbStore,
    table: String,
}

impl<'a> EventWriter<'a> {
    pub fn new(store: &'a DynamoDbStore, table: impl Into<String>) -> Self {
        Self { store, table: table.into() }
    }

    /// Batched put of up to 25 items per underlying request. The `(PK, SK)`
    /// key makes this idempotent: replaying the same line overwrites the
    /// same row rather than duplicating it.
    pub async fn write(&self, events: &[EventRecord]) -> Result<usize, IngestError> {
        if events.is_empty() {
            return Ok(0);
        }
        let written = self.store.batch_put_events(&self.table, events).await?;
        info!(table = %self.table, written, "wrote event batch");
        Ok(written)
    }
}
