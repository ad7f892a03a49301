//! Two-phase rollup aggregation: accumulate in memory per delivered
//! object, then push atomic `ADD` updates for each of the four rollup
//! families. Each family's remote update is independently fault-tolerant —
//! a failure updating one counter is logged and skipped, never aborting
//! the others.

use std::collections::{HashMap, HashSet};

use beacon_core::model::EventRecord;
use beacon_store::DynamoDbStore;
use tracing::{info, warn};

#[derive(Default)]
struct DailyAccumulator {
    requests: i64,
    ips: HashSet<String>,
}

/// Phase 1: in-memory per-object aggregation over the four rollup families.
#[derive(Default)]
pub struct RollupAccumulator {
    daily: HashMap<(String, String), DailyAccumulator>,
    pages: HashMap<(String, String, String), i64>,
    referrers: HashMap<(String, String, String), i64>,
    hours: HashMap<(String, String, String), i64>,
}

impl RollupAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, events: &[EventRecord]) {
        for event in events {
            let daily_key = (event.domain.clone(), event.date.clone());
            let daily = self.daily.entry(daily_key).or_default();
            daily.requests += 1;
            if let Some(ref ip) = event.client_ip {
                daily.ips.insert(ip.clone());
            }

            *self
                .pages
                .entry((event.domain.clone(), event.date.clone(), event.path.clone()))
                .or_insert(0) += 1;

            if let Some(ref referrer_domain) = event.referrer_domain {
                *self
                    .referrers
                    .entry((event.domain.clone(), event.date.clone(), referrer_domain.clone()))
                    .or_insert(0) += 1;
            }

            *self
                .hours
                .entry((event.domain.clone(), event.date.clone(), event.hour().to_string()))
                .or_insert(0) += 1;
        }
    }

    /// Phase 2: push every accumulated delta as an atomic remote `ADD`.
    /// Returns the count of counters that failed to update (for metrics);
    /// never returns an `Err` — this phase degrades, it never aborts.
    pub async fn flush(&self, store: &DynamoDbStore, table: &str) -> u32 {
        let mut failed = 0u32;

        for ((domain, date), acc) in &self.daily {
            let ips: Vec<String> = acc.ips.iter().cloned().collect();
            if let Err(e) = store.add_daily_stats(table, domain, date, acc.requests, &ips).await {
                warn!(domain, date, error = %e, "failed to update daily rollup");
                failed += 1;
            }
        }

        for ((domain, date, path), count) in &self.pages {
            if let Err(e) = store.add_page_count(table, domain, date, path, *count).await {
                warn!(domain, date, path, error = %e, "failed to update page rollup");
                failed += 1;
            }
        }

        for ((domain, date, referrer_domain), count) in &self.referrers {
            if let Err(e) = store.add_referrer_count(table, domain, date, referrer_domain, *count).await {
                warn!(domain, date, referrer_domain, error = %e, "failed to update referrer rollup");
                failed += 1;
            }
        }

        for ((domain, date, hour), count) in &self.hours {
            if let Err(e) = store.add_hour_count(table, domain, date, hour, *count).await {
                warn!(domain, date, hour, error = %e, "failed to update hourly rollup");
                failed += 1;
            }
        }

        info!(
            daily = self.daily.len(),
            pages = self.pages.len(),
            referrers = self.referrers.len(),
            hours = self.hours.len(),
            failed,
            "rollup flush complete"
        );

        failed
    }
}

pub struct RollupWriter<'a> {
    store: &'a DynamoDbStore,
    table: String,
}

impl<'a> RollupWriter<'a> {
    pub fn new(store: &'a DynamoDbStore, table: impl Into<String>) -> Self {
        Self { store, table: table.into() }
    }

    pub async fn write(&self, events: &[EventRecord]) -> u32 {
        if events.is_empty() {
            return 0;
        }
        let mut acc = RollupAccumulator::new();
        acc.accumulate(events);
        acc.flush(self.store, &self.table).await
    }
}
