//! Long-running worker: polls the delivery queue and drives the
//! ingestion controller for each delivered log object.

use std::collections::HashMap;

use beacon_core::Config;
use beacon_ingest::IngestionController;
use beacon_queue::{parse_batch, QueueConsumer, SqsConsumer};
use beacon_store::DynamoDbStore;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ingest-worker")]
struct Cli {
    /// Configuration profile (falls back to unprefixed env vars).
    #[arg(long, env = "BEACON_PROFILE", default_value = "")]
    profile: String,

    /// Messages requested per poll (capped at 10 by SQS).
    #[arg(long, default_value_t = 10)]
    max_messages: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    beacon_core::config::load_dotenv();
    let cli = Cli::parse();

    let config = Config::for_profile(&cli.profile);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    config.log_summary();
    config.require_configured("TABLE_NAME")?;

    let consumer = SqsConsumer::new(&config.aws, &config.queue).await?;
    let reader = beacon_ingest::log_reader::LogObjectReader::new(&config.aws);
    let store = DynamoDbStore::new(&config.aws, config.store.ttl_days);

    info!("ingest-worker started");

    loop {
        let messages = match consumer.poll_batch(cli.max_messages).await {
            Ok(m) => m,
            Err(e) => {
                error!(error = %e, "poll failed, backing off");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                continue;
            }
        };

        if messages.is_empty() {
            continue;
        }

        let (records, parse_errors) = parse_batch(&messages);
        for (id, err) in &parse_errors {
            warn!(message_id = %id, error = %err, "dropping unparseable delivery message");
        }
        // Unparseable messages can never succeed on retry; acknowledge them.
        for msg in &messages {
            if parse_errors.iter().any(|(id, _)| id == &msg.id) {
                if let Err(e) = consumer.ack(&msg.receipt_handle).await {
                    warn!(message_id = %msg.id, error = %e, "failed to ack unparseable message");
                }
            }
        }

        let controller = IngestionController::new(&reader, &store, &config.store, &config.filter);
        let mut message_failed: HashMap<String, bool> = HashMap::new();

        for (message_id, record) in &records {
            match controller.process(&record.bucket, &record.key).await {
                Ok(summary) => {
                    info!(bucket = %record.bucket, key = %record.key, processed = summary.processed, written = summary.written, "object processed");
                }
                Err(e) => {
                    error!(bucket = %record.bucket, key = %record.key, error = %e, "object processing failed");
                    message_failed.insert(message_id.clone(), true);
                }
            }
        }

        for msg in &messages {
            if parse_errors.iter().any(|(id, _)| id == &msg.id) {
                continue; // already handled above
            }
            let result = if message_failed.get(&msg.id).copied().unwrap_or(false) {
                consumer.nack(&msg.receipt_handle).await
            } else {
                consumer.ack(&msg.receipt_handle).await
            };
            if let Err(e) = result {
                warn!(message_id = %msg.id, error = %e, "failed to ack/nack message");
            }
        }
    }
}
