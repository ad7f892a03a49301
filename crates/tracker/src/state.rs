use std::sync::Arc;

use beacon_store::DynamoDbStore;

pub struct AppState {
    pub store: DynamoDbStore,
    pub sessions_table: String,
    pub allowed_domains: Vec<String>,
}

pub type SharedState = Arc<AppState>;
