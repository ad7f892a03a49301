pub mod client;
pub mod error;
pub mod event_store;

pub use error::StoreError;
pub use event_store::{DynamoDbStore, Page};
