use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("object fetch failed: {0}")]
    Fetch(String),

    #[error("gzip decode failed: {0}")]
    Decode(String),

    #[error("store error: {0}")]
    Store(#[from] beacon_store::StoreError),
}
