//! Event store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("put failed: {0}")]
    Put(String),

    #[error("batch put failed: {0}")]
    BatchPut(String),

    #[error("update failed: {0}")]
    Update(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("malformed item: {0}")]
    Malformed(String),

    #[error("not configured: {0}")]
    NotConfigured(String),
}
