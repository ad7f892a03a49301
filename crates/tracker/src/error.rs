//! Journey tracker error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] beacon_store::StoreError),
}
