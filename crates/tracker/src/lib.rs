pub mod enrich;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod validate;

pub use error::TrackerError;
pub use router::build_router;
pub use state::AppState;
