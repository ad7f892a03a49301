pub mod config;
pub mod error;
pub mod model;

pub use config::Config;
pub use error::BeaconError;
pub use model::*;
