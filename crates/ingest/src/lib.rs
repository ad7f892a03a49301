pub mod controller;
pub mod error;
pub mod event_writer;
pub mod log_parser;
pub mod log_reader;
pub mod path_filter;
pub mod rollup_writer;

pub use controller::{IngestionController, IngestionSummary};
pub use error::IngestError;
