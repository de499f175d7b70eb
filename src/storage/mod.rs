//! Storage module for persisting harvest results
//!
//! This module handles reading and writing the tabular result file:
//! - Loading previously captured records for resumption
//! - Checkpointing the full accumulated result set after every page

mod csv_store;
mod traits;

pub use csv_store::{CsvStore, DISPATCHED_COLUMN, REVEALED_COLUMN};
pub use traits::{Store, StorageError, StorageResult};

use crate::config::Config;

/// Opens the result store described by the configuration
pub fn open_store(config: &Config) -> CsvStore {
    CsvStore::new(&config.output.results_path, config.layout.labels.clone())
}
