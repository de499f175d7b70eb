//! Statistics over the persisted result file
//!
//! This module provides functionality for summarizing and displaying
//! what the store currently holds.

use crate::record::Record;
use crate::storage::Store;

/// Result file summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultStatistics {
    /// Number of persisted records
    pub total: usize,

    /// Records with a revealed address
    pub revealed: usize,

    /// Records whose lookup produced nothing
    pub unrevealed: usize,

    /// Records already handed to the downstream dispatcher
    pub dispatched: usize,

    /// Revealed records not yet dispatched
    pub pending_dispatch: usize,

    /// Non-empty cell count per column, in first-seen column order
    pub field_coverage: Vec<(String, usize)>,
}

impl ResultStatistics {
    /// Computes statistics over an in-memory result set
    pub fn from_records(records: &[Record]) -> Self {
        let mut stats = Self {
            total: records.len(),
            ..Self::default()
        };

        for record in records {
            if record.revealed_value().is_some() {
                stats.revealed += 1;
                if !record.dispatched {
                    stats.pending_dispatch += 1;
                }
            } else {
                stats.unrevealed += 1;
            }
            if record.dispatched {
                stats.dispatched += 1;
            }

            for (name, _) in record.fields() {
                match stats.field_coverage.iter_mut().find(|(n, _)| n == name) {
                    Some((_, count)) => *count += 1,
                    None => stats.field_coverage.push((name.clone(), 1)),
                }
            }
        }

        stats
    }

    /// Share of records with a revealed address, in percent
    pub fn reveal_rate(&self) -> f64 {
        if self.total > 0 {
            (self.revealed as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Loads statistics from a store
pub fn load_statistics(store: &dyn Store) -> ResultStatistics {
    ResultStatistics::from_records(&store.load())
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ResultStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total);
    println!(
        "  Revealed: {} ({:.1}%)",
        stats.revealed,
        stats.reveal_rate()
    );
    println!("  Unrevealed: {}", stats.unrevealed);
    println!();

    println!("Dispatch:");
    println!("  Dispatched: {}", stats.dispatched);
    println!("  Pending: {}", stats.pending_dispatch);
    println!();

    if !stats.field_coverage.is_empty() {
        println!("Field Coverage:");
        for (name, count) in &stats.field_coverage {
            println!("  {}: {} / {}", name, count, stats.total);
        }
        println!();
    }
}
