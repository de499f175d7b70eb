//! Output module for reporting on harvest results
//!
//! This module handles:
//! - Summarizing the persisted result file
//! - Printing run reports and statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, ResultStatistics};

use crate::crawler::CrawlReport;

/// Prints the outcome of a harvest run to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Harvest Report ===\n");

    println!("Pages:");
    println!("  Started at page: {}", report.start_page);
    println!("  Pages processed: {}", report.pages_processed);
    println!("  Stopped because: {}", report.stop_reason);
    println!();

    println!("Records:");
    println!("  Carried forward: {}", report.carried_forward);
    println!("  New this run: {}", report.new_records);
    println!("  Total: {}", report.total_records);
    println!();

    println!("Lookups:");
    println!("  Attempted: {}", report.reveal_attempts);
    println!("  Revealed: {}", report.revealed);
    println!("  Recovered from free text: {}", report.fallback_revealed);
}
