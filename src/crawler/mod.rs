//! Crawler module for paginated listing harvests
//!
//! This module contains the core crawling logic, including:
//! - Listing page and reveal fetching with retry logic
//! - Entry and "next" control extraction from listing pages
//! - Fast-forwarding to the resume page
//! - Overall harvest coordination

mod address;
mod coordinator;
mod fetcher;
mod parser;
mod resume;
mod retry;
mod reveal;

pub use address::{extract_embedded_address, is_address};
pub use coordinator::{Coordinator, CrawlReport, StopReason};
pub use fetcher::PageFetcher;
pub use parser::{PageParser, ParsedPage};
pub use resume::{FastForward, ResumeCoordinator, ResumeError, ResumePlan};
pub use retry::{with_retry, FetchError, RetryPolicy};
pub use reveal::{parse_reveal_response, RevealFetcher};

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete harvest for one region and category
///
/// This is the main entry point for starting a harvest. It will:
/// 1. Load previously persisted results, unless `fresh` is set
/// 2. Fast-forward to the first page not yet captured
/// 3. Scrape and reveal each page, checkpointing after every page
/// 4. Stop at the end of the listing or on an unrecoverable fetch failure
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The harvest ran; see `stop_reason` for how it ended
/// * `Err(HarvestError)` - Misconfiguration or a storage failure
pub async fn harvest(
    config: Config,
    region: &str,
    category: &str,
    fresh: bool,
) -> Result<CrawlReport, HarvestError> {
    let mut coordinator = Coordinator::new(config, region, category, fresh)?;
    coordinator.run().await
}
