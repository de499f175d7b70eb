//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `CrawlPhase`: The phases a run moves through for every listing page
//! - `CrawlState`: Page counter, accumulated records and the pending request

mod crawl_phase;
mod crawl_state;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use crawl_state::CrawlState;
