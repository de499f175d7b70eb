//! Resumption from a persisted result set
//!
//! The listing exposes no page-number addressing, only a chained "next"
//! control whose token is derived from each page's content. Resuming at
//! page `n` therefore means replaying the chain from the first page,
//! following `n - 1` "next" controls without extracting or revealing the
//! entries on the way.
//!
//! This assumes the remote chain is stable between runs. If the site
//! reorders its listing, a resumed run can skip or duplicate entries.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::PageParser;
use crate::crawler::retry::FetchError;
use crate::record::PaginationToken;
use crate::transport::Transport;
use thiserror::Error;
use url::Url;

/// Errors that end a fast-forward
#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("Fast-forward failed at page {page}: {source}")]
    Fetch { page: u32, source: FetchError },

    #[error("Listing ended at page {reached} before resume page {target}")]
    ChainEnded { reached: u32, target: u32 },
}

/// Where a run starts, given what was persisted before
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePlan {
    /// Number of previously persisted records, all carried forward
    pub carried_forward: usize,

    /// First page to scrape live (1-based)
    pub start_page: u32,

    /// Entries at the top of the start page that are already persisted
    pub skip_on_first_page: usize,
}

impl ResumePlan {
    /// Computes the plan for `persisted` records at `page_size` entries per page
    ///
    /// `start_page = floor(persisted / page_size) + 1`
    pub fn new(persisted: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let full_pages = persisted / page_size;
        Self {
            carried_forward: persisted,
            start_page: u32::try_from(full_pages)
                .unwrap_or(u32::MAX - 1)
                .saturating_add(1),
            skip_on_first_page: persisted % page_size,
        }
    }

    /// Returns true if the run has to fast-forward before scraping
    pub fn is_resuming(&self) -> bool {
        self.start_page > 1
    }
}

/// The page reached by a fast-forward
#[derive(Debug, Clone)]
pub struct FastForward {
    /// 1-based number of the reached page
    pub page_number: u32,

    /// Request that produced the reached page
    pub token: PaginationToken,

    /// Content of the reached page, to be scraped live
    pub content: String,
}

/// Replays the "next" chain to reach a resume page
pub struct ResumeCoordinator<'a, T> {
    fetcher: &'a PageFetcher<T>,
    parser: &'a PageParser,
}

impl<'a, T: Transport> ResumeCoordinator<'a, T> {
    pub fn new(fetcher: &'a PageFetcher<T>, parser: &'a PageParser) -> Self {
        Self { fetcher, parser }
    }

    /// Fetches the first page, then follows "next" until `target_page`
    ///
    /// Intermediate pages are only inspected for their continuation token.
    /// Each fetch goes through the fetcher's normal retry policy; a failure
    /// after retries aborts the fast-forward.
    pub async fn fast_forward(
        &self,
        first_page: Url,
        target_page: u32,
    ) -> Result<FastForward, ResumeError> {
        let mut page_number = 1;
        let mut token = PaginationToken::get(first_page);
        let mut content = self
            .fetcher
            .fetch(&token)
            .await
            .map_err(|source| ResumeError::Fetch { page: 1, source })?;

        while page_number < target_page {
            let next = self
                .parser
                .next_token(&content, &token.target)
                .ok_or(ResumeError::ChainEnded {
                    reached: page_number,
                    target: target_page,
                })?;

            page_number += 1;
            tracing::debug!("Fast-forwarding to page {} via {}", page_number, next);
            content = self.fetcher.fetch(&next).await.map_err(|source| {
                ResumeError::Fetch {
                    page: page_number,
                    source,
                }
            })?;
            token = next;
        }

        tracing::info!("Fast-forwarded to page {}", page_number);
        Ok(FastForward {
            page_number,
            token,
            content,
        })
    }
}
