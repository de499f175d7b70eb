//! Harvest coordinator - main crawl orchestration logic
//!
//! This module contains the page loop that coordinates a harvest run:
//! - Reconciling previously persisted results and fast-forwarding to the
//!   resume page
//! - Fetching and parsing listing pages strictly in sequence
//! - Revealing each entry's hidden field, one lookup at a time
//! - Checkpointing the full result set after every page

use crate::config::Config;
use crate::crawler::address::extract_embedded_address;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::PageParser;
use crate::crawler::resume::{ResumeCoordinator, ResumeError, ResumePlan};
use crate::crawler::reveal::RevealFetcher;
use crate::record::Record;
use crate::state::{CrawlPhase, CrawlState};
use crate::storage::{open_store, CsvStore, Store};
use crate::transport::{ReqwestTransport, Transport};
use crate::HarvestError;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Why a run stopped paginating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page had no entries
    EmptyPage { page: u32 },

    /// A page had no "next" control
    NoContinuation { page: u32 },

    /// A listing page could not be fetched after retries
    FetchFailed { page: u32, error: String },

    /// The configured page ceiling was reached
    PageCeiling { page: u32 },

    /// Fast-forward to the resume page failed; prior results were kept as-is
    ResumeAborted { page: u32, error: String },

    /// The listing ended before the resume page; nothing new to capture
    ResumeChainEnded { reached: u32 },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPage { page } => write!(f, "page {} had no entries", page),
            Self::NoContinuation { page } => write!(f, "page {} is the last page", page),
            Self::FetchFailed { page, error } => {
                write!(f, "page {} could not be fetched: {}", page, error)
            }
            Self::PageCeiling { page } => write!(f, "page ceiling reached before page {}", page),
            Self::ResumeAborted { page, error } => {
                write!(f, "resume aborted at page {}: {}", page, error)
            }
            Self::ResumeChainEnded { reached } => {
                write!(f, "listing ended at page {} before the resume point", reached)
            }
        }
    }
}

/// Outcome of a harvest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    /// First page scraped live
    pub start_page: u32,

    /// Records loaded from the store and kept
    pub carried_forward: usize,

    /// Pages whose entries were appended and checkpointed
    pub pages_processed: u32,

    /// Records captured during this run
    pub new_records: usize,

    /// Reveal lookups issued
    pub reveal_attempts: usize,

    /// Lookups that produced an address
    pub revealed: usize,

    /// Addresses recovered from free text after the lookup produced nothing
    pub fallback_revealed: usize,

    /// Records in the final result set
    pub total_records: usize,

    pub stop_reason: StopReason,
}

impl CrawlReport {
    fn new(plan: &ResumePlan) -> Self {
        Self {
            start_page: plan.start_page,
            carried_forward: plan.carried_forward,
            pages_processed: 0,
            new_records: 0,
            reveal_attempts: 0,
            revealed: 0,
            fallback_revealed: 0,
            total_records: plan.carried_forward,
            stop_reason: StopReason::EmptyPage {
                page: plan.start_page,
            },
        }
    }
}

/// Main harvest coordinator
pub struct Coordinator<T, S> {
    config: Arc<Config>,
    transport: Arc<T>,
    store: S,
    listing_url: Url,
    fresh: bool,
}

impl Coordinator<ReqwestTransport, CsvStore> {
    /// Creates a coordinator talking to the real site
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `region` - Region selector substituted into the listing URL
    /// * `category` - Category selector substituted into the listing URL
    /// * `fresh` - Ignore previously persisted results
    pub fn new(
        config: Config,
        region: &str,
        category: &str,
        fresh: bool,
    ) -> Result<Self, HarvestError> {
        let listing_url = config.site.resolve_listing_url(region, category)?;
        let transport = ReqwestTransport::from_config(&config.user_agent)?;
        let store = open_store(&config);
        Ok(Self::with_parts(
            config,
            Arc::new(transport),
            store,
            listing_url,
            fresh,
        ))
    }
}

impl<T: Transport, S: Store> Coordinator<T, S> {
    /// Creates a coordinator from explicit collaborators
    pub fn with_parts(
        config: Config,
        transport: Arc<T>,
        store: S,
        listing_url: Url,
        fresh: bool,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            store,
            listing_url,
            fresh,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the harvest to completion
    ///
    /// Pagination stops on an empty page, a page without a "next" control,
    /// the page ceiling, or a listing fetch that fails after retries. In every
    /// case what has been collected is persisted and the run returns `Ok`.
    /// Only storage failures and misconfiguration are returned as errors.
    pub async fn run(&mut self) -> Result<CrawlReport, HarvestError> {
        let start_time = Instant::now();
        let page_size = self.config.crawler.page_size;
        let max_pages = self.config.crawler.max_pages;

        let parser = PageParser::new(&self.config.layout, page_size)?;
        let page_fetcher = PageFetcher::from_config(self.transport.clone(), &self.config.fetch);
        let reveal_url = Url::parse(&self.config.site.reveal_url)?;
        let reveal_fetcher =
            RevealFetcher::new(self.transport.clone(), reveal_url, &self.config.reveal);

        let mut state = CrawlState::new(self.listing_url.clone());
        let prior = if self.fresh {
            tracing::info!("Fresh run requested, ignoring persisted results");
            Vec::new()
        } else {
            self.store.load()
        };

        let plan = ResumePlan::new(prior.len(), page_size);
        state.records = prior;
        let mut report = CrawlReport::new(&plan);
        let mut saved_len: Option<usize> = None;

        tracing::info!(
            "Starting harvest of {} at page {} ({} records carried forward)",
            self.listing_url,
            plan.start_page,
            plan.carried_forward
        );

        // Content of a page fetched before the loop (the fast-forward target)
        let mut pending = None;
        // Entries of the first live page already persisted, also on page 1
        let mut skip = plan.skip_on_first_page;

        if plan.is_resuming() {
            state.transition(CrawlPhase::FastForwarding)?;

            if plan.start_page > max_pages {
                report.stop_reason = StopReason::PageCeiling {
                    page: plan.start_page,
                };
                return self.finish(state, report, saved_len, start_time);
            }

            let resume = ResumeCoordinator::new(&page_fetcher, &parser);
            match resume
                .fast_forward(self.listing_url.clone(), plan.start_page)
                .await
            {
                Ok(reached) => {
                    state.page_number = reached.page_number;
                    state.token = Some(reached.token);
                    pending = Some(reached.content);
                }
                Err(ResumeError::ChainEnded { reached, .. }) => {
                    tracing::info!(
                        "Listing ends at page {}; persisted results are complete",
                        reached
                    );
                    report.stop_reason = StopReason::ResumeChainEnded { reached };
                    return self.finish(state, report, saved_len, start_time);
                }
                Err(ResumeError::Fetch { page, source }) => {
                    tracing::warn!("Resume aborted: {}", source);
                    report.stop_reason = StopReason::ResumeAborted {
                        page,
                        error: source.to_string(),
                    };
                    return self.finish(state, report, saved_len, start_time);
                }
            }
        }

        loop {
            let content = match pending.take() {
                Some(content) => content,
                None => {
                    if state.page_number > max_pages {
                        tracing::info!("Reached page ceiling of {}", max_pages);
                        report.stop_reason = StopReason::PageCeiling {
                            page: state.page_number,
                        };
                        break;
                    }

                    state.transition(CrawlPhase::FetchingPage)?;
                    let Some(token) = state.token.as_ref() else {
                        report.stop_reason = StopReason::NoContinuation {
                            page: state.page_number,
                        };
                        break;
                    };

                    match page_fetcher.fetch(token).await {
                        Ok(content) => content,
                        Err(e) => {
                            tracing::warn!(
                                "Stopping at page {}: {}. Keeping {} records.",
                                state.page_number,
                                e,
                                state.records.len()
                            );
                            report.stop_reason = StopReason::FetchFailed {
                                page: state.page_number,
                                error: e.to_string(),
                            };
                            break;
                        }
                    }
                }
            };

            state.transition(CrawlPhase::Parsing)?;
            let page_url = state
                .token
                .as_ref()
                .map(|t| t.target.clone())
                .unwrap_or_else(|| self.listing_url.clone());
            let parsed = parser.parse(&content, &page_url);

            if parsed.records.is_empty() {
                tracing::info!("Page {} has no entries, stopping", state.page_number);
                report.stop_reason = StopReason::EmptyPage {
                    page: state.page_number,
                };
                break;
            }

            let mut batch = parsed.records;
            if skip > 0 {
                let already_captured = skip.min(batch.len());
                tracing::debug!(
                    "Skipping {} entries already persisted on page {}",
                    already_captured,
                    state.page_number
                );
                batch.drain(..already_captured);
                skip = 0;
            }

            if !batch.is_empty() {
                state.transition(CrawlPhase::Revealing)?;
                self.reveal_batch(&reveal_fetcher, &mut batch, &mut report)
                    .await;
            }

            state.transition(CrawlPhase::Checkpointing)?;
            report.new_records += batch.len();
            state.records.extend(batch.into_iter().map(|mut record| {
                record.clear_reveal_key();
                record
            }));
            self.store.save(&state.records)?;
            saved_len = Some(state.records.len());
            report.pages_processed += 1;

            tracing::info!(
                "Page {} checkpointed: {} records total, {:.1}s elapsed",
                state.page_number,
                state.records.len(),
                start_time.elapsed().as_secs_f64()
            );

            match parsed.token {
                Some(next) => state.advance(next),
                None => {
                    report.stop_reason = StopReason::NoContinuation {
                        page: state.page_number,
                    };
                    break;
                }
            }
        }

        self.finish(state, report, saved_len, start_time)
    }

    /// Resolves the hidden field of every record in `batch`, one at a time
    ///
    /// Failures are record-local: the record keeps `None` and the batch
    /// continues.
    async fn reveal_batch(
        &self,
        reveal: &RevealFetcher<T>,
        batch: &mut [Record],
        report: &mut CrawlReport,
    ) {
        let delay = self.config.reveal.delay();

        for record in batch.iter_mut() {
            let Some(key) = record.reveal_key().map(str::to_string) else {
                continue;
            };

            if report.reveal_attempts > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            report.reveal_attempts += 1;

            match reveal.reveal(&key).await {
                Ok(Some(value)) => {
                    if record.set_revealed(value) {
                        report.revealed += 1;
                    }
                }
                Ok(None) => {
                    tracing::debug!("Lookup for {} returned no address", key);
                }
                Err(e) => {
                    tracing::warn!("Lookup for {} failed: {}", key, e);
                }
            }

            if record.revealed_value().is_none() && self.config.crawler.free_text_fallback {
                if let Some(address) = self.free_text_address(record) {
                    tracing::debug!("Using address found in free text for {}", key);
                    record.set_revealed(address);
                    report.fallback_revealed += 1;
                }
            }
        }
    }

    /// Last-resort heuristic: an address written into a free-text field
    fn free_text_address(&self, record: &Record) -> Option<String> {
        self.config
            .layout
            .free_text_labels
            .iter()
            .filter_map(|label| record.field(label))
            .find_map(extract_embedded_address)
    }

    /// Persists anything not yet checkpointed and closes the run
    fn finish(
        &self,
        mut state: CrawlState,
        mut report: CrawlReport,
        saved_len: Option<usize>,
        start_time: Instant,
    ) -> Result<CrawlReport, HarvestError> {
        // An empty result set is only written over an earlier save, never in
        // place of a file this run did not produce.
        let needs_save = match saved_len {
            Some(len) => len != state.records.len(),
            None => !state.records.is_empty(),
        };
        if needs_save {
            self.store.save(&state.records)?;
        }

        state.finish();
        report.total_records = state.records.len();

        tracing::info!(
            "Harvest finished after {:.1}s: {} ({} records, {} new)",
            start_time.elapsed().as_secs_f64(),
            report.stop_reason,
            report.total_records,
            report.new_records
        );

        Ok(report)
    }
}
