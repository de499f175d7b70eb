/// Mutable state of a single harvest run
use crate::record::{PaginationToken, Record};
use crate::state::CrawlPhase;
use crate::HarvestError;
use url::Url;

/// Page counter, accumulated records, and the token for the next request
///
/// Owned exclusively by the coordinator for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct CrawlState {
    /// 1-based number of the page currently being processed
    pub page_number: u32,

    /// Everything captured so far, carried-forward rows first
    pub records: Vec<Record>,

    /// Request for the page being processed, `None` once the chain ends
    pub token: Option<PaginationToken>,

    phase: CrawlPhase,
}

impl CrawlState {
    /// Creates the state for a run starting at the listing's first page
    pub fn new(initial_url: Url) -> Self {
        Self {
            page_number: 1,
            records: Vec::new(),
            token: Some(PaginationToken::get(initial_url)),
            phase: CrawlPhase::Start,
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Moves to the next phase, rejecting transitions the state machine forbids
    pub fn transition(&mut self, next: CrawlPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!(page = self.page_number, "{} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Advances to the page described by `token`
    pub fn advance(&mut self, token: PaginationToken) {
        self.page_number += 1;
        self.token = Some(token);
    }

    /// Finishes the run; valid from any phase
    pub fn finish(&mut self) {
        if !self.phase.is_terminal() {
            tracing::trace!(page = self.page_number, "{} -> done", self.phase);
            self.phase = CrawlPhase::Done;
        }
    }
}
