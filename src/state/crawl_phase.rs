/// Phase definitions for the crawl state machine
///
/// The orchestrator moves through these phases once per listing page.
use std::fmt;

/// Represents the current phase of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Run created, persisted results not yet reconciled
    Start,

    /// Replaying the "next" chain to reach the resume page
    FastForwarding,

    /// Requesting a listing page
    FetchingPage,

    /// Extracting entries and the continuation token
    Parsing,

    /// Resolving each entry's hidden field
    Revealing,

    /// Persisting the accumulated result set
    Checkpointing,

    /// Run finished; nothing further happens
    Done,
}

impl CrawlPhase {
    /// Returns true if no further processing happens in this phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// | From | To |
    /// |------|----|
    /// | Start | FastForwarding, FetchingPage, Parsing, Done |
    /// | FastForwarding | Parsing, Done |
    /// | FetchingPage | Parsing, Done |
    /// | Parsing | Revealing, Checkpointing, Done |
    /// | Revealing | Checkpointing |
    /// | Checkpointing | FetchingPage, Done |
    ///
    /// `Start → Parsing` covers a first page that was already fetched while
    /// the run was being planned. Every phase except `Done` may move to
    /// `Done` when persistence happens on the way out.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;
        match (self, next) {
            (Done, _) => false,
            (_, Done) => true,
            (Start, FastForwarding | FetchingPage | Parsing) => true,
            (FastForwarding, Parsing) => true,
            (FetchingPage, Parsing) => true,
            (Parsing, Revealing | Checkpointing) => true,
            (Revealing, Checkpointing) => true,
            (Checkpointing, FetchingPage) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::FastForwarding => "fast_forwarding",
            Self::FetchingPage => "fetching_page",
            Self::Parsing => "parsing",
            Self::Revealing => "revealing",
            Self::Checkpointing => "checkpointing",
            Self::Done => "done",
        }
    }

    /// Returns all phases
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::Start,
            Self::FastForwarding,
            Self::FetchingPage,
            Self::Parsing,
            Self::Revealing,
            Self::Checkpointing,
            Self::Done,
        ]
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
