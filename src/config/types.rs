use crate::crawler::RetryPolicy;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub reveal: RevealConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Remote site addressing
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Listing URL template with `{region}` and `{category}` placeholders
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Hidden-field lookup endpoint
    #[serde(rename = "reveal-url")]
    pub reveal_url: String,
}

impl SiteConfig {
    /// Substitutes the two selectors into the listing template
    ///
    /// Selectors are percent-encoded, so a `/`, `?` or space in a selector
    /// stays inside its own segment.
    pub fn resolve_listing_url(
        &self,
        region: &str,
        category: &str,
    ) -> Result<url::Url, url::ParseError> {
        let raw = self
            .listing_url
            .replace("{region}", &urlencoding::encode(region))
            .replace("{category}", &urlencoding::encode(category));
        url::Url::parse(&raw)
    }
}

/// Listing page retrieval policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Total attempts per page, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds); doubles each retry
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    /// Per-attempt timeout
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 2_000,
            timeout_secs: 30,
        }
    }
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Hidden-field lookup policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Query parameter carrying the reveal key
    #[serde(rename = "key-param")]
    pub key_param: String,

    /// JSON field holding the address in structured responses
    pub field: String,

    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Pause between consecutive lookups (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            key_param: "id".to_string(),
            field: "email".to_string(),
            max_attempts: 4,
            base_delay_ms: 1_000,
            timeout_secs: 15,
            delay_ms: 300,
        }
    }
}

impl RevealConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Selectors and labels of the listing page layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// CSS selector of the per-entry marker element
    #[serde(rename = "entry-selector")]
    pub entry_selector: String,

    /// Marker attribute holding the reveal key
    #[serde(rename = "key-attribute")]
    pub key_attribute: String,

    /// CSS selector of the "next page" control
    #[serde(rename = "next-selector")]
    pub next_selector: String,

    /// Labels captured from `Label: value` lines, in column order
    pub labels: Vec<String>,

    /// Labels whose values are free text, scanned by the address heuristic
    #[serde(rename = "free-text-labels")]
    pub free_text_labels: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            entry_selector: "[data-reveal-key]".to_string(),
            key_attribute: "data-reveal-key".to_string(),
            next_selector: "form.next-page, a[rel=next]".to_string(),
            labels: ["Name", "Category", "Address", "Phone", "Website", "Description"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            free_text_labels: vec!["Description".to_string()],
        }
    }
}

/// Crawl loop behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Entries per listing page
    #[serde(rename = "page-size")]
    pub page_size: usize,

    /// Highest page number that will be fetched
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Scan free-text fields for an address when the lookup yields nothing
    #[serde(rename = "free-text-fallback")]
    pub free_text_fallback: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            max_pages: u32::MAX,
            free_text_fallback: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the CSV result file
    #[serde(rename = "results-path")]
    pub results_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: "./results.csv".to_string(),
        }
    }
}
