use crate::config::types::{
    Config, CrawlerConfig, FetchConfig, LayoutConfig, OutputConfig, RevealConfig, SiteConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_fetch_config(&config.fetch)?;
    validate_reveal_config(&config.reveal)?;
    validate_layout_config(&config.layout)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates site addressing
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    for placeholder in ["{region}", "{category}"] {
        if !config.listing_url.contains(placeholder) {
            return Err(ConfigError::Validation(format!(
                "listing-url must contain the {} placeholder",
                placeholder
            )));
        }
    }

    config
        .resolve_listing_url("region", "category")
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listing-url: {}", e)))?;

    Url::parse(&config.reveal_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid reveal-url: {}", e)))?;

    Ok(())
}

/// Validates page fetch policy
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    validate_attempts("fetch", config.max_attempts)?;
    validate_timeout("fetch", config.timeout_secs)
}

/// Validates reveal lookup policy
fn validate_reveal_config(config: &RevealConfig) -> Result<(), ConfigError> {
    validate_attempts("reveal", config.max_attempts)?;
    validate_timeout("reveal", config.timeout_secs)?;

    if config.key_param.trim().is_empty() {
        return Err(ConfigError::Validation(
            "reveal key-param cannot be empty".to_string(),
        ));
    }

    if config.field.trim().is_empty() {
        return Err(ConfigError::Validation(
            "reveal field cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_attempts(section: &str, attempts: u32) -> Result<(), ConfigError> {
    if !(1..=10).contains(&attempts) {
        return Err(ConfigError::Validation(format!(
            "{} max-attempts must be between 1 and 10, got {}",
            section, attempts
        )));
    }
    Ok(())
}

fn validate_timeout(section: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 {
        return Err(ConfigError::Validation(format!(
            "{} timeout-secs must be >= 1",
            section
        )));
    }
    Ok(())
}

/// Validates page layout selectors and labels
fn validate_layout_config(config: &LayoutConfig) -> Result<(), ConfigError> {
    validate_selector("entry-selector", &config.entry_selector)?;
    validate_selector("next-selector", &config.next_selector)?;

    if config.key_attribute.trim().is_empty() {
        return Err(ConfigError::Validation(
            "key-attribute cannot be empty".to_string(),
        ));
    }

    if config.labels.is_empty() {
        return Err(ConfigError::Validation(
            "layout must define at least one label".to_string(),
        ));
    }

    for label in &config.labels {
        if label.trim().is_empty() || label.contains(':') {
            return Err(ConfigError::Validation(format!(
                "Invalid label '{}': labels must be non-empty and must not contain ':'",
                label
            )));
        }
    }

    for label in &config.free_text_labels {
        if !config.labels.contains(label) {
            return Err(ConfigError::Validation(format!(
                "free-text label '{}' is not one of the layout labels",
                label
            )));
        }
    }

    Ok(())
}

fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }

    Selector::parse(selector).map_err(|e| {
        ConfigError::Validation(format!("Invalid {} '{}': {:?}", name, selector, e))
    })?;

    Ok(())
}

/// Validates crawl loop settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page-size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "results-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
