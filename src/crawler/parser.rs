//! Listing page parser
//!
//! This module extracts from one listing page:
//! - The entries, each anchored on an entry marker carrying a reveal key
//! - The labeled `Label: value` fields around each marker
//! - The continuation token from the "next page" control
//!
//! The rules are tied to one page layout; the selectors and labels come from
//! [`LayoutConfig`].

use crate::config::LayoutConfig;
use crate::record::{Method, PaginationToken, Record};
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Tags that count as a structural block around an entry marker
const BLOCK_TAGS: [&str; 9] = [
    "div", "li", "article", "section", "tr", "td", "table", "dd", "dl",
];

/// Records and continuation token extracted from one page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Entries found on the page, at most `page_size`
    pub records: Vec<Record>,

    /// Request for the following page, if the page has a "next" control
    pub token: Option<PaginationToken>,
}

/// Parser for the fixed listing layout
#[derive(Debug, Clone)]
pub struct PageParser {
    entry_selector: Selector,
    next_selector: Selector,
    field_selector: Selector,
    key_attribute: String,
    labels: Vec<String>,
    label_regex: Regex,
    page_size: usize,
}

impl PageParser {
    /// Builds a parser from the layout configuration
    ///
    /// # Arguments
    ///
    /// * `layout` - Selectors and labels of the listing page
    /// * `page_size` - Maximum number of entry markers considered per page
    pub fn new(layout: &LayoutConfig, page_size: usize) -> Result<Self, ConfigError> {
        let entry_selector = parse_selector("entry-selector", &layout.entry_selector)?;
        let next_selector = parse_selector("next-selector", &layout.next_selector)?;
        let field_selector = parse_selector("form fields", "input[name], button[name]")?;

        let alternatives = layout
            .labels
            .iter()
            .map(|label| regex::escape(label.trim()))
            .collect::<Vec<_>>()
            .join("|");
        let label_regex = Regex::new(&format!(r"(?i)^\s*({})\s*:\s*(.*)$", alternatives))
            .map_err(|e| ConfigError::Validation(format!("Invalid labels: {}", e)))?;

        Ok(Self {
            entry_selector,
            next_selector,
            field_selector,
            key_attribute: layout.key_attribute.clone(),
            labels: layout.labels.clone(),
            label_regex,
            page_size,
        })
    }

    /// Parses a listing page
    ///
    /// A page with no entry markers yields no records; the token is still
    /// extracted independently.
    ///
    /// # Arguments
    ///
    /// * `html` - The page content
    /// * `page_url` - URL the page was fetched from, for resolving relative links
    pub fn parse(&self, html: &str, page_url: &Url) -> ParsedPage {
        let document = Html::parse_document(html);

        let records = document
            .select(&self.entry_selector)
            .take(self.page_size)
            .filter_map(|marker| self.extract_record(marker))
            .collect();

        let token = self.extract_token(&document, page_url);

        ParsedPage { records, token }
    }

    /// Extracts only the continuation token, skipping entry extraction
    pub fn next_token(&self, html: &str, page_url: &Url) -> Option<PaginationToken> {
        let document = Html::parse_document(html);
        self.extract_token(&document, page_url)
    }

    /// Builds the record anchored on one entry marker
    fn extract_record(&self, marker: ElementRef<'_>) -> Option<Record> {
        let key = marker
            .value()
            .attr(&self.key_attribute)
            .map(str::trim)
            .filter(|k| !k.is_empty());

        let Some(key) = key else {
            tracing::debug!("Skipping entry marker without {}", self.key_attribute);
            return None;
        };

        let mut record = Record::with_key(key);
        if let Some(block) = self.enclosing_block(marker) {
            for (label, value) in self.labeled_fields(block) {
                if record.field(&label).is_none() {
                    record.set_field(label, value);
                }
            }
        }
        Some(record)
    }

    /// Finds the smallest structural block around `marker` that has labeled text
    ///
    /// Climbing stops before a block that holds more than one entry marker, so
    /// one entry never picks up a neighbour's fields.
    fn enclosing_block<'a>(&self, marker: ElementRef<'a>) -> Option<ElementRef<'a>> {
        let mut fallback = None;

        for node in marker.ancestors() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            if !BLOCK_TAGS.contains(&element.value().name()) {
                continue;
            }
            if element.select(&self.entry_selector).count() > 1 {
                break;
            }
            if !self.labeled_fields(element).is_empty() {
                return Some(element);
            }
            fallback.get_or_insert(element);
        }

        fallback
    }

    /// Matches `Label: value` lines in the block's text
    ///
    /// A label with nothing after the colon takes the next non-label line as
    /// its value, which covers `<b>Label:</b> value` markup.
    fn labeled_fields(&self, block: ElementRef<'_>) -> Vec<(String, String)> {
        let lines: Vec<&str> = block
            .text()
            .flat_map(str::lines)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let mut fields = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let Some(captures) = self.label_regex.captures(line) else {
                continue;
            };
            let Some(label) = self.canonical_label(&captures[1]) else {
                continue;
            };

            let mut value = captures[2].trim().to_string();
            if value.is_empty() {
                if let Some(next) = lines.get(i + 1) {
                    if !self.label_regex.is_match(next) {
                        value = next.to_string();
                    }
                }
            }

            if !value.is_empty() {
                fields.push((label, value));
            }
        }
        fields
    }

    /// Maps a matched label onto its configured spelling
    fn canonical_label(&self, matched: &str) -> Option<String> {
        self.labels
            .iter()
            .find(|label| label.trim().eq_ignore_ascii_case(matched.trim()))
            .cloned()
    }

    /// Derives the continuation token from the "next page" control
    fn extract_token(&self, document: &Html, page_url: &Url) -> Option<PaginationToken> {
        let control = document.select(&self.next_selector).next()?;

        match control.value().name() {
            "a" => {
                let href = control.value().attr("href")?.trim();
                if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                    return None;
                }
                let target = page_url.join(href).ok()?;
                Some(PaginationToken::get(target))
            }
            "form" => {
                let action = control
                    .value()
                    .attr("action")
                    .map(str::trim)
                    .filter(|a| !a.is_empty());
                let target = match action {
                    Some(action) => page_url.join(action).ok()?,
                    None => page_url.clone(),
                };
                let method = Method::from_form_attr(control.value().attr("method"));
                let params = self.form_params(control);
                Some(PaginationToken {
                    target,
                    method,
                    params,
                })
            }
            other => {
                tracing::debug!("Unsupported next-page control <{}>", other);
                None
            }
        }
    }

    /// Collects the named fields a browser would submit, in document order
    fn form_params(&self, form: ElementRef<'_>) -> Vec<(String, String)> {
        let mut params = Vec::new();
        for field in form.select(&self.field_selector) {
            let element = field.value();
            let Some(name) = element.attr("name") else {
                continue;
            };

            let kind = element
                .attr("type")
                .unwrap_or("text")
                .to_ascii_lowercase();
            match kind.as_str() {
                "checkbox" | "radio" if element.attr("checked").is_none() => continue,
                "file" | "image" | "reset" => continue,
                _ => {}
            }

            let value = element.attr("value").unwrap_or("");
            params.push((name.to_string(), value.to_string()));
        }
        params
    }
}

fn parse_selector(name: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::Validation(format!("Invalid {} '{}': {:?}", name, selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PageParser {
        PageParser::new(&LayoutConfig::default(), 5).unwrap()
    }

    fn page_url() -> Url {
        Url::parse("https://example.com/listing/north/plumbers").unwrap()
    }

    fn entry(key: &str, name: &str) -> String {
        format!(
            r#"<div class="entry">
                <h3>Name: {name}</h3>
                <p>Category: Plumbing</p>
                <p><b>Phone:</b> 555-0100</p>
                <div class="actions"><button data-reveal-key="{key}">Show email</button></div>
            </div>"#
        )
    }

    #[test]
    fn test_extracts_labeled_fields() {
        let html = format!("<html><body>{}</body></html>", entry("k1", "Acme"));
        let parsed = parser().parse(&html, &page_url());

        assert_eq!(parsed.records.len(), 1);
        let record = &parsed.records[0];
        assert_eq!(record.reveal_key(), Some("k1"));
        assert_eq!(record.field("Name"), Some("Acme"));
        assert_eq!(record.field("Category"), Some("Plumbing"));
        assert_eq!(record.field("Phone"), Some("555-0100"));
        assert_eq!(record.revealed_value(), None);
    }

    #[test]
    fn test_entries_do_not_share_fields() {
        let html = format!(
            "<html><body><section>{}{}</section></body></html>",
            entry("k1", "Acme"),
            entry("k2", "Bolt")
        );
        let parsed = parser().parse(&html, &page_url());

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].field("Name"), Some("Acme"));
        assert_eq!(parsed.records[1].field("Name"), Some("Bolt"));
    }

    #[test]
    fn test_marker_without_key_is_skipped() {
        let html = format!(
            r#"<html><body>{}<div>Name: Ghost<button data-reveal-key="  ">x</button></div></body></html>"#,
            entry("k1", "Acme")
        );
        let parsed = parser().parse(&html, &page_url());

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].reveal_key(), Some("k1"));
    }

    #[test]
    fn test_at_most_page_size_markers() {
        let body: String = (0..7).map(|i| entry(&format!("k{}", i), "X")).collect();
        let html = format!("<html><body>{}</body></html>", body);
        let parsed = parser().parse(&html, &page_url());
        assert_eq!(parsed.records.len(), 5);
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        let html = r#"<div><p>NAME: Acme</p><p>website: acme.example</p>
            <button data-reveal-key="k1"></button></div>"#;
        let parsed = parser().parse(html, &page_url());
        assert_eq!(parsed.records[0].field("Name"), Some("Acme"));
        assert_eq!(parsed.records[0].field("Website"), Some("acme.example"));
    }

    #[test]
    fn test_unknown_labels_are_ignored() {
        let html = r#"<div><p>Name: Acme</p><p>Rating: 5</p>
            <button data-reveal-key="k1"></button></div>"#;
        let parsed = parser().parse(html, &page_url());
        assert_eq!(parsed.records[0].fields().len(), 1);
    }

    #[test]
    fn test_zero_markers_with_token() {
        let html = r#"<html><body><p>No results</p>
            <a rel="next" href="?page=2">Next</a></body></html>"#;
        let parsed = parser().parse(html, &page_url());

        assert!(parsed.records.is_empty());
        let token = parsed.token.unwrap();
        assert_eq!(token.method, Method::Get);
        assert_eq!(
            token.target.as_str(),
            "https://example.com/listing/north/plumbers?page=2"
        );
    }

    #[test]
    fn test_no_next_control() {
        let html = format!("<html><body>{}</body></html>", entry("k1", "Acme"));
        assert!(parser().parse(&html, &page_url()).token.is_none());
    }

    #[test]
    fn test_form_next_control() {
        let html = r#"<html><body>
            <form class="next-page" action="/listing/search" method="post">
                <input type="hidden" name="state" value="abc123">
                <input type="hidden" name="page" value="2">
                <input type="checkbox" name="unchecked" value="x">
                <button type="submit" name="go" value="next">Next</button>
            </form></body></html>"#;
        let token = parser().next_token(html, &page_url()).unwrap();

        assert_eq!(token.method, Method::Post);
        assert_eq!(token.target.as_str(), "https://example.com/listing/search");
        assert_eq!(
            token.params,
            vec![
                ("state".to_string(), "abc123".to_string()),
                ("page".to_string(), "2".to_string()),
                ("go".to_string(), "next".to_string()),
            ]
        );
    }

    #[test]
    fn test_form_without_action_posts_to_page() {
        let html = r#"<form class="next-page"><input name="p" value="3"></form>"#;
        let token = parser().next_token(html, &page_url()).unwrap();
        assert_eq!(token.method, Method::Get);
        assert_eq!(token.target, page_url());
    }

    #[test]
    fn test_fragment_next_link_is_not_a_token() {
        let html = r##"<a rel="next" href="#">Next</a>"##;
        assert!(parser().next_token(html, &page_url()).is_none());
    }
}
