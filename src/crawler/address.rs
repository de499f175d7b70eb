//! Email-address shape matching
//!
//! [`is_address`] decides whether a reveal response *is* an address.
//! [`extract_embedded_address`] is a last-resort heuristic that pulls the
//! first address-looking token out of free text; it is not a parser and is
//! only consulted when the reveal lookup produced nothing.

use regex::Regex;
use std::sync::LazyLock;

static ADDRESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap()
});

static EMBEDDED_ADDRESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}").unwrap()
});

/// Image file names look like addresses (`logo@2x.png`)
const IMAGE_SUFFIXES: [&str; 5] = [".png", ".jpg", ".jpeg", ".gif", ".webp"];

/// Returns true if the whole (trimmed) value has an email-address shape
pub fn is_address(value: &str) -> bool {
    ADDRESS_REGEX.is_match(value.trim())
}

/// Finds the first address-shaped token inside free text
pub fn extract_embedded_address(text: &str) -> Option<String> {
    EMBEDDED_ADDRESS_REGEX
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches('.'))
        .find(|candidate| {
            let lower = candidate.to_ascii_lowercase();
            !IMAGE_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
        })
        .map(|candidate| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_address() {
        assert!(is_address("user@example.com"));
        assert!(is_address("  first.last+tag@mail.example.co.uk \n"));

        assert!(!is_address(""));
        assert!(!is_address("user@"));
        assert!(!is_address("@example.com"));
        assert!(!is_address("user@localhost"));
        assert!(!is_address("contact: user@example.com"));
        assert!(!is_address("<html>user@example.com</html>"));
    }

    #[test]
    fn test_extract_embedded_address() {
        assert_eq!(
            extract_embedded_address("Write to sales@acme.example.com for quotes."),
            Some("sales@acme.example.com".to_string())
        );
        assert_eq!(extract_embedded_address("No contact details here"), None);
    }

    #[test]
    fn test_embedded_skips_image_names() {
        assert_eq!(
            extract_embedded_address("see logo@2x.png or info@example.org"),
            Some("info@example.org".to_string())
        );
    }
}
