//! Harvested records and pagination tokens
//!
//! A [`Record`] is one listing entry: an ordered set of labeled text fields,
//! the revealed contact address (once resolved), and the transient key used
//! to resolve it. A [`PaginationToken`] describes how to request the page
//! that follows the one it was read from.

use std::fmt;
use url::Url;

/// One harvested listing entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Labeled fields in layout order
    fields: Vec<(String, String)>,

    /// The resolved hidden field, `None` until a lookup succeeds
    revealed_value: Option<String>,

    /// Opaque lookup identifier; never persisted
    reveal_key: Option<String>,

    /// Set by the downstream notifier once the row has been mailed
    pub dispatched: bool,
}

impl Record {
    /// Creates an empty record carrying the given reveal key
    pub fn with_key(reveal_key: impl Into<String>) -> Self {
        Self {
            reveal_key: Some(reveal_key.into()),
            ..Self::default()
        }
    }

    /// Sets a field, replacing an existing value with the same name
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Returns a field value by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All fields in insertion order
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn revealed_value(&self) -> Option<&str> {
        self.revealed_value.as_deref()
    }

    pub fn reveal_key(&self) -> Option<&str> {
        self.reveal_key.as_deref()
    }

    /// Records the revealed value unless one is already present
    ///
    /// Returns `true` if the value was stored.
    pub fn set_revealed(&mut self, value: impl Into<String>) -> bool {
        if self.revealed_value.is_some() {
            return false;
        }
        self.revealed_value = Some(value.into());
        true
    }

    /// Drops the transient reveal key before the record is persisted
    pub fn clear_reveal_key(&mut self) {
        self.reveal_key = None;
    }
}

/// HTTP method of a page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl Method {
    /// Parses a form `method` attribute, defaulting to GET
    pub fn from_form_attr(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "post" => Self::Post,
            _ => Self::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to request the next listing page
///
/// A token is only meaningful relative to the page it was derived from, so
/// it is consumed immediately and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationToken {
    pub target: Url,
    pub method: Method,
    pub params: Vec<(String, String)>,
}

impl PaginationToken {
    /// A plain GET of the given URL with no extra parameters
    pub fn get(target: Url) -> Self {
        Self {
            target,
            method: Method::Get,
            params: Vec::new(),
        }
    }
}

impl fmt::Display for PaginationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.target)?;
        if !self.params.is_empty() {
            write!(f, " ({} params)", self.params.len())?;
        }
        Ok(())
    }
}
