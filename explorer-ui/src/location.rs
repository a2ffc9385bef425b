//! Address bar state and query-parameter sync
//!
//! The explorer keeps the current page in a single query parameter (`p`) so
//! that reloading, deep links and back/forward navigation reproduce the same
//! view. [`History`] is a browser-style session history; [`QueryStateSync`]
//! maps the in-memory page onto it:
//!
//! - link navigation and deep links **push** a new entry,
//! - paging **replaces** the current entry,
//! - writing the page that is already in the URL does nothing, so a write
//!   triggered by a state change never feeds back into another change.

use explorer_common::{Error, Result};
use reqwest::Url;
use tracing::debug;

/// Query parameter carrying the current page
pub const PAGE_PARAM: &str = "p";

/// Origin of the in-memory address bar; only path and query are meaningful
pub const APP_ORIGIN: &str = "http://explorer.localhost/";

/// Resolve `path?query` (or a full URL) against [`APP_ORIGIN`]
pub fn app_url(location: &str) -> Result<Url> {
    let base = Url::parse(APP_ORIGIN).map_err(|e| Error::Internal(e.to_string()))?;
    base.join(location.trim())
        .map_err(|e| Error::InvalidInput(format!("Invalid location {}: {}", location, e)))
}

/// `path?query` part of a location, as shown in the address bar
pub fn display_location(url: &Url) -> String {
    match url.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", url.path(), query),
        _ => url.path().to_string(),
    }
}

/// Read a page number from `param`; missing or malformed values give `None`
pub fn parse_page_param(url: &Url, param: &str) -> Option<u64> {
    url.query_pairs()
        .find(|(key, _)| key == param)
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
}

/// Copy of `url` with `param` set to `page`, other parameters kept in order
pub fn with_page_param(url: &Url, param: &str, page: u64) -> Url {
    let page = page.to_string();
    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (key, value) in url.query_pairs() {
        if key == param {
            if !replaced {
                pairs.push((key.into_owned(), page.clone()));
                replaced = true;
            }
        } else {
            pairs.push((key.into_owned(), value.into_owned()));
        }
    }
    if !replaced {
        pairs.push((param.to_string(), page));
    }

    let mut next = url.clone();
    next.query_pairs_mut().clear().extend_pairs(pairs.iter());
    next
}

/// Result of moving through history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Traversal {
    /// Now at this entry
    Moved(Url),
    /// Moved before the first explorer entry, i.e. left the explorer
    Left,
    /// Nothing in that direction
    Blocked,
}

/// Browser-style session history
///
/// Position 0 is "outside the explorer" (where the user came from); entries
/// pushed afterwards are numbered from 1.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<Url>,
    cursor: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entry, `None` while outside the explorer
    pub fn current(&self) -> Option<&Url> {
        self.cursor.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Add a navigable entry, dropping anything forward of the cursor
    pub fn push(&mut self, url: Url) {
        self.entries.truncate(self.cursor);
        self.entries.push(url);
        self.cursor = self.entries.len();
    }

    /// Swap the current entry in place; pushes when there is none
    pub fn replace(&mut self, url: Url) {
        match self.cursor.checked_sub(1) {
            Some(i) => self.entries[i] = url,
            None => self.push(url),
        }
    }

    pub fn back(&mut self) -> Traversal {
        match self.cursor {
            0 => Traversal::Blocked,
            1 => {
                self.cursor = 0;
                Traversal::Left
            }
            n => {
                self.cursor = n - 1;
                Traversal::Moved(self.entries[n - 2].clone())
            }
        }
    }

    pub fn forward(&mut self) -> Traversal {
        if self.cursor >= self.entries.len() {
            return Traversal::Blocked;
        }
        self.cursor += 1;
        Traversal::Moved(self.entries[self.cursor - 1].clone())
    }

    /// Number of explorer entries (the outside position is not counted)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of [`QueryStateSync::write`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// URL already carried this page
    Unchanged,
    /// Current entry replaced with the new page
    Replaced,
}

/// Two-way mapping between the current page and the `p` query parameter
#[derive(Debug, Clone)]
pub struct QueryStateSync {
    history: History,
    param: &'static str,
}

impl Default for QueryStateSync {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryStateSync {
    pub fn new() -> Self {
        Self {
            history: History::new(),
            param: PAGE_PARAM,
        }
    }

    pub fn param(&self) -> &'static str {
        self.param
    }

    /// Navigate to a location, creating a new history entry
    pub fn open(&mut self, url: Url) {
        debug!(location = %display_location(&url), "History push");
        self.history.push(url);
    }

    /// Swap the current location without a new entry (unknown paths)
    pub fn redirect(&mut self, url: Url) {
        debug!(location = %display_location(&url), "History redirect");
        self.history.replace(url);
    }

    pub fn location(&self) -> Option<&Url> {
        self.history.current()
    }

    /// Page in the current URL; `None` when missing or malformed
    ///
    /// Callers substitute their view's first page for `None`.
    pub fn read_initial(&self) -> Option<u64> {
        self.location()
            .and_then(|url| parse_page_param(url, self.param))
    }

    /// Put `page` into the URL without creating a history entry
    pub fn write(&mut self, page: u64) -> WriteOutcome {
        let Some(current) = self.history.current() else {
            // Not mounted yet: start the history at the root location
            return match app_url("/") {
                Ok(root) => {
                    self.history.push(with_page_param(&root, self.param, page));
                    WriteOutcome::Replaced
                }
                Err(_) => WriteOutcome::Unchanged,
            };
        };

        if parse_page_param(current, self.param) == Some(page) {
            return WriteOutcome::Unchanged;
        }

        let next = with_page_param(current, self.param, page);
        debug!(location = %display_location(&next), "History replace");
        self.history.replace(next);
        WriteOutcome::Replaced
    }

    pub fn back(&mut self) -> Traversal {
        self.history.back()
    }

    pub fn forward(&mut self) -> Traversal {
        self.history.forward()
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}
