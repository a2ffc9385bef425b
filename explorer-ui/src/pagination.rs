//! Page bounds validation and pagination control state
//!
//! A requested page is valid when `first_page <= page <= total_pages` and the
//! collection is not empty. Requests arrive as `Option<i64>`: `None` stands
//! for input that is not a number at all, negative values come from "previous"
//! on page 0. Both are simply out of range.

use explorer_common::api::PaginationMetadata;
use thiserror::Error;

/// Requested page outside the valid window
///
/// The Display text is the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Please enter values between {first_page} and {total_pages}")]
pub struct OutOfRange {
    pub requested: Option<i64>,
    pub first_page: u64,
    pub total_pages: u64,
}

/// Valid page window of one view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    /// Lowest valid page (0 or 1 depending on the view)
    pub first_page: u64,
    /// Highest valid page as reported by the server
    pub total_pages: u64,
}

impl PageBounds {
    pub fn new(first_page: u64, total_pages: u64) -> Self {
        Self {
            first_page,
            total_pages,
        }
    }

    pub fn from_metadata(metadata: &PaginationMetadata) -> Self {
        Self::new(metadata.first_page, metadata.total_pages)
    }

    /// No page is valid
    pub fn is_empty(&self) -> bool {
        self.total_pages == 0
    }

    pub fn contains(&self, page: i64) -> bool {
        !self.is_empty()
            && page >= 0
            && (page as u64) >= self.first_page
            && (page as u64) <= self.total_pages
    }

    /// Check a requested page against the window
    pub fn validate(&self, requested: Option<i64>) -> Result<u64, OutOfRange> {
        match requested {
            Some(page) if self.contains(page) => Ok(page as u64),
            _ => Err(OutOfRange {
                requested,
                first_page: self.first_page,
                total_pages: self.total_pages,
            }),
        }
    }
}

/// Validate `requested` against `[first_page, total_pages]`
///
/// # Examples
/// ```
/// use explorer_ui::pagination::validate_page;
///
/// assert_eq!(validate_page(Some(3), 1, 5), Ok(3));
/// assert!(validate_page(Some(6), 1, 5).is_err());
/// assert!(validate_page(None, 1, 5).is_err());
/// // An empty collection has no valid page, not even the first one
/// assert!(validate_page(Some(0), 0, 0).is_err());
/// ```
pub fn validate_page(
    requested: Option<i64>,
    first_page: u64,
    total_pages: u64,
) -> Result<u64, OutOfRange> {
    PageBounds::new(first_page, total_pages).validate(requested)
}

/// Parse free-form page input
///
/// Surrounding whitespace and a leading `+` are accepted. Anything that is not
/// an integer (empty input, `2.5`, `abc`) yields `None`.
pub fn parse_page_input(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    let (explicit_plus, signed) = match trimmed.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (negative, magnitude) = match signed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, signed),
    };

    if magnitude.is_empty()
        || (explicit_plus && negative)
        || !magnitude.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    // Too large for i64 but still a well-formed number: out of range either way
    Some(signed.parse::<i64>().unwrap_or(if negative { i64::MIN } else { i64::MAX }))
}

/// Validate typed page input, as on blur/Enter of the page field
pub fn validate_input(input: &str, bounds: PageBounds) -> Result<u64, OutOfRange> {
    bounds.validate(parse_page_input(input))
}

/// Navigation button of the pagination footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    First,
    Previous,
    Next,
    Last,
}

impl NavTarget {
    /// Page this button leads to, before validation
    ///
    /// A current page outside the window (deep link past the end) steps back
    /// into it: previous goes to the last page, next to the first.
    pub fn target_page(&self, metadata: &PaginationMetadata) -> i64 {
        let current = metadata.current_page as i64;
        let first = metadata.first_page as i64;
        let total = metadata.total_pages as i64;
        match self {
            NavTarget::First => first,
            NavTarget::Previous => (current - 1).min(total),
            NavTarget::Next => (current + 1).max(first),
            NavTarget::Last => total,
        }
    }
}

/// Text under the pagination buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLabel {
    PageOf { current: u64, total: u64 },
    NoData,
}

/// Enabled state of every pagination control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageControls {
    pub first: bool,
    pub previous: bool,
    pub next: bool,
    pub last: bool,
    /// The editable page field
    pub input: bool,
    pub label: PageLabel,
}

impl PageControls {
    /// Everything disabled, used before the first page arrives and for empty collections
    pub fn disabled() -> Self {
        Self {
            first: false,
            previous: false,
            next: false,
            last: false,
            input: false,
            label: PageLabel::NoData,
        }
    }

    pub fn for_metadata(metadata: &PaginationMetadata) -> Self {
        if metadata.has_no_pages() {
            return Self::disabled();
        }

        // A button is live when it leads to another valid page
        let bounds = PageBounds::from_metadata(metadata);
        let leads_somewhere = |target: NavTarget| {
            let page = target.target_page(metadata);
            bounds.contains(page) && page != metadata.current_page as i64
        };
        Self {
            first: leads_somewhere(NavTarget::First),
            previous: leads_somewhere(NavTarget::Previous),
            next: leads_somewhere(NavTarget::Next),
            last: leads_somewhere(NavTarget::Last),
            input: true,
            label: PageLabel::PageOf {
                current: metadata.current_page,
                total: metadata.total_pages,
            },
        }
    }

    pub fn is_enabled(&self, target: NavTarget) -> bool {
        match target {
            NavTarget::First => self.first,
            NavTarget::Previous => self.previous,
            NavTarget::Next => self.next,
            NavTarget::Last => self.last,
        }
    }

    /// All controls disabled
    pub fn all_disabled(&self) -> bool {
        !(self.first || self.previous || self.next || self.last || self.input)
    }
}
