//! Forward/backward paging over Docker Registry v2 listings
//!
//! The registry pages `/v2/_catalog` and `/v2/{name}/tags/list` with an `n`
//! page size and an opaque `last` continuation token. The token for the next
//! page arrives in a `Link` header:
//!
//! ```text
//! </v2/_catalog?last=samples%2Fnginx&n=30>; rel="next"
//! ```
//!
//! The registry only pages forward, so [`PageCursor`] keeps a stack of the
//! tokens of pages already visited in order to step back.

use crate::error::{Result, ToolkitError};
use url::Url;

/// Query parameter carrying the continuation token
pub const CONTINUATION_PARAM: &str = "last";
/// Query parameter carrying the page size
pub const PAGE_SIZE_PARAM: &str = "n";

/// Base used to resolve registry-relative `Link` targets
const LINK_BASE: &str = "http://registry.local/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn is_forward(self) -> bool {
        self == Direction::Forward
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl From<bool> for Direction {
    fn from(going_forward: bool) -> Self {
        if going_forward {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }
}

/// Parameters for one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page_size: usize,
    pub last: Option<String>,
}

impl PageQuery {
    /// Query string pairs in the order the registry documents them
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![(PAGE_SIZE_PARAM, self.page_size.to_string())];
        if let Some(last) = &self.last {
            pairs.push((CONTINUATION_PARAM, last.clone()));
        }
        pairs
    }
}

/// Paging position within one listing (repositories, or the tags of one repository).
///
/// A `None` token names the first page. `history` holds the token of every page
/// displayed before `current`, oldest first, so the first page shows up as a
/// `None` entry once the cursor has moved past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page_size: usize,
    current: Option<String>,
    next: Option<String>,
    history: Vec<Option<String>>,
    loaded: bool,
}

impl PageCursor {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            current: None,
            next: None,
            history: Vec::new(),
            loaded: false,
        }
    }

    /// Token of the page on display, `None` for the first page
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Token that fetches the page after the one on display
    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    pub fn history(&self) -> &[Option<String>] {
        &self.history
    }

    /// No page has been applied since construction or the last reset
    pub fn is_fresh(&self) -> bool {
        !self.loaded
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        !self.history.is_empty()
    }

    /// Whether a move in `direction` would land on a different page.
    ///
    /// A fresh cursor can always move forward (onto the first page).
    pub fn can_move(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.is_fresh() || self.has_next(),
            Direction::Backward => self.has_previous(),
        }
    }

    /// Build the request for the page in `direction`.
    ///
    /// Forward sends `next`; backward sends the top of the history. Either is
    /// omitted when it is the first page.
    pub fn build_query(&self, direction: Direction) -> PageQuery {
        let last = match direction {
            Direction::Forward => self.next.clone(),
            Direction::Backward => self.history.last().cloned().flatten(),
        };
        PageQuery {
            page_size: self.page_size,
            last,
        }
    }

    /// Record a successful fetch in `direction`.
    ///
    /// A present but malformed `Link` header counts as "no next page".
    pub fn apply_response(&mut self, direction: Direction, link_header: Option<&str>) {
        match direction {
            Direction::Forward => self.advance(link_header.and_then(parse_link_header)),
            Direction::Backward => self.retreat(),
        }
    }

    /// Move onto the page named by `next`; `following` is the token after it.
    pub fn advance(&mut self, following: Option<String>) {
        if self.loaded {
            self.history.push(self.current.take());
        }
        self.current = self.next.take();
        self.next = following;
        self.loaded = true;
    }

    /// Move back onto the top of the history. No-op on an empty history.
    pub fn retreat(&mut self) {
        if let Some(previous) = self.history.pop() {
            self.next = std::mem::replace(&mut self.current, previous);
        }
    }

    /// Forget every token; they are only valid for the listing that issued them.
    pub fn reset(&mut self) {
        self.current = None;
        self.next = None;
        self.history.clear();
        self.loaded = false;
    }
}

/// Continuation token from a `Link` header value, or `None` when absent or malformed.
pub fn parse_link_header(value: &str) -> Option<String> {
    continuation_token(value).ok()
}

/// Strict form of [`parse_link_header`] that says what was wrong with the header.
pub fn continuation_token(value: &str) -> Result<String> {
    let malformed = |reason: &str| {
        ToolkitError::MalformedContinuationToken(format!("{} in link header {:?}", reason, value))
    };

    let start = value.find('<').ok_or_else(|| malformed("missing '<'"))?;
    let len = value[start + 1..]
        .find('>')
        .ok_or_else(|| malformed("missing '>'"))?;
    let target = &value[start + 1..start + 1 + len];

    let base = Url::parse(LINK_BASE).map_err(|e| malformed(&e.to_string()))?;
    let url = base
        .join(target)
        .map_err(|e| malformed(&format!("unparsable URL ({})", e)))?;

    url.query_pairs()
        .find(|(key, _)| key == CONTINUATION_PARAM)
        .map(|(_, token)| token.into_owned())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| malformed(&format!("no '{}' parameter", CONTINUATION_PARAM)))
}
