//! Repository and tag browsing for one registry
//!
//! [`RegistryBrowser`] owns two independent cursors. Continuation tokens are
//! scoped to the listing that issued them, so picking another registry resets
//! both cursors and picking another repository resets the tag cursor.

use crate::error::{Result, ToolkitError};
use crate::logging::Logger;
use crate::registry::client::{Page, RegistryApi};
use crate::registry::pagination::{continuation_token, Direction, PageCursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Repositories,
    Tags,
}

impl Listing {
    fn as_str(self) -> &'static str {
        match self {
            Listing::Repositories => "repositories",
            Listing::Tags => "tags",
        }
    }
}

pub struct RegistryBrowser<A: RegistryApi> {
    api: A,
    output: Logger,
    repositories: PageCursor,
    tags: PageCursor,
    selected_repository: Option<String>,
}

impl<A: RegistryApi> RegistryBrowser<A> {
    pub fn new(api: A, page_size: usize, output: Logger) -> Self {
        Self {
            api,
            output,
            repositories: PageCursor::new(page_size),
            tags: PageCursor::new(page_size),
            selected_repository: None,
        }
    }

    /// Point the browser at another registry, dropping all paging state.
    pub fn select_registry(&mut self, api: A) {
        self.api = api;
        self.repositories.reset();
        self.tags.reset();
        self.selected_repository = None;
    }

    /// Pick the repository whose tags are listed next. Resets the tag cursor.
    pub fn select_repository(&mut self, repository: &str) {
        self.output
            .verbose(&format!("Selected repository {}", repository));
        self.selected_repository = Some(repository.to_string());
        self.tags.reset();
    }

    pub fn selected_repository(&self) -> Option<&str> {
        self.selected_repository.as_deref()
    }

    pub fn cursor(&self, listing: Listing) -> &PageCursor {
        match listing {
            Listing::Repositories => &self.repositories,
            Listing::Tags => &self.tags,
        }
    }

    /// Fetch the repository page in `direction`.
    ///
    /// Returns `Ok(None)` when the cursor cannot move that way. A failed fetch
    /// leaves the cursor where it was.
    pub async fn list_repositories(&mut self, direction: Direction) -> Result<Option<Vec<String>>> {
        if !self.repositories.can_move(direction) {
            return Ok(None);
        }

        let query = self.repositories.build_query(direction);
        let page = self
            .api
            .list_repositories(&query)
            .await
            .map_err(|e| e.with_context(&page_context(Listing::Repositories, direction, None)))?;

        Ok(Some(self.apply(Listing::Repositories, direction, page)))
    }

    /// Fetch the tag page of the selected repository in `direction`.
    pub async fn list_tags(&mut self, direction: Direction) -> Result<Option<Vec<String>>> {
        let repository = self.selected_repository.clone().ok_or_else(|| {
            ToolkitError::Validation("No repository selected for tag listing".to_string())
        })?;

        if !self.tags.can_move(direction) {
            return Ok(None);
        }

        let query = self.tags.build_query(direction);
        let page = self
            .api
            .list_tags(&repository, &query)
            .await
            .map_err(|e| {
                e.with_context(&page_context(Listing::Tags, direction, Some(&repository)))
            })?;

        Ok(Some(self.apply(Listing::Tags, direction, page)))
    }

    fn apply(&mut self, listing: Listing, direction: Direction, page: Page) -> Vec<String> {
        let cursor = match listing {
            Listing::Repositories => &mut self.repositories,
            Listing::Tags => &mut self.tags,
        };

        match direction {
            Direction::Forward => {
                let following = match page.link.as_deref().map(continuation_token) {
                    Some(Ok(token)) => Some(token),
                    Some(Err(e)) => {
                        self.output
                            .warning(&format!("Treating {} listing as complete: {}", listing.as_str(), e));
                        None
                    }
                    None => None,
                };
                cursor.advance(following);
            }
            Direction::Backward => cursor.retreat(),
        }

        self.output.debug(&format!(
            "{} cursor: current={:?} next={:?} depth={}",
            listing.as_str(),
            cursor.current(),
            cursor.next(),
            cursor.history().len()
        ));

        page.items
    }
}

fn page_context(listing: Listing, direction: Direction, repository: Option<&str>) -> String {
    match repository {
        Some(repo) => format!("{} page of {} ({})", listing.as_str(), repo, direction.as_str()),
        None => format!("{} page ({})", listing.as_str(), direction.as_str()),
    }
}
