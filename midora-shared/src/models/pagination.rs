use serde::{Deserialize, Serialize};

/// Cursor tracking how much of a paginated collection has been fetched.
///
/// Invariant: `page <= total_pages`. Pages are 1-based; a collection with
/// no items reports `page == total_pages == 0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageInfo {
    /// The page most recently fetched.
    pub page: u32,
    /// Number of items requested per page.
    pub per_page: u32,
    /// Total item count reported by the server.
    pub total: u64,
    /// Total page count reported by the server.
    pub total_pages: u32,
}

impl PageInfo {
    /// Whether another page remains to be fetched.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    /// The page number to request next, if any remains.
    #[must_use]
    pub const fn next_page(&self) -> Option<u32> {
        if self.has_more() { Some(self.page + 1) } else { None }
    }
}
