//! Listing payload models.
//!
//! `NoteListPage` is both the response shape handed to the caller and the
//! value serialized into the cache; once written to the cache it is never
//! partially updated, only overwritten or expired.

use serde::{Deserialize, Serialize};

use super::Note;

/// Pagination metadata for one listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageInfo {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_count: u64,
    pub page_size: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageInfo {
    /// Compute pagination metadata from the page request and total count.
    pub fn compute(page: u32, page_size: u32, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(u64::from(page_size));

        Self {
            current_page: page,
            total_pages,
            total_count,
            page_size,
            has_next_page: u64::from(page) < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// Echo of the search parameters a page was computed for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchInfo {
    /// The (normalized) search text
    pub query: String,
    /// Number of results on this page
    pub results_count: usize,
}

/// One page of an owner's note listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteListPage {
    pub data: Vec<Note>,
    pub pagination: PageInfo,
    pub search: SearchInfo,

    /// Whether this payload was served from the cache.
    /// Stored as `false`; flipped to `true` on a cache hit.
    #[serde(default)]
    pub cached: bool,
}
