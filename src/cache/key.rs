//! Cache key derivation for note listings.
//!
//! A cache key identifies one (owner, normalized query) pair. The query
//! parameters are normalized once, in the `ListQuery` constructors, then
//! hashed over a fixed canonical encoding so that identical queries always
//! land on the same key, within and across processes.

use sha2::{Digest, Sha256};

/// Default page size when none is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound on the page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Fields a note listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Title,
}

impl SortField {
    /// Document field name for this sort field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Title => "title",
        }
    }

    /// Parse a raw value, falling back to `CreatedAt` for anything outside
    /// the whitelist.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "updated_at" | "updatedAt" => Self::UpdatedAt,
            "title" => Self::Title,
            _ => Self::CreatedAt,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Sort direction as a MongoDB sort value.
    pub fn direction(self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }

    /// Parse a raw value; anything other than `asc` sorts descending.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

/// Normalized parameters of a note listing query.
///
/// Fields are private so a `ListQuery` can only be built through the
/// constructors below, which are the single normalization point: search is
/// trimmed, page is clamped to at least 1, page size to 1..=100. Key
/// derivation and the backing query both consume the same normalized
/// values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    search: String,
    page: u32,
    page_size: u32,
    sort_field: SortField,
    sort_order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_field: SortField::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

impl ListQuery {
    /// Build a query from typed parameters, normalizing them.
    pub fn new(
        search: impl Into<String>,
        page: u32,
        page_size: u32,
        sort_field: SortField,
        sort_order: SortOrder,
    ) -> Self {
        Self {
            search: search.into().trim().to_string(),
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            sort_field,
            sort_order,
        }
    }

    /// Build a query from raw (string-typed) request parameters.
    ///
    /// Mirrors how a query string is coerced: numbers are parsed with a
    /// fallback to the default, unknown sort fields fall back to
    /// `created_at`, unknown orders to `desc`.
    pub fn from_raw(
        search: Option<&str>,
        page: Option<&str>,
        page_size: Option<&str>,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
    ) -> Self {
        Self::new(
            search.unwrap_or(""),
            page.and_then(|p| p.trim().parse().ok()).unwrap_or(1),
            page_size
                .and_then(|l| l.trim().parse().ok())
                .unwrap_or(DEFAULT_PAGE_SIZE),
            SortField::parse(sort_by.unwrap_or("")),
            SortOrder::parse(sort_order.unwrap_or("")),
        )
    }

    /// Replace the search text (builder pattern, re-normalized).
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into().trim().to_string();
        self
    }

    /// Replace the page number (builder pattern, re-normalized).
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Replace the page size (builder pattern, re-normalized).
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Replace the sort field and order (builder pattern).
    #[must_use]
    pub fn with_sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = field;
        self.sort_order = order;
        self
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort_field(&self) -> SortField {
        self.sort_field
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Number of documents to skip for this page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// Key prefix under which all of one owner's listing entries live.
///
/// Invalidation scans this prefix, so every key produced by `derive_key`
/// must start with it.
pub fn owner_prefix(owner_id: &str) -> String {
    format!("listcache:owner:{owner_id}:q:")
}

/// Derive the cache key for an owner's listing query.
///
/// The canonical encoding is a fixed ASCII format string with a stable
/// field order, deliberately independent of any serializer's behavior, so
/// the digest never shifts underneath existing cache entries.
pub fn derive_key(owner_id: &str, query: &ListQuery) -> String {
    let canonical = format!(
        "search={}|page={}|limit={}|sort={}|order={}",
        query.search(),
        query.page(),
        query.page_size(),
        query.sort_field().as_str(),
        query.sort_order().as_str(),
    );

    let digest = Sha256::digest(canonical.as_bytes());
    format!("{}{}", owner_prefix(owner_id), hex::encode(digest))
}
