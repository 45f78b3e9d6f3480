//! Deterministic path derivation for externally stored colored markup.
//!
//! For large corpora the annotated markup blobs live outside the hot
//! relational tables. Every worker must derive the same path from the same
//! (page, revision) pair with no lookup table, so the layout is a pure
//! function of the two ids. Pages are bucketed by `page_id mod 1000` so a
//! single directory never accumulates an unbounded number of entries.

use crate::id::{PageId, RevisionId};

/// Root prefix for all markup blobs.
pub const MARKUP_ROOT: &str = "markup";

/// File extension for markup blobs.
pub const MARKUP_EXT: &str = "trust";

/// Number of top-level page buckets.
const PAGE_BUCKETS: i64 = 1000;

/// Returns the bucket directory for a page.
fn page_bucket(page_id: PageId) -> i64 {
    page_id.as_i64().rem_euclid(PAGE_BUCKETS)
}

/// Returns the storage prefix holding every markup blob for one page.
///
/// Useful for listing or retiring a page's markup wholesale.
#[must_use]
pub fn page_markup_prefix(page_id: PageId) -> String {
    format!("{MARKUP_ROOT}/{:03}/{page_id}", page_bucket(page_id))
}

/// Returns the storage path for one revision's colored markup.
///
/// # Example
///
/// ```rust
/// use credo_core::id::{PageId, RevisionId};
/// use credo_core::paths::markup_path;
///
/// let path = markup_path(PageId::new(12_042), RevisionId::new(98_765));
/// assert_eq!(path, "markup/042/12042/98765.trust");
/// ```
#[must_use]
pub fn markup_path(page_id: PageId, revision_id: RevisionId) -> String {
    format!(
        "{MARKUP_ROOT}/{:03}/{page_id}/{revision_id}.{MARKUP_EXT}",
        page_bucket(page_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_path_is_deterministic() {
        let a = markup_path(PageId::new(12_042), RevisionId::new(98_765));
        let b = markup_path(PageId::new(12_042), RevisionId::new(98_765));
        assert_eq!(a, b);
        assert_eq!(a, "markup/042/12042/98765.trust");
    }

    #[test]
    fn pages_spread_across_buckets() {
        assert_eq!(markup_path(PageId::new(1), RevisionId::new(1)), "markup/001/1/1.trust");
        assert_eq!(markup_path(PageId::new(1001), RevisionId::new(1)), "markup/001/1001/1.trust");
        assert_eq!(markup_path(PageId::new(999), RevisionId::new(2)), "markup/999/999/2.trust");
    }

    #[test]
    fn prefix_contains_every_revision_path() {
        let page = PageId::new(77);
        let prefix = page_markup_prefix(page);
        let path = markup_path(page, RevisionId::new(5));
        assert!(path.starts_with(&prefix));
    }

    #[test]
    fn negative_ids_stay_in_range() {
        // Source systems should never emit these, but the bucket must not
        // produce a malformed path if one slips through.
        let path = markup_path(PageId::new(-7), RevisionId::new(1));
        assert!(path.starts_with("markup/993/"));
    }
}
