//! Strongly-typed identifiers for Credo entities.
//!
//! Pages, revisions, and users are keyed by the numeric identifiers the
//! editing system assigns. The newtypes exist so the compiler rejects a
//! revision id where a page id is expected; this engine never generates
//! identifiers of its own.
//!
//! # Example
//!
//! ```rust
//! use credo_core::id::{PageId, RevisionId};
//!
//! let page = PageId::new(12);
//! let revision = RevisionId::new(98_765);
//!
//! // IDs are different types - this won't compile:
//! // let wrong: PageId = revision;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A unique identifier for a page in the corpus.
///
/// Pages are the unit of mutual exclusion: all trust state for a page is
/// owned by whichever worker currently holds that page's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(i64);

impl PageId {
    /// Wraps a raw page identifier from the editing system.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the underlying numeric identifier.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PageId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<i64>().map(Self).map_err(|e| Error::InvalidId {
            message: format!("invalid page ID '{s}': {e}"),
        })
    }
}

/// A unique identifier for one immutable revision of a page.
///
/// Revision ids increase with creation time within a page, so they sort in
/// the order the edits were made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(i64);

impl RevisionId {
    /// Wraps a raw revision identifier from the editing system.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the underlying numeric identifier.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RevisionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<i64>().map(Self).map_err(|e| Error::InvalidId {
            message: format!("invalid revision ID '{s}': {e}"),
        })
    }
}

/// A unique identifier for a user, whether author or reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wraps a raw user identifier from the editing system.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the underlying numeric identifier.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<i64>().map(Self).map_err(|e| Error::InvalidId {
            message: format!("invalid user ID '{s}': {e}"),
        })
    }
}
