//! # credo-core
//!
//! Core abstractions for the Credo content-trust infrastructure.
//!
//! This crate provides the foundational types and traits used across all
//! Credo components:
//!
//! - **Identifiers**: Strongly-typed IDs for pages, revisions, and users
//! - **Domain Model**: The persisted shapes of trust state
//! - **Store Contract**: The durable-state surface the update engine needs
//! - **Lock Service**: Lease-based mutual exclusion for pages and the
//!   reputation aggregate
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `credo-core` is the **only** crate allowed to define shared primitives.
//! It contains no orchestration logic; the update engine lives in
//! `credo-updater` and consumes these contracts.
//!
//! ## Example
//!
//! ```rust
//! use credo_core::prelude::*;
//!
//! let page = PageId::new(12);
//! let revision = RevisionId::new(98_765);
//! let path = credo_core::paths::markup_path(page, revision);
//! assert!(path.ends_with(".trust"));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod lock;
pub mod model;
pub mod observability;
pub mod paths;
pub mod store;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use credo_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::{PageId, RevisionId, UserId};
    pub use crate::lock::{
        InMemoryLockService, Lease, LockAcquisition, LockKey, LockService,
    };
    pub use crate::model::{
        AuthorSignatures, ColoredMarkup, DeadChunk, GlobalHistogram, PageTrustState,
        ReputationRecord, Revision, RevisionTrustResult, Vote,
    };
    pub use crate::store::{MemoryStore, TrustStore};
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use id::{PageId, RevisionId, UserId};
pub use lock::{InMemoryLockService, Lease, LockAcquisition, LockKey, LockService};
pub use model::{
    AuthorSignatures, ColoredMarkup, DeadChunk, GlobalHistogram, PageTrustState, ReputationRecord,
    Revision, RevisionTrustResult, Vote,
};
pub use observability::{LogFormat, init_logging};
pub use store::{MemoryStore, TrustStore};
