//! Lease-based mutual exclusion for pages and the reputation aggregate.
//!
//! Every ordering guarantee in the update engine rests on these locks being
//! truly mutually exclusive, so acquisition is never a no-op: a lock is a
//! **lease** with an owner token and an expiry. The TTL prevents a crashed
//! holder from deadlocking a page forever; the token prevents one worker
//! from releasing another's lease.
//!
//! The service is pluggable, separate from storage concerns:
//!
//! - **Testing / single-process deployments**: [`InMemoryLockService`]
//! - **Production**: a shared-store lease (advisory lock or CAS'd lease row)
//!   implementing the same trait
//!
//! Timeout semantics: a zero timeout tries once and reports `Busy`
//! immediately; a positive timeout retries until the deadline passes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::id::PageId;

/// Default lease TTL.
///
/// Generous because a single page evaluation may backfill a long ancestor
/// chain while holding the lock.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(600);

/// Interval between acquisition attempts while a timeout budget remains.
const ACQUIRE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// The resource a lease covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockKey {
    /// Exclusive ownership of one page's trust state and trust results.
    Page(PageId),
    /// The single global lock guarding the reputation histogram and any
    /// cross-page reputation recompute.
    Reputation,
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(page_id) => write!(f, "page/{page_id}"),
            Self::Reputation => write!(f, "reputation"),
        }
    }
}

/// A held lease: proof of ownership returned by a successful acquisition.
///
/// The token is required for release, so a worker can only relinquish a
/// lease it actually holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    /// The resource this lease covers.
    pub key: LockKey,
    /// Unique holder ID of the owning worker.
    pub holder_id: String,
    /// Opaque token proving ownership.
    pub token: String,
    /// When the lease expires.
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    /// Returns whether this lease has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Result of a lock acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAcquisition {
    /// The lease was obtained; the caller now owns the resource.
    Acquired {
        /// The lease that must be presented on release.
        lease: Lease,
    },
    /// The resource is held by another worker.
    Busy {
        /// Holder ID of the current owner, if known.
        current_holder: Option<String>,
    },
}

impl LockAcquisition {
    /// Returns true if the lease was obtained.
    #[must_use]
    pub const fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired { .. })
    }

    /// Returns the lease if one was obtained.
    #[must_use]
    pub fn into_lease(self) -> Option<Lease> {
        match self {
            Self::Acquired { lease } => Some(lease),
            Self::Busy { .. } => None,
        }
    }
}

/// Mutual-exclusion service for page and reputation locks.
///
/// ## Contract
///
/// - Acquisition with a zero timeout tries once; a positive timeout blocks
///   up to that long before reporting `Busy`.
/// - An expired lease may be taken over by any worker.
/// - `release` must be called exactly once per successful acquisition,
///   including on failure paths, and only succeeds with a matching token.
///
/// The lock is cooperative: it constrains workers that honor this service,
/// not raw storage access.
#[async_trait]
pub trait LockService: Send + Sync {
    /// Attempts to obtain exclusive ownership of `key`.
    ///
    /// # Errors
    ///
    /// Returns an error only on service failure; contention is reported as
    /// [`LockAcquisition::Busy`], not as an error.
    async fn acquire(
        &self,
        key: LockKey,
        holder_id: &str,
        timeout: Duration,
    ) -> Result<LockAcquisition>;

    /// Relinquishes a held lease.
    ///
    /// Returns `true` if the lease was released, `false` if it had already
    /// expired, been taken over, or the token did not match.
    ///
    /// # Errors
    ///
    /// Returns an error only on service failure.
    async fn release(&self, lease: &Lease) -> Result<bool>;
}

/// Lease bookkeeping for one key.
#[derive(Debug, Clone)]
struct LeaseEntry {
    holder_id: String,
    token: String,
    expires_at: DateTime<Utc>,
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("lock poisoned")
}

/// In-memory lock service for tests and single-process deployments.
///
/// Thread-safe via `RwLock`. Not suitable for multi-process workers: leases
/// are not shared across process boundaries.
#[derive(Debug)]
pub struct InMemoryLockService {
    leases: RwLock<HashMap<LockKey, LeaseEntry>>,
    lease_ttl: Duration,
}

impl Default for InMemoryLockService {
    fn default() -> Self {
        Self::new(DEFAULT_LEASE_TTL)
    }
}

impl InMemoryLockService {
    /// Creates a new in-memory lock service with the given lease TTL.
    #[must_use]
    pub fn new(lease_ttl: Duration) -> Self {
        Self {
            leases: RwLock::new(HashMap::new()),
            lease_ttl,
        }
    }

    /// Generates a new unique lease token.
    fn generate_token() -> String {
        Ulid::new().to_string()
    }

    /// One acquisition attempt, no waiting.
    fn try_acquire(&self, key: LockKey, holder_id: &str) -> Result<LockAcquisition> {
        let mut leases = self.leases.write().map_err(poison_err)?;
        let now = Utc::now();

        if let Some(entry) = leases.get(&key) {
            if entry.expires_at > now && entry.holder_id != holder_id {
                let current_holder = entry.holder_id.clone();
                drop(leases);

                return Ok(LockAcquisition::Busy {
                    current_holder: Some(current_holder),
                });
            }
            // Expired, or re-acquisition by the same holder - fall through.
        }

        let entry = LeaseEntry {
            holder_id: holder_id.to_string(),
            token: Self::generate_token(),
            expires_at: now
                + chrono::Duration::from_std(self.lease_ttl)
                    .unwrap_or(chrono::Duration::seconds(600)),
        };
        let lease = Lease {
            key,
            holder_id: entry.holder_id.clone(),
            token: entry.token.clone(),
            expires_at: entry.expires_at,
        };
        leases.insert(key, entry);
        drop(leases);

        Ok(LockAcquisition::Acquired { lease })
    }
}

#[async_trait]
impl LockService for InMemoryLockService {
    async fn acquire(
        &self,
        key: LockKey,
        holder_id: &str,
        timeout: Duration,
    ) -> Result<LockAcquisition> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let attempt = self.try_acquire(key, holder_id)?;
            if attempt.is_acquired() {
                return Ok(attempt);
            }

            let now = tokio::time::Instant::now();
            if timeout.is_zero() || now >= deadline {
                return Ok(attempt);
            }
            tokio::time::sleep(ACQUIRE_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn release(&self, lease: &Lease) -> Result<bool> {
        let mut leases = self.leases.write().map_err(poison_err)?;

        let Some(entry) = leases.get(&lease.key) else {
            drop(leases);
            return Ok(false);
        };

        // Token must match: never release a lease taken over by another
        // worker after ours expired.
        if entry.token != lease.token {
            drop(leases);
            return Ok(false);
        }

        leases.remove(&lease.key);
        drop(leases);

        Ok(true)
    }
}
