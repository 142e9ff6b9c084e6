//! Storage abstraction for fairs and sales.
//!
//! The store is the single place where fairs and sales are coordinated. Each
//! trait method is one atomic operation: compound writes (activating a fair
//! while deactivating the previous one, inserting the lines of a cart,
//! purging sales while archiving) either apply completely or not at all.
//!
//! # Implementations
//!
//! - `PostgresFeriaStore` (in `feria-postgres`): production storage
//! - `InMemoryStore` (in `feria-testing`): fast, deterministic testing
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so that
//! the lifecycle can hold an `Arc<dyn FeriaStore>`.

use crate::commands::FairDraft;
use crate::error::StoreError;
use crate::types::{Fair, FairId, NewSale, Sale, SaleAttemptId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by store methods
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Result of closing a fair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "fair", rename_all = "snake_case")]
pub enum CloseOutcome {
    /// The fair was active and is now closed
    Closed(Fair),
    /// The fair was already closed; nothing changed
    AlreadyClosed(Fair),
}

impl CloseOutcome {
    /// The fair as it is after the call
    #[must_use]
    pub const fn fair(&self) -> &Fair {
        match self {
            Self::Closed(fair) | Self::AlreadyClosed(fair) => fair,
        }
    }

    /// Consume the outcome, keeping the fair
    #[must_use]
    pub fn into_fair(self) -> Fair {
        match self {
            Self::Closed(fair) | Self::AlreadyClosed(fair) => fair,
        }
    }
}

/// Result of finalizing a fair and purging its sales.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveOutcome {
    /// The fair as it is after the call
    pub fair: Fair,
    /// Number of sale records removed by this call
    pub sales_deleted: u64,
}

/// Result of inserting the lines of one sale attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    /// Every record of the attempt
    pub sales: Vec<Sale>,
    /// `true` if the attempt had already been recorded and nothing was written
    pub replayed: bool,
}

impl InsertOutcome {
    /// Records written by this call
    #[must_use]
    pub const fn inserted(sales: Vec<Sale>) -> Self {
        Self {
            sales,
            replayed: false,
        }
    }

    /// Records found from an earlier call with the same attempt
    #[must_use]
    pub const fn replayed(sales: Vec<Sale>) -> Self {
        Self {
            sales,
            replayed: true,
        }
    }
}

/// Fair persistence.
pub trait FairStore: Send + Sync {
    /// Create a new active fair from a validated draft.
    ///
    /// In the same atomic step, any currently active fair is deactivated and
    /// its `closed_at` set to `at`. After this call exactly one fair is active.
    ///
    /// # Errors
    ///
    /// - `Conflict`: a concurrent activation won the race
    /// - `Unavailable`: the store could not be reached
    fn activate_fair(&self, draft: FairDraft, at: DateTime<Utc>) -> StoreFuture<'_, Fair>;

    /// Replace a fair's configuration with a validated draft.
    ///
    /// Never changes `is_active` and never touches stored sales.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no fair with this id
    /// - `Closed`: the fair is no longer active
    /// - `Unavailable`: the store could not be reached
    fn update_fair(&self, id: FairId, draft: FairDraft) -> StoreFuture<'_, Fair>;

    /// Look up a fair by id.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store could not be reached, or `Corrupt`
    /// if the stored row cannot be decoded.
    fn get_fair(&self, id: FairId) -> StoreFuture<'_, Option<Fair>>;

    /// Every fair flagged active. More than one entry means the store is
    /// inconsistent; callers decide how to report it.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store could not be reached.
    fn active_fairs(&self) -> StoreFuture<'_, Vec<Fair>>;

    /// All fairs, most recent start date first.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store could not be reached.
    fn list_fairs(&self) -> StoreFuture<'_, Vec<Fair>>;

    /// Deactivate a fair, setting `closed_at = at` if it was active.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no fair with this id
    /// - `Unavailable`: the store could not be reached
    fn close_fair(&self, id: FairId, at: DateTime<Utc>) -> StoreFuture<'_, CloseOutcome>;

    /// Atomically delete every sale of the fair and mark it archived.
    ///
    /// `closed_at` keeps its value if already set. Repeating the call deletes
    /// nothing and leaves `archived_at` at its first value.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no fair with this id
    /// - `Unavailable`: the store could not be reached
    fn archive_fair(&self, id: FairId, at: DateTime<Utc>) -> StoreFuture<'_, ArchiveOutcome>;
}

/// Sale persistence.
pub trait SaleStore: Send + Sync {
    /// Insert every line of one sale attempt, all or none.
    ///
    /// The fair is re-checked for being active inside the same atomic step.
    /// If records for `attempt_id` already exist they are returned unchanged
    /// with `replayed` set, and nothing new is written.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no fair with this id
    /// - `NotActive`: the fair was closed before the insert
    /// - `Conflict`: `attempt_id` was already used for another fair
    /// - `Unavailable`: the store could not be reached
    fn insert_sales(
        &self,
        fair_id: FairId,
        attempt_id: SaleAttemptId,
        lines: Vec<NewSale>,
    ) -> StoreFuture<'_, InsertOutcome>;

    /// Records stored for one sale attempt, empty if it was never recorded.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store could not be reached, or `Corrupt`
    /// if a stored record cannot be decoded.
    fn sales_for_attempt(&self, attempt_id: SaleAttemptId) -> StoreFuture<'_, Vec<Sale>>;

    /// Every sale of a fair, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store could not be reached, or `Corrupt`
    /// if a stored unit type or payment method is not recognized.
    fn sales_for_fair(&self, fair_id: FairId) -> StoreFuture<'_, Vec<Sale>>;

    /// Delete every sale of a fair, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the store could not be reached.
    fn delete_sales_for_fair(&self, fair_id: FairId) -> StoreFuture<'_, u64>;
}

/// Both halves of the store, as the lifecycle needs them.
pub trait FeriaStore: FairStore + SaleStore {}

impl<T: FairStore + SaleStore + ?Sized> FeriaStore for T {}
