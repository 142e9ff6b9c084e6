//! In-memory fair and sale storage.
//!
//! Complements `PostgresFeriaStore` for fast, deterministic tests. One
//! `RwLock` guards fairs and sales together, so every trait method runs as a
//! single critical section and compound operations are atomic.

use chrono::{DateTime, Utc};
use feria_core::commands::FairDraft;
use feria_core::environment::{Clock, SystemClock};
use feria_core::error::StoreError;
use feria_core::store::{
    ArchiveOutcome, CloseOutcome, FairStore, InsertOutcome, SaleStore, StoreFuture,
};
use feria_core::types::{Fair, FairId, NewSale, Sale, SaleAttemptId, SaleId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct State {
    fairs: Vec<Fair>,
    // (insertion sequence, sale)
    sales: Vec<(u64, Sale)>,
    next_seq: u64,
}

/// In-memory implementation of [`FairStore`] and [`SaleStore`].
///
/// # Example
///
/// ```
/// use feria_testing::{InMemoryStore, fixtures};
/// use feria_core::store::FairStore;
///
/// # async fn example() -> Result<(), feria_core::StoreError> {
/// let store = InMemoryStore::new();
/// let fair = store.activate_fair(fixtures::fair_draft("Fair1"), chrono::Utc::now()).await?;
/// assert!(fair.is_active);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    clock: Arc<dyn Clock>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create an empty store stamping sales with the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping sales with `clock`
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            clock,
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`
    /// (or succeed again with `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert a fair exactly as given, bypassing every rule.
    ///
    /// Lets tests build states the store would never produce itself, such as
    /// two active fairs.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the lock is poisoned.
    pub fn seed_fair(&self, fair: Fair) -> Result<(), StoreError> {
        self.write(|state| {
            state.fairs.push(fair);
            Ok(())
        })
    }

    /// Total number of stored sale records across all fairs.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the lock is poisoned.
    pub fn sale_count(&self) -> Result<usize, StoreError> {
        self.read(|state| Ok(state.sales.len()))
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store marked unavailable".into()))
        } else {
            Ok(())
        }
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> Result<T, StoreError>) -> Result<T, StoreError> {
        self.check_available()?;
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))?;
        f(&state)
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.check_available()?;
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))?;
        f(&mut state)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("unavailable", &self.unavailable.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn find_fair(state: &mut State, id: FairId) -> Result<&mut Fair, StoreError> {
    state
        .fairs
        .iter_mut()
        .find(|f| f.id == id)
        .ok_or(StoreError::NotFound(id))
}

fn attempt_sales(state: &State, attempt_id: SaleAttemptId) -> Vec<Sale> {
    state
        .sales
        .iter()
        .filter(|(_, s)| s.attempt_id == attempt_id)
        .map(|(_, s)| s.clone())
        .collect()
}

impl FairStore for InMemoryStore {
    fn activate_fair(&self, draft: FairDraft, at: DateTime<Utc>) -> StoreFuture<'_, Fair> {
        let result = self.write(|state| {
            for fair in state.fairs.iter_mut().filter(|f| f.is_active) {
                fair.is_active = false;
                fair.closed_at.get_or_insert(at);
            }
            let fair = Fair {
                id: FairId::new(),
                name: draft.name,
                start_date: draft.start_date,
                end_date: draft.end_date,
                pinta_price: draft.pinta_price,
                litro_price: draft.litro_price,
                is_active: true,
                created_at: at,
                closed_at: None,
                archived_at: None,
            };
            state.fairs.push(fair.clone());
            Ok(fair)
        });
        Box::pin(async move { result })
    }

    fn update_fair(&self, id: FairId, draft: FairDraft) -> StoreFuture<'_, Fair> {
        let result = self.write(|state| {
            let fair = find_fair(state, id)?;
            if !fair.is_active {
                return Err(StoreError::Closed(id));
            }
            fair.name = draft.name;
            fair.start_date = draft.start_date;
            fair.end_date = draft.end_date;
            fair.pinta_price = draft.pinta_price;
            fair.litro_price = draft.litro_price;
            Ok(fair.clone())
        });
        Box::pin(async move { result })
    }

    fn get_fair(&self, id: FairId) -> StoreFuture<'_, Option<Fair>> {
        let result = self.read(|state| Ok(state.fairs.iter().find(|f| f.id == id).cloned()));
        Box::pin(async move { result })
    }

    fn active_fairs(&self) -> StoreFuture<'_, Vec<Fair>> {
        let result = self.read(|state| {
            Ok(state.fairs.iter().filter(|f| f.is_active).cloned().collect())
        });
        Box::pin(async move { result })
    }

    fn list_fairs(&self) -> StoreFuture<'_, Vec<Fair>> {
        let result = self.read(|state| {
            let mut fairs = state.fairs.clone();
            fairs.sort_by(|a, b| {
                b.start_date
                    .cmp(&a.start_date)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            });
            Ok(fairs)
        });
        Box::pin(async move { result })
    }

    fn close_fair(&self, id: FairId, at: DateTime<Utc>) -> StoreFuture<'_, CloseOutcome> {
        let result = self.write(|state| {
            let fair = find_fair(state, id)?;
            if fair.is_active {
                fair.is_active = false;
                fair.closed_at = Some(at);
                Ok(CloseOutcome::Closed(fair.clone()))
            } else {
                Ok(CloseOutcome::AlreadyClosed(fair.clone()))
            }
        });
        Box::pin(async move { result })
    }

    fn archive_fair(&self, id: FairId, at: DateTime<Utc>) -> StoreFuture<'_, ArchiveOutcome> {
        let result = self.write(|state| {
            // existence check before any mutation
            find_fair(state, id)?;
            let before = state.sales.len();
            state.sales.retain(|(_, sale)| sale.fair_id != id);
            let sales_deleted = (before - state.sales.len()) as u64;

            let fair = find_fair(state, id)?;
            fair.is_active = false;
            fair.closed_at.get_or_insert(at);
            fair.archived_at.get_or_insert(at);
            Ok(ArchiveOutcome {
                fair: fair.clone(),
                sales_deleted,
            })
        });
        Box::pin(async move { result })
    }
}

impl SaleStore for InMemoryStore {
    fn insert_sales(
        &self,
        fair_id: FairId,
        attempt_id: SaleAttemptId,
        lines: Vec<NewSale>,
    ) -> StoreFuture<'_, InsertOutcome> {
        let sold_at = self.clock.now();
        let result = self.write(|state| {
            let existing = attempt_sales(state, attempt_id);
            if !existing.is_empty() {
                if existing.iter().any(|s| s.fair_id != fair_id) {
                    return Err(StoreError::Conflict(format!(
                        "sale attempt {attempt_id} belongs to another fair"
                    )));
                }
                return Ok(InsertOutcome::replayed(existing));
            }

            if !find_fair(state, fair_id)?.is_active {
                return Err(StoreError::NotActive(fair_id));
            }

            let mut inserted = Vec::with_capacity(lines.len());
            for line in lines {
                let sale = line.into_sale(SaleId::new(), fair_id, attempt_id, sold_at);
                state.sales.push((state.next_seq, sale.clone()));
                state.next_seq += 1;
                inserted.push(sale);
            }
            Ok(InsertOutcome::inserted(inserted))
        });
        Box::pin(async move { result })
    }

    fn sales_for_attempt(&self, attempt_id: SaleAttemptId) -> StoreFuture<'_, Vec<Sale>> {
        let result = self.read(|state| Ok(attempt_sales(state, attempt_id)));
        Box::pin(async move { result })
    }

    fn sales_for_fair(&self, fair_id: FairId) -> StoreFuture<'_, Vec<Sale>> {
        let result = self.read(|state| {
            let mut sales: Vec<&(u64, Sale)> = state
                .sales
                .iter()
                .filter(|(_, s)| s.fair_id == fair_id)
                .collect();
            sales.sort_by(|(seq_a, a), (seq_b, b)| {
                b.sold_at.cmp(&a.sold_at).then_with(|| seq_b.cmp(seq_a))
            });
            Ok(sales.into_iter().map(|(_, s)| s.clone()).collect())
        });
        Box::pin(async move { result })
    }

    fn delete_sales_for_fair(&self, fair_id: FairId) -> StoreFuture<'_, u64> {
        let result = self.write(|state| {
            let before = state.sales.len();
            state.sales.retain(|(_, sale)| sale.fair_id != fair_id);
            Ok((before - state.sales.len()) as u64)
        });
        Box::pin(async move { result })
    }
}
