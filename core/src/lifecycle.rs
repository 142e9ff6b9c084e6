//! Fair lifecycle management.
//!
//! [`FairLifecycle`] is the entry point for every state change: activating a
//! fair, editing it, closing it, finalizing it, and recording sales against
//! it. It validates input, then delegates each change to a single atomic
//! store call. The lifecycle itself keeps no mutable state; the store is the
//! only point of coordination, so any number of lifecycles may share one.
//!
//! States:
//!
//! ```text
//! NoActiveFair --activate--> Active --close / activate another--> Closed
//!                                  \                                 |
//!                                   +-------finalize_and_purge-------+--> Archived
//! ```

use crate::commands::{FairDraft, FairUpdate, SaleRequest};
use crate::environment::Clock;
use crate::error::{FeriaError, ValidationError};
use crate::metrics;
use crate::report::FairReport;
use crate::store::{ArchiveOutcome, CloseOutcome, FeriaStore, InsertOutcome};
use crate::types::{Fair, FairId, Money, Sale};
use std::sync::Arc;

/// Coordinates fairs and their sales.
#[derive(Clone)]
pub struct FairLifecycle {
    store: Arc<dyn FeriaStore>,
    clock: Arc<dyn Clock>,
}

impl FairLifecycle {
    /// Create a lifecycle over a store and a clock
    #[must_use]
    pub fn new(store: Arc<dyn FeriaStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The underlying store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn FeriaStore> {
        &self.store
    }

    /// Create a new fair and make it the only active one.
    ///
    /// Any previously active fair is closed in the same atomic store call.
    ///
    /// # Errors
    ///
    /// - [`FeriaError::Validation`]: nothing was written
    /// - [`FeriaError::Conflict`]: a concurrent activation won; safe to retry
    /// - [`FeriaError::StoreUnavailable`]: nothing was written
    pub async fn activate(&self, draft: FairDraft) -> Result<Fair, FeriaError> {
        let draft = draft.validate()?;
        let fair = self.store.activate_fair(draft, self.clock.now()).await?;

        metrics::record_fair_activated();
        tracing::info!(
            fair_id = %fair.id,
            name = %fair.name,
            start_date = %fair.start_date,
            end_date = %fair.end_date,
            pinta_price = fair.pinta_price.cents(),
            litro_price = fair.litro_price.cents(),
            "Fair activated"
        );
        Ok(fair)
    }

    /// Edit a fair that has not been closed.
    ///
    /// Changed prices apply to future sales only.
    ///
    /// # Errors
    ///
    /// - [`FeriaError::NotFound`]: unknown fair
    /// - [`FeriaError::FairClosed`]: the fair is closed
    /// - [`FeriaError::Validation`]: the merged configuration is invalid
    pub async fn update(&self, id: FairId, changes: FairUpdate) -> Result<Fair, FeriaError> {
        let current = self.get_fair(id).await?;
        if current.is_closed() {
            return Err(FeriaError::FairClosed(id));
        }
        let draft = changes.merge_into(&current)?;
        let fair = self.store.update_fair(id, draft).await?;

        tracing::info!(fair_id = %fair.id, name = %fair.name, "Fair updated");
        Ok(fair)
    }

    /// Stop a fair from accepting sales. Its sales remain queryable.
    ///
    /// Closing an already closed fair is not an error.
    ///
    /// # Errors
    ///
    /// - [`FeriaError::NotFound`]: unknown fair
    /// - [`FeriaError::StoreUnavailable`]: nothing was written
    pub async fn close(&self, id: FairId) -> Result<CloseOutcome, FeriaError> {
        let outcome = self.store.close_fair(id, self.clock.now()).await?;
        match &outcome {
            CloseOutcome::Closed(fair) => {
                metrics::record_fair_closed();
                tracing::info!(fair_id = %fair.id, "Fair closed");
            }
            CloseOutcome::AlreadyClosed(fair) => {
                tracing::debug!(fair_id = %fair.id, "Fair already closed");
            }
        }
        Ok(outcome)
    }

    /// Delete every sale of the fair and deactivate it, atomically.
    ///
    /// Confirmation is the caller's responsibility. Repeating the call
    /// succeeds and deletes nothing.
    ///
    /// # Errors
    ///
    /// - [`FeriaError::NotFound`]: unknown fair
    /// - [`FeriaError::StoreUnavailable`]: nothing was deleted
    pub async fn finalize_and_purge(&self, id: FairId) -> Result<ArchiveOutcome, FeriaError> {
        let outcome = self.store.archive_fair(id, self.clock.now()).await?;

        metrics::record_fair_archived(outcome.sales_deleted);
        tracing::warn!(
            fair_id = %outcome.fair.id,
            sales_deleted = outcome.sales_deleted,
            "Fair finalized and sales purged"
        );
        Ok(outcome)
    }

    /// Record one sale attempt against an active fair.
    ///
    /// Yields one record per unit type in the cart, all stored atomically
    /// with the fair's current prices snapshotted. Resubmitting the same
    /// `attempt_id` returns the records stored the first time with
    /// `replayed` set, even after the fair has closed, and leaves the sales
    /// counters untouched.
    ///
    /// # Errors
    ///
    /// - [`FeriaError::Validation`]: empty cart, blank seller, values out of
    ///   range, or amount overflow
    /// - [`FeriaError::NotFound`]: unknown fair
    /// - [`FeriaError::FairNotActive`]: the fair is closed, or was closed
    ///   before the insert committed
    /// - [`FeriaError::Conflict`]: the attempt was recorded against another fair
    pub async fn record_sale(
        &self,
        id: FairId,
        request: SaleRequest,
    ) -> Result<InsertOutcome, FeriaError> {
        let fair = self.get_fair(id).await?;

        let existing = self.store.sales_for_attempt(request.attempt_id).await?;
        if !existing.is_empty() {
            if existing.iter().any(|sale| sale.fair_id != id) {
                return Err(FeriaError::Conflict(format!(
                    "sale attempt {} belongs to another fair",
                    request.attempt_id
                )));
            }
            tracing::debug!(
                fair_id = %id,
                attempt_id = %request.attempt_id,
                "Sale attempt already recorded"
            );
            return Ok(InsertOutcome::replayed(existing));
        }

        if !fair.is_active {
            return Err(FeriaError::FairNotActive(id));
        }
        let lines = request.lines(&fair)?;
        let outcome = self
            .store
            .insert_sales(id, request.attempt_id, lines)
            .await?;

        // a concurrent retry may have committed between lookup and insert
        if outcome.replayed {
            tracing::debug!(
                fair_id = %id,
                attempt_id = %request.attempt_id,
                "Sale attempt already recorded"
            );
            return Ok(outcome);
        }

        metrics::record_sale(request.payment_method, &outcome.sales);
        tracing::info!(
            fair_id = %id,
            attempt_id = %request.attempt_id,
            pintas = request.pintas,
            litros = request.litros,
            payment_method = %request.payment_method,
            seller = %request.seller_name,
            records = outcome.sales.len(),
            "Sale recorded"
        );
        Ok(outcome)
    }

    /// Look up a fair.
    ///
    /// # Errors
    ///
    /// [`FeriaError::NotFound`] if no fair has this id.
    pub async fn get_fair(&self, id: FairId) -> Result<Fair, FeriaError> {
        self.store
            .get_fair(id)
            .await?
            .ok_or(FeriaError::NotFound(id))
    }

    /// The fair currently accepting sales, if any.
    ///
    /// # Errors
    ///
    /// [`FeriaError::InvariantViolation`] if the store holds more than one
    /// active fair.
    pub async fn active_fair(&self) -> Result<Option<Fair>, FeriaError> {
        let mut active = self.store.active_fairs().await?;
        if active.len() > 1 {
            let ids: Vec<String> = active.iter().map(|f| f.id.to_string()).collect();
            tracing::error!(count = active.len(), ids = ?ids, "More than one active fair");
            return Err(FeriaError::InvariantViolation(format!(
                "{} fairs are active: {}",
                active.len(),
                ids.join(", ")
            )));
        }
        Ok(active.pop())
    }

    /// All fairs, most recent start date first.
    ///
    /// # Errors
    ///
    /// [`FeriaError::StoreUnavailable`] if the store cannot be reached.
    pub async fn history(&self) -> Result<Vec<Fair>, FeriaError> {
        Ok(self.store.list_fairs().await?)
    }

    /// Sales of a fair, most recent first.
    ///
    /// # Errors
    ///
    /// [`FeriaError::NotFound`] for an unknown fair.
    pub async fn sales(&self, id: FairId) -> Result<Vec<Sale>, FeriaError> {
        self.get_fair(id).await?;
        Ok(self.store.sales_for_fair(id).await?)
    }

    /// Aggregated report for a fair.
    ///
    /// Works in every state; an archived fair reports zeros.
    ///
    /// # Errors
    ///
    /// [`FeriaError::NotFound`] for an unknown fair, or
    /// [`FeriaError::InvariantViolation`] if a stored sale cannot be decoded.
    pub async fn report(&self, id: FairId) -> Result<FairReport, FeriaError> {
        let fair = self.get_fair(id).await?;
        let sales = self.store.sales_for_fair(id).await?;
        Ok(FairReport::new(&fair, &sales))
    }

    /// Partial total of a cart at the active fair's current prices.
    ///
    /// # Errors
    ///
    /// - [`FeriaError::NotFound`]: unknown fair
    /// - [`FeriaError::FairNotActive`]: the fair is closed
    /// - [`FeriaError::Validation`]: the total overflows
    pub async fn quote(&self, id: FairId, pintas: u32, litros: u32) -> Result<Money, FeriaError> {
        let fair = self.get_fair(id).await?;
        if !fair.is_active {
            return Err(FeriaError::FairNotActive(id));
        }
        fair.quote(pintas, litros)
            .ok_or_else(|| ValidationError::AmountOverflow.into())
    }
}

impl std::fmt::Debug for FairLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FairLifecycle").finish_non_exhaustive()
    }
}
