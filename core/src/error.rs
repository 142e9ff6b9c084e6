//! Error types for Feria POS.
//!
//! Three layers:
//!
//! - [`ValidationError`]: input rejected before any store call.
//! - [`StoreError`]: what a [`FairStore`](crate::store::FairStore) or
//!   [`SaleStore`](crate::store::SaleStore) implementation can report.
//! - [`FeriaError`]: what callers of the lifecycle see. Every `StoreError`
//!   converts into one.

use crate::types::{FairId, Money, UnitType};
use thiserror::Error;

/// Input failed a precondition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Fair name is empty or whitespace
    #[error("fair name must not be empty")]
    EmptyName,

    /// Fair name exceeds the maximum length
    #[error("fair name must be at most {max} characters, got {len}")]
    NameTooLong {
        /// Maximum accepted length in characters
        max: usize,
        /// Submitted length in characters
        len: usize,
    },

    /// End date precedes start date
    #[error("end date {end} is before start date {start}")]
    InvertedDateRange {
        /// Submitted start date
        start: chrono::NaiveDate,
        /// Submitted end date
        end: chrono::NaiveDate,
    },

    /// A unit price is zero
    #[error("{0} price must be greater than zero")]
    NonPositivePrice(UnitType),

    /// A unit price exceeds the largest storable amount
    #[error("{unit} price must be at most {max}")]
    PriceTooLarge {
        /// Which price
        unit: UnitType,
        /// Largest accepted price
        max: Money,
    },

    /// A cart quantity exceeds the largest storable quantity
    #[error("at most {max} {unit} units per sale, got {quantity}")]
    QuantityTooLarge {
        /// Which unit type
        unit: UnitType,
        /// Largest accepted quantity
        max: u32,
        /// Submitted quantity
        quantity: u32,
    },

    /// Sale request carries no units
    #[error("a sale must include at least one unit")]
    EmptySale,

    /// Seller name is empty or whitespace
    #[error("seller name must not be empty")]
    EmptySellerName,

    /// Quantity times price exceeds the largest storable amount
    #[error("sale amount overflows")]
    AmountOverflow,
}

/// Errors reported by a store implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or the operation failed transiently
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The referenced fair does not exist
    #[error("fair not found: {0}")]
    NotFound(FairId),

    /// The fair exists but is not accepting sales
    #[error("fair {0} is not active")]
    NotActive(FairId),

    /// The fair is closed and can no longer be edited
    #[error("fair {0} is closed")]
    Closed(FairId),

    /// A concurrent writer won a race
    #[error("conflicting write: {0}")]
    Conflict(String),

    /// A stored record could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Errors returned by lifecycle and reporting operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeriaError {
    /// Input failed validation; nothing was written
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The referenced fair does not exist
    #[error("fair not found: {0}")]
    NotFound(FairId),

    /// Sale recorded against a fair that is not active
    #[error("fair {0} is not active")]
    FairNotActive(FairId),

    /// Edit attempted on a closed fair
    #[error("fair {0} is closed")]
    FairClosed(FairId),

    /// A concurrent operation won; the caller may retry
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store is temporarily unreachable
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Stored data breaks a domain invariant
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl FeriaError {
    /// Whether retrying the same operation later may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Conflict(_))
    }
}

impl From<StoreError> for FeriaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::NotActive(id) => Self::FairNotActive(id),
            StoreError::Closed(id) => Self::FairClosed(id),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Corrupt(msg) => Self::InvariantViolation(msg),
        }
    }
}
