//! # Feria Testing
//!
//! Testing utilities for Feria POS.
//!
//! This crate provides:
//! - [`InMemoryStore`]: a complete in-memory `FeriaStore`
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Fixtures for drafts and sale requests
//! - proptest strategies for domain types
//!
//! ## Example
//!
//! ```ignore
//! use feria_testing::{InMemoryStore, fixtures, test_lifecycle};
//!
//! #[tokio::test]
//! async fn test_sale_flow() {
//!     let (lifecycle, _store) = test_lifecycle();
//!     let fair = lifecycle.activate(fixtures::fair_draft("Fair1")).await.unwrap();
//!     lifecycle.record_sale(fair.id, fixtures::sale_request(1, 0, PaymentMethod::Cash)).await.unwrap();
//! }
//! ```

use chrono::{DateTime, Utc};
use feria_core::FairLifecycle;
use feria_core::environment::Clock;
use std::sync::Arc;

pub mod store;

pub use store::InMemoryStore;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use feria_testing::mocks::FixedClock;
    /// use feria_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Millisecond resolution.
    #[derive(Debug)]
    pub struct ManualClock {
        millis: AtomicI64,
    }

    impl ManualClock {
        /// Start at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                millis: AtomicI64::new(time.timestamp_millis()),
            }
        }

        /// Move forward by `delta`
        pub fn advance(&self, delta: chrono::Duration) {
            self.millis
                .fetch_add(delta.num_milliseconds(), Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for common test inputs.
pub mod fixtures {
    use chrono::NaiveDate;
    use feria_core::commands::{FairDraft, SaleRequest};
    use feria_core::types::{Money, PaymentMethod, SaleAttemptId};

    /// Calendar date
    ///
    /// # Panics
    ///
    /// Panics on an invalid date.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
    }

    /// A valid draft: 2024-06-01 to 2024-06-10, pinta 500, litro 1000
    #[must_use]
    pub fn fair_draft(name: &str) -> FairDraft {
        FairDraft {
            name: name.to_string(),
            start_date: date(2024, 6, 1),
            end_date: date(2024, 6, 10),
            pinta_price: Money::from_cents(500),
            litro_price: Money::from_cents(1000),
        }
    }

    /// A draft with explicit prices in cents
    #[must_use]
    pub fn fair_draft_priced(name: &str, pinta_cents: u64, litro_cents: u64) -> FairDraft {
        FairDraft {
            pinta_price: Money::from_cents(pinta_cents),
            litro_price: Money::from_cents(litro_cents),
            ..fair_draft(name)
        }
    }

    /// A sale request from seller "Ana" with a fresh attempt id
    #[must_use]
    pub fn sale_request(pintas: u32, litros: u32, payment_method: PaymentMethod) -> SaleRequest {
        SaleRequest {
            pintas,
            litros,
            payment_method,
            seller_name: "Ana".to_string(),
            attempt_id: SaleAttemptId::new(),
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Operations on the fair lifecycle, for sequence tests
    #[derive(Clone, Debug)]
    pub enum LifecycleOp {
        /// Activate a new fair
        Activate,
        /// Close the fair at this index in creation order (modulo count)
        Close(usize),
        /// Archive the fair at this index in creation order (modulo count)
        Archive(usize),
    }

    /// Random lifecycle operation
    pub fn arb_lifecycle_op() -> impl Strategy<Value = LifecycleOp> {
        prop_oneof![
            3 => Just(LifecycleOp::Activate),
            1 => any::<usize>().prop_map(LifecycleOp::Close),
            1 => any::<usize>().prop_map(LifecycleOp::Archive),
        ]
    }
}

/// A lifecycle over a fresh in-memory store, both driven by [`test_clock`].
#[must_use]
pub fn test_lifecycle() -> (FairLifecycle, InMemoryStore) {
    let clock: Arc<dyn Clock> = Arc::new(test_clock());
    let store = InMemoryStore::with_clock(Arc::clone(&clock));
    let lifecycle = FairLifecycle::new(Arc::new(store.clone()), clock);
    (lifecycle, store)
}

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
