//! Domain types for Feria POS.
//!
//! Identifiers, the cents-based `Money` value object, the two product and
//! payment categories, and the `Fair` and `Sale` records as they live in the
//! store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a fair
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FairId(Uuid);

impl FairId {
    /// Creates a new random `FairId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `FairId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FairId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a sale record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(Uuid);

impl SaleId {
    /// Creates a new random `SaleId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `SaleId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SaleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-generated key for one sale attempt.
///
/// Every record produced by the same attempt carries the same key, and the
/// store refuses to insert a second set of records for a key it has already
/// seen. Retrying a request after a network failure therefore never
/// double-counts a sale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleAttemptId(Uuid);

impl SaleAttemptId {
    /// Creates a new random `SaleAttemptId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `SaleAttemptId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SaleAttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SaleAttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Largest amount accepted anywhere in the system.
    ///
    /// Storage keeps cents in a signed 64-bit column, so prices and sale
    /// totals above this are rejected during validation.
    pub const MAX: Self = Self(i64::MAX.unsigned_abs());

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Adds two money amounts, clamping at the maximum representable value
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

// ============================================================================
// Categories
// ============================================================================

/// Error returned when a stored or submitted category name is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownCategory {
    /// Which category was being parsed
    pub kind: &'static str,
    /// The offending value
    pub value: String,
}

/// The two sellable unit types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Pint
    Pinta,
    /// Litre
    Litro,
}

impl UnitType {
    /// Every unit type, in display order
    pub const ALL: [Self; 2] = [Self::Pinta, Self::Litro];

    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pinta => "pinta",
            Self::Litro => "litro",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pinta" => Ok(Self::Pinta),
            "litro" => Ok(Self::Litro),
            other => Err(UnknownCategory {
                kind: "unit type",
                value: other.to_string(),
            }),
        }
    }
}

/// How the customer paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card, transfer or QR payment
    Digital,
    /// Banknotes
    Cash,
}

impl PaymentMethod {
    /// Every payment method, in display order
    pub const ALL: [Self; 2] = [Self::Digital, Self::Cash];

    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Digital => "digital",
            Self::Cash => "cash",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "digital" => Ok(Self::Digital),
            "cash" => Ok(Self::Cash),
            other => Err(UnknownCategory {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Domain Entities
// ============================================================================

/// Fair lifecycle status, derived from the stored flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FairStatus {
    /// Accepting sales
    Active,
    /// No longer accepting sales; history kept
    Closed,
    /// Sales history purged
    Archived,
}

/// A time-boxed sales occasion with fixed per-unit prices
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fair {
    /// Unique fair identifier
    pub id: FairId,
    /// Display name
    pub name: String,
    /// First day of the fair
    pub start_date: NaiveDate,
    /// Last day of the fair
    pub end_date: NaiveDate,
    /// Price of one pinta
    pub pinta_price: Money,
    /// Price of one litro
    pub litro_price: Money,
    /// Whether this fair currently accepts sales
    pub is_active: bool,
    /// When the fair was created
    pub created_at: DateTime<Utc>,
    /// When the fair stopped accepting sales
    pub closed_at: Option<DateTime<Utc>>,
    /// When the fair's sales were purged
    pub archived_at: Option<DateTime<Utc>>,
}

impl Fair {
    /// Current lifecycle status
    #[must_use]
    pub const fn status(&self) -> FairStatus {
        if self.archived_at.is_some() {
            FairStatus::Archived
        } else if self.is_active {
            FairStatus::Active
        } else {
            FairStatus::Closed
        }
    }

    /// Whether the fair has left the active state
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        !self.is_active
    }

    /// Current price for one unit of the given type
    #[must_use]
    pub const fn unit_price(&self, unit_type: UnitType) -> Money {
        match unit_type {
            UnitType::Pinta => self.pinta_price,
            UnitType::Litro => self.litro_price,
        }
    }

    /// Partial total of a cart at the current prices.
    ///
    /// Returns `None` if the amount exceeds [`Money::MAX`].
    #[must_use]
    pub fn quote(&self, pintas: u32, litros: u32) -> Option<Money> {
        self.pinta_price
            .checked_multiply(pintas)?
            .checked_add(self.litro_price.checked_multiply(litros)?)
            .filter(|total| *total <= Money::MAX)
    }
}

/// One recorded transaction of a quantity of one unit type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Unique sale identifier
    pub id: SaleId,
    /// Owning fair
    pub fair_id: FairId,
    /// Attempt that produced this record
    pub attempt_id: SaleAttemptId,
    /// When the store accepted the sale
    pub sold_at: DateTime<Utc>,
    /// What was sold
    pub unit_type: UnitType,
    /// How many units
    pub quantity: u32,
    /// Amount charged, snapshotted at sale time
    pub total_amount: Money,
    /// How the customer paid
    pub payment_method: PaymentMethod,
    /// Who recorded the sale
    pub seller_name: String,
}

/// A sale line ready to be written; the store assigns id and timestamp
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    /// What was sold
    pub unit_type: UnitType,
    /// How many units
    pub quantity: u32,
    /// Amount charged
    pub total_amount: Money,
    /// How the customer paid
    pub payment_method: PaymentMethod,
    /// Who recorded the sale
    pub seller_name: String,
}

impl NewSale {
    /// Materialize the line into a stored `Sale`
    #[must_use]
    pub fn into_sale(
        self,
        id: SaleId,
        fair_id: FairId,
        attempt_id: SaleAttemptId,
        sold_at: DateTime<Utc>,
    ) -> Sale {
        Sale {
            id,
            fair_id,
            attempt_id,
            sold_at,
            unit_type: self.unit_type,
            quantity: self.quantity,
            total_amount: self.total_amount,
            payment_method: self.payment_method,
            seller_name: self.seller_name,
        }
    }
}
