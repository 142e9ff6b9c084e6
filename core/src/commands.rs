//! Validated inputs to the lifecycle.
//!
//! Everything here is pure: validation happens before the store is touched.

use crate::error::ValidationError;
use crate::types::{Fair, Money, NewSale, PaymentMethod, SaleAttemptId, UnitType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum length of a fair name, in characters
pub const MAX_NAME_LEN: usize = 200;

/// Maximum units of one type in a single sale; storage keeps a signed 32-bit quantity
pub const MAX_QUANTITY: u32 = i32::MAX.unsigned_abs();

/// Configuration for a new fair, or the merged result of an update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairDraft {
    /// Display name
    pub name: String,
    /// First day
    pub start_date: NaiveDate,
    /// Last day
    pub end_date: NaiveDate,
    /// Price of one pinta
    pub pinta_price: Money,
    /// Price of one litro
    pub litro_price: Money,
}

impl FairDraft {
    /// Check every field constraint.
    ///
    /// Leading and trailing whitespace in the name is trimmed first.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found: empty or overlong name,
    /// end date before start date, or a price that is zero or above
    /// [`Money::MAX`].
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let len = trimmed.chars().count();
        if len > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong {
                max: MAX_NAME_LEN,
                len,
            });
        }
        if trimmed.len() != self.name.len() {
            self.name = trimmed.to_string();
        }

        if self.end_date < self.start_date {
            return Err(ValidationError::InvertedDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }

        for unit in UnitType::ALL {
            let price = match unit {
                UnitType::Pinta => self.pinta_price,
                UnitType::Litro => self.litro_price,
            };
            if price.is_zero() {
                return Err(ValidationError::NonPositivePrice(unit));
            }
            if price > Money::MAX {
                return Err(ValidationError::PriceTooLarge {
                    unit,
                    max: Money::MAX,
                });
            }
        }

        Ok(self)
    }
}

impl From<&Fair> for FairDraft {
    fn from(fair: &Fair) -> Self {
        Self {
            name: fair.name.clone(),
            start_date: fair.start_date,
            end_date: fair.end_date,
            pinta_price: fair.pinta_price,
            litro_price: fair.litro_price,
        }
    }
}

/// Partial edit of a fair's configuration. `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairUpdate {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New start date
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// New end date
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// New pinta price
    #[serde(default)]
    pub pinta_price: Option<Money>,
    /// New litro price
    #[serde(default)]
    pub litro_price: Option<Money>,
}

impl FairUpdate {
    /// Merge over the current fair and re-validate the result as a whole.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the merged configuration is invalid,
    /// e.g. a new end date that precedes the existing start date.
    pub fn merge_into(self, fair: &Fair) -> Result<FairDraft, ValidationError> {
        FairDraft {
            name: self.name.unwrap_or_else(|| fair.name.clone()),
            start_date: self.start_date.unwrap_or(fair.start_date),
            end_date: self.end_date.unwrap_or(fair.end_date),
            pinta_price: self.pinta_price.unwrap_or(fair.pinta_price),
            litro_price: self.litro_price.unwrap_or(fair.litro_price),
        }
        .validate()
    }
}

/// One sale attempt at the terminal: a cart of pintas and litros paid one way.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    /// Number of pintas in the cart
    #[serde(default)]
    pub pintas: u32,
    /// Number of litros in the cart
    #[serde(default)]
    pub litros: u32,
    /// How the customer paid
    pub payment_method: PaymentMethod,
    /// Who is recording the sale
    pub seller_name: String,
    /// Idempotency key for this attempt
    pub attempt_id: SaleAttemptId,
}

impl SaleRequest {
    /// Quantity of the given unit type in the cart
    #[must_use]
    pub const fn quantity(&self, unit_type: UnitType) -> u32 {
        match unit_type {
            UnitType::Pinta => self.pintas,
            UnitType::Litro => self.litros,
        }
    }

    /// Build the sale lines for this cart at the fair's current prices.
    ///
    /// Produces one line per unit type with a non-zero quantity, each carrying
    /// its own snapshotted `total_amount`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptySale`] if both quantities are zero
    /// - [`ValidationError::EmptySellerName`] if the seller name is blank
    /// - [`ValidationError::QuantityTooLarge`] if a quantity exceeds [`MAX_QUANTITY`]
    /// - [`ValidationError::AmountOverflow`] if a line total exceeds [`Money::MAX`]
    pub fn lines(&self, fair: &Fair) -> Result<Vec<NewSale>, ValidationError> {
        if self.pintas == 0 && self.litros == 0 {
            return Err(ValidationError::EmptySale);
        }
        let seller_name = self.seller_name.trim();
        if seller_name.is_empty() {
            return Err(ValidationError::EmptySellerName);
        }

        let mut lines = Vec::with_capacity(UnitType::ALL.len());
        for unit_type in UnitType::ALL {
            let quantity = self.quantity(unit_type);
            if quantity == 0 {
                continue;
            }
            if quantity > MAX_QUANTITY {
                return Err(ValidationError::QuantityTooLarge {
                    unit: unit_type,
                    max: MAX_QUANTITY,
                    quantity,
                });
            }
            let total_amount = fair
                .unit_price(unit_type)
                .checked_multiply(quantity)
                .filter(|total| *total <= Money::MAX)
                .ok_or(ValidationError::AmountOverflow)?;
            lines.push(NewSale {
                unit_type,
                quantity,
                total_amount,
                payment_method: self.payment_method,
                seller_name: seller_name.to_string(),
            });
        }
        Ok(lines)
    }
}
