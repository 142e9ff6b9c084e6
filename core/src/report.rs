//! Sales aggregation.
//!
//! [`summarize`] reduces a fair's sales into a [`Report`] in one pass. It is a
//! pure function of its input: order does not matter and nothing is mutated.
//! [`FairReport`] pairs a report with the fair it describes and is the payload
//! handed to exporters, which format it and never recompute sums.

use crate::types::{Fair, FairStatus, Money, PaymentMethod, Sale, UnitType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aggregated totals for a set of sales.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Pintas sold
    pub pintas_sold: u64,
    /// Litros sold
    pub litros_sold: u64,
    /// Revenue paid digitally
    pub total_digital: Money,
    /// Revenue paid in cash
    pub total_cash: Money,
    /// `total_digital + total_cash`
    pub total_revenue: Money,
}

impl Report {
    /// Units sold of the given type
    #[must_use]
    pub const fn units(&self, unit_type: UnitType) -> u64 {
        match unit_type {
            UnitType::Pinta => self.pintas_sold,
            UnitType::Litro => self.litros_sold,
        }
    }

    /// Revenue collected with the given payment method
    #[must_use]
    pub const fn revenue(&self, payment_method: PaymentMethod) -> Money {
        match payment_method {
            PaymentMethod::Digital => self.total_digital,
            PaymentMethod::Cash => self.total_cash,
        }
    }
}

/// Reduce sales into a [`Report`].
///
/// Sums saturate at the maximum representable value instead of wrapping.
#[must_use]
pub fn summarize(sales: &[Sale]) -> Report {
    let mut report = sales.iter().fold(Report::default(), |mut acc, sale| {
        let quantity = u64::from(sale.quantity);
        match sale.unit_type {
            UnitType::Pinta => acc.pintas_sold = acc.pintas_sold.saturating_add(quantity),
            UnitType::Litro => acc.litros_sold = acc.litros_sold.saturating_add(quantity),
        }
        match sale.payment_method {
            PaymentMethod::Digital => {
                acc.total_digital = acc.total_digital.saturating_add(sale.total_amount);
            }
            PaymentMethod::Cash => {
                acc.total_cash = acc.total_cash.saturating_add(sale.total_amount);
            }
        }
        acc
    });
    report.total_revenue = report.total_digital.saturating_add(report.total_cash);
    report
}

/// Export payload: a report together with the fair it describes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairReport {
    /// Fair name
    pub fair_name: String,
    /// First day
    pub start_date: NaiveDate,
    /// Last day
    pub end_date: NaiveDate,
    /// Current pinta price
    pub pinta_price: Money,
    /// Current litro price
    pub litro_price: Money,
    /// Lifecycle status at report time
    pub status: FairStatus,
    /// Number of sale records aggregated
    pub sale_count: usize,
    /// Aggregated totals
    pub report: Report,
}

impl FairReport {
    /// Summarize `sales` for `fair`
    #[must_use]
    pub fn new(fair: &Fair, sales: &[Sale]) -> Self {
        Self {
            fair_name: fair.name.clone(),
            start_date: fair.start_date,
            end_date: fair.end_date,
            pinta_price: fair.pinta_price,
            litro_price: fair.litro_price,
            status: fair.status(),
            sale_count: sales.len(),
            report: summarize(sales),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{FairId, SaleAttemptId, SaleId};
    use chrono::Utc;
    use proptest::prelude::*;

    fn sale(unit_type: UnitType, quantity: u32, cents: u64, payment_method: PaymentMethod) -> Sale {
        Sale {
            id: SaleId::new(),
            fair_id: FairId::new(),
            attempt_id: SaleAttemptId::new(),
            sold_at: Utc::now(),
            unit_type,
            quantity,
            total_amount: Money::from_cents(cents),
            payment_method,
            seller_name: "Ana".to_string(),
        }
    }

    fn arb_sale() -> impl Strategy<Value = Sale> {
        (
            prop_oneof![Just(UnitType::Pinta), Just(UnitType::Litro)],
            1u32..50,
            1u64..100_000,
            prop_oneof![Just(PaymentMethod::Digital), Just(PaymentMethod::Cash)],
        )
            .prop_map(|(unit, qty, cents, pay)| sale(unit, qty, cents, pay))
    }

    #[test]
    fn empty_input_yields_zero_report() {
        assert_eq!(summarize(&[]), Report::default());
    }

    #[test]
    fn mixed_sales_are_bucketed() {
        // 3 pintas cash 1500, 2 litros digital 2000, 1 pinta digital 500
        let sales = vec![
            sale(UnitType::Pinta, 3, 1500, PaymentMethod::Cash),
            sale(UnitType::Litro, 2, 2000, PaymentMethod::Digital),
            sale(UnitType::Pinta, 1, 500, PaymentMethod::Digital),
        ];
        let report = summarize(&sales);
        assert_eq!(report.pintas_sold, 4);
        assert_eq!(report.litros_sold, 2);
        assert_eq!(report.total_digital, Money::from_cents(2500));
        assert_eq!(report.total_cash, Money::from_cents(1500));
        assert_eq!(report.total_revenue, Money::from_cents(4000));
    }

    #[test]
    fn sums_saturate_instead_of_wrapping() {
        let sales = vec![
            sale(UnitType::Pinta, 1, u64::MAX, PaymentMethod::Cash),
            sale(UnitType::Pinta, 1, 10, PaymentMethod::Cash),
            sale(UnitType::Litro, 1, 10, PaymentMethod::Digital),
        ];
        let report = summarize(&sales);
        assert_eq!(report.total_cash.cents(), u64::MAX);
        assert_eq!(report.total_revenue.cents(), u64::MAX);
    }

    #[test]
    fn fair_report_carries_fair_details() {
        let fair = Fair {
            id: FairId::new(),
            name: "Fair1".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            pinta_price: Money::from_cents(500),
            litro_price: Money::from_cents(1000),
            is_active: false,
            created_at: Utc::now(),
            closed_at: Some(Utc::now()),
            archived_at: None,
        };
        let sales = vec![sale(UnitType::Litro, 1, 1000, PaymentMethod::Cash)];
        let export = FairReport::new(&fair, &sales);
        assert_eq!(export.fair_name, "Fair1");
        assert_eq!(export.status, FairStatus::Closed);
        assert_eq!(export.sale_count, 1);
        assert_eq!(export.report.total_cash, Money::from_cents(1000));

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["report"]["total_revenue"], 1000);
        assert_eq!(json["start_date"], "2024-06-01");
        assert_eq!(json["status"], "closed");
    }

    proptest! {
        #[test]
        fn order_does_not_matter(
            (sales, shuffled) in proptest::collection::vec(arb_sale(), 0..40)
                .prop_flat_map(|sales| (Just(sales.clone()), Just(sales).prop_shuffle())),
        ) {
            prop_assert_eq!(summarize(&sales), summarize(&shuffled));
        }

        #[test]
        fn categories_conserve_totals(sales in proptest::collection::vec(arb_sale(), 0..40)) {
            let report = summarize(&sales);
            let units: u64 = sales.iter().map(|s| u64::from(s.quantity)).sum();
            let amount: u64 = sales.iter().map(|s| s.total_amount.cents()).sum();

            let by_unit: u64 = UnitType::ALL.iter().map(|u| report.units(*u)).sum();
            let by_payment: u64 = PaymentMethod::ALL.iter().map(|p| report.revenue(*p).cents()).sum();

            prop_assert_eq!(by_unit, units);
            prop_assert_eq!(by_payment, amount);
            prop_assert_eq!(report.total_revenue.cents(), amount);
        }

        #[test]
        fn summarize_is_idempotent(sales in proptest::collection::vec(arb_sale(), 0..40)) {
            let before = sales.clone();
            let first = summarize(&sales);
            let second = summarize(&sales);
            prop_assert_eq!(first, second);
            prop_assert_eq!(sales, before);
        }
    }
}
