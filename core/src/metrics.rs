//! Business metrics for Feria POS.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `feria_fairs_activated_total` - Fairs activated
//! - `feria_fairs_closed_total` - Fairs closed explicitly
//! - `feria_fairs_archived_total` - Fairs finalized and purged
//! - `feria_sales_recorded_total{payment}` - Sale attempts recorded, by payment method
//! - `feria_units_sold_total{unit}` - Units sold, by unit type
//! - `feria_revenue_cents_total{payment}` - Revenue in cents, by payment method
//! - `feria_sales_purged_total` - Sale records deleted by purges
//! - `feria_store_errors_total{kind}` - Store failures, by kind
//! - `feria_http_requests_total{method,status}` - HTTP requests served
//!
//! ## Histograms
//! - `feria_sale_lines` - Records written per sale attempt
//! - `feria_http_request_duration_seconds` - HTTP request latency

use crate::types::{PaymentMethod, Sale};
use metrics::{describe_counter, describe_histogram};

/// Register all metric descriptions.
///
/// Call once at startup, after the exporter is installed.
pub fn register_business_metrics() {
    describe_counter!("feria_fairs_activated_total", "Total number of fairs activated");
    describe_counter!("feria_fairs_closed_total", "Total number of fairs closed");
    describe_counter!(
        "feria_fairs_archived_total",
        "Total number of fairs finalized with their sales purged"
    );
    describe_counter!(
        "feria_sales_recorded_total",
        "Total number of sale attempts recorded, by payment method"
    );
    describe_counter!("feria_units_sold_total", "Total units sold, by unit type");
    describe_counter!(
        "feria_revenue_cents_total",
        "Total revenue in cents, by payment method"
    );
    describe_counter!(
        "feria_sales_purged_total",
        "Total sale records deleted when finalizing fairs"
    );
    describe_histogram!("feria_sale_lines", "Sale records written per sale attempt");
    describe_counter!(
        "feria_store_errors_total",
        "Total store operations that failed, by kind"
    );
    describe_counter!("feria_http_requests_total", "Total HTTP requests served");
    describe_histogram!(
        "feria_http_request_duration_seconds",
        metrics::Unit::Seconds,
        "HTTP request latency"
    );

    tracing::info!("Business metrics registered");
}

/// Record a fair activation
pub fn record_fair_activated() {
    metrics::counter!("feria_fairs_activated_total").increment(1);
}

/// Record a fair closing
pub fn record_fair_closed() {
    metrics::counter!("feria_fairs_closed_total").increment(1);
}

/// Record a finalize-and-purge, with how many sale records it removed
pub fn record_fair_archived(sales_deleted: u64) {
    metrics::counter!("feria_fairs_archived_total").increment(1);
    metrics::counter!("feria_sales_purged_total").increment(sales_deleted);
    tracing::debug!(sales_deleted, "Recorded fair_archived metric");
}

/// Record the records written for one sale attempt.
pub fn record_sale(payment_method: PaymentMethod, sales: &[Sale]) {
    let payment = payment_method.as_str();
    metrics::counter!("feria_sales_recorded_total", "payment" => payment).increment(1);
    #[allow(clippy::cast_precision_loss)]
    metrics::histogram!("feria_sale_lines").record(sales.len() as f64);

    for sale in sales {
        metrics::counter!("feria_units_sold_total", "unit" => sale.unit_type.as_str())
            .increment(u64::from(sale.quantity));
        metrics::counter!("feria_revenue_cents_total", "payment" => payment)
            .increment(sale.total_amount.cents());
    }
}
