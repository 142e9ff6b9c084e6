//! `PostgreSQL` storage for Feria POS.
//!
//! [`PostgresFeriaStore`] implements the `FairStore` and `SaleStore` traits
//! from `feria-core`. Every compound operation runs in one transaction:
//!
//! - Activation takes `LOCK TABLE fairs IN SHARE ROW EXCLUSIVE MODE`, so
//!   concurrent activators queue up instead of racing. The partial unique
//!   index `idx_fairs_single_active` rejects a second active row if anything
//!   bypasses the lock.
//! - Sale insertion locks the fair row `FOR SHARE`, so a concurrent close
//!   waits for the insert to finish (or the insert sees the fair closed).
//! - Archiving deletes the sales and flags the fair in the same transaction.
//!
//! # Example
//!
//! ```ignore
//! use feria_postgres::PostgresFeriaStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresFeriaStore::new("postgres://localhost/feria").await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use feria_core::commands::FairDraft;
use feria_core::error::StoreError;
use feria_core::store::{
    ArchiveOutcome, CloseOutcome, FairStore, InsertOutcome, SaleStore, StoreFuture,
};
use feria_core::types::{
    Fair, FairId, Money, NewSale, PaymentMethod, Sale, SaleAttemptId, SaleId, UnitType,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::str::FromStr;

const FAIR_COLUMNS: &str = "id, name, start_date, end_date, pinta_price_cents, \
     litro_price_cents, is_active, created_at, closed_at, archived_at";

const SALE_COLUMNS: &str = "id, fair_id, attempt_id, sold_at, unit_type, quantity, \
     total_amount_cents, payment_method, seller_name";

/// `PostgreSQL`-backed fair and sale store.
#[derive(Clone, Debug)]
pub struct PostgresFeriaStore {
    pool: PgPool,
}

impl PostgresFeriaStore {
    /// Connect to the database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the connection fails.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect: {e}")))?;
        Ok(Self { pool })
    }

    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin transaction", e))
    }

    async fn activate(&self, draft: FairDraft, at: DateTime<Utc>) -> Result<Fair, StoreError> {
        let mut tx = self.begin().await?;

        sqlx::query("LOCK TABLE fairs IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock fairs", e))?;

        let superseded = sqlx::query(
            "UPDATE fairs SET is_active = FALSE, closed_at = COALESCE(closed_at, $1) \
             WHERE is_active",
        )
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("deactivate previous fair", e))?
        .rows_affected();

        let row = sqlx::query(&format!(
            "INSERT INTO fairs (id, name, start_date, end_date, pinta_price_cents, \
             litro_price_cents, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7) RETURNING {FAIR_COLUMNS}"
        ))
        .bind(*FairId::new().as_uuid())
        .bind(&draft.name)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(cents_to_db(draft.pinta_price)?)
        .bind(cents_to_db(draft.litro_price)?)
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert fair", e))?;
        let fair = fair_from_row(&row)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit activation", e))?;

        tracing::debug!(fair_id = %fair.id, superseded, "Fair row inserted as active");
        Ok(fair)
    }

    async fn update(&self, id: FairId, draft: FairDraft) -> Result<Fair, StoreError> {
        let mut tx = self.begin().await?;
        let current = lock_fair(&mut tx, id, "FOR UPDATE").await?;
        if !current.is_active {
            return Err(StoreError::Closed(id));
        }

        let row = sqlx::query(&format!(
            "UPDATE fairs SET name = $2, start_date = $3, end_date = $4, \
             pinta_price_cents = $5, litro_price_cents = $6 \
             WHERE id = $1 RETURNING {FAIR_COLUMNS}"
        ))
        .bind(*id.as_uuid())
        .bind(&draft.name)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(cents_to_db(draft.pinta_price)?)
        .bind(cents_to_db(draft.litro_price)?)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update fair", e))?;
        let fair = fair_from_row(&row)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit update", e))?;
        Ok(fair)
    }

    async fn fetch_fair(&self, id: FairId) -> Result<Option<Fair>, StoreError> {
        sqlx::query(&format!("SELECT {FAIR_COLUMNS} FROM fairs WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get fair", e))?
            .as_ref()
            .map(fair_from_row)
            .transpose()
    }

    async fn fetch_fairs(&self, filter: &str, context: &str) -> Result<Vec<Fair>, StoreError> {
        sqlx::query(&format!(
            "SELECT {FAIR_COLUMNS} FROM fairs {filter} ORDER BY start_date DESC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(context, e))?
        .iter()
        .map(fair_from_row)
        .collect()
    }

    async fn close(&self, id: FairId, at: DateTime<Utc>) -> Result<CloseOutcome, StoreError> {
        let mut tx = self.begin().await?;
        let current = lock_fair(&mut tx, id, "FOR UPDATE").await?;
        if !current.is_active {
            return Ok(CloseOutcome::AlreadyClosed(current));
        }

        let row = sqlx::query(&format!(
            "UPDATE fairs SET is_active = FALSE, closed_at = $2 \
             WHERE id = $1 RETURNING {FAIR_COLUMNS}"
        ))
        .bind(*id.as_uuid())
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("close fair", e))?;
        let fair = fair_from_row(&row)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit close", e))?;
        Ok(CloseOutcome::Closed(fair))
    }

    async fn archive(&self, id: FairId, at: DateTime<Utc>) -> Result<ArchiveOutcome, StoreError> {
        let mut tx = self.begin().await?;
        lock_fair(&mut tx, id, "FOR UPDATE").await?;

        let sales_deleted = sqlx::query("DELETE FROM sales WHERE fair_id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("purge sales", e))?
            .rows_affected();

        let row = sqlx::query(&format!(
            "UPDATE fairs SET is_active = FALSE, closed_at = COALESCE(closed_at, $2), \
             archived_at = COALESCE(archived_at, $2) \
             WHERE id = $1 RETURNING {FAIR_COLUMNS}"
        ))
        .bind(*id.as_uuid())
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("archive fair", e))?;
        let fair = fair_from_row(&row)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit archive", e))?;

        tracing::debug!(fair_id = %id, sales_deleted, "Fair archived");
        Ok(ArchiveOutcome {
            fair,
            sales_deleted,
        })
    }

    async fn insert(
        &self,
        fair_id: FairId,
        attempt_id: SaleAttemptId,
        lines: Vec<NewSale>,
    ) -> Result<InsertOutcome, StoreError> {
        let mut tx = self.begin().await?;

        let existing: Vec<Sale> = sqlx::query(&attempt_query())
            .bind(*attempt_id.as_uuid())
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("look up sale attempt", e))?
            .iter()
            .map(sale_from_row)
            .collect::<Result<_, _>>()?;

        if !existing.is_empty() {
            if existing.iter().any(|s| s.fair_id != fair_id) {
                return Err(StoreError::Conflict(format!(
                    "sale attempt {attempt_id} belongs to another fair"
                )));
            }
            tracing::debug!(%attempt_id, "Sale attempt already recorded");
            return Ok(InsertOutcome::replayed(existing));
        }

        let fair = lock_fair(&mut tx, fair_id, "FOR SHARE").await?;
        if !fair.is_active {
            return Err(StoreError::NotActive(fair_id));
        }

        let mut inserted = Vec::with_capacity(lines.len());
        for line in lines {
            let row = sqlx::query(&format!(
                "INSERT INTO sales (id, fair_id, attempt_id, unit_type, quantity, \
                 total_amount_cents, payment_method, seller_name) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {SALE_COLUMNS}"
            ))
            .bind(*SaleId::new().as_uuid())
            .bind(*fair_id.as_uuid())
            .bind(*attempt_id.as_uuid())
            .bind(line.unit_type.as_str())
            .bind(
                i32::try_from(line.quantity)
                    .map_err(|_| StoreError::Corrupt(format!("quantity {} too large", line.quantity)))?,
            )
            .bind(cents_to_db(line.total_amount)?)
            .bind(line.payment_method.as_str())
            .bind(&line.seller_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert sale", e))?;
            inserted.push(sale_from_row(&row)?);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit sale", e))?;
        Ok(InsertOutcome::inserted(inserted))
    }

    async fn fetch_attempt(&self, attempt_id: SaleAttemptId) -> Result<Vec<Sale>, StoreError> {
        sqlx::query(&attempt_query())
            .bind(*attempt_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("look up sale attempt", e))?
            .iter()
            .map(sale_from_row)
            .collect()
    }

    async fn fetch_sales(&self, fair_id: FairId) -> Result<Vec<Sale>, StoreError> {
        sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE fair_id = $1 ORDER BY sold_at DESC, id"
        ))
        .bind(*fair_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list sales", e))?
        .iter()
        .map(sale_from_row)
        .collect()
    }

    async fn delete_sales(&self, fair_id: FairId) -> Result<u64, StoreError> {
        Ok(sqlx::query("DELETE FROM sales WHERE fair_id = $1")
            .bind(*fair_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete sales", e))?
            .rows_affected())
    }
}

impl FairStore for PostgresFeriaStore {
    fn activate_fair(&self, draft: FairDraft, at: DateTime<Utc>) -> StoreFuture<'_, Fair> {
        Box::pin(self.activate(draft, at))
    }

    fn update_fair(&self, id: FairId, draft: FairDraft) -> StoreFuture<'_, Fair> {
        Box::pin(self.update(id, draft))
    }

    fn get_fair(&self, id: FairId) -> StoreFuture<'_, Option<Fair>> {
        Box::pin(self.fetch_fair(id))
    }

    fn active_fairs(&self) -> StoreFuture<'_, Vec<Fair>> {
        Box::pin(self.fetch_fairs("WHERE is_active", "list active fairs"))
    }

    fn list_fairs(&self) -> StoreFuture<'_, Vec<Fair>> {
        Box::pin(self.fetch_fairs("", "list fairs"))
    }

    fn close_fair(&self, id: FairId, at: DateTime<Utc>) -> StoreFuture<'_, CloseOutcome> {
        Box::pin(self.close(id, at))
    }

    fn archive_fair(&self, id: FairId, at: DateTime<Utc>) -> StoreFuture<'_, ArchiveOutcome> {
        Box::pin(self.archive(id, at))
    }
}

impl SaleStore for PostgresFeriaStore {
    fn insert_sales(
        &self,
        fair_id: FairId,
        attempt_id: SaleAttemptId,
        lines: Vec<NewSale>,
    ) -> StoreFuture<'_, InsertOutcome> {
        Box::pin(self.insert(fair_id, attempt_id, lines))
    }

    fn sales_for_attempt(&self, attempt_id: SaleAttemptId) -> StoreFuture<'_, Vec<Sale>> {
        Box::pin(self.fetch_attempt(attempt_id))
    }

    fn sales_for_fair(&self, fair_id: FairId) -> StoreFuture<'_, Vec<Sale>> {
        Box::pin(self.fetch_sales(fair_id))
    }

    fn delete_sales_for_fair(&self, fair_id: FairId) -> StoreFuture<'_, u64> {
        Box::pin(self.delete_sales(fair_id))
    }
}

fn attempt_query() -> String {
    format!("SELECT {SALE_COLUMNS} FROM sales WHERE attempt_id = $1 ORDER BY unit_type")
}

/// Select one fair row with a row lock, or `NotFound`.
async fn lock_fair(
    tx: &mut Transaction<'static, Postgres>,
    id: FairId,
    lock: &str,
) -> Result<Fair, StoreError> {
    let row = sqlx::query(&format!("SELECT {FAIR_COLUMNS} FROM fairs WHERE id = $1 {lock}"))
        .bind(*id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock fair", e))?
        .ok_or(StoreError::NotFound(id))?;
    fair_from_row(&row)
}

fn fair_from_row(row: &PgRow) -> Result<Fair, StoreError> {
    Ok(Fair {
        id: FairId::from_uuid(column(row, "id")?),
        name: column(row, "name")?,
        start_date: column(row, "start_date")?,
        end_date: column(row, "end_date")?,
        pinta_price: cents_from_db(column(row, "pinta_price_cents")?)?,
        litro_price: cents_from_db(column(row, "litro_price_cents")?)?,
        is_active: column(row, "is_active")?,
        created_at: column(row, "created_at")?,
        closed_at: column(row, "closed_at")?,
        archived_at: column(row, "archived_at")?,
    })
}

fn sale_from_row(row: &PgRow) -> Result<Sale, StoreError> {
    let quantity: i32 = column(row, "quantity")?;
    Ok(Sale {
        id: SaleId::from_uuid(column(row, "id")?),
        fair_id: FairId::from_uuid(column(row, "fair_id")?),
        attempt_id: SaleAttemptId::from_uuid(column(row, "attempt_id")?),
        sold_at: column(row, "sold_at")?,
        unit_type: decode_category::<UnitType>(&column::<String>(row, "unit_type")?)?,
        quantity: u32::try_from(quantity)
            .map_err(|_| StoreError::Corrupt(format!("negative quantity {quantity}")))?,
        total_amount: cents_from_db(column(row, "total_amount_cents")?)?,
        payment_method: decode_category::<PaymentMethod>(&column::<String>(
            row,
            "payment_method",
        )?)?,
        seller_name: column(row, "seller_name")?,
    })
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("column {name}: {e}")))
}

/// Parse a stored category name; unknown values are corrupt data.
fn decode_category<T>(value: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::Corrupt(e.to_string()))
}

fn cents_to_db(amount: Money) -> Result<i64, StoreError> {
    i64::try_from(amount.cents())
        .map_err(|_| StoreError::Corrupt(format!("amount {} exceeds storage range", amount.cents())))
}

fn cents_from_db(cents: i64) -> Result<Money, StoreError> {
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| StoreError::Corrupt(format!("negative amount {cents}")))
}

fn map_sqlx_error(context: &str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            metrics::counter!("feria_store_errors_total", "kind" => "conflict").increment(1);
            tracing::warn!(context, error = %err, "Store write lost a race");
            StoreError::Conflict(format!("{context}: {err}"))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("{context}: {err}"))
        }
        _ => {
            metrics::counter!("feria_store_errors_total", "kind" => "unavailable").increment(1);
            tracing::error!(context, error = %err, "Store operation failed");
            StoreError::Unavailable(format!("{context}: {err}"))
        }
    }
}
