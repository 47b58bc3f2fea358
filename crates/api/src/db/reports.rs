//! AI price report repository for database operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};

use unibazaar_core::{ListingId, ReportId};

use super::RepositoryError;
use crate::models::AiPriceReport;

/// Raw report row as stored in `marketplace.ai_price_report`.
#[derive(Debug, FromRow)]
struct ReportRow {
    id: i64,
    listing_id: i64,
    price_min: Decimal,
    price_max: Decimal,
    currency: String,
    confidence: String,
    reasoning: String,
    created_at: DateTime<Utc>,
}

impl From<ReportRow> for AiPriceReport {
    fn from(row: ReportRow) -> Self {
        Self {
            id: ReportId::new(row.id),
            listing_id: ListingId::new(row.listing_id),
            price_min: row.price_min,
            price_max: row.price_max,
            currency: row.currency,
            confidence: row.confidence,
            reasoning: row.reasoning,
            created_at: row.created_at,
        }
    }
}

const REPORT_COLUMNS: &str =
    "id, listing_id, price_min, price_max, currency, confidence, reasoning, created_at";

/// Fields for a new report, exactly as the estimation service returned
/// them.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub price_min: Decimal,
    pub price_max: Decimal,
    pub currency: String,
    pub confidence: String,
    pub reasoning: String,
}

/// Repository for AI price report database operations.
pub struct ReportRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportRepository<'a> {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the most recent report for a listing, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_for_listing(
        &self,
        listing: ListingId,
    ) -> Result<Option<AiPriceReport>, RepositoryError> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT {REPORT_COLUMNS} FROM marketplace.ai_price_report
             WHERE listing_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(listing.as_i64())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(AiPriceReport::from))
    }

    /// Insert a report row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        listing: ListingId,
        new: &NewReport,
    ) -> Result<AiPriceReport, RepositoryError> {
        let row = Self::insert_row(self.pool, listing, new).await?;
        Ok(row.into())
    }

    /// Insert a report row inside a caller-owned transaction (used when a
    /// client-supplied estimate accompanies a listing create).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        conn: &mut PgConnection,
        listing: ListingId,
        new: &NewReport,
    ) -> Result<AiPriceReport, RepositoryError> {
        let row = Self::insert_row(conn, listing, new).await?;
        Ok(row.into())
    }

    async fn insert_row<'e, E>(
        executor: E,
        listing: ListingId,
        new: &NewReport,
    ) -> Result<ReportRow, RepositoryError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            "INSERT INTO marketplace.ai_price_report
                 (listing_id, price_min, price_max, currency, confidence, reasoning)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(listing.as_i64())
        .bind(new.price_min)
        .bind(new.price_max)
        .bind(&new.currency)
        .bind(&new.confidence)
        .bind(&new.reasoning)
        .fetch_one(executor)
        .await?;

        Ok(row)
    }
}
