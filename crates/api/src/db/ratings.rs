//! Rating repository for database operations.
//!
//! Every mutation of the rating set happens inside a transaction owned by
//! the rating service, which holds a row lock on the seller's account for
//! the duration (see `services::ratings`). The repository exposes the
//! transaction-scoped pieces plus plain reads.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use unibazaar_core::{AccountId, ListingId, RatingId};

use super::RepositoryError;
use crate::models::{Rating, RatingAggregate, RatingWithRater, RaterSummary};

/// Raw rating row as stored in `marketplace.rating`.
#[derive(Debug, FromRow)]
struct RatingRow {
    id: i64,
    seller_id: i64,
    rater_id: i64,
    listing_id: Option<i64>,
    score: i16,
    comment: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Self {
            id: RatingId::new(row.id),
            seller_id: AccountId::new(row.seller_id),
            rater_id: AccountId::new(row.rater_id),
            listing_id: row.listing_id.map(ListingId::new),
            score: row.score,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Rating row joined with the rater's public info.
#[derive(Debug, FromRow)]
struct RatingWithRaterRow {
    #[sqlx(flatten)]
    rating: RatingRow,
    rater_name: String,
    rater_avatar_url: Option<String>,
}

impl From<RatingWithRaterRow> for RatingWithRater {
    fn from(row: RatingWithRaterRow) -> Self {
        let rater = RaterSummary {
            id: AccountId::new(row.rating.rater_id),
            name: row.rater_name,
            avatar_url: row.rater_avatar_url,
        };
        Self {
            rating: row.rating.into(),
            rater,
        }
    }
}

const RATING_COLUMNS: &str =
    "id, seller_id, rater_id, listing_id, score, comment, created_at, updated_at";

/// Fields for a new rating.
#[derive(Debug, Clone)]
pub struct NewRating {
    pub seller_id: AccountId,
    pub rater_id: AccountId,
    pub listing_id: Option<ListingId>,
    pub score: i16,
    pub comment: String,
}

/// Repository for rating database operations.
pub struct RatingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RatingRepository<'a> {
    /// Create a new rating repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a rating by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: RatingId) -> Result<Option<Rating>, RepositoryError> {
        let row = sqlx::query_as::<_, RatingRow>(&format!(
            "SELECT {RATING_COLUMNS} FROM marketplace.rating WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Rating::from))
    }

    /// Find the rating a rater gave a seller within one uniqueness scope:
    /// either for a specific listing, or the listing-independent scope.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_scoped(
        &self,
        seller: AccountId,
        rater: AccountId,
        listing: Option<ListingId>,
    ) -> Result<Option<Rating>, RepositoryError> {
        let row = match listing {
            Some(listing_id) => {
                sqlx::query_as::<_, RatingRow>(&format!(
                    "SELECT {RATING_COLUMNS} FROM marketplace.rating
                     WHERE seller_id = $1 AND rater_id = $2 AND listing_id = $3"
                ))
                .bind(seller.as_i64())
                .bind(rater.as_i64())
                .bind(listing_id.as_i64())
                .fetch_optional(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RatingRow>(&format!(
                    "SELECT {RATING_COLUMNS} FROM marketplace.rating
                     WHERE seller_id = $1 AND rater_id = $2 AND listing_id IS NULL"
                ))
                .bind(seller.as_i64())
                .bind(rater.as_i64())
                .fetch_optional(self.pool)
                .await?
            }
        };

        Ok(row.map(Rating::from))
    }

    /// List a seller's ratings with rater info, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_seller(
        &self,
        seller: AccountId,
    ) -> Result<Vec<RatingWithRater>, RepositoryError> {
        let rows = sqlx::query_as::<_, RatingWithRaterRow>(
            "SELECT r.id, r.seller_id, r.rater_id, r.listing_id, r.score, r.comment,
                    r.created_at, r.updated_at,
                    a.name AS rater_name, a.avatar_url AS rater_avatar_url
             FROM marketplace.rating r
             JOIN marketplace.account a ON a.id = r.rater_id
             WHERE r.seller_id = $1
             ORDER BY r.created_at DESC",
        )
        .bind(seller.as_i64())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(RatingWithRater::from).collect())
    }

    /// List the ratings an account has given, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_rater(&self, rater: AccountId) -> Result<Vec<Rating>, RepositoryError> {
        let rows = sqlx::query_as::<_, RatingRow>(&format!(
            "SELECT {RATING_COLUMNS} FROM marketplace.rating
             WHERE rater_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(rater.as_i64())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Rating::from).collect())
    }

    /// Insert a rating row inside a caller-owned transaction.
    ///
    /// The partial unique indexes backstop the service's duplicate
    /// pre-check; a violation surfaces as `Conflict`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate rating.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(
        conn: &mut PgConnection,
        new: &NewRating,
    ) -> Result<Rating, RepositoryError> {
        let row = sqlx::query_as::<_, RatingRow>(&format!(
            "INSERT INTO marketplace.rating (seller_id, rater_id, listing_id, score, comment)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {RATING_COLUMNS}"
        ))
        .bind(new.seller_id.as_i64())
        .bind(new.rater_id.as_i64())
        .bind(new.listing_id.map(|l| l.as_i64()))
        .bind(new.score)
        .bind(&new.comment)
        .fetch_one(conn)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "rating already exists"))?;

        Ok(row.into())
    }

    /// Update a rating's score and comment inside a caller-owned transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the rating doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        conn: &mut PgConnection,
        id: RatingId,
        score: i16,
        comment: &str,
    ) -> Result<Rating, RepositoryError> {
        let row = sqlx::query_as::<_, RatingRow>(&format!(
            "UPDATE marketplace.rating
             SET score = $2, comment = $3, updated_at = now()
             WHERE id = $1
             RETURNING {RATING_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(score)
        .bind(comment)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a rating inside a caller-owned transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the rating doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(conn: &mut PgConnection, id: RatingId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM marketplace.rating WHERE id = $1")
            .bind(id.as_i64())
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Compute the exact aggregate over a seller's current rating rows.
    ///
    /// `(0.0, 0)` for a seller with no ratings, never NULL or NaN.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn aggregate_for_seller(
        conn: &mut PgConnection,
        seller: AccountId,
    ) -> Result<RatingAggregate, RepositoryError> {
        let (average_rating, rating_count) = sqlx::query_as::<_, (f64, i64)>(
            "SELECT COALESCE(AVG(score), 0)::DOUBLE PRECISION, COUNT(*)
             FROM marketplace.rating
             WHERE seller_id = $1",
        )
        .bind(seller.as_i64())
        .fetch_one(conn)
        .await?;

        Ok(RatingAggregate {
            average_rating,
            rating_count,
        })
    }

    /// Distinct sellers the given account has rated, in ascending ID order
    /// so callers can lock them without deadlocking each other.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sellers_rated_by(
        conn: &mut PgConnection,
        rater: AccountId,
    ) -> Result<Vec<AccountId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT seller_id FROM marketplace.rating
             WHERE rater_id = $1
             ORDER BY seller_id",
        )
        .bind(rater.as_i64())
        .fetch_all(conn)
        .await?;

        Ok(ids.into_iter().map(AccountId::new).collect())
    }
}
