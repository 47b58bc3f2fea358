//! Rating aggregation service.
//!
//! Every rating mutation runs as one transaction that also recomputes the
//! seller's stored `(average_rating, rating_count)` pair, so the derived
//! state on the account row always equals the exact aggregate of the
//! surviving rating rows.
//!
//! The recompute is a read-then-write, which loses updates if two raters
//! of the same seller interleave. To prevent that, each transaction first
//! takes a `FOR UPDATE` row lock on the seller's account; concurrent
//! raters of one seller serialize on that lock, while raters of different
//! sellers proceed in parallel.

use sqlx::PgPool;
use thiserror::Error;

use unibazaar_core::{AccountId, ListingId, RatingId};

use crate::db::accounts::AccountRepository;
use crate::db::ratings::{NewRating, RatingRepository};
use crate::db::{ListingRepository, RepositoryError};
use crate::models::{Rating, RatingWithRater};

/// Errors that can occur during rating operations.
#[derive(Debug, Error)]
pub enum RatingError {
    /// A rater attempted to rate themselves.
    #[error("cannot rate yourself")]
    SelfRating,

    /// Score outside the 1-5 range.
    #[error("score must be between 1 and 5")]
    InvalidScore,

    /// The rated seller does not exist.
    #[error("seller not found")]
    SellerNotFound,

    /// The referenced listing does not exist.
    #[error("listing not found")]
    ListingNotFound,

    /// The referenced listing belongs to a different seller.
    #[error("listing does not belong to this seller")]
    ListingSellerMismatch,

    /// A rating already exists in this uniqueness scope.
    #[error("already rated")]
    AlreadyRated,

    /// The rating does not exist.
    #[error("rating not found")]
    NotFound,

    /// The caller is not the rating's author.
    #[error("not the rating owner")]
    NotOwner,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Fields for creating a rating, as submitted by the rater.
#[derive(Debug, Clone)]
pub struct CreateRating {
    pub seller_id: AccountId,
    pub score: i16,
    pub comment: String,
    pub listing_id: Option<ListingId>,
}

/// Rating aggregation service.
pub struct RatingService<'a> {
    pool: &'a PgPool,
}

impl<'a> RatingService<'a> {
    /// Create a new rating service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a rating and recompute the seller's aggregate atomically.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::SelfRating` / `InvalidScore` /
    /// `SellerNotFound` / `ListingNotFound` / `ListingSellerMismatch` for
    /// failed preconditions, `RatingError::AlreadyRated` for a duplicate
    /// in the same uniqueness scope, and `RatingError::Repository` for
    /// database failures (which roll the whole operation back).
    pub async fn create(
        &self,
        rater: AccountId,
        request: CreateRating,
    ) -> Result<Rating, RatingError> {
        validate_score(request.score)?;

        if request.seller_id == rater {
            return Err(RatingError::SelfRating);
        }

        let accounts = AccountRepository::new(self.pool);
        if accounts.get_by_id(request.seller_id).await?.is_none() {
            return Err(RatingError::SellerNotFound);
        }

        if let Some(listing_id) = request.listing_id {
            let listing = ListingRepository::new(self.pool)
                .get_by_id(listing_id)
                .await?
                .ok_or(RatingError::ListingNotFound)?;

            if listing.seller_id != request.seller_id {
                return Err(RatingError::ListingSellerMismatch);
            }
        }

        let ratings = RatingRepository::new(self.pool);
        if ratings
            .find_scoped(request.seller_id, rater, request.listing_id)
            .await?
            .is_some()
        {
            return Err(RatingError::AlreadyRated);
        }

        let new = NewRating {
            seller_id: request.seller_id,
            rater_id: rater,
            listing_id: request.listing_id,
            score: request.score,
            comment: request.comment,
        };

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        if !AccountRepository::lock(&mut tx, request.seller_id).await? {
            return Err(RatingError::SellerNotFound);
        }

        let rating = RatingRepository::insert(&mut tx, &new)
            .await
            .map_err(|e| match e {
                // The unique index backstops the pre-check under races.
                RepositoryError::Conflict(_) => RatingError::AlreadyRated,
                other => RatingError::Repository(other),
            })?;

        Self::recompute_aggregate(&mut tx, request.seller_id).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(rating)
    }

    /// Update a rating's score and comment, recomputing the aggregate.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::NotFound` if the rating doesn't exist,
    /// `RatingError::NotOwner` if the caller didn't write it,
    /// `RatingError::InvalidScore` for a score outside 1-5, and
    /// `RatingError::Repository` for database failures.
    pub async fn update(
        &self,
        rater: AccountId,
        rating_id: RatingId,
        score: i16,
        comment: &str,
    ) -> Result<Rating, RatingError> {
        validate_score(score)?;

        let existing = RatingRepository::new(self.pool)
            .get_by_id(rating_id)
            .await?
            .ok_or(RatingError::NotFound)?;

        if existing.rater_id != rater {
            return Err(RatingError::NotOwner);
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        if !AccountRepository::lock(&mut tx, existing.seller_id).await? {
            return Err(RatingError::SellerNotFound);
        }

        let rating = RatingRepository::update(&mut tx, rating_id, score, comment)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => RatingError::NotFound,
                other => RatingError::Repository(other),
            })?;

        Self::recompute_aggregate(&mut tx, existing.seller_id).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(rating)
    }

    /// Delete a rating, recomputing the aggregate.
    ///
    /// Deleting the seller's last rating resets the stored aggregate to
    /// `(0, 0)` explicitly.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::NotFound` if the rating doesn't exist,
    /// `RatingError::NotOwner` if the caller didn't write it, and
    /// `RatingError::Repository` for database failures.
    pub async fn delete(&self, rater: AccountId, rating_id: RatingId) -> Result<(), RatingError> {
        let existing = RatingRepository::new(self.pool)
            .get_by_id(rating_id)
            .await?
            .ok_or(RatingError::NotFound)?;

        if existing.rater_id != rater {
            return Err(RatingError::NotOwner);
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        if !AccountRepository::lock(&mut tx, existing.seller_id).await? {
            return Err(RatingError::SellerNotFound);
        }

        RatingRepository::delete(&mut tx, rating_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => RatingError::NotFound,
                other => RatingError::Repository(other),
            })?;

        Self::recompute_aggregate(&mut tx, existing.seller_id).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(())
    }

    /// List a seller's ratings with rater info.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::SellerNotFound` if the seller doesn't exist
    /// and `RatingError::Repository` for database failures.
    pub async fn list_for_seller(
        &self,
        seller: AccountId,
    ) -> Result<Vec<RatingWithRater>, RatingError> {
        if AccountRepository::new(self.pool)
            .get_by_id(seller)
            .await?
            .is_none()
        {
            return Err(RatingError::SellerNotFound);
        }

        Ok(RatingRepository::new(self.pool)
            .list_for_seller(seller)
            .await?)
    }

    /// List the ratings the caller has given.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::Repository` for database failures.
    pub async fn list_given(&self, rater: AccountId) -> Result<Vec<Rating>, RatingError> {
        Ok(RatingRepository::new(self.pool).list_by_rater(rater).await?)
    }

    /// Find the caller's rating of a seller within one uniqueness scope.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::Repository` for database failures.
    pub async fn find_scoped(
        &self,
        seller: AccountId,
        rater: AccountId,
        listing: Option<ListingId>,
    ) -> Result<Option<Rating>, RatingError> {
        Ok(RatingRepository::new(self.pool)
            .find_scoped(seller, rater, listing)
            .await?)
    }

    /// Recompute the seller's aggregate from the current rating rows and
    /// persist it onto the account row. Must run inside the transaction
    /// that mutated the rating set, while holding the seller's row lock.
    async fn recompute_aggregate(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        seller: AccountId,
    ) -> Result<(), RepositoryError> {
        let aggregate = RatingRepository::aggregate_for_seller(tx, seller).await?;
        AccountRepository::store_aggregate(tx, seller, aggregate).await
    }
}

fn validate_score(score: i16) -> Result<(), RatingError> {
    if (1..=5).contains(&score) {
        Ok(())
    } else {
        Err(RatingError::InvalidScore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bounds() {
        assert!(validate_score(1).is_ok());
        assert!(validate_score(5).is_ok());
        assert!(matches!(validate_score(0), Err(RatingError::InvalidScore)));
        assert!(matches!(validate_score(6), Err(RatingError::InvalidScore)));
        assert!(matches!(validate_score(-3), Err(RatingError::InvalidScore)));
    }
}
