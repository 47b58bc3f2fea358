//! Wishlist repository for database operations.
//!
//! The join row has no derived state, so single-statement insert/delete is
//! enough; no explicit transaction is taken.

use sqlx::PgPool;

use unibazaar_core::{AccountId, ListingId};

use super::RepositoryError;
use crate::models::Listing;

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Check whether an entry exists for the pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(
        &self,
        account: AccountId,
        listing: ListingId,
    ) -> Result<bool, RepositoryError> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM marketplace.wishlist_entry
             WHERE account_id = $1 AND listing_id = $2",
        )
        .bind(account.as_i64())
        .bind(listing.as_i64())
        .fetch_optional(self.pool)
        .await?;

        Ok(found.is_some())
    }

    /// Insert an entry for the pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the pair already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(
        &self,
        account: AccountId,
        listing: ListingId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO marketplace.wishlist_entry (account_id, listing_id) VALUES ($1, $2)",
        )
        .bind(account.as_i64())
        .bind(listing.as_i64())
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "already wishlisted"))?;

        Ok(())
    }

    /// Delete the entry for the pair.
    ///
    /// # Returns
    ///
    /// Returns `true` if an entry was deleted, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(
        &self,
        account: AccountId,
        listing: ListingId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM marketplace.wishlist_entry WHERE account_id = $1 AND listing_id = $2",
        )
        .bind(account.as_i64())
        .bind(listing.as_i64())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List the listings an account has wishlisted, most recently saved
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored category is invalid.
    pub async fn listings_for(
        &self,
        account: AccountId,
    ) -> Result<Vec<Listing>, RepositoryError> {
        let rows = sqlx::query_as::<_, super::listings::ListingRow>(
            "SELECT l.id, l.seller_id, l.title, l.description, l.price, l.category,
                    l.is_closed, l.image_urls, l.created_at, l.updated_at
             FROM marketplace.listing l
             JOIN marketplace.wishlist_entry w ON w.listing_id = l.id
             WHERE w.account_id = $1
             ORDER BY w.created_at DESC",
        )
        .bind(account.as_i64())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(super::listings::ListingRow::into_listing)
            .collect()
    }
}
