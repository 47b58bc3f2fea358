//! Wishlist service.
//!
//! The join row's presence is the entire state, so toggling is a single
//! insert or delete - no transaction, no derived state to maintain
//! (contrast with ratings).

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use unibazaar_core::{AccountId, ListingId};

use crate::db::{ListingRepository, RepositoryError, WishlistRepository};
use crate::models::Listing;

/// Errors that can occur during wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// The listing does not exist.
    #[error("listing not found")]
    ListingNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Outcome of a wishlist toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WishlistAction {
    Added,
    Removed,
}

/// Wishlist service.
pub struct WishlistService<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistService<'a> {
    /// Create a new wishlist service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Toggle a listing in the account's wishlist.
    ///
    /// Toggling twice returns to the original state.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::ListingNotFound` if the listing doesn't
    /// exist and `WishlistError::Repository` for database failures.
    pub async fn toggle(
        &self,
        account: AccountId,
        listing_id: ListingId,
    ) -> Result<WishlistAction, WishlistError> {
        if ListingRepository::new(self.pool)
            .get_by_id(listing_id)
            .await?
            .is_none()
        {
            return Err(WishlistError::ListingNotFound);
        }

        let wishlist = WishlistRepository::new(self.pool);

        if wishlist.delete(account, listing_id).await? {
            return Ok(WishlistAction::Removed);
        }

        match wishlist.insert(account, listing_id).await {
            Ok(()) => Ok(WishlistAction::Added),
            // A concurrent toggle inserted first; the entry exists, which
            // is what "added" reports.
            Err(RepositoryError::Conflict(_)) => Ok(WishlistAction::Added),
            Err(other) => Err(other.into()),
        }
    }

    /// List the listings the account has wishlisted, most recently saved
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Repository` for database failures.
    pub async fn listings(&self, account: AccountId) -> Result<Vec<Listing>, WishlistError> {
        Ok(WishlistRepository::new(self.pool).listings_for(account).await?)
    }
}
