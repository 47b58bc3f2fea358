//! Listing repository for database operations.
//!
//! Mutations that must stay atomic with blob-store side effects take a
//! caller-owned transaction connection; the listing service decides the
//! ordering (blob writes before commit, blob deletes after).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};

use unibazaar_core::{AccountId, Category, ListingId};

use super::RepositoryError;
use crate::models::{Listing, ListingWithContext};

/// Raw listing row as stored in `marketplace.listing`.
#[derive(Debug, FromRow)]
pub(crate) struct ListingRow {
    id: i64,
    seller_id: i64,
    title: String,
    description: String,
    price: Decimal,
    category: String,
    is_closed: bool,
    image_urls: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ListingRow {
    pub(crate) fn into_listing(self) -> Result<Listing, RepositoryError> {
        let category: Category = self.category.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid category in database: {e}"))
        })?;

        Ok(Listing {
            id: ListingId::new(self.id),
            seller_id: AccountId::new(self.seller_id),
            title: self.title,
            description: self.description,
            price: self.price,
            category,
            is_closed: self.is_closed,
            image_urls: self.image_urls,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Listing row joined with viewer context.
#[derive(Debug, FromRow)]
struct ListingContextRow {
    #[sqlx(flatten)]
    listing: ListingRow,
    is_wishlisted: bool,
}

const LISTING_COLUMNS: &str = "id, seller_id, title, description, price, category, is_closed, \
     image_urls, created_at, updated_at";

/// Fields for a new listing. The image URL set always starts empty; URLs
/// are attached once the blobs exist.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub seller_id: AccountId,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category: Category,
}

/// Partial listing update; `None` fields are left unchanged.
#[derive(Debug, Default, Clone)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<Category>,
    pub is_closed: Option<bool>,
    pub image_urls: Option<Vec<String>>,
}

/// Repository for listing database operations.
pub struct ListingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ListingRepository<'a> {
    /// Create a new listing repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a listing by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored category is invalid.
    pub async fn get_by_id(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM marketplace.listing WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(ListingRow::into_listing).transpose()
    }

    /// Get a listing by ID, scoped to its owner.
    ///
    /// Returns `None` both when the listing doesn't exist and when it
    /// belongs to someone else; callers treat the two identically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_owned(
        &self,
        id: ListingId,
        owner: AccountId,
    ) -> Result<Option<Listing>, RepositoryError> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM marketplace.listing WHERE id = $1 AND seller_id = $2"
        ))
        .bind(id.as_i64())
        .bind(owner.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(ListingRow::into_listing).transpose()
    }

    /// List all listings, newest first, decorated with wishlist context
    /// for the viewing account (if any).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_context(
        &self,
        viewer: Option<AccountId>,
    ) -> Result<Vec<ListingWithContext>, RepositoryError> {
        let rows = sqlx::query_as::<_, ListingContextRow>(&format!(
            "SELECT {LISTING_COLUMNS},
                    EXISTS (
                        SELECT 1 FROM marketplace.wishlist_entry w
                        WHERE w.account_id = $1 AND w.listing_id = marketplace.listing.id
                    ) AS is_wishlisted
             FROM marketplace.listing
             ORDER BY created_at DESC"
        ))
        .bind(viewer.map(|v| v.as_i64()))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(ListingWithContext {
                    listing: r.listing.into_listing()?,
                    is_wishlisted: r.is_wishlisted,
                })
            })
            .collect()
    }

    /// List all listings of a seller, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_seller(
        &self,
        seller: AccountId,
    ) -> Result<Vec<Listing>, RepositoryError> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM marketplace.listing
             WHERE seller_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(seller.as_i64())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ListingRow::into_listing).collect()
    }

    /// Delete a listing scoped to its owner.
    ///
    /// # Returns
    ///
    /// Returns `true` if the listing was deleted, `false` if it didn't
    /// exist or belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ListingId, owner: AccountId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM marketplace.listing WHERE id = $1 AND seller_id = $2")
                .bind(id.as_i64())
                .bind(owner.as_i64())
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a listing row inside a caller-owned transaction.
    ///
    /// The row starts with an empty image set; [`Self::set_image_urls`]
    /// attaches URLs once the blobs have been written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        conn: &mut PgConnection,
        new: &NewListing,
    ) -> Result<Listing, RepositoryError> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "INSERT INTO marketplace.listing (seller_id, title, description, price, category)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {LISTING_COLUMNS}"
        ))
        .bind(new.seller_id.as_i64())
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.category.as_str())
        .fetch_one(conn)
        .await?;

        row.into_listing()
    }

    /// Replace the listing's image URL set inside a caller-owned transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the listing doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_image_urls(
        conn: &mut PgConnection,
        id: ListingId,
        image_urls: &[String],
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.listing SET image_urls = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_i64())
        .bind(image_urls)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Apply a partial update inside a caller-owned transaction and return
    /// the updated listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the listing doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        conn: &mut PgConnection,
        id: ListingId,
        changes: &ListingChanges,
    ) -> Result<Listing, RepositoryError> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "UPDATE marketplace.listing
             SET title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 price = COALESCE($4, price),
                 category = COALESCE($5, category),
                 is_closed = COALESCE($6, is_closed),
                 image_urls = COALESCE($7, image_urls),
                 updated_at = now()
             WHERE id = $1
             RETURNING {LISTING_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.price)
        .bind(changes.category.map(|c| c.as_str()))
        .bind(changes.is_closed)
        .bind(changes.image_urls.as_deref())
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.into_listing()
    }
}
