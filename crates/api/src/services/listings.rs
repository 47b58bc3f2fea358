//! Listing lifecycle service.
//!
//! Listings span two stores with no shared transaction: the relational
//! row and the image blobs. The orderings here keep one invariant: a
//! committed `image_urls` entry always pointed at a blob that existed
//! when it was written.
//!
//! - Create: insert the row (empty image set) in a transaction, upload
//!   blobs, attach the URLs, commit. An upload failure rolls the insert
//!   back; blobs stored before the failure stay behind as orphans.
//! - Update: upload new blobs first, commit the row pointing at
//!   `kept + new`, and only then delete the unreferenced old blobs.
//!   A failed delete leaves an orphan, never a dangling reference.
//! - Delete: remove the row, then best-effort delete the blobs.
//!
//! Blob deletes are logged and swallowed throughout - once the relational
//! state is consistent the request must not fail over cleanup.

use sqlx::PgPool;
use thiserror::Error;
use tracing::warn;

use unibazaar_core::{AccountId, ListingId};

use crate::db::accounts::AccountRepository;
use crate::db::listings::{ListingChanges, ListingRepository, NewListing};
use crate::db::ratings::RatingRepository;
use crate::db::reports::{NewReport, ReportRepository};
use crate::db::RepositoryError;
use crate::models::listing::MAX_IMAGES;
use crate::models::{Account, Listing};
use crate::services::storage::{StorageClient, StorageError, UploadedImage};

/// Errors that can occur during listing operations.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Title is empty after trimming.
    #[error("title cannot be empty")]
    EmptyTitle,

    /// Price is negative.
    #[error("price cannot be negative")]
    NegativePrice,

    /// More than [`MAX_IMAGES`] images.
    #[error("a listing can carry at most {MAX_IMAGES} images")]
    TooManyImages,

    /// An upload is not an image.
    #[error("uploaded file is not an image: {0}")]
    NotAnImage(String),

    /// A "kept" URL is not part of the listing's current image set.
    #[error("image does not belong to this listing: {0}")]
    ImageNotOwned(String),

    /// The listing does not exist or belongs to someone else.
    #[error("listing not found")]
    NotFound,

    /// Blob store failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Fields for creating a listing.
#[derive(Debug)]
pub struct CreateListing {
    pub title: String,
    pub description: String,
    pub price: rust_decimal::Decimal,
    pub category: unibazaar_core::Category,
    /// Client-supplied price estimate to persist alongside the listing.
    pub price_suggestion: Option<NewReport>,
    pub images: Vec<UploadedImage>,
}

/// Fields for updating a listing; `None` leaves a field unchanged.
///
/// The image set changes only when `kept_images` or `new_images` is
/// present; `kept_images: Some(vec![])` drops every existing image.
#[derive(Debug, Default)]
pub struct UpdateListing {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<rust_decimal::Decimal>,
    pub category: Option<unibazaar_core::Category>,
    pub is_closed: Option<bool>,
    pub kept_images: Option<Vec<String>>,
    pub new_images: Vec<UploadedImage>,
}

/// Listing lifecycle service.
pub struct ListingService<'a> {
    pool: &'a PgPool,
    storage: &'a StorageClient,
}

impl<'a> ListingService<'a> {
    /// Create a new listing service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, storage: &'a StorageClient) -> Self {
        Self { pool, storage }
    }

    /// Create a listing with up to [`MAX_IMAGES`] images.
    ///
    /// No partially-populated listing ever becomes visible: the row is
    /// inserted and updated with its image URLs inside one transaction,
    /// and any upload failure rolls it back.
    ///
    /// # Errors
    ///
    /// Returns the validation variants for bad input,
    /// `ListingError::Storage` when an upload fails, and
    /// `ListingError::Repository` for database failures.
    pub async fn create(
        &self,
        owner: AccountId,
        input: CreateListing,
    ) -> Result<Listing, ListingError> {
        let title = input.title.trim().to_owned();
        if title.is_empty() {
            return Err(ListingError::EmptyTitle);
        }
        if input.price.is_sign_negative() {
            return Err(ListingError::NegativePrice);
        }
        validate_images(&input.images, 0)?;

        let new = NewListing {
            seller_id: owner,
            title,
            description: input.description,
            price: input.price,
            category: input.category,
        };

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let mut listing = ListingRepository::insert(&mut tx, &new).await?;

        if let Some(suggestion) = &input.price_suggestion {
            ReportRepository::insert(&mut tx, listing.id, suggestion).await?;
        }

        if !input.images.is_empty() {
            let urls = match self
                .storage
                .upload_images(&input.images, owner, "listings")
                .await
            {
                Ok(urls) => urls,
                Err(e) => {
                    // Rolling back removes the row; blobs stored before the
                    // failure stay behind as orphans.
                    warn!(listing_id = %listing.id, error = %e,
                        "image upload failed, rolling back listing create");
                    return Err(e.into());
                }
            };

            ListingRepository::set_image_urls(&mut tx, listing.id, &urls).await?;
            listing.image_urls = urls;
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(listing)
    }

    /// Update a listing's fields and/or image set.
    ///
    /// Kept URLs are validated against the current image set before any
    /// upload happens. New blobs are uploaded before the row is updated;
    /// old blobs are deleted only after the transaction commits, so the
    /// row never references a deleted blob.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::NotFound` if the listing doesn't exist or
    /// isn't the caller's, the validation variants for bad input,
    /// `ListingError::Storage` when an upload fails, and
    /// `ListingError::Repository` for database failures.
    pub async fn update(
        &self,
        owner: AccountId,
        listing_id: ListingId,
        input: UpdateListing,
    ) -> Result<Listing, ListingError> {
        let current = ListingRepository::new(self.pool)
            .get_owned(listing_id, owner)
            .await?
            .ok_or(ListingError::NotFound)?;

        let title = match input.title {
            Some(t) => {
                let t = t.trim().to_owned();
                if t.is_empty() {
                    return Err(ListingError::EmptyTitle);
                }
                Some(t)
            }
            None => None,
        };
        if input.price.is_some_and(|p| p.is_sign_negative()) {
            return Err(ListingError::NegativePrice);
        }

        // Touching either image field replaces the whole set with
        // `kept + new`; omitting both leaves it alone.
        let images_touched = input.kept_images.is_some() || !input.new_images.is_empty();
        let kept = input.kept_images.unwrap_or_default();

        let mut to_delete = Vec::new();
        let mut final_urls = None;

        if images_touched {
            validate_images(&input.new_images, kept.len())?;

            for url in &kept {
                if !current.image_urls.contains(url) {
                    return Err(ListingError::ImageNotOwned(url.clone()));
                }
            }

            to_delete = current
                .image_urls
                .iter()
                .filter(|url| !kept.contains(*url))
                .cloned()
                .collect();

            // Upload before touching the row; a failure here leaves the
            // listing exactly as it was.
            let new_urls = self
                .storage
                .upload_images(&input.new_images, owner, "listings")
                .await?;

            let mut urls = kept;
            urls.extend(new_urls);
            final_urls = Some(urls);
        }

        let changes = ListingChanges {
            title,
            description: input.description,
            price: input.price,
            category: input.category,
            is_closed: input.is_closed,
            image_urls: final_urls,
        };

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let listing = ListingRepository::update(&mut tx, listing_id, &changes)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ListingError::NotFound,
                other => ListingError::Repository(other),
            })?;
        tx.commit().await.map_err(RepositoryError::from)?;

        // The references are gone; failures here only leave orphans.
        self.cleanup_blobs(&to_delete).await;

        Ok(listing)
    }

    /// Delete a listing, then best-effort delete its blobs.
    ///
    /// The operation succeeds once the relational delete commits; blob
    /// deletion failures are warnings.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::NotFound` if the listing doesn't exist or
    /// isn't the caller's, and `ListingError::Repository` for database
    /// failures.
    pub async fn delete(&self, owner: AccountId, listing_id: ListingId) -> Result<(), ListingError> {
        let repository = ListingRepository::new(self.pool);

        let listing = repository
            .get_owned(listing_id, owner)
            .await?
            .ok_or(ListingError::NotFound)?;

        if !repository.delete(listing_id, owner).await? {
            return Err(ListingError::NotFound);
        }

        self.cleanup_blobs(&listing.image_urls).await;

        Ok(())
    }

    /// Delete an account with its listings, in one logical operation.
    ///
    /// One transaction deletes the account row (listings, ratings, and
    /// wishlist entries cascade) and re-derives the aggregates of every
    /// seller this account had rated, taking their row locks in ascending
    /// ID order. Blob cleanup (listing images plus avatar) happens after
    /// commit, best-effort.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::Repository` for database failures; the
    /// transaction rolls back as a whole.
    pub async fn delete_account(&self, account: &Account) -> Result<(), ListingError> {
        let listings = ListingRepository::new(self.pool)
            .list_by_seller(account.id)
            .await?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let rated_sellers = RatingRepository::sellers_rated_by(&mut tx, account.id).await?;
        for seller in &rated_sellers {
            AccountRepository::lock(&mut tx, *seller).await?;
        }

        AccountRepository::delete(&mut tx, account.id).await?;

        // The cascade removed this account's ratings; bring the affected
        // sellers' stored aggregates back in line with their rows.
        for seller in &rated_sellers {
            let aggregate = RatingRepository::aggregate_for_seller(&mut tx, *seller).await?;
            AccountRepository::store_aggregate(&mut tx, *seller, aggregate).await?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        for listing in &listings {
            self.cleanup_blobs(&listing.image_urls).await;
        }
        if let Some(avatar_url) = &account.avatar_url {
            self.cleanup_blobs(std::slice::from_ref(avatar_url)).await;
        }

        Ok(())
    }

    /// Best-effort blob deletion; failures are logged, never propagated.
    async fn cleanup_blobs(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.storage.delete_by_url(url).await {
                warn!(url = %url, error = %e, "failed to delete blob");
            }
        }
    }
}

/// Validate a batch of new uploads against the image limit and content
/// type, counting `existing` images already on the listing.
fn validate_images(images: &[UploadedImage], existing: usize) -> Result<(), ListingError> {
    if images.len() + existing > MAX_IMAGES {
        return Err(ListingError::TooManyImages);
    }

    for image in images {
        if !image.content_type.starts_with("image/") {
            return Err(ListingError::NotAnImage(image.filename.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(filename: &str, content_type: &str) -> UploadedImage {
        UploadedImage {
            filename: filename.to_owned(),
            content_type: content_type.to_owned(),
            bytes: vec![0; 4],
        }
    }

    #[test]
    fn test_image_limit() {
        let images: Vec<_> = (0..6).map(|i| image(&format!("{i}.png"), "image/png")).collect();
        assert!(matches!(
            validate_images(&images, 0),
            Err(ListingError::TooManyImages)
        ));
        assert!(validate_images(&images[..5], 0).is_ok());
        // Two kept plus four new exceeds the limit.
        assert!(matches!(
            validate_images(&images[..4], 2),
            Err(ListingError::TooManyImages)
        ));
        assert!(validate_images(&images[..3], 2).is_ok());
    }

    #[test]
    fn test_non_image_rejected() {
        let images = [image("notes.pdf", "application/pdf")];
        assert!(matches!(
            validate_images(&images, 0),
            Err(ListingError::NotAnImage(name)) if name == "notes.pdf"
        ));
    }
}
