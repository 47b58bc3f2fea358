//! Listing domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use unibazaar_core::{AccountId, Category, ListingId};

/// Maximum number of images a listing may carry.
pub const MAX_IMAGES: usize = 5;

/// A marketplace listing (domain type).
///
/// Every entry of `image_urls` referenced an existing blob when it was
/// written; the blob store may additionally hold orphans, which is
/// tolerated.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    /// Unique listing ID.
    pub id: ListingId,
    /// Account that owns the listing.
    pub seller_id: AccountId,
    /// Listing title (non-empty).
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Asking price, non-negative.
    pub price: Decimal,
    /// Listing category.
    pub category: Category,
    /// Whether the seller has closed the listing. Orthogonal to the
    /// create/update/delete lifecycle.
    pub is_closed: bool,
    /// Public image URLs, at most [`MAX_IMAGES`], in display order.
    pub image_urls: Vec<String>,
    /// When the listing was created.
    pub created_at: DateTime<Utc>,
    /// When the listing was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A listing decorated with viewer-specific context.
#[derive(Debug, Clone, Serialize)]
pub struct ListingWithContext {
    #[serde(flatten)]
    pub listing: Listing,
    /// Whether the viewing account has wishlisted this listing. Always
    /// `false` for anonymous viewers.
    pub is_wishlisted: bool,
}
