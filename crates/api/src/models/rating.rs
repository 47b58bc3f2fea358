//! Rating domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use unibazaar_core::{AccountId, ListingId, RatingId};

/// A seller rating (domain type).
///
/// At most one rating exists per (seller, rater, listing) tuple, and at
/// most one per (seller, rater) with no listing. The two scopes are
/// independent of each other.
#[derive(Debug, Clone, Serialize)]
pub struct Rating {
    /// Unique rating ID.
    pub id: RatingId,
    /// Seller being rated.
    pub seller_id: AccountId,
    /// Account that wrote the rating.
    pub rater_id: AccountId,
    /// Listing this rating concerns, if any.
    pub listing_id: Option<ListingId>,
    /// Score, 1 to 5.
    pub score: i16,
    /// Free-form comment.
    pub comment: String,
    /// When the rating was created.
    pub created_at: DateTime<Utc>,
    /// When the rating was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Minimal public info about the account that wrote a rating.
#[derive(Debug, Clone, Serialize)]
pub struct RaterSummary {
    pub id: AccountId,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// A rating joined with its rater's public info, as shown on profiles.
#[derive(Debug, Clone, Serialize)]
pub struct RatingWithRater {
    #[serde(flatten)]
    pub rating: Rating,
    pub rater: RaterSummary,
}

/// The derived rating aggregate stored on an account row.
///
/// Always equals `(AVG(score), COUNT(*))` over the seller's rating rows;
/// `(0.0, 0)` when the seller has no ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingAggregate {
    pub average_rating: f64,
    pub rating_count: i64,
}
