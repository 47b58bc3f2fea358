//! Public browse route handlers.
//!
//! These routes work for anonymous viewers; a valid access token only
//! adds viewer context (wishlist flags) and owner-only extras (the AI
//! price report on the owner's own listing).

use axum::extract::{Path, Query, State};
use axum::{Json, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use unibazaar_core::{AccountId, ListingId};

use crate::db::{AccountRepository, ListingRepository, ReportRepository, WishlistRepository};
use crate::error::{ApiError, Result};
use crate::middleware::OptionalAuth;
use crate::models::AccountProfile;
use crate::services::ratings::RatingService;
use crate::state::AppState;

/// List all listings, newest first.
pub async fn list_listings(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
) -> Result<impl IntoResponse> {
    let listings = ListingRepository::new(state.pool())
        .list_with_context(viewer.map(|v| v.0.id))
        .await?;

    Ok(Json(json!({ "listings": listings })))
}

/// Get a listing with its seller's public profile.
///
/// The owner additionally sees the latest AI price report.
pub async fn show_listing(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(listing_id): Path<ListingId>,
) -> Result<impl IntoResponse> {
    let listing = ListingRepository::new(state.pool())
        .get_by_id(listing_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("listing not found".to_owned()))?;

    let seller = AccountRepository::new(state.pool())
        .get_by_id(listing.seller_id)
        .await?
        .map(AccountProfile::from)
        .ok_or_else(|| ApiError::NotFound("listing not found".to_owned()))?;

    let viewer_id = viewer.map(|v| v.0.id);

    let is_wishlisted = match viewer_id {
        Some(account_id) => {
            WishlistRepository::new(state.pool())
                .exists(account_id, listing.id)
                .await?
        }
        None => false,
    };

    let report = if viewer_id == Some(listing.seller_id) {
        ReportRepository::new(state.pool())
            .latest_for_listing(listing.id)
            .await?
    } else {
        None
    };

    Ok(Json(json!({
        "listing": listing,
        "seller": seller,
        "is_wishlisted": is_wishlisted,
        "ai_price_report": report,
    })))
}

/// Get a seller's public profile with their listings.
pub async fn show_seller(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(seller_id): Path<AccountId>,
) -> Result<impl IntoResponse> {
    let seller = AccountRepository::new(state.pool())
        .get_by_id(seller_id)
        .await?
        .map(AccountProfile::from)
        .ok_or_else(|| ApiError::NotFound("user not found".to_owned()))?;

    let listings = ListingRepository::new(state.pool())
        .list_by_seller(seller_id)
        .await?;

    // Decorate with the viewer's wishlist membership.
    let mut decorated = Vec::with_capacity(listings.len());
    if let Some(viewer) = viewer {
        let wishlist = WishlistRepository::new(state.pool());
        for listing in listings {
            let is_wishlisted = wishlist.exists(viewer.0.id, listing.id).await?;
            decorated.push(json!({ "listing": listing, "is_wishlisted": is_wishlisted }));
        }
    } else {
        for listing in listings {
            decorated.push(json!({ "listing": listing, "is_wishlisted": false }));
        }
    }

    Ok(Json(json!({
        "seller": seller,
        "listings": decorated,
    })))
}

/// List a seller's ratings together with the stored aggregate.
pub async fn seller_ratings(
    State(state): State<AppState>,
    Path(seller_id): Path<AccountId>,
) -> Result<impl IntoResponse> {
    let seller = AccountRepository::new(state.pool())
        .get_by_id(seller_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_owned()))?;

    let ratings = RatingService::new(state.pool())
        .list_for_seller(seller_id)
        .await?;

    Ok(Json(json!({
        "ratings": ratings,
        "average_rating": seller.average_rating,
        "rating_count": seller.rating_count,
    })))
}

/// Query string for the rating check.
#[derive(Debug, Deserialize)]
pub struct RatingCheckQuery {
    pub listing_id: Option<ListingId>,
}

/// Check whether the viewer has rated a seller in a given scope.
///
/// Anonymous viewers simply haven't rated anyone.
pub async fn check_rating(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(seller_id): Path<AccountId>,
    Query(query): Query<RatingCheckQuery>,
) -> Result<impl IntoResponse> {
    let Some(viewer) = viewer else {
        return Ok(Json(json!({ "has_rated": false, "rating": null })));
    };

    let rating = RatingService::new(state.pool())
        .find_scoped(seller_id, viewer.0.id, query.listing_id)
        .await?;

    Ok(Json(json!({
        "has_rated": rating.is_some(),
        "rating": rating,
    })))
}
