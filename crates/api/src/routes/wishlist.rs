//! Wishlist route handlers.

use axum::extract::{Path, State};
use axum::{Json, response::IntoResponse};
use serde_json::json;
use tracing::instrument;

use unibazaar_core::ListingId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::wishlist::WishlistService;
use crate::state::AppState;

/// Toggle a listing in the caller's wishlist.
#[instrument(skip_all, fields(account_id = %current.0.id, listing_id = %listing_id))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(listing_id): Path<ListingId>,
) -> Result<impl IntoResponse> {
    let action = WishlistService::new(state.pool())
        .toggle(current.0.id, listing_id)
        .await?;

    Ok(Json(json!({ "success": true, "action": action })))
}
