//! Rating route handlers.

use axum::extract::{Path, State};
use axum::{Json, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use unibazaar_core::{AccountId, ListingId, RatingId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::ratings::{CreateRating, RatingService};
use crate::state::AppState;

/// Payload for creating a rating.
#[derive(Debug, Deserialize)]
pub struct CreateRatingBody {
    /// The seller being rated.
    pub seller_id: AccountId,
    pub score: i16,
    #[serde(default)]
    pub comment: String,
    pub listing_id: Option<ListingId>,
}

/// Payload for updating a rating.
#[derive(Debug, Deserialize)]
pub struct UpdateRatingBody {
    pub score: i16,
    #[serde(default)]
    pub comment: String,
}

/// Create a rating for a seller.
#[instrument(skip_all, fields(rater_id = %current.0.id, seller_id = %body.seller_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<CreateRatingBody>,
) -> Result<impl IntoResponse> {
    let rating = RatingService::new(state.pool())
        .create(
            current.0.id,
            CreateRating {
                seller_id: body.seller_id,
                score: body.score,
                comment: body.comment,
                listing_id: body.listing_id,
            },
        )
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({ "rating": rating })),
    ))
}

/// Update one of the caller's ratings.
#[instrument(skip_all, fields(rater_id = %current.0.id, rating_id = %rating_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(rating_id): Path<RatingId>,
    Json(body): Json<UpdateRatingBody>,
) -> Result<impl IntoResponse> {
    let rating = RatingService::new(state.pool())
        .update(current.0.id, rating_id, body.score, &body.comment)
        .await?;

    Ok(Json(json!({ "rating": rating })))
}

/// Delete one of the caller's ratings.
#[instrument(skip_all, fields(rater_id = %current.0.id, rating_id = %rating_id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(rating_id): Path<RatingId>,
) -> Result<impl IntoResponse> {
    RatingService::new(state.pool())
        .delete(current.0.id, rating_id)
        .await?;

    Ok(Json(json!({ "success": true })))
}
