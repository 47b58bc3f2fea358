//! Account route handlers (the authenticated user's own resources).

use axum::{Json, extract::Multipart, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::accounts::{AccountRepository, ProfileChanges};
use crate::db::ListingRepository;
use crate::error::{ApiError, Result};
use crate::middleware::RequireAuth;
use crate::services::listings::ListingService;
use crate::services::ratings::RatingService;
use crate::services::storage::UploadedImage;
use crate::services::wishlist::WishlistService;
use crate::state::AppState;

/// Partial profile update payload.
#[derive(Debug, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub campus: Option<String>,
    pub phone: Option<String>,
    pub telegram: Option<String>,
    pub bio: Option<String>,
}

/// Get the current account with its listings.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let listings = ListingRepository::new(state.pool())
        .list_by_seller(current.0.id)
        .await?;

    Ok(Json(json!({
        "account": current.0,
        "listings": listings,
    })))
}

/// Apply a partial profile update.
///
/// Never touches the rating aggregate - that pair belongs to the rating
/// service.
#[instrument(skip(state, current, body), fields(account_id = %current.0.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<UpdateProfile>,
) -> Result<impl IntoResponse> {
    let name = match body.name {
        Some(name) => {
            let name = name.trim().to_owned();
            if name.is_empty() {
                return Err(ApiError::InvalidInput("name cannot be empty".to_owned()));
            }
            Some(name)
        }
        None => None,
    };

    let changes = ProfileChanges {
        name,
        campus: body.campus,
        phone: body.phone,
        telegram: body.telegram,
        bio: body.bio,
    };

    let account = AccountRepository::new(state.pool())
        .update_profile(current.0.id, &changes)
        .await?;

    Ok(Json(json!({ "account": account })))
}

/// Delete the current account, its listings, and their blobs.
#[instrument(skip(state, current), fields(account_id = %current.0.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    ListingService::new(state.pool(), state.storage())
        .delete_account(&current.0)
        .await?;

    tracing::info!(account_id = %current.0.id, "account deleted");

    Ok(Json(json!({ "success": true })))
}

/// Upload a new avatar.
///
/// The new blob is stored and persisted first; the previous avatar blob
/// is deleted only afterwards, best-effort.
#[instrument(skip_all, fields(account_id = %current.0.id))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?
    {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or("avatar").to_owned();
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidInput(e.to_string()))?
                .to_vec();
            image = Some(UploadedImage {
                filename,
                content_type,
                bytes,
            });
        }
    }

    let image = image.ok_or_else(|| {
        ApiError::InvalidInput("no file received, upload an image with the key 'image'".to_owned())
    })?;

    if !image.content_type.starts_with("image/") {
        return Err(ApiError::InvalidInput(format!(
            "uploaded file is not an image: {}",
            image.filename
        )));
    }

    let storage = state.storage();
    let key = storage.object_key("avatars", current.0.id, &image.filename);
    storage.put(&key, image.bytes, &image.content_type).await?;
    let avatar_url = storage.public_url(&key);

    AccountRepository::new(state.pool())
        .set_avatar_url(current.0.id, &avatar_url)
        .await?;

    // The reference now points at the new blob; the old one is an orphan
    // at worst.
    if let Some(old) = &current.0.avatar_url {
        if let Err(e) = storage.delete_by_url(old).await {
            tracing::warn!(url = %old, error = %e, "failed to delete old avatar");
        }
    }

    Ok(Json(json!({ "avatar_url": avatar_url })))
}

/// List the current account's listings.
pub async fn listings(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let listings = ListingRepository::new(state.pool())
        .list_by_seller(current.0.id)
        .await?;

    Ok(Json(json!({ "listings": listings })))
}

/// List the ratings the current account has given.
pub async fn ratings_given(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let ratings = RatingService::new(state.pool())
        .list_given(current.0.id)
        .await?;

    Ok(Json(json!({ "ratings": ratings })))
}

/// List the current account's wishlisted listings.
pub async fn wishlist(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let listings = WishlistService::new(state.pool())
        .listings(current.0.id)
        .await?;

    Ok(Json(json!({ "listings": listings })))
}
