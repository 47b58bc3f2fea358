//! Listing route handlers (owner-side mutations and AI price reports).
//!
//! Create and update accept `multipart/form-data`: text fields for the
//! listing attributes plus `images` / `new_images` file parts. Field
//! binding happens here; ordering and validation live in the listing
//! service.

use axum::extract::{Multipart, Path, State};
use axum::{Json, response::IntoResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use unibazaar_core::{Category, ListingId};

use crate::db::reports::NewReport;
use crate::db::{ListingRepository, ReportRepository};
use crate::error::{ApiError, Result};
use crate::middleware::RequireAuth;
use crate::services::listings::{CreateListing, ListingService, UpdateListing};
use crate::services::pricing::{EstimateRequest, PriceSuggestion};
use crate::services::storage::UploadedImage;
use crate::state::AppState;

/// Create a listing.
#[instrument(skip_all, fields(account_id = %current.0.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut title = None;
    let mut description = String::new();
    let mut price = Decimal::ZERO;
    let mut category = None;
    let mut price_suggestion = None;
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "title" => title = Some(read_text(field).await?),
            "description" => description = read_text(field).await?,
            "price" => price = parse_price(&read_text(field).await?)?,
            "category" => category = Some(parse_category(&read_text(field).await?)?),
            "price_suggestion" => {
                let raw = read_text(field).await?;
                let suggestion: PriceSuggestion = serde_json::from_str(&raw).map_err(|_| {
                    ApiError::InvalidInput("invalid price suggestion format".to_owned())
                })?;
                price_suggestion = Some(suggestion_to_report(suggestion));
            }
            "images" | "images[]" => images.push(read_image(field).await?),
            _ => {}
        }
    }

    let title = title.ok_or_else(|| ApiError::InvalidInput("title is required".to_owned()))?;
    let category =
        category.ok_or_else(|| ApiError::InvalidInput("category is required".to_owned()))?;

    let listing = ListingService::new(state.pool(), state.storage())
        .create(
            current.0.id,
            CreateListing {
                title,
                description,
                price,
                category,
                price_suggestion,
                images,
            },
        )
        .await?;

    tracing::info!(listing_id = %listing.id, "listing created");

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({ "listing": listing })),
    ))
}

/// Update a listing's fields and/or image set.
#[instrument(skip_all, fields(account_id = %current.0.id, listing_id = %listing_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(listing_id): Path<ListingId>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut input = UpdateListing::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "title" => input.title = Some(read_text(field).await?),
            "description" => input.description = Some(read_text(field).await?),
            "price" => input.price = Some(parse_price(&read_text(field).await?)?),
            "category" => input.category = Some(parse_category(&read_text(field).await?)?),
            "is_closed" => {
                let raw = read_text(field).await?;
                let value = raw.parse::<bool>().map_err(|_| {
                    ApiError::InvalidInput("is_closed must be true or false".to_owned())
                })?;
                input.is_closed = Some(value);
            }
            // A present-but-empty field marks "keep nothing".
            "kept_images" | "kept_images[]" => {
                let value = read_text(field).await?;
                let kept = input.kept_images.get_or_insert_with(Vec::new);
                if !value.is_empty() {
                    kept.push(value);
                }
            }
            "new_images" | "new_images[]" => input.new_images.push(read_image(field).await?),
            _ => {}
        }
    }

    let listing = ListingService::new(state.pool(), state.storage())
        .update(current.0.id, listing_id, input)
        .await?;

    Ok(Json(json!({ "listing": listing })))
}

/// Delete a listing and (best-effort) its image blobs.
#[instrument(skip_all, fields(account_id = %current.0.id, listing_id = %listing_id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(listing_id): Path<ListingId>,
) -> Result<impl IntoResponse> {
    ListingService::new(state.pool(), state.storage())
        .delete(current.0.id, listing_id)
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// Request payload for an AI price report.
///
/// Absent fields fall back to the listing's own data.
#[derive(Debug, Default, Deserialize)]
pub struct CreateReport {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

/// Request an AI price estimate for an owned listing and persist it.
#[instrument(skip_all, fields(account_id = %current.0.id, listing_id = %listing_id))]
pub async fn create_report(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(listing_id): Path<ListingId>,
    body: Option<Json<CreateReport>>,
) -> Result<impl IntoResponse> {
    let listing = ListingRepository::new(state.pool())
        .get_owned(listing_id, current.0.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("listing not found".to_owned()))?;

    let body = body.map(|Json(b)| b).unwrap_or_default();

    let title = body.title.unwrap_or_else(|| listing.title.clone());
    if title.trim().is_empty() {
        return Err(ApiError::InvalidInput("title cannot be empty".to_owned()));
    }

    let description = body.description.unwrap_or_else(|| listing.description.clone());
    let image_urls = body.image_urls.unwrap_or_else(|| listing.image_urls.clone());
    if image_urls.is_empty() {
        return Err(ApiError::InvalidInput(
            "listing must have at least 1 image".to_owned(),
        ));
    }

    let suggestion = state
        .pricing()
        .suggest(&EstimateRequest {
            title: &title,
            description: &description,
            image_urls: &image_urls,
        })
        .await?;

    let report = ReportRepository::new(state.pool())
        .create(listing.id, &suggestion_to_report(suggestion))
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({ "report": report })),
    ))
}

/// Read a text field.
async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::InvalidInput(e.to_string()))
}

/// Read a file field into an [`UploadedImage`].
async fn read_image(field: axum::extract::multipart::Field<'_>) -> Result<UploadedImage> {
    let filename = field.file_name().unwrap_or("upload").to_owned();
    let content_type = field.content_type().unwrap_or_default().to_owned();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?
        .to_vec();

    Ok(UploadedImage {
        filename,
        content_type,
        bytes,
    })
}

fn parse_price(raw: &str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .map_err(|_| ApiError::InvalidInput("invalid price".to_owned()))
}

fn parse_category(raw: &str) -> Result<Category> {
    raw.parse::<Category>()
        .map_err(|e| ApiError::InvalidInput(e.to_string()))
}

fn suggestion_to_report(suggestion: PriceSuggestion) -> NewReport {
    NewReport {
        price_min: suggestion.price_min,
        price_max: suggestion.price_max,
        currency: suggestion.currency,
        confidence: suggestion.confidence,
        reasoning: suggestion.reasoning,
    }
}
