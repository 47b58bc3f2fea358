//! Unified error handling with Sentry integration.
//!
//! Provides a unified `ApiError` type that captures server errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, ApiError>`; every failure maps to an HTTP status and a
//! machine-readable error code in a JSON body:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "listing not found" } }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{
    AuthError, ListingError, PricingError, RatingError, StorageError, TokenError, WishlistError,
};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing/invalid/expired token, or the token's subject no longer
    /// exists.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated, but not the owner of the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate rating, duplicate account.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Validation failure.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Blob store or AI service failure.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Internal server error (including any relational-store failure).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidInput(_) => "invalid_input",
            Self::Upstream(_) => "upstream",
            Self::Internal(_) => "internal",
        }
    }

    /// Client-facing message. Internal details are never exposed.
    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "internal server error".to_owned(),
            Self::Upstream(_) => "external service error".to_owned(),
            Self::Unauthenticated(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::InvalidInput(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Internal(_) | Self::Upstream(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.public_message(),
            }
        }));

        (self.status(), body).into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => Self::NotFound("resource not found".to_owned()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidEmail(e) => Self::InvalidInput(e.to_string()),
            AuthError::WeakPassword(msg) => Self::InvalidInput(msg),
            AuthError::InvalidCredentials => {
                Self::Unauthenticated("invalid email or password".to_owned())
            }
            AuthError::AccountAlreadyExists => Self::Conflict("account already exists".to_owned()),
            AuthError::Repository(e) => e.into(),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_owned()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Signing => Self::Internal("failed to sign token".to_owned()),
            // Expired/Malformed/WrongAlgorithm/WrongKind all read the same
            // to the caller: the credential doesn't authenticate them.
            other => Self::Unauthenticated(other.to_string()),
        }
    }
}

impl From<RatingError> for ApiError {
    fn from(error: RatingError) -> Self {
        match error {
            RatingError::SelfRating
            | RatingError::InvalidScore
            | RatingError::ListingSellerMismatch => Self::InvalidInput(error.to_string()),
            RatingError::SellerNotFound | RatingError::ListingNotFound | RatingError::NotFound => {
                Self::NotFound(error.to_string())
            }
            RatingError::AlreadyRated => Self::Conflict(error.to_string()),
            RatingError::NotOwner => {
                Self::Forbidden("you can only modify your own ratings".to_owned())
            }
            RatingError::Repository(e) => e.into(),
        }
    }
}

impl From<ListingError> for ApiError {
    fn from(error: ListingError) -> Self {
        match error {
            ListingError::EmptyTitle
            | ListingError::NegativePrice
            | ListingError::TooManyImages
            | ListingError::NotAnImage(_)
            | ListingError::ImageNotOwned(_) => Self::InvalidInput(error.to_string()),
            ListingError::NotFound => Self::NotFound(error.to_string()),
            ListingError::Storage(e) => Self::Upstream(e.to_string()),
            ListingError::Repository(e) => e.into(),
        }
    }
}

impl From<WishlistError> for ApiError {
    fn from(error: WishlistError) -> Self {
        match error {
            WishlistError::ListingNotFound => Self::NotFound(error.to_string()),
            WishlistError::Repository(e) => e.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        Self::Upstream(error.to_string())
    }
}

impl From<PricingError> for ApiError {
    fn from(error: PricingError) -> Self {
        Self::Upstream(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Unauthenticated("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::InvalidInput("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Upstream("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = ApiError::Internal("connection refused at 10.0.0.3".into());
        assert_eq!(err.public_message(), "internal server error");

        let err = ApiError::Upstream("blob store 503".into());
        assert_eq!(err.public_message(), "external service error");
    }

    #[test]
    fn test_token_errors_map_to_unauthenticated() {
        for token_error in [
            TokenError::Expired,
            TokenError::Malformed,
            TokenError::WrongAlgorithm,
            TokenError::WrongKind,
        ] {
            let err = ApiError::from(token_error);
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_rating_error_mapping() {
        assert_eq!(
            ApiError::from(RatingError::AlreadyRated).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(RatingError::NotOwner).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(RatingError::SelfRating).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
