//! Authentication extractors.
//!
//! Protected routes take [`RequireAuth`], which validates the bearer
//! access token, confirms the subject still exists, and hands the handler
//! a typed [`CurrentAccount`] - the account is resolved exactly once per
//! request and threaded explicitly from there. A deleted account fails
//! the lookup, which is what implicitly invalidates its outstanding
//! tokens.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::db::accounts::AccountRepository;
use crate::error::ApiError;
use crate::models::Account;
use crate::services::tokens::TokenKind;
use crate::state::AppState;

/// The authenticated account for this request.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

/// Extractor that requires a valid access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(account): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", account.0.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentAccount);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let account = authenticate(parts, state).await?;
        Ok(Self(CurrentAccount(account)))
    }
}

/// Extractor that optionally authenticates the request.
///
/// Unlike [`RequireAuth`], this does not reject the request when no valid
/// token is presented; anonymous viewers simply get `None`.
pub struct OptionalAuth(pub Option<CurrentAccount>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let account = authenticate(parts, state).await.ok();
        Ok(Self(account.map(CurrentAccount)))
    }
}

/// Validate the request's access token and resolve its subject.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<Account, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthenticated("missing access token".to_owned()))?
        .to_str()
        .map_err(|_| ApiError::Unauthenticated("invalid access token".to_owned()))?;

    // Accept both "Bearer <token>" and a bare token.
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        return Err(ApiError::Unauthenticated("missing access token".to_owned()));
    }

    let account_id = state.tokens().validate(token, TokenKind::Access)?;

    // A structurally valid token with an unknown subject reads the same
    // as an invalid token - no oracle on whether the account ever existed.
    AccountRepository::new(state.pool())
        .get_by_id(account_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::Unauthenticated("invalid access token".to_owned()))
}
