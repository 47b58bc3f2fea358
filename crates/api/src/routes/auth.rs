//! Authentication route handlers.
//!
//! Login returns the access token in the JSON body and sets the renewal
//! token as an `HttpOnly` cookie; refresh exchanges that cookie for a
//! fresh access token. Logout only clears the cookie - the renewal token
//! itself stays valid until its natural expiry, since nothing server-side
//! records issued tokens.

use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::accounts::AccountRepository;
use crate::error::{ApiError, Result};
use crate::services::auth::AuthService;
use crate::services::tokens::RENEWAL_TTL_SECS;
use crate::state::AppState;

/// Name of the renewal token cookie.
const REFRESH_COOKIE: &str = "refresh_token";

/// Credentials for register and login.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Register a new account.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<impl IntoResponse> {
    let account = AuthService::new(state.pool())
        .register(&body.email, &body.password)
        .await?;

    tracing::info!(account_id = %account.id, "account registered");

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({ "account": account })),
    ))
}

/// Login with email and password.
///
/// Issues the credential pair: the access token goes to the client in the
/// body, the renewal token into the cookie.
#[instrument(skip(state, jar, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Credentials>,
) -> Result<impl IntoResponse> {
    let account = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    let pair = state.tokens().issue(account.id)?;

    let jar = jar.add(refresh_cookie(pair.renewal));

    Ok((
        jar,
        Json(json!({
            "access_token": pair.access,
            "account": account,
        })),
    ))
}

/// Exchange the renewal token cookie for a fresh access token.
///
/// Re-validates the renewal token and re-checks that the account still
/// exists; no new renewal token is issued.
#[instrument(skip(state, jar))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(Cookie::value)
        .ok_or_else(|| ApiError::Unauthenticated("no renewal token".to_owned()))?;

    let (account_id, access) = state.tokens().rotate(token)?;

    if AccountRepository::new(state.pool())
        .get_by_id(account_id)
        .await?
        .is_none()
    {
        return Err(ApiError::Unauthenticated("invalid renewal token".to_owned()));
    }

    Ok(Json(json!({ "access_token": access })))
}

/// Logout: clear the renewal token cookie.
///
/// Purely client-side revocation; the token remains cryptographically
/// valid until expiry.
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build((REFRESH_COOKIE, "")).path("/"));
    (jar, Json(json!({ "success": true })))
}

/// Build the renewal token cookie.
fn refresh_cookie(token: String) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(RENEWAL_TTL_SECS))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = refresh_cookie("tok".to_owned());

        assert_eq!(cookie.name(), REFRESH_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::seconds(RENEWAL_TTL_SECS))
        );
    }
}
