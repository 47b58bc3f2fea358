//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness probe
//! GET  /health/ready               - Readiness probe (checks database)
//!
//! # Auth
//! POST /auth/register              - Create an account
//! POST /auth/login                 - Login; sets renewal cookie, returns access token
//! POST /auth/refresh               - Exchange renewal cookie for a fresh access token
//! POST /auth/logout                - Clear the renewal cookie
//!
//! # Public browse (token optional)
//! GET  /listings                   - All listings with wishlist context
//! GET  /listings/{id}              - Listing detail (owner also sees the AI report)
//! GET  /sellers/{id}               - Seller profile with listings
//! GET  /sellers/{id}/ratings       - Seller ratings plus stored aggregate
//! GET  /sellers/{id}/ratings/check - Has the viewer rated this seller?
//!
//! # Listings (requires auth)
//! POST   /listings                 - Create (multipart, up to 5 images)
//! PATCH  /listings/{id}            - Update fields and/or image set (multipart)
//! DELETE /listings/{id}            - Delete listing and blobs
//! POST   /listings/{id}/wishlist   - Toggle wishlist membership
//! POST   /listings/{id}/report     - Request and persist an AI price estimate
//!
//! # Account (requires auth)
//! GET    /account                  - Current account with listings
//! PATCH  /account                  - Partial profile update
//! DELETE /account                  - Delete account, listings, and blobs
//! POST   /account/avatar           - Upload a new avatar
//! GET    /account/listings         - Own listings
//! GET    /account/ratings          - Ratings given
//! GET    /account/wishlist         - Wishlisted listings
//!
//! # Ratings (requires auth)
//! POST   /ratings                  - Create a rating
//! PATCH  /ratings/{id}             - Update own rating
//! DELETE /ratings/{id}             - Delete own rating
//! ```

pub mod account;
pub mod auth;
pub mod listings;
pub mod public;
pub mod ratings;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
}

/// Create the listing routes router (public reads plus owner mutations).
pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::list_listings).post(listings::create))
        .route(
            "/{id}",
            get(public::show_listing)
                .patch(listings::update)
                .delete(listings::delete),
        )
        .route("/{id}/wishlist", post(wishlist::toggle))
        .route("/{id}/report", post(listings::create_report))
}

/// Create the seller routes router.
pub fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(public::show_seller))
        .route("/{id}/ratings", get(public::seller_ratings))
        .route("/{id}/ratings/check", get(public::check_rating))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(account::show)
                .patch(account::update)
                .delete(account::delete),
        )
        .route("/avatar", post(account::upload_avatar))
        .route("/listings", get(account::listings))
        .route("/ratings", get(account::ratings_given))
        .route("/wishlist", get(account::wishlist))
}

/// Create the rating routes router.
pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(ratings::create))
        .route(
            "/{id}",
            axum::routing::patch(ratings::update).delete(ratings::delete),
        )
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/listings", listing_routes())
        .nest("/sellers", seller_routes())
        .nest("/account", account_routes())
        .nest("/ratings", rating_routes())
}
