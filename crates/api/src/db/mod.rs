//! Database operations for the marketplace `PostgreSQL`.
//!
//! # Schema: `marketplace`
//!
//! ## Tables
//!
//! - `account` - Accounts with the derived rating aggregate
//! - `listing` - Listings with their image URL sets
//! - `rating` - Seller ratings (two uniqueness scopes)
//! - `wishlist_entry` - (account, listing) join rows
//! - `ai_price_report` - Persisted AI price estimates
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p unibazaar-cli -- migrate
//! ```
//!
//! Queries use the runtime sqlx API (`query_as`/`query_scalar` with
//! `FromRow` row types); repositories convert rows to domain models and
//! surface invalid stored data as [`RepositoryError::DataCorruption`].

pub mod accounts;
pub mod listings;
pub mod ratings;
pub mod reports;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use accounts::AccountRepository;
pub use listings::ListingRepository;
pub use ratings::RatingRepository;
pub use reports::ReportRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, duplicate rating).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error, turning unique violations into [`Self::Conflict`].
    pub(crate) fn from_sqlx(error: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = error
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict_message.to_owned());
        }
        Self::Database(error)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
