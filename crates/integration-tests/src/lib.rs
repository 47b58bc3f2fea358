//! Integration tests for Unibazaar.
//!
//! # Running Tests
//!
//! The tests drive a running API server over HTTP, so they are `#[ignore]`d
//! by default. To run them:
//!
//! ```bash
//! # Start PostgreSQL and run migrations
//! cargo run -p unibazaar-cli -- migrate
//!
//! # Start the API
//! cargo run -p unibazaar-api
//!
//! # Run the ignored tests
//! cargo test -p unibazaar-integration-tests -- --ignored
//! ```
//!
//! `API_BASE_URL` overrides the default `http://localhost:8080`.
//!
//! # Test Categories
//!
//! - `auth_flow` - Registration, login, refresh, logout
//! - `rating_aggregate` - Aggregate consistency, including under concurrency
//! - `listing_lifecycle` - Listing create/update/delete and wishlist toggling
