//! Business services for the marketplace.
//!
//! Services own the orderings and transaction boundaries; repositories
//! own the SQL; routes only bind requests and map errors.

pub mod auth;
pub mod listings;
pub mod pricing;
pub mod ratings;
pub mod storage;
pub mod tokens;
pub mod wishlist;

pub use auth::{AuthError, AuthService};
pub use listings::{ListingError, ListingService};
pub use pricing::{PricingClient, PricingError};
pub use ratings::{RatingError, RatingService};
pub use storage::{StorageClient, StorageError};
pub use tokens::{TokenError, TokenService};
pub use wishlist::{WishlistAction, WishlistError, WishlistService};
