//! Domain models for the marketplace.
//!
//! These types represent validated domain objects separate from database
//! row types; repositories convert rows into them and reject corrupt data.

pub mod account;
pub mod listing;
pub mod rating;
pub mod report;

pub use account::{Account, AccountProfile};
pub use listing::{Listing, ListingWithContext};
pub use rating::{Rating, RatingAggregate, RatingWithRater, RaterSummary};
pub use report::AiPriceReport;
