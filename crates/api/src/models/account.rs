//! Account domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use unibazaar_core::{AccountId, Email};

/// A marketplace account (domain type).
///
/// `average_rating` and `rating_count` are derived from the account's
/// rating rows and stored for read efficiency. Only the rating service
/// writes them; profile updates leave them untouched.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Account email address (unique).
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Campus the account belongs to.
    pub campus: String,
    /// Contact phone number.
    pub phone: String,
    /// Telegram handle or link.
    pub telegram: String,
    /// Free-form bio.
    pub bio: String,
    /// Public URL of the avatar blob, if one was uploaded.
    pub avatar_url: Option<String>,
    /// Derived: average of all rating scores for this seller.
    pub average_rating: f64,
    /// Derived: number of ratings for this seller.
    pub rating_count: i64,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Public view of an account, safe to show to other users.
#[derive(Debug, Clone, Serialize)]
pub struct AccountProfile {
    pub id: AccountId,
    pub name: String,
    pub campus: String,
    pub phone: String,
    pub telegram: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub average_rating: f64,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            campus: account.campus,
            phone: account.phone,
            telegram: account.telegram,
            bio: account.bio,
            avatar_url: account.avatar_url,
            average_rating: account.average_rating,
            rating_count: account.rating_count,
            created_at: account.created_at,
        }
    }
}
