//! Account repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use unibazaar_core::{AccountId, Email};

use super::RepositoryError;
use crate::models::{Account, RatingAggregate};

/// Raw account row as stored in `marketplace.account`.
#[derive(Debug, FromRow)]
struct AccountRow {
    id: i64,
    email: String,
    name: String,
    campus: String,
    phone: String,
    telegram: String,
    bio: String,
    avatar_url: Option<String>,
    average_rating: f64,
    rating_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self) -> Result<Account, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Account {
            id: AccountId::new(self.id),
            email,
            name: self.name,
            campus: self.campus,
            phone: self.phone,
            telegram: self.telegram,
            bio: self.bio,
            avatar_url: self.avatar_url,
            average_rating: self.average_rating,
            rating_count: self.rating_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, name, campus, phone, telegram, bio, avatar_url, \
     average_rating, rating_count, created_at, updated_at";

/// Partial profile update; `None` fields are left unchanged.
///
/// Deliberately has no way to express the rating aggregate - that pair is
/// owned by the rating service.
#[derive(Debug, Default, Clone)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub campus: Option<String>,
    pub phone: Option<String>,
    pub telegram: Option<String>,
    pub bio: Option<String>,
}

/// Repository for account database operations.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an account by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM marketplace.account WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(AccountRow::into_account).transpose()
    }

    /// Get an account by its email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM marketplace.account WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(AccountRow::into_account).transpose()
    }

    /// Create a new account with email and password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "INSERT INTO marketplace.account (email, password_hash)
             VALUES ($1, $2)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "email already exists"))?;

        row.into_account()
    }

    /// Get an account together with its password hash, by email.
    ///
    /// Returns `None` if no account exists for the email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        #[derive(FromRow)]
        struct HashRow {
            #[sqlx(flatten)]
            account: AccountRow,
            password_hash: String,
        }

        let row = sqlx::query_as::<_, HashRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS}, password_hash
             FROM marketplace.account WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let hash = r.password_hash;
        Ok(Some((r.account.into_account()?, hash)))
    }

    /// Apply a partial profile update and return the updated account.
    ///
    /// The rating aggregate columns are not touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_profile(
        &self,
        id: AccountId,
        changes: &ProfileChanges,
    ) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE marketplace.account
             SET name = COALESCE($2, name),
                 campus = COALESCE($3, campus),
                 phone = COALESCE($4, phone),
                 telegram = COALESCE($5, telegram),
                 bio = COALESCE($6, bio),
                 updated_at = now()
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(changes.name.as_deref())
        .bind(changes.campus.as_deref())
        .bind(changes.phone.as_deref())
        .bind(changes.telegram.as_deref())
        .bind(changes.bio.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.into_account()
    }

    /// Replace the account's avatar URL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_avatar_url(
        &self,
        id: AccountId,
        avatar_url: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.account SET avatar_url = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_i64())
        .bind(avatar_url)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Take a row lock on the account for the duration of the enclosing
    /// transaction. Returns `false` if the account doesn't exist.
    ///
    /// Serializes concurrent writers of the account's derived state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock(conn: &mut PgConnection, id: AccountId) -> Result<bool, RepositoryError> {
        let row = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM marketplace.account WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_i64())
        .fetch_optional(conn)
        .await?;

        Ok(row.is_some())
    }

    /// Persist a rating aggregate onto the account row.
    ///
    /// Must only be called by the rating service, inside the transaction
    /// that mutated the rating set, while holding the account row lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn store_aggregate(
        conn: &mut PgConnection,
        id: AccountId,
        aggregate: RatingAggregate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE marketplace.account
             SET average_rating = $2, rating_count = $3, updated_at = now()
             WHERE id = $1",
        )
        .bind(id.as_i64())
        .bind(aggregate.average_rating)
        .bind(aggregate.rating_count)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete the account row inside a caller-owned transaction.
    ///
    /// Dependent rows (listings, ratings, wishlist entries) go away via
    /// foreign-key cascade; the caller is responsible for blob cleanup and
    /// for recomputing aggregates of sellers this account had rated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(conn: &mut PgConnection, id: AccountId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM marketplace.account WHERE id = $1")
            .bind(id.as_i64())
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
