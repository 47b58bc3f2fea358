//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::services::pricing::PricingClient;
use crate::services::storage::StorageClient;
use crate::services::tokens::TokenService;
use crate::services::{PricingError, StorageError};

/// Error creating application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("storage client: {0}")]
    Storage(#[from] StorageError),
    #[error("pricing client: {0}")]
    Pricing(#[from] PricingError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool, the blob store client, and
/// the token service.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenService,
    storage: StorageClient,
    pricing: PricingClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the storage or pricing client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let tokens = TokenService::new(&config.jwt_secret);
        let storage = StorageClient::new(&config.storage)?;
        let pricing = PricingClient::new(&config.pricing)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                storage,
                pricing,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the blob store client.
    #[must_use]
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    /// Get a reference to the price estimation client.
    #[must_use]
    pub fn pricing(&self) -> &PricingClient {
        &self.inner.pricing
    }
}
