//! AI price estimation client.
//!
//! Thin wrapper over the external estimation service: send a listing's
//! title, description, and image URLs, get back a suggested price range.
//! The response is persisted verbatim as an `ai_price_report` row by the
//! caller; the service itself is opaque and may fail or time out.

use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PricingConfig;

/// Request timeout; estimation can be slow, but a hung provider must not
/// hold the request worker forever.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// Errors that can occur when requesting a price estimate.
#[derive(Debug, Error)]
pub enum PricingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The estimation service returned an error response.
    #[error("estimation error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse the service response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Client construction failed.
    #[error("invalid pricing configuration: {0}")]
    Config(String),
}

/// Estimation request payload.
#[derive(Debug, Serialize)]
pub struct EstimateRequest<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub image_urls: &'a [String],
}

/// A suggested price range as returned by the estimation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSuggestion {
    pub price_min: Decimal,
    pub price_max: Decimal,
    pub currency: String,
    pub confidence: String,
    pub reasoning: String,
}

/// Client for the price estimation service.
#[derive(Clone)]
pub struct PricingClient {
    client: reqwest::Client,
    api_url: String,
}

impl PricingClient {
    /// Create a new estimation client.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::Config` if the HTTP client fails to build or
    /// the API key is not a valid header value.
    pub fn new(config: &PricingConfig) -> Result<Self, PricingError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| PricingError::Config(format!("invalid API key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PricingError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// Request a price estimate for a listing.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::Http` if the request fails,
    /// `PricingError::Api` for an error response, and
    /// `PricingError::Parse` if the response body is not a valid
    /// suggestion.
    pub async fn suggest(
        &self,
        request: &EstimateRequest<'_>,
    ) -> Result<PriceSuggestion, PricingError> {
        let response = self.client.post(&self.api_url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PricingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<PriceSuggestion>()
            .await
            .map_err(|e| PricingError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_parses_from_json() {
        let suggestion: PriceSuggestion = serde_json::from_str(
            r#"{
                "price_min": "40.00",
                "price_max": "65.50",
                "currency": "USD",
                "confidence": "medium",
                "reasoning": "Comparable used textbooks sell in this range."
            }"#,
        )
        .expect("parse");

        assert_eq!(suggestion.price_min, Decimal::new(4000, 2));
        assert_eq!(suggestion.price_max, Decimal::new(6550, 2));
        assert_eq!(suggestion.currency, "USD");
    }
}
