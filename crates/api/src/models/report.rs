//! AI price report domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use unibazaar_core::{ListingId, ReportId};

/// An AI-generated price estimate attached to a listing.
///
/// Immutable once created; the estimation service's response is persisted
/// verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct AiPriceReport {
    pub id: ReportId,
    pub listing_id: ListingId,
    /// Lower bound of the suggested price range.
    pub price_min: Decimal,
    /// Upper bound of the suggested price range.
    pub price_max: Decimal,
    /// ISO 4217 currency code of the range.
    pub currency: String,
    /// Estimation confidence as reported by the service (e.g. "high").
    pub confidence: String,
    /// Free-form reasoning from the estimation service.
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}
