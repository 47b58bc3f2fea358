//! Listing category enumeration.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown [`Category`].
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown category: {0}")]
pub struct CategoryError(pub String);

/// Fixed set of listing categories.
///
/// Listings must carry exactly one of these values; anything else is
/// rejected at the validation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electronics,
    Furniture,
    Books,
    Clothing,
    Services,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Self; 5] = [
        Self::Electronics,
        Self::Furniture,
        Self::Books,
        Self::Clothing,
        Self::Services,
    ];

    /// Get the wire representation of the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Electronics => "electronics",
            Self::Furniture => "furniture",
            Self::Books => "books",
            Self::Clothing => "clothing",
            Self::Services => "services",
        }
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "electronics" => Ok(Self::Electronics),
            "furniture" => Ok(Self::Furniture),
            "books" => Ok(Self::Books),
            "clothing" => Ok(Self::Clothing),
            "services" => Ok(Self::Services),
            other => Err(CategoryError(other.to_owned())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_categories() {
        for category in Category::ALL {
            let parsed: Category = category.as_str().parse().expect("roundtrip");
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_parse_unknown() {
        assert!("vehicles".parse::<Category>().is_err());
        // Parsing is case-sensitive: the wire format is lowercase only.
        assert!("Electronics".parse::<Category>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Category::Books).expect("serialize");
        assert_eq!(json, "\"books\"");
        let back: Category = serde_json::from_str("\"services\"").expect("deserialize");
        assert_eq!(back, Category::Services);
    }
}
