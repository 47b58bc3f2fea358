//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string failed to parse as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    TooLong,
    #[error("email must look like local@domain")]
    MissingAtSymbol,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    #[error("email domain cannot be empty")]
    EmptyDomain,
}

/// Maximum accepted length, per RFC 5321.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// A normalized email address.
///
/// Parsing trims surrounding whitespace and lowercases the input, so two
/// spellings of the same address compare equal and the unique constraint
/// on the account table can't be dodged with case tricks. Validation is
/// structural only: a non-empty local part and domain around a single
/// separator. Anything stricter belongs to the mail provider.
///
/// ```
/// use unibazaar_core::Email;
///
/// let email = Email::parse("  Student@Uni.Example ").unwrap();
/// assert_eq!(email.as_str(), "student@uni.example");
///
/// assert!(Email::parse("not-an-address").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Parse and normalize an email address.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first structural problem:
    /// empty input, over-long input, no `@`, or an empty part on either
    /// side of it.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let normalized = input.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(EmailError::Empty);
        }
        if normalized.len() > MAX_EMAIL_LENGTH {
            return Err(EmailError::TooLong);
        }

        match normalized.split_once('@') {
            None => Err(EmailError::MissingAtSymbol),
            Some(("", _)) => Err(EmailError::EmptyLocalPart),
            Some((_, "")) => Err(EmailError::EmptyDomain),
            Some(_) => Ok(Self(normalized)),
        }
    }

    /// The normalized address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let email = Email::parse("  Student@Uni.Example ").expect("valid email");
        assert_eq!(email.as_str(), "student@uni.example");
    }

    #[test]
    fn test_parse_structural_failures() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("not-an-email"), Err(EmailError::MissingAtSymbol));
        assert_eq!(Email::parse("@domain.com"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("user@"), Err(EmailError::EmptyDomain));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(Email::parse(&long), Err(EmailError::TooLong));
    }

    #[test]
    fn test_serde_transparent() {
        let email = Email::parse("student@uni.example").expect("valid email");
        let json = serde_json::to_string(&email).expect("serialize");
        assert_eq!(json, "\"student@uni.example\"");

        let back: Email = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, email);
    }
}
