//! Stateless credential issuing, validation, and rotation.
//!
//! Two signed token kinds share one HS256 secret: short-lived access
//! tokens presented on every request, and long-lived renewal tokens
//! exchanged for fresh access tokens. No database row represents an
//! issued token - validity is purely cryptographic plus expiry, so
//! "logout" can only clear the client-held cookie. A renewal token that
//! leaks stays valid until its natural expiry; this is a documented
//! property of the design, not something the service papers over.

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use unibazaar_core::AccountId;

/// Access token lifetime: 15 minutes.
pub const ACCESS_TTL_SECS: i64 = 15 * 60;

/// Renewal token lifetime: 15 days.
pub const RENEWAL_TTL_SECS: i64 = 15 * 24 * 60 * 60;

/// Errors that can occur when validating or issuing tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token's expiry is in the past.
    #[error("token expired")]
    Expired,

    /// The token is structurally invalid or the signature doesn't verify.
    #[error("malformed token")]
    Malformed,

    /// The token was signed with an algorithm other than the fixed one
    /// (including "none").
    #[error("wrong signing algorithm")]
    WrongAlgorithm,

    /// A valid token of the other kind was presented (e.g. a renewal token
    /// on a protected route).
    #[error("wrong token kind")]
    WrongKind,

    /// Signing failed; only possible with a broken key.
    #[error("failed to sign token")]
    Signing,
}

/// The two credential kinds, encoded in the `kind` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Renewal,
}

/// Signed claims carried by both token kinds.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject: the account ID.
    sub: i64,
    /// Expiry as a Unix timestamp.
    exp: i64,
    /// Which credential this is.
    kind: TokenKind,
}

/// An access/renewal credential pair as issued at login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub renewal: String,
}

/// Issues, validates, and rotates signed credentials.
///
/// Holds no mutable state; both keys derive from the single configured
/// secret. Subject existence is NOT checked here - callers confirm the
/// account still exists after decoding, which is what implicitly
/// invalidates all tokens of a deleted account.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    /// Fixed signing algorithm; anything else is rejected on decode.
    const ALGORITHM: Algorithm = Algorithm::HS256;

    /// Create a token service from the shared signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
        }
    }

    /// Issue a fresh access/renewal pair for an account.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, account_id: AccountId) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.sign(account_id, TokenKind::Access, ACCESS_TTL_SECS)?,
            renewal: self.sign(account_id, TokenKind::Renewal, RENEWAL_TTL_SECS)?,
        })
    }

    /// Validate a token of the expected kind and return its subject.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` for an expired token,
    /// `TokenError::WrongAlgorithm` for a token signed with a different
    /// algorithm, `TokenError::WrongKind` for a valid token of the other
    /// kind, and `TokenError::Malformed` for everything else.
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<AccountId, TokenError> {
        let validation = Validation::new(Self::ALGORITHM);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    TokenError::WrongAlgorithm
                }
                _ => TokenError::Malformed,
            })?;

        if data.claims.kind != expected {
            return Err(TokenError::WrongKind);
        }

        Ok(AccountId::new(data.claims.sub))
    }

    /// Exchange a renewal token for a new access token.
    ///
    /// Deliberately does not issue a new renewal token: no sliding
    /// renewal, no rotation detection.
    ///
    /// # Errors
    ///
    /// Returns the validation errors of [`Self::validate`], or
    /// `TokenError::Signing` if encoding fails.
    pub fn rotate(&self, renewal_token: &str) -> Result<(AccountId, String), TokenError> {
        let account_id = self.validate(renewal_token, TokenKind::Renewal)?;
        let access = self.sign(account_id, TokenKind::Access, ACCESS_TTL_SECS)?;
        Ok((account_id, access))
    }

    fn sign(
        &self,
        account_id: AccountId,
        kind: TokenKind,
        ttl_secs: i64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: account_id.as_i64(),
            exp: Utc::now().timestamp() + ttl_secs,
            kind,
        };

        encode(&Header::new(Self::ALGORITHM), &claims, &self.encoding_key)
            .map_err(|_| TokenError::Signing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&SecretString::from("kAtGdN9wPq2LxV4mRbZc7HsJf3TnYe8U"))
    }

    #[test]
    fn test_issue_and_validate_roundtrip() {
        let service = service();
        let pair = service.issue(AccountId::new(7)).expect("issue");

        let subject = service
            .validate(&pair.access, TokenKind::Access)
            .expect("valid access token");
        assert_eq!(subject, AccountId::new(7));

        let subject = service
            .validate(&pair.renewal, TokenKind::Renewal)
            .expect("valid renewal token");
        assert_eq!(subject, AccountId::new(7));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let service = service();
        let pair = service.issue(AccountId::new(1)).expect("issue");

        assert_eq!(
            service.validate(&pair.renewal, TokenKind::Access),
            Err(TokenError::WrongKind)
        );
        assert_eq!(
            service.validate(&pair.access, TokenKind::Renewal),
            Err(TokenError::WrongKind)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = service();
        // Expiry far enough in the past to clear the default leeway.
        let token = service
            .sign(AccountId::new(1), TokenKind::Access, -300)
            .expect("sign");

        assert_eq!(
            service.validate(&token, TokenKind::Access),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_wrong_algorithm_rejected() {
        let secret = SecretString::from("kAtGdN9wPq2LxV4mRbZc7HsJf3TnYe8U");
        let service = TokenService::new(&secret);

        let claims = Claims {
            sub: 1,
            exp: Utc::now().timestamp() + 60,
            kind: TokenKind::Access,
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
        )
        .expect("encode");

        assert_eq!(
            service.validate(&token, TokenKind::Access),
            Err(TokenError::WrongAlgorithm)
        );
    }

    #[test]
    fn test_garbage_rejected_as_malformed() {
        let service = service();
        assert_eq!(
            service.validate("not.a.token", TokenKind::Access),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            service.validate("", TokenKind::Access),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let service = service();
        let other = TokenService::new(&SecretString::from("Zq8RvW3nTb6KxP1mLcYd9GsHj4Ue7Af2"));
        let pair = other.issue(AccountId::new(1)).expect("issue");

        assert_eq!(
            service.validate(&pair.access, TokenKind::Access),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_rotate_issues_access_from_renewal() {
        let service = service();
        let pair = service.issue(AccountId::new(42)).expect("issue");

        let (subject, access) = service.rotate(&pair.renewal).expect("rotate");
        assert_eq!(subject, AccountId::new(42));
        assert_eq!(
            service
                .validate(&access, TokenKind::Access)
                .expect("fresh access token"),
            AccountId::new(42)
        );

        // An access token can't be used to rotate.
        assert_eq!(service.rotate(&pair.access), Err(TokenError::WrongKind));
    }
}
