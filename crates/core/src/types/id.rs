//! Newtype IDs for entity references.
//!
//! An `AccountId` and a `ListingId` both wrap an `i64`, but the compiler
//! keeps them apart, so a handler can't pass a listing's key where a
//! seller's belongs.

/// Define a newtype ID over `i64`.
///
/// The generated type serializes transparently as its backing integer,
/// derives the usual value-type traits, converts to and from `i64`, and
/// (behind the `postgres` feature) binds directly as a `BIGINT` in sqlx
/// queries.
///
/// ```rust
/// # use unibazaar_core::define_id;
/// define_id!(AccountId);
/// define_id!(ListingId);
///
/// let account_id = AccountId::new(1);
/// let listing_id = ListingId::new(1);
///
/// // Distinct types: `let _: AccountId = listing_id;` won't compile.
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i64 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i64 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <i64 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i64 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(AccountId);
define_id!(ListingId);
define_id!(RatingId);
define_id!(ReportId);
define_id!(WishlistEntryId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = AccountId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(AccountId::from(42_i64), id);
        assert_eq!(i64::from(id), 42);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ListingId::new(7).to_string(), "7");
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = RatingId::new(9);
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "9");
        let back: RatingId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
