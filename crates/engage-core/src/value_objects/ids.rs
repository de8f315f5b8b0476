//! Identifier value objects
//!
//! Products, users and brands are identified by positive 64-bit integers
//! assigned outside this system. Zero, negative and non-numeric values are
//! rejected at parse time so they never reach a store.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Error when parsing an identifier from untrusted input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("invalid {kind} format: {input:?}")]
    InvalidFormat { kind: &'static str, input: String },

    #[error("{kind} must be positive, got {value}")]
    NotPositive { kind: &'static str, value: i64 },
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i64);

        impl $name {
            /// Name used in error messages and log fields
            pub const KIND: &'static str = $kind;

            /// Create an identifier, rejecting non-positive values
            pub fn new(value: i64) -> Result<Self, IdParseError> {
                if value > 0 {
                    Ok(Self(value))
                } else {
                    Err(IdParseError::NotPositive { kind: $kind, value })
                }
            }

            /// Get the inner i64 value
            #[inline]
            pub const fn into_inner(self) -> i64 {
                self.0
            }

            /// Parse from string representation
            pub fn parse(s: &str) -> Result<Self, IdParseError> {
                let value = s.trim().parse::<i64>().map_err(|_| IdParseError::InvalidFormat {
                    kind: $kind,
                    input: s.to_string(),
                })?;
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<i64> for $name {
            type Error = IdParseError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_i64(self.0)
            }
        }

        // Accepts both JSON numbers and numeric strings
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                #[derive(Deserialize)]
                #[serde(untagged)]
                enum Raw {
                    Number(i64),
                    Text(String),
                }

                match Raw::deserialize(deserializer)? {
                    Raw::Number(n) => Self::new(n),
                    Raw::Text(s) => Self::parse(&s),
                }
                .map_err(serde::de::Error::custom)
            }
        }
    };
}

define_id!(
    /// Product identifier, owned by the catalog
    ProductId,
    "product_id"
);

define_id!(
    /// User identifier, supplied by the caller identity header
    UserId,
    "user_id"
);

define_id!(
    /// Brand identifier, used for listing filters
    BrandId,
    "brand_id"
);
