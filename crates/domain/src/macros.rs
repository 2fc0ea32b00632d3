//! Macro for implementing Display and FromStr for enums stored as text
//!
//! Log levels, audit statuses and audit operations are persisted as lowercase
//! strings. This macro keeps the string mapping in one place for both
//! directions.
//!
//! # Example
//!
//! ```rust
//! use crmbridge_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Outcome {
//!     Accepted,
//!     Rejected,
//! }
//!
//! impl_domain_status_conversions!(Outcome {
//!     Accepted => "accepted",
//!     Rejected => "rejected",
//! });
//!
//! assert_eq!(Outcome::Accepted.to_string(), "accepted");
//! assert_eq!("REJECTED".parse::<Outcome>().unwrap(), Outcome::Rejected);
//! ```

/// Implements Display and FromStr traits for text-backed enums
///
/// Parsing is case-insensitive; output is always the lowercase mapping.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
