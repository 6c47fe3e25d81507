//! Macro for implementing string conversions on status enums
//!
//! Status-like enums in this crate are persisted as lowercase text columns and
//! exchanged with the external systems as snake_case strings. The macro keeps
//! the column value, the `Display` output and the parser in one table.
//!
//! # Example
//!
//! ```rust
//! use fieldbridge_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum RecordStatus {
//!     Active,
//!     Cancelled,
//! }
//!
//! impl_domain_status_conversions!(RecordStatus {
//!     Active => "active",
//!     Cancelled => "cancelled",
//! });
//!
//! assert_eq!(RecordStatus::Cancelled.as_str(), "cancelled");
//! assert_eq!("ACTIVE".parse::<RecordStatus>(), Ok(RecordStatus::Active));
//! ```

/// Implements `as_str`, `ALL`, `Display` and case-insensitive `FromStr`.
///
/// Parsing failures return `Err(String)` naming the enum and the rejected
/// input, which callers fold into `FieldBridgeError::InvalidInput` or a
/// `rusqlite` conversion error.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$enum_name] = &[$(Self::$variant),+];

            /// Canonical lowercase string form.
            pub const fn as_str(&self) -> &'static str {
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

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    // Invoking modules import the crate's one-parameter alias
    #[allow(unused_imports)]
    use crate::Result;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Direction {
        Inbound,
        Outbound,
        Both,
    }

    impl_domain_status_conversions!(Direction {
        Inbound => "inbound",
        Outbound => "outbound",
        Both => "both",
    });

    #[test]
    fn display_uses_table_value() {
        assert_eq!(Direction::Inbound.to_string(), "inbound");
        assert_eq!(Direction::Both.as_str(), "both");
    }

    #[test]
    fn parse_ignores_case_and_whitespace() {
        assert_eq!(Direction::from_str("OUTBOUND").unwrap(), Direction::Outbound);
        assert_eq!(Direction::from_str(" Both ").unwrap(), Direction::Both);
    }

    #[test]
    fn parse_rejects_unknown_values() {
        let err = Direction::from_str("sideways").unwrap_err();
        assert!(err.contains("Invalid Direction: sideways"));
        assert!(Direction::from_str("").is_err());
    }

    #[test]
    fn all_lists_every_variant_and_round_trips() {
        assert_eq!(Direction::ALL.len(), 3);
        for variant in Direction::ALL {
            assert_eq!(Direction::from_str(variant.as_str()).unwrap(), *variant);
        }
    }
}
