//! Macro for implementing Display and FromStr for wire-name enums
//!
//! Several domain enums travel as plain strings (HTTP methods, storage
//! backends in config files, error kinds in logs). This macro gives each of
//! them one canonical spelling for `Display` and case-insensitive parsing.
//!
//! # Example
//!
//! ```rust
//! use lessonlink_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Theme {
//!     Light,
//!     Dark,
//! }
//!
//! impl_wire_name_conversions!(Theme {
//!     Light => "light",
//!     Dark => "dark",
//! });
//!
//! assert_eq!("DARK".parse::<Theme>().unwrap(), Theme::Dark);
//! ```

/// Implements Display and FromStr traits for enums with a fixed wire name
///
/// This macro generates:
/// - Display trait: writes the canonical string for each variant
/// - FromStr trait: parses ASCII case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their canonical string
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Verb {
        Get,
        Post,
    }

    impl_wire_name_conversions!(Verb {
        Get => "GET",
        Post => "POST",
    });

    #[test]
    fn test_display_uses_canonical_spelling() {
        assert_eq!(Verb::Get.to_string(), "GET");
        assert_eq!(Verb::Post.to_string(), "POST");
    }

    #[test]
    fn test_fromstr_ignores_case_and_whitespace() {
        assert_eq!(Verb::from_str("get").unwrap(), Verb::Get);
        assert_eq!(Verb::from_str(" Post ").unwrap(), Verb::Post);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = Verb::from_str("teleport");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid Verb: teleport"));
    }

    #[test]
    fn test_fromstr_empty() {
        assert!(Verb::from_str("").is_err());
    }
}
