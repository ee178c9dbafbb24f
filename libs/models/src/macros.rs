//! Macros for defining typed keys.

/// Defines an opaque string key assigned outside the auctioneer.
///
/// The generated newtype:
/// - rejects empty strings and strings containing whitespace or control
///   characters
/// - implements `Display`, `FromStr`, `AsRef<str>`, and string-form serde
/// - is cheap to clone and usable as a map key
///
/// # Example
///
/// ```ignore
/// define_key!(RepId, "rep id");
///
/// let rep: RepId = "cell-z1-0".parse()?;
/// assert_eq!(rep.as_str(), "cell-z1-0");
/// ```
#[macro_export]
macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// Human-readable name of this key kind, used in errors.
            pub const KIND: &'static str = $kind;

            /// Parses and validates a key.
            pub fn parse(s: &str) -> Result<Self, $crate::KeyError> {
                if s.is_empty() {
                    return Err($crate::KeyError::Empty { kind: Self::KIND });
                }

                if let Some(found) = s.chars().find(|c| c.is_whitespace() || c.is_control()) {
                    return Err($crate::KeyError::InvalidCharacter {
                        kind: Self::KIND,
                        found,
                    });
                }

                Ok(Self(s.to_owned()))
            }

            /// Returns the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        $crate::__parse_via_str!($name);
    };
}

/// Defines a locally generated, prefixed ULID identifier (`{prefix}_{ulid}`).
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($crate::Ulid);

        impl $name {
            /// The prefix for this ID type.
            pub const PREFIX: &'static str = $prefix;

            /// Creates a new ID with a fresh ULID.
            #[must_use]
            pub fn new() -> Self {
                Self($crate::Ulid::new())
            }

            /// Parses an ID in the format `{prefix}_{ulid}`.
            pub fn parse(s: &str) -> Result<Self, $crate::KeyError> {
                if s.is_empty() {
                    return Err($crate::KeyError::Empty { kind: Self::PREFIX });
                }

                let Some((prefix, ulid_str)) = s.split_once('_') else {
                    return Err($crate::KeyError::MissingSeparator);
                };

                if prefix != Self::PREFIX {
                    return Err($crate::KeyError::InvalidPrefix {
                        expected: Self::PREFIX,
                        actual: prefix.to_string(),
                    });
                }

                ulid_str
                    .parse::<$crate::Ulid>()
                    .map(Self)
                    .map_err(|e| $crate::KeyError::InvalidUlid(e.to_string()))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", Self::PREFIX, self.0)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        $crate::__parse_via_str!($name);
    };
}

/// `FromStr` and string-form `Deserialize` through the type's `parse`.
#[doc(hidden)]
#[macro_export]
macro_rules! __parse_via_str {
    ($name:ident) => {
        impl std::str::FromStr for $name {
            type Err = $crate::KeyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                Self::parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}
