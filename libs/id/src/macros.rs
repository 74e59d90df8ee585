//! Macros for defining typed ID types.

/// Macro to define a typed 20-byte ID.
///
/// This generates a newtype wrapper around the fixed-width payload with:
/// - `random()` to mint a fresh ID
/// - `from_content()` to derive an ID from raw bytes (truncated SHA-256)
/// - `parse()` to parse the 40-character hex form
/// - `Display` and `FromStr` implementations
/// - `Serialize` and `Deserialize` as the hex string
/// - `Hash` and bytewise equality; deliberately no `Ord`
///
/// # Example
///
/// ```ignore
/// define_id!(JobId);
/// define_id!(FileId);
///
/// let job_id = JobId::from_content(b"cc -o main main.c");
/// let parsed: JobId = "4bf3e335289fdb63c711f8959d197b0c0b6cbe5e".parse()?;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        /// A typed ID for this resource type.
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name([u8; $crate::ID_LEN]);

        impl $name {
            /// Mints a fresh random ID.
            #[must_use]
            pub fn random() -> Self {
                Self($crate::random_payload())
            }

            /// Derives the ID of a piece of content.
            #[must_use]
            pub fn from_content(content: &[u8]) -> Self {
                Self($crate::digest_payload(content))
            }

            /// Creates an ID from a raw payload.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; $crate::ID_LEN]) -> Self {
                Self(bytes)
            }

            /// Returns the raw payload.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; $crate::ID_LEN] {
                &self.0
            }

            /// Parses an ID from its canonical hex form.
            pub fn parse(s: &str) -> Result<Self, $crate::IdError> {
                if s.is_empty() {
                    return Err($crate::IdError::Empty);
                }

                if s.len() != $crate::ID_LEN * 2 {
                    return Err($crate::IdError::InvalidLength {
                        expected: $crate::ID_LEN * 2,
                        actual: s.len(),
                    });
                }

                let mut bytes = [0u8; $crate::ID_LEN];
                hex::decode_to_slice(s, &mut bytes)
                    .map_err(|e| $crate::IdError::InvalidHex(e.to_string()))?;

                Ok(Self(bytes))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), hex::encode(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}
