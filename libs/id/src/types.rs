//! Typed ID definitions for the build system.
//!
//! `BuildId`, `JobId`, and `FileId` share one payload format but are
//! distinct types; a job's artifact is addressed by its `JobId`.

use serde::{Deserialize, Serialize};

use crate::define_id;

define_id!(BuildId);
define_id!(JobId);
define_id!(FileId);

/// Identity of a worker, as the base URL of its artifact endpoint.
///
/// Workers self-assign this at startup; the coordinator treats it as an
/// opaque label and hands it to peers that need to fetch artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self(endpoint.into())
    }

    /// The worker's artifact endpoint base URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WorkerId {
    fn from(endpoint: String) -> Self {
        Self(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let id = JobId::random();
        let parsed = JobId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_content_ids_are_stable() {
        let a = FileId::from_content(b"int main() {}\n");
        let b = FileId::from_content(b"int main() {}\n");
        let c = FileId::from_content(b"int main() { return 1; }\n");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_random_ids_are_distinct() {
        assert_ne!(BuildId::random(), BuildId::random());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(JobId::parse(""), Err(crate::IdError::Empty));
        assert!(matches!(
            JobId::parse("abc123"),
            Err(crate::IdError::InvalidLength { .. })
        ));
        let not_hex = "zz".repeat(crate::ID_LEN);
        assert!(matches!(
            JobId::parse(&not_hex),
            Err(crate::IdError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let id = FileId::from_content(b"lib.rs");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: FileId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_worker_id_is_transparent() {
        let worker = WorkerId::new("http://127.0.0.1:5090");
        let json = serde_json::to_string(&worker).unwrap();
        assert_eq!(json, "\"http://127.0.0.1:5090\"");
    }
}
