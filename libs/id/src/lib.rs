//! # quarry-id
//!
//! Content-addressed ID types for the quarry build system.
//!
//! ## Design Principles
//!
//! - IDs are opaque fixed-width tokens; equality is bytewise
//! - All IDs share one canonical lowercase-hex text encoding with
//!   strict parsing, safe for URL query parameters
//! - IDs support roundtrip serialization (parse → format → parse)
//! - IDs are typed to prevent mixing builds, jobs, and source files
//! - No ordering is exposed; a content digest has no meaningful sort
//!
//! ## ID Format
//!
//! All IDs are 20 bytes rendered as 40 hex characters:
//!
//! - `4bf3e335289fdb63c711f8959d197b0c0b6cbe5e`
//!
//! A [`JobId`] or [`FileId`] is normally derived from content with
//! `from_content`; a [`BuildId`] is minted per build with `random`.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Width of every ID payload in bytes.
pub const ID_LEN: usize = 20;

#[doc(hidden)]
pub fn random_payload() -> [u8; ID_LEN] {
    use rand::Rng;
    let mut bytes = [0u8; ID_LEN];
    rand::rng().fill(&mut bytes[..]);
    bytes
}

#[doc(hidden)]
pub fn digest_payload(content: &[u8]) -> [u8; ID_LEN] {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(content);
    let mut bytes = [0u8; ID_LEN];
    bytes.copy_from_slice(&digest[..ID_LEN]);
    bytes
}
