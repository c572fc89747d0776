//! Archive Storage Library
//!
//! The blob store the derivative pipeline runs against: a [`Storage`] trait keyed
//! by opaque path strings, and a local filesystem implementation.
//!
//! # Key format
//!
//! - Originals: `record_files/{uuid}/{filename}`
//! - Thumbnails: `{original stem}_thumb_{token}.jpg`, next to the original
//! - Image previews: `{original stem}_preview_{token}.jpg`
//! - Video previews: `{original stem}_preview.mp4`
//!
//! Keys must not contain `..` or start with `/`. Key generation lives in [`keys`].

pub mod factory;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
