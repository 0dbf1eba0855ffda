//! Content hashes for targets and graphs

pub mod content_hasher;
pub mod error;
pub mod graph_hasher;
pub mod profile;
pub mod target_hasher;


pub use content_hasher::{ContentHasher, ContentHashing};
pub use error::HasherError;
pub use graph_hasher::GraphContentHasher;
pub use profile::{CacheOutputType, CacheProfile};
pub use target_hasher::{HashedTargets, TargetContentHasher};
