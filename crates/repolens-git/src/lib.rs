//! Git backend: answers repository queries by running the `git` CLI.
//!
//! Commit metadata is fetched with a single `git show --format=...` call
//! whose fields are wrapped in sentinel tokens (see [`metadata`]); listings
//! use NUL-delimited output so unusual file names survive.

pub mod backend;
pub mod listing;
pub mod metadata;
pub mod validate;

pub use backend::GitBackend;
pub use metadata::MetadataCodec;
pub use validate::{ensure_valid_hash, ensure_valid_ref};
