//! Core types, configuration, and error handling for repolens.
//!
//! This crate provides the shared foundation used by the backend crates:
//! - [`LensError`]: unified error type using `thiserror`
//! - [`LensConfig`]: configuration loaded from `.repolens.toml`
//! - [`SourceControl`]: the read-only contract both backends implement
//! - [`ToolRunner`]: timeout-bounded invocation of `git` / `svn`
//! - Shared types: [`TreeEntry`], [`CommitMetadata`], [`DiffFile`],
//!   [`Hunk`], [`NumStat`], [`RepoKind`], [`OutputFormat`]

mod config;
mod contract;
mod create;
mod error;
mod process;
mod types;

pub use config::{ExecConfig, GitConfig, LensConfig, MetadataConfig, SvnConfig};
pub use contract::{is_root_path, normalize_path, root_entry, SourceControl};
pub use create::{apply_mode, valid_mode};
pub use error::LensError;
pub use process::ToolRunner;
pub use types::{
    Author, CommitMetadata, DiffFile, DiffLine, EntryKind, Hunk, HunkSummary, LineMarker,
    LineRange, MetadataField, NumStat, OutputFormat, RepoKind, SharedMode, TreeEntry,
};

/// A convenience `Result` type for repolens operations.
pub type Result<T> = std::result::Result<T, LensError>;
