//! Unified diff parsing.
//!
//! Turns the raw diff text produced by `git diff-tree` or `svn diff` into
//! per-file hunks with old/new line numbers and added/removed counts. The
//! parser does not care which backend produced the text.

pub mod parser;

pub use parser::{parse_unified_diff, Diff};
