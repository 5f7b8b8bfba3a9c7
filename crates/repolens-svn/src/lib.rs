//! Subversion backend: answers repository queries by running the `svn` CLI
//! with `--xml` output and mapping it onto the shared data model.
//!
//! Revisions stand in for both commit ids and branches. Diff text comes
//! back raw from `svn diff`; per-file counts are derived with
//! [`repolens_difflens`].

pub mod backend;
pub mod xml;

pub use backend::SvnBackend;
