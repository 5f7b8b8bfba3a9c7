//! Repository browsing on top of the [`SourceControl`] contract.
//!
//! [`Repository`] picks the Git or Subversion backend; the free functions
//! build commit pages, diffs, and file or folder views out of contract calls
//! alone, so they work the same for either backend.
//!
//! [`SourceControl`]: repolens_core::SourceControl

pub mod commit;
pub mod path;
pub mod repository;
pub mod submodule;

pub use commit::{commit_details, commit_diff, fetch_commit, file_diff, CommitDetails};
pub use path::{fetch_path, history, load_submodules, PathView, TreeItem};
pub use repository::Repository;
pub use submodule::{parse_gitmodules, Submodule};
