use std::path::Path;

use crate::types::{CommitMetadata, EntryKind, MetadataField, NumStat, RepoKind, TreeEntry};
use crate::Result;

/// Read-only query interface shared by the Git and Subversion backends.
///
/// A backend is created closed; every query returns [`LensError::NotOpen`]
/// until [`open`](SourceControl::open) has succeeded. Each query is one
/// synchronous invocation of the underlying tool and shares no state with
/// previous calls apart from what `open` recorded.
///
/// Identifiers are plain strings: Git content hashes or ref names, or
/// Subversion revision numbers / `HEAD`.
///
/// [`LensError::NotOpen`]: crate::LensError::NotOpen
pub trait SourceControl {
    /// The version-control system this backend talks to.
    fn kind(&self) -> RepoKind;

    /// Attach to the repository at `location` and cache its branch names.
    fn open(&mut self, location: &Path) -> Result<()>;

    /// Branch names recorded by `open`, in tool order.
    fn branches(&self) -> Result<&[String]>;

    /// Resolve a revision or ref to a concrete id, `None` if it does not exist.
    fn resolve(&self, rev: &str) -> Result<Option<String>>;

    /// Whether `rev` names an existing commit or revision.
    fn exists(&self, rev: &str) -> Result<bool> {
        Ok(self.resolve(rev)?.is_some())
    }

    /// Metadata of commit `id`, populated only for the requested `fields`.
    fn commit_metadata(&self, id: &str, fields: &[MetadataField]) -> Result<CommitMetadata>;

    /// Paths changed between `parent` (or the root, when `None`) and `id`.
    fn changed_files(&self, id: &str, parent: Option<&str>) -> Result<Vec<String>>;

    /// Raw unified diff between `parent` (or the root) and `id`, optionally
    /// scoped to one file.
    fn diff(&self, id: &str, parent: Option<&str>, file: Option<&str>) -> Result<String>;

    /// Per-file added/removed line counts for the same range as [`diff`](SourceControl::diff).
    fn diff_stats(&self, id: &str, parent: Option<&str>, file: Option<&str>)
        -> Result<Vec<NumStat>>;

    /// The entry at `path` on `branch`, `None` if nothing is there.
    ///
    /// The root (`""` or `"."`) always resolves to a tree whose hash is
    /// `branch` itself, without invoking the tool.
    fn path_details(&self, branch: &str, path: &str) -> Result<Option<TreeEntry>>;

    /// Up to `count` ids reachable from `branch` after skipping `offset`,
    /// most recent first, optionally limited to commits touching `file`.
    fn revision_list(
        &self,
        branch: &str,
        count: usize,
        offset: usize,
        file: Option<&str>,
    ) -> Result<Vec<String>>;

    /// Raw content of the object `id`.
    fn show(&self, id: &str) -> Result<Vec<u8>>;

    /// Entries directly inside `folder` on `branch`.
    fn tree_list(&self, branch: &str, folder: &str) -> Result<Vec<TreeEntry>>;
}

/// Trim one trailing `/`, leading `./` and `/` from a repository path.
///
/// Passing a folder with a trailing slash to a listing tool returns its
/// contents instead of the folder itself.
///
/// # Examples
///
/// ```
/// use repolens_core::normalize_path;
///
/// assert_eq!(normalize_path("folder/"), "folder");
/// assert_eq!(normalize_path("./.gitmodules"), ".gitmodules");
/// assert_eq!(normalize_path(""), "");
/// assert_eq!(normalize_path("."), ".");
/// ```
pub fn normalize_path(path: &str) -> &str {
    let path = path.strip_suffix('/').unwrap_or(path);
    let path = path.strip_prefix("./").unwrap_or(path);
    path.trim_start_matches('/')
}

/// Whether a normalized path denotes the repository root.
pub fn is_root_path(path: &str) -> bool {
    path.is_empty() || path == "."
}

/// The synthetic entry returned for the repository root.
///
/// # Examples
///
/// ```
/// use repolens_core::{root_entry, EntryKind};
///
/// let root = root_entry("master");
/// assert_eq!(root.kind, EntryKind::Tree);
/// assert_eq!(root.hash, "master");
/// assert_eq!(root.permissions, "0");
/// ```
pub fn root_entry(branch: &str) -> TreeEntry {
    TreeEntry {
        permissions: "0".into(),
        kind: EntryKind::Tree,
        hash: branch.to_string(),
        path: ".".into(),
        name: ".".into(),
    }
}
