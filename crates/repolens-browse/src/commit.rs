//! Commit details and parsed diffs.

use repolens_core::{normalize_path, CommitMetadata, DiffFile, MetadataField, Result, SourceControl};
use repolens_difflens::{parse_unified_diff, Diff};
use serde::Serialize;

/// Metadata of a commit plus, for extended lookups, the files it touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitDetails {
    /// Requested metadata fields.
    #[serde(flatten)]
    pub metadata: CommitMetadata,
    /// Paths changed relative to the first parent (extended lookups only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changeset: Option<Vec<String>>,
}

/// Look up commit `id`.
///
/// A basic lookup asks for hash, subject, date and author. An extended one
/// asks for every field and adds the changeset against the first parent.
///
/// # Errors
///
/// Whatever the backend returns for `commit_metadata` or `changed_files`.
pub fn commit_details<R>(repo: &R, id: &str, extended: bool) -> Result<CommitDetails>
where
    R: SourceControl + ?Sized,
{
    let fields: &[MetadataField] = if extended {
        &MetadataField::ALL
    } else {
        &MetadataField::BASIC
    };
    let metadata = repo.commit_metadata(id, fields)?;
    let changeset = if extended {
        Some(repo.changed_files(id, metadata.parent.as_deref())?)
    } else {
        None
    };
    Ok(CommitDetails {
        metadata,
        changeset,
    })
}

/// Extended details of commit `id`.
///
/// # Errors
///
/// Same as [`commit_details`].
pub fn fetch_commit<R>(repo: &R, id: &str) -> Result<CommitDetails>
where
    R: SourceControl + ?Sized,
{
    commit_details(repo, id, true)
}

/// Parsed diff of `id` against `parent` (or the root).
///
/// With `file`, the result holds at most that one file. Backends that
/// cannot scope a diff themselves still return the full text; the
/// narrowing happens here.
///
/// # Errors
///
/// Whatever the backend's `diff` returns, or [`LensError::Parse`] for
/// malformed diff text.
///
/// [`LensError::Parse`]: repolens_core::LensError::Parse
pub fn commit_diff<R>(repo: &R, id: &str, parent: Option<&str>, file: Option<&str>) -> Result<Diff>
where
    R: SourceControl + ?Sized,
{
    let file = file.map(normalize_path).filter(|f| !f.is_empty());
    let raw = repo.diff(id, parent, file)?;
    let diff = parse_unified_diff(&raw)?;
    Ok(match file {
        Some(file) => diff.into_iter().filter(|f| f.path == file).collect(),
        None => diff,
    })
}

/// The diff of one file in `id`, `None` if the commit did not touch it.
///
/// # Errors
///
/// Same as [`commit_diff`].
pub fn file_diff<R>(repo: &R, id: &str, parent: Option<&str>, file: &str) -> Result<Option<DiffFile>>
where
    R: SourceControl + ?Sized,
{
    let file = normalize_path(file);
    Ok(commit_diff(repo, id, parent, Some(file))?.take(file))
}
