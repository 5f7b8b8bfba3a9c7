//! Browsing files and folders on a branch.

use std::collections::BTreeMap;

use repolens_core::{normalize_path, EntryKind, Result, SourceControl, TreeEntry};
use serde::Serialize;
use tracing::debug;

use crate::commit::{commit_details, CommitDetails};
use crate::submodule::{parse_gitmodules, Submodule};

const GITMODULES: &str = ".gitmodules";

/// A folder entry with its last change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeItem {
    #[serde(flatten)]
    pub entry: TreeEntry,
    /// Last commit on the branch that touched the entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<CommitDetails>,
    /// Normalized remote, submodule entries only. Empty when `.gitmodules`
    /// has no section for the entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

/// What a path on a branch turned out to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PathView {
    /// The path (or branch) does not exist.
    Invalid,
    /// A file.
    Blob {
        path: String,
        /// Content, decoded lossily as UTF-8.
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        updated: Option<CommitDetails>,
        /// Basic details of the branch head.
        commit: CommitDetails,
    },
    /// A folder.
    Tree {
        path: String,
        entries: Vec<TreeItem>,
        commit: CommitDetails,
    },
}

impl PathView {
    /// Whether the lookup found nothing.
    pub fn is_invalid(&self) -> bool {
        matches!(self, PathView::Invalid)
    }
}

/// Look up `path` on `branch`.
///
/// A trailing `/` is dropped and an empty path means the root (`.`).
/// Files carry their content, folders their listing; both carry the
/// commit that last touched them. Unknown paths and branches give
/// [`PathView::Invalid`].
///
/// # Errors
///
/// Any backend error other than "not found".
pub fn fetch_path<R>(repo: &R, branch: &str, path: &str) -> Result<PathView>
where
    R: SourceControl + ?Sized,
{
    let path = path.strip_suffix('/').unwrap_or(path);
    let path = if path.is_empty() { "." } else { path };

    // path lookups on a missing branch fail in the tool rather than
    // returning nothing
    let Some(head) = repo.resolve(branch)? else {
        debug!(branch, "branch does not resolve");
        return Ok(PathView::Invalid);
    };
    let Some(current) = repo.path_details(branch, path)? else {
        return Ok(PathView::Invalid);
    };
    let commit = commit_details(repo, &head, false)?;

    match current.kind {
        EntryKind::Blob => {
            let content = String::from_utf8_lossy(&repo.show(&current.hash)?).into_owned();
            let updated = last_change(repo, branch, Some(normalize_path(path)))?;
            Ok(PathView::Blob {
                path: path.to_string(),
                content,
                updated,
                commit,
            })
        }
        EntryKind::Tree => {
            let mut submodules: Option<BTreeMap<String, Submodule>> = None;
            let mut entries = Vec::new();
            for entry in repo.tree_list(branch, path)? {
                let updated = last_change(repo, branch, Some(&entry.path))?;
                let remote = if entry.kind == EntryKind::Commit {
                    if submodules.is_none() {
                        submodules = Some(load_submodules(repo, branch)?);
                    }
                    Some(
                        submodules
                            .as_ref()
                            .and_then(|m| m.get(&entry.path))
                            .map(|s| s.remote.clone())
                            .unwrap_or_default(),
                    )
                } else {
                    None
                };
                entries.push(TreeItem {
                    entry,
                    updated,
                    remote,
                });
            }
            Ok(PathView::Tree {
                path: path.to_string(),
                entries,
                commit,
            })
        }
        // a submodule is not browsable from the parent repository
        EntryKind::Commit => Ok(PathView::Invalid),
    }
}

/// Submodules declared in the branch's `.gitmodules`, keyed by path.
///
/// # Errors
///
/// Any backend error other than the file being absent.
pub fn load_submodules<R>(repo: &R, branch: &str) -> Result<BTreeMap<String, Submodule>>
where
    R: SourceControl + ?Sized,
{
    match repo.path_details(branch, GITMODULES)? {
        Some(entry) if entry.kind == EntryKind::Blob => {
            let raw = repo.show(&entry.hash)?;
            Ok(parse_gitmodules(&String::from_utf8_lossy(&raw)))
        }
        _ => Ok(BTreeMap::new()),
    }
}

/// Up to `count` revision ids on `branch`, newest first, after skipping
/// `offset`. With `file`, only revisions touching it.
///
/// # Errors
///
/// Whatever the backend's `revision_list` returns.
pub fn history<R>(
    repo: &R,
    branch: &str,
    count: usize,
    offset: usize,
    file: Option<&str>,
) -> Result<Vec<String>>
where
    R: SourceControl + ?Sized,
{
    repo.revision_list(branch, count, offset, file.map(normalize_path))
}

fn last_change<R>(repo: &R, branch: &str, file: Option<&str>) -> Result<Option<CommitDetails>>
where
    R: SourceControl + ?Sized,
{
    match history(repo, branch, 1, 0, file)?.first() {
        Some(id) => Ok(Some(commit_details(repo, id, false)?)),
        None => Ok(None),
    }
}
