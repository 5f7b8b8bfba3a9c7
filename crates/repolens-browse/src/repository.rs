//! Backend selection by repository type.

use std::path::Path;

use repolens_core::{
    CommitMetadata, LensConfig, MetadataField, NumStat, RepoKind, Result, SharedMode,
    SourceControl, TreeEntry,
};
use repolens_git::GitBackend;
use repolens_svn::SvnBackend;
use tracing::debug;

/// An open repository of either supported kind.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use repolens_browse::Repository;
/// use repolens_core::{LensConfig, RepoKind, SourceControl};
///
/// let repo = Repository::open(RepoKind::Git, Path::new("."), &LensConfig::default()).unwrap();
/// for branch in repo.branches().unwrap() {
///     println!("{branch}");
/// }
/// ```
#[derive(Debug, Clone)]
pub enum Repository {
    /// Backed by the `git` CLI.
    Git(GitBackend),
    /// Backed by the `svn` CLI.
    Subversion(SvnBackend),
}

impl Repository {
    /// Open the repository at `location` with the backend for `kind`.
    ///
    /// # Errors
    ///
    /// Whatever the backend's `open` returns.
    pub fn open(kind: RepoKind, location: &Path, config: &LensConfig) -> Result<Self> {
        debug!(%kind, location = %location.display(), "opening repository");
        Ok(match kind {
            RepoKind::Git => Repository::Git(GitBackend::open_at(config, location)?),
            RepoKind::Subversion => Repository::Subversion(SvnBackend::open_at(config, location)?),
        })
    }

    /// Create a new repository at `base` and open it.
    ///
    /// `mode` is a chmod-style mode applied recursively afterwards; invalid
    /// modes are ignored. `shared` only affects Git.
    ///
    /// # Errors
    ///
    /// Whatever the backend's `create` or `open` returns.
    pub fn create(
        kind: RepoKind,
        base: &Path,
        mode: Option<&str>,
        shared: &SharedMode,
        config: &LensConfig,
    ) -> Result<Self> {
        match kind {
            RepoKind::Git => GitBackend::create(config, base, mode, shared)?,
            RepoKind::Subversion => SvnBackend::create(config, base, mode, shared)?,
        }
        Self::open(kind, base, config)
    }

    fn backend(&self) -> &dyn SourceControl {
        match self {
            Repository::Git(git) => git,
            Repository::Subversion(svn) => svn,
        }
    }
}

impl SourceControl for Repository {
    fn kind(&self) -> RepoKind {
        self.backend().kind()
    }

    fn open(&mut self, location: &Path) -> Result<()> {
        match self {
            Repository::Git(git) => git.open(location),
            Repository::Subversion(svn) => svn.open(location),
        }
    }

    fn branches(&self) -> Result<&[String]> {
        self.backend().branches()
    }

    fn resolve(&self, rev: &str) -> Result<Option<String>> {
        self.backend().resolve(rev)
    }

    fn exists(&self, rev: &str) -> Result<bool> {
        self.backend().exists(rev)
    }

    fn commit_metadata(&self, id: &str, fields: &[MetadataField]) -> Result<CommitMetadata> {
        self.backend().commit_metadata(id, fields)
    }

    fn changed_files(&self, id: &str, parent: Option<&str>) -> Result<Vec<String>> {
        self.backend().changed_files(id, parent)
    }

    fn diff(&self, id: &str, parent: Option<&str>, file: Option<&str>) -> Result<String> {
        self.backend().diff(id, parent, file)
    }

    fn diff_stats(
        &self,
        id: &str,
        parent: Option<&str>,
        file: Option<&str>,
    ) -> Result<Vec<NumStat>> {
        self.backend().diff_stats(id, parent, file)
    }

    fn path_details(&self, branch: &str, path: &str) -> Result<Option<TreeEntry>> {
        self.backend().path_details(branch, path)
    }

    fn revision_list(
        &self,
        branch: &str,
        count: usize,
        offset: usize,
        file: Option<&str>,
    ) -> Result<Vec<String>> {
        self.backend().revision_list(branch, count, offset, file)
    }

    fn show(&self, id: &str) -> Result<Vec<u8>> {
        self.backend().show(id)
    }

    fn tree_list(&self, branch: &str, folder: &str) -> Result<Vec<TreeEntry>> {
        self.backend().tree_list(branch, folder)
    }
}
