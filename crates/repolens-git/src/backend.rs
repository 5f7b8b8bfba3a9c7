//! [`SourceControl`] over the `git` command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use repolens_core::{
    apply_mode, is_root_path, normalize_path, root_entry, CommitMetadata, LensConfig, LensError,
    MetadataField, NumStat, RepoKind, Result, SharedMode, SourceControl, ToolRunner, TreeEntry,
};
use tracing::{debug, info};

use crate::listing::{
    parse_branches, parse_changed_files, parse_numstat, parse_tree_line, parse_tree_listing,
};
use crate::metadata::{self, MetadataCodec};
use crate::validate::{ensure_valid_hash, ensure_valid_ref};

/// `diff-tree` argument standing in for a missing parent.
const NO_PARENT: &str = "--root";

/// Git repository backend.
///
/// Created closed; [`open`](SourceControl::open) checks that the location
/// is a repository and caches its branches.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use repolens_core::{LensConfig, MetadataField, SourceControl};
/// use repolens_git::GitBackend;
///
/// let repo = GitBackend::open_at(&LensConfig::default(), Path::new("/srv/git/project.git")).unwrap();
/// let head = repo.resolve("master").unwrap().unwrap();
/// let meta = repo.commit_metadata(&head, &MetadataField::BASIC).unwrap();
/// println!("{}", meta.subject.unwrap_or_default());
/// ```
#[derive(Debug, Clone)]
pub struct GitBackend {
    binary: String,
    timeout: Option<Duration>,
    codec: MetadataCodec,
    handle: Option<Handle>,
}

#[derive(Debug, Clone)]
struct Handle {
    git: ToolRunner,
    location: PathBuf,
    branches: Vec<String>,
}

impl GitBackend {
    /// A closed backend using the configured `git` binary and timeout.
    pub fn new(config: &LensConfig) -> Self {
        Self {
            binary: config.git.binary.clone(),
            timeout: config.exec.timeout(),
            codec: MetadataCodec::from_config(&config.metadata),
            handle: None,
        }
    }

    /// Create a backend and open `location` in one step.
    ///
    /// # Errors
    ///
    /// Same as [`open`](SourceControl::open).
    pub fn open_at(config: &LensConfig, location: &Path) -> Result<Self> {
        let mut backend = Self::new(config);
        backend.open(location)?;
        Ok(backend)
    }

    /// Initialise a bare repository at `base`.
    ///
    /// Missing parent directories are created. A `mode` that is not a
    /// chmod-style mode is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Io`] if the directory cannot be created, or
    /// [`LensError::Command`] if `git init` or `chmod` fails.
    pub fn create(
        config: &LensConfig,
        base: &Path,
        mode: Option<&str>,
        shared: &SharedMode,
    ) -> Result<()> {
        std::fs::create_dir_all(base)?;
        let git = ToolRunner::new(&config.git.binary).with_timeout(config.exec.timeout());

        let mut args = vec!["init".to_string(), "--bare".to_string()];
        if let Some(value) = shared.as_arg() {
            args.push(format!("--shared={value}"));
        }
        args.push(base.to_string_lossy().into_owned());
        git.run_checked(&args)?;

        apply_mode(base, mode, config.exec.timeout())?;
        info!(base = %base.display(), "created git repository");
        Ok(())
    }

    /// The location passed to `open`, if open.
    pub fn location(&self) -> Option<&Path> {
        self.handle.as_ref().map(|h| h.location.as_path())
    }

    fn handle(&self) -> Result<&Handle> {
        self.handle.as_ref().ok_or(LensError::NotOpen)
    }

    fn git(&self) -> Result<&ToolRunner> {
        Ok(&self.handle()?.git)
    }

    fn show_format(&self, id: &str, format: &str) -> Result<String> {
        let format = format!("--format={format}");
        let out = self
            .git()?
            .run_checked(&["--no-pager", "show", "-s", format.as_str(), id])?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn metadata_per_field(&self, id: &str, fields: &[MetadataField]) -> Result<CommitMetadata> {
        let mut meta = CommitMetadata::default();
        for p in metadata::expand(fields) {
            let value = self.show_format(id, p.spec)?;
            metadata::apply(&mut meta, p.group, &value);
        }
        Ok(meta)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Range arguments shared by the `diff-tree` family.
fn diff_range(id: &str, parent: Option<&str>) -> Result<Vec<String>> {
    ensure_valid_hash(id)?;
    let parent = match non_empty(parent) {
        Some(parent) => {
            ensure_valid_hash(parent)?;
            parent
        }
        None => NO_PARENT,
    };
    Ok(vec![parent.to_string(), id.to_string()])
}

fn push_pathspec(args: &mut Vec<String>, file: Option<&str>) {
    if let Some(file) = non_empty(file) {
        args.push("--".into());
        args.push(file.to_string());
    }
}

impl SourceControl for GitBackend {
    fn kind(&self) -> RepoKind {
        RepoKind::Git
    }

    fn open(&mut self, location: &Path) -> Result<()> {
        let git = ToolRunner::new(&self.binary)
            .with_working_dir(location)
            .with_timeout(self.timeout);
        let git_dir = git.run_text(&["rev-parse", "--git-dir"])?;
        let branches = parse_branches(&git.run_text(&["branch", "--no-color"])?);
        debug!(
            location = %location.display(),
            git_dir = %git_dir,
            branches = branches.len(),
            "opened git repository"
        );
        self.handle = Some(Handle {
            git,
            location: location.to_path_buf(),
            branches,
        });
        Ok(())
    }

    fn branches(&self) -> Result<&[String]> {
        Ok(&self.handle()?.branches)
    }

    fn resolve(&self, rev: &str) -> Result<Option<String>> {
        ensure_valid_ref(rev)?;
        let target = format!("{rev}^{{commit}}");
        let output = self
            .git()?
            .run(&["rev-parse", "--verify", "--quiet", target.as_str()])?;
        if !output.status.success() {
            return Ok(None);
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!id.is_empty()).then_some(id))
    }

    fn commit_metadata(&self, id: &str, fields: &[MetadataField]) -> Result<CommitMetadata> {
        ensure_valid_hash(id)?;
        let format = self.codec.format_string(fields);
        let output = self.show_format(id, &format)?;
        if let Some(meta) = self.codec.decode(fields, output.trim_end())? {
            return Ok(meta);
        }
        debug!(id, "combined metadata output did not decode, querying fields one by one");
        self.metadata_per_field(id, fields)
    }

    fn changed_files(&self, id: &str, parent: Option<&str>) -> Result<Vec<String>> {
        let mut args = vec!["diff-tree".to_string(), "--name-only".into(), "-r".into()];
        args.extend(diff_range(id, parent)?);
        let output = self.git()?.run_checked(&args)?;
        Ok(parse_changed_files(&String::from_utf8_lossy(&output), id))
    }

    fn diff(&self, id: &str, parent: Option<&str>, file: Option<&str>) -> Result<String> {
        let mut args = vec!["diff-tree".to_string(), "-p".into(), "--cc".into()];
        args.extend(diff_range(id, parent)?);
        push_pathspec(&mut args, file);
        let output = self.git()?.run_checked(&args)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    fn diff_stats(
        &self,
        id: &str,
        parent: Option<&str>,
        file: Option<&str>,
    ) -> Result<Vec<NumStat>> {
        let mut args = vec!["diff-tree".to_string(), "--numstat".into(), "-r".into()];
        args.extend(diff_range(id, parent)?);
        push_pathspec(&mut args, file);
        let output = self.git()?.run_checked(&args)?;
        Ok(parse_numstat(&String::from_utf8_lossy(&output)))
    }

    fn path_details(&self, branch: &str, path: &str) -> Result<Option<TreeEntry>> {
        let git = self.git()?;
        ensure_valid_ref(branch)?;
        let path = normalize_path(path);
        if is_root_path(path) {
            return Ok(Some(root_entry(branch)));
        }
        let output = git.run_checked(&["ls-tree", "--full-tree", "-z", branch, "--", path])?;
        let output = String::from_utf8_lossy(&output);
        Ok(output
            .split('\0')
            .next()
            .and_then(|record| parse_tree_line(record, None)))
    }

    fn revision_list(
        &self,
        branch: &str,
        count: usize,
        offset: usize,
        file: Option<&str>,
    ) -> Result<Vec<String>> {
        let git = self.git()?;
        ensure_valid_ref(branch)?;
        let mut args = vec![
            "rev-list".to_string(),
            format!("--max-count={count}"),
            format!("--skip={offset}"),
            branch.to_string(),
        ];
        push_pathspec(&mut args, file);
        let output = git.run_text(&args)?;
        Ok(output.lines().map(str::to_string).collect())
    }

    fn show(&self, id: &str) -> Result<Vec<u8>> {
        let git = self.git()?;
        ensure_valid_hash(id)?;
        git.run_checked(&["--no-pager", "show", id])
    }

    fn tree_list(&self, branch: &str, folder: &str) -> Result<Vec<TreeEntry>> {
        let git = self.git()?;
        ensure_valid_ref(branch)?;
        let folder = normalize_path(folder);
        let output = if is_root_path(folder) {
            git.run_checked(&["ls-tree", "--full-tree", "-z", branch])?
        } else {
            let pathspec = format!("{folder}/");
            git.run_checked(&["ls-tree", "--full-tree", "-z", branch, "--", pathspec.as_str()])?
        };
        let folder = if is_root_path(folder) { "" } else { folder };
        Ok(parse_tree_listing(&String::from_utf8_lossy(&output), folder))
    }
}
