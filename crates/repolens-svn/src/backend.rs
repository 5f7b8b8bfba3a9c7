//! [`SourceControl`] over the `svn` command line client.
//!
//! Subversion has no named branches at this layer: the branch set is just
//! `HEAD`, and every "branch" argument is a revision (`HEAD` or a number).
//! Object ids handed out by [`path_details`](SourceControl::path_details)
//! and [`tree_list`](SourceControl::tree_list) are `path@revision`, which is
//! what [`show`](SourceControl::show) expects back.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use repolens_core::{
    apply_mode, is_root_path, normalize_path, root_entry, Author, CommitMetadata, LensConfig,
    LensError, MetadataField, NumStat, RepoKind, Result, SharedMode, SourceControl, ToolRunner,
    TreeEntry,
};
use repolens_difflens::parse_unified_diff;
use tracing::{debug, info};

use crate::xml::{self, LogEntry};

/// `svn info` codes for a path that does not exist at the revision.
const NOT_FOUND_CODES: [&str; 2] = ["W170000", "E200009"];

/// `svn diff --summarize` line: content status column, property status
/// column, then the URL.
fn summary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[ ACDMR][ M]\s+(?P<file>.+)$").expect("summary pattern is valid")
    })
}

/// A revision argument: `HEAD` (any case) or a decimal number.
///
/// # Errors
///
/// Returns [`LensError::Validation`] for anything else.
///
/// # Examples
///
/// ```
/// use repolens_svn::backend::revision_arg;
///
/// assert_eq!(revision_arg("head").unwrap(), "HEAD");
/// assert_eq!(revision_arg("42").unwrap(), "42");
/// assert!(revision_arg("42; rm -rf /").is_err());
/// ```
pub fn revision_arg(rev: &str) -> Result<String> {
    if rev.eq_ignore_ascii_case("HEAD") {
        return Ok("HEAD".into());
    }
    if !rev.is_empty() && rev.chars().all(|c| c.is_ascii_digit()) {
        return Ok(rev.to_string());
    }
    Err(LensError::Validation(format!(
        "Revision type must be HEAD or a number, got '{rev}'"
    )))
}

/// Subversion repository backend.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use repolens_core::{LensConfig, MetadataField, SourceControl};
/// use repolens_svn::SvnBackend;
///
/// let repo = SvnBackend::open_at(&LensConfig::default(), Path::new("/srv/svn/project")).unwrap();
/// let meta = repo.commit_metadata("HEAD", &MetadataField::BASIC).unwrap();
/// println!("r{} {}", meta.hash.unwrap(), meta.subject.unwrap_or_default());
/// ```
#[derive(Debug, Clone)]
pub struct SvnBackend {
    binary: String,
    timeout: Option<Duration>,
    handle: Option<Handle>,
}

#[derive(Debug, Clone)]
struct Handle {
    svn: ToolRunner,
    url: String,
    location: PathBuf,
    branches: Vec<String>,
}

impl Handle {
    fn url_for(&self, path: &str) -> String {
        let path = normalize_path(path);
        if is_root_path(path) {
            self.url.clone()
        } else {
            format!("{}/{}", self.url, path)
        }
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("--non-interactive");
        full.extend_from_slice(args);
        self.svn.run_checked(&full)
    }

    fn run_string(&self, args: &[&str]) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.run(args)?).into_owned())
    }

    fn log(&self, target: &str, limit: usize, verbose: bool) -> Result<Vec<LogEntry>> {
        let limit = limit.to_string();
        let mut args = vec!["log", "--xml"];
        if verbose {
            args.push("-v");
        }
        args.extend(["--limit", limit.as_str(), target]);
        Ok(xml::parse_log(&self.run_string(&args)?)?.entries)
    }

    /// Concrete revision number of `rev`.
    fn revision_number(&self, rev: &str) -> Result<u64> {
        if let Ok(number) = rev.parse() {
            return Ok(number);
        }
        let target = format!("{}@{rev}", self.url);
        self.log(&target, 1, false)?
            .first()
            .map(|entry| entry.revision)
            .ok_or_else(|| LensError::Parse(format!("svn log returned no entry for {rev}")))
    }

    /// `parent:id` for `diff -r`, deriving the parent as `id - 1`.
    fn range(&self, id: &str, parent: Option<&str>) -> Result<String> {
        let id = revision_arg(id)?;
        let parent = match parent.filter(|p| !p.is_empty()) {
            Some(parent) => revision_arg(parent)?,
            None => self.revision_number(&id)?.saturating_sub(1).to_string(),
        };
        Ok(format!("{parent}:{id}"))
    }
}

impl SvnBackend {
    /// A closed backend using the configured `svn` binary and timeout.
    pub fn new(config: &LensConfig) -> Self {
        Self {
            binary: config.svn.binary.clone(),
            timeout: config.exec.timeout(),
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

    /// Create a repository at `base` with the usual `trunk`, `tags` and
    /// `branches` layout.
    ///
    /// `shared` has no Subversion equivalent and is ignored; use `mode` to
    /// open up permissions.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Validation`] if `base` already exists, or
    /// [`LensError::Command`] if `svnadmin`, `svn mkdir` or `chmod` fails.
    pub fn create(
        config: &LensConfig,
        base: &Path,
        mode: Option<&str>,
        shared: &SharedMode,
    ) -> Result<()> {
        if base.exists() {
            return Err(LensError::Validation(format!(
                "{} already exists",
                base.display()
            )));
        }
        if *shared != SharedMode::False {
            debug!(?shared, "shared mode does not apply to subversion repositories");
        }
        let timeout = config.exec.timeout();

        let svnadmin = ToolRunner::new(&config.svn.admin_binary).with_timeout(timeout);
        svnadmin.run_checked(&[OsString::from("create"), base.as_os_str().to_owned()])?;

        let url = file_url(&base.canonicalize()?);
        let svn = ToolRunner::new(&config.svn.binary).with_timeout(timeout);
        svn.run_checked(&[
            "--non-interactive".to_string(),
            "mkdir".into(),
            format!("{url}/trunk"),
            format!("{url}/tags"),
            format!("{url}/branches"),
            "-m".into(),
            "Initial Commit".into(),
        ])?;

        apply_mode(base, mode, timeout)?;
        info!(base = %base.display(), "created subversion repository");
        Ok(())
    }

    /// The `file://` URL recorded by `open`, if open.
    pub fn url(&self) -> Option<&str> {
        self.handle.as_ref().map(|h| h.url.as_str())
    }

    /// The location passed to `open`, if open.
    pub fn location(&self) -> Option<&Path> {
        self.handle.as_ref().map(|h| h.location.as_path())
    }

    fn handle(&self) -> Result<&Handle> {
        self.handle.as_ref().ok_or(LensError::NotOpen)
    }
}

fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy();
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{}", path.replace('\\', "/"))
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Keep only the requested fields of a fully populated record.
fn restrict(full: CommitMetadata, fields: &[MetadataField]) -> CommitMetadata {
    let wants = |f| fields.contains(&f);
    CommitMetadata {
        hash: full.hash.filter(|_| wants(MetadataField::Hash)),
        abbreviated_hash: full.abbreviated_hash.filter(|_| wants(MetadataField::Abbv)),
        subject: full.subject.filter(|_| wants(MetadataField::Subject)),
        body: full.body.filter(|_| wants(MetadataField::Body)),
        notes: full.notes.filter(|_| wants(MetadataField::Notes)),
        date: full.date.filter(|_| wants(MetadataField::Date)),
        author: full.author.filter(|_| wants(MetadataField::Author)),
        parent: full.parent.filter(|_| wants(MetadataField::Parent)),
    }
}

fn metadata_from_log(entry: &LogEntry, requested: &str) -> CommitMetadata {
    CommitMetadata {
        hash: Some(entry.revision.to_string()),
        abbreviated_hash: Some(requested.to_string()),
        subject: Some(entry.msg.as_deref().unwrap_or_default().trim_end().to_string()),
        body: Some(String::new()),
        notes: Some(String::new()),
        date: Some(entry.date.as_deref().map(xml::normalize_date).unwrap_or_default()),
        author: Some(Author {
            name: entry.author.clone().unwrap_or_default(),
            email: String::new(),
        }),
        parent: (entry.revision > 1).then(|| (entry.revision - 1).to_string()),
    }
}

/// Paths from `svn diff --summarize`, relative to the repository root.
fn parse_summary(output: &str, url: &str) -> Vec<String> {
    let prefix = format!("{url}/");
    output
        .lines()
        .filter_map(|line| summary_pattern().captures(line))
        .filter_map(|caps| caps.name("file").map(|m| m.as_str().trim_end()))
        .map(|file| file.strip_prefix(prefix.as_str()).unwrap_or(file).to_string())
        .collect()
}

impl SourceControl for SvnBackend {
    fn kind(&self) -> RepoKind {
        RepoKind::Subversion
    }

    fn open(&mut self, location: &Path) -> Result<()> {
        let absolute = location.canonicalize()?;
        let url = file_url(&absolute);
        let svn = ToolRunner::new(&self.binary).with_timeout(self.timeout);
        debug!(%url, "opened subversion repository");
        self.handle = Some(Handle {
            svn,
            url,
            location: location.to_path_buf(),
            branches: vec!["HEAD".into()],
        });
        Ok(())
    }

    fn branches(&self) -> Result<&[String]> {
        Ok(&self.handle()?.branches)
    }

    fn resolve(&self, rev: &str) -> Result<Option<String>> {
        let handle = self.handle()?;
        let Ok(rev) = revision_arg(rev) else {
            return Ok(None);
        };
        let target = format!("{}@{rev}", handle.url);
        match handle.log(&target, 1, false) {
            Ok(entries) => Ok(entries.first().map(|e| e.revision.to_string())),
            Err(LensError::Command { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn exists(&self, rev: &str) -> Result<bool> {
        let handle = self.handle()?;
        if rev.eq_ignore_ascii_case("HEAD") {
            return Ok(true);
        }
        if revision_arg(rev).is_err() {
            return Ok(false);
        }
        let target = format!("{}@{rev}", handle.url);
        let output = handle
            .svn
            .run(&["--non-interactive", "log", "--limit", "1", target.as_str()])?;
        Ok(output.status.success())
    }

    fn commit_metadata(&self, id: &str, fields: &[MetadataField]) -> Result<CommitMetadata> {
        let handle = self.handle()?;
        let rev = revision_arg(id)?;
        let target = format!("{}@{rev}", handle.url);
        let entries = handle.log(&target, 1, false)?;
        let entry = entries
            .first()
            .ok_or_else(|| LensError::Parse(format!("svn log returned no entry for {id}")))?;
        Ok(restrict(metadata_from_log(entry, id), fields))
    }

    fn changed_files(&self, id: &str, parent: Option<&str>) -> Result<Vec<String>> {
        let handle = self.handle()?;
        let range = handle.range(id, parent)?;
        let output = handle.run_string(&["diff", "-r", &range, &handle.url, "--summarize"])?;
        Ok(parse_summary(&output, &handle.url))
    }

    fn diff(&self, id: &str, parent: Option<&str>, file: Option<&str>) -> Result<String> {
        let handle = self.handle()?;
        if let Some(file) = file.filter(|f| !f.is_empty()) {
            // Scoping fails when the file is missing at one end of the range.
            debug!(file, "svn diff is not scoped to a file; returning the full diff");
        }
        let range = handle.range(id, parent)?;
        handle.run_string(&["diff", "-r", &range, &handle.url])
    }

    fn diff_stats(
        &self,
        id: &str,
        parent: Option<&str>,
        file: Option<&str>,
    ) -> Result<Vec<NumStat>> {
        let raw = self.diff(id, parent, file)?;
        let diff = parse_unified_diff(&raw)?;
        let file = file.map(normalize_path).filter(|f| !f.is_empty());
        Ok(diff
            .into_iter()
            .filter(|f| file.map_or(true, |wanted| f.path == wanted))
            .map(|f| NumStat {
                path: f.path,
                added: Some(f.lines_added as u64),
                removed: Some(f.lines_removed as u64),
            })
            .collect())
    }

    fn path_details(&self, branch: &str, path: &str) -> Result<Option<TreeEntry>> {
        let handle = self.handle()?;
        let path = normalize_path(path);
        if is_root_path(path) {
            return Ok(Some(root_entry(branch)));
        }
        let rev = revision_arg(branch)?;
        let target = format!("{}@{rev}", handle.url_for(path));
        let output = match handle.run_string(&["info", "--xml", &target]) {
            Ok(output) => output,
            Err(e) if NOT_FOUND_CODES.iter().any(|c| e.is_command_failure_containing(c)) => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };
        let info = xml::parse_info(&output)?;
        Ok(info.entries.first().map(|entry| {
            let (kind, permissions) = xml::map_kind(&entry.kind);
            TreeEntry {
                permissions: permissions.into(),
                kind,
                hash: format!("{path}@{}", entry.revision),
                path: path.to_string(),
                name: basename(path).to_string(),
            }
        }))
    }

    fn revision_list(
        &self,
        branch: &str,
        count: usize,
        offset: usize,
        file: Option<&str>,
    ) -> Result<Vec<String>> {
        let handle = self.handle()?;
        let rev = revision_arg(branch)?;
        let limit = count.saturating_add(offset);
        if count == 0 {
            return Ok(Vec::new());
        }
        let target = format!("{}@{rev}", handle.url_for(file.unwrap_or_default()));
        Ok(handle
            .log(&target, limit, true)?
            .into_iter()
            .skip(offset)
            .take(count)
            .map(|entry| entry.revision.to_string())
            .collect())
    }

    fn show(&self, id: &str) -> Result<Vec<u8>> {
        let handle = self.handle()?;
        let (path, rev) = id.rsplit_once('@').ok_or_else(|| {
            LensError::Validation(format!("'{id}' is not a path@revision id"))
        })?;
        let rev = revision_arg(rev)?;
        let target = format!("{}@{rev}", handle.url_for(path));
        handle.run(&["cat", &target])
    }

    fn tree_list(&self, branch: &str, folder: &str) -> Result<Vec<TreeEntry>> {
        let handle = self.handle()?;
        let rev = revision_arg(branch)?;
        let folder = normalize_path(folder);
        let folder = if is_root_path(folder) { "" } else { folder };
        let target = format!("{}@{rev}", handle.url_for(folder));
        let lists = xml::parse_list(&handle.run_string(&["list", "--xml", &target])?)?;
        Ok(lists
            .lists
            .into_iter()
            .flat_map(|list| list.entries)
            .map(|entry| {
                let (kind, permissions) = xml::map_kind(&entry.kind);
                let path = if folder.is_empty() {
                    entry.name.clone()
                } else {
                    format!("{folder}/{}", entry.name)
                };
                TreeEntry {
                    permissions: permissions.into(),
                    kind,
                    hash: format!("{path}@{rev}"),
                    path,
                    name: entry.name,
                }
            })
            .collect())
    }
}
