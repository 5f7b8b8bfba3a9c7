use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LensError;

/// The version-control system behind a repository.
///
/// The numeric tags `1` and `2` are accepted for compatibility with stored
/// project records.
///
/// # Examples
///
/// ```
/// use repolens_core::RepoKind;
///
/// assert_eq!("git".parse::<RepoKind>().unwrap(), RepoKind::Git);
/// assert_eq!("2".parse::<RepoKind>().unwrap(), RepoKind::Subversion);
/// assert!("hg".parse::<RepoKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    /// Git, addressed by content hashes.
    Git,
    /// Subversion, addressed by monotonic revision numbers.
    Subversion,
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoKind::Git => write!(f, "git"),
            RepoKind::Subversion => write!(f, "subversion"),
        }
    }
}

impl FromStr for RepoKind {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "git" | "1" => Ok(RepoKind::Git),
            "svn" | "subversion" | "2" => Ok(RepoKind::Subversion),
            other => Err(LensError::UnknownRepoType(other.to_string())),
        }
    }
}

/// Kind of object a [`TreeEntry`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A directory.
    Tree,
    /// A file.
    Blob,
    /// A submodule (Git gitlink).
    Commit,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Tree => write!(f, "tree"),
            EntryKind::Blob => write!(f, "blob"),
            EntryKind::Commit => write!(f, "commit"),
        }
    }
}

impl FromStr for EntryKind {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tree" => Ok(EntryKind::Tree),
            "blob" => Ok(EntryKind::Blob),
            "commit" => Ok(EntryKind::Commit),
            other => Err(LensError::Parse(format!("unknown tree entry type: {other}"))),
        }
    }
}

/// One entry of a directory listing.
///
/// # Examples
///
/// ```
/// use repolens_core::{EntryKind, TreeEntry};
///
/// let entry = TreeEntry {
///     permissions: "100644".into(),
///     kind: EntryKind::Blob,
///     hash: "6bd106ca427102ce9cdca16aa8560681de69a868".into(),
///     path: "docs/readme.md".into(),
///     name: "readme.md".into(),
/// };
/// assert_eq!(entry.kind.to_string(), "blob");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEntry {
    /// Octal-like mode token (`100644`, `040000`, ...).
    pub permissions: String,
    /// What the entry points at.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Content id (Git) or revision-qualified path id (Subversion).
    pub hash: String,
    /// Full path from the repository root, without leading or trailing `/`.
    pub path: String,
    /// Name within the queried folder.
    pub name: String,
}

/// A commit field that can be requested from a backend.
///
/// # Examples
///
/// ```
/// use repolens_core::MetadataField;
///
/// let field: MetadataField = "abbv".parse().unwrap();
/// assert_eq!(field, MetadataField::Abbv);
/// assert_eq!(field.name(), "abbv");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataField {
    /// Full commit id / revision number.
    Hash,
    /// First line of the message.
    Subject,
    /// Commit timestamp.
    Date,
    /// Abbreviated commit id.
    Abbv,
    /// Message body after the subject.
    Body,
    /// Attached notes.
    Notes,
    /// First parent id.
    Parent,
    /// Name and email of the author (composite).
    Author,
}

impl MetadataField {
    /// Every field, in canonical order.
    pub const ALL: [MetadataField; 8] = [
        MetadataField::Hash,
        MetadataField::Subject,
        MetadataField::Date,
        MetadataField::Author,
        MetadataField::Abbv,
        MetadataField::Body,
        MetadataField::Notes,
        MetadataField::Parent,
    ];

    /// The fields shown in listings.
    pub const BASIC: [MetadataField; 4] = [
        MetadataField::Hash,
        MetadataField::Subject,
        MetadataField::Date,
        MetadataField::Author,
    ];

    /// Lowercase field name.
    pub fn name(self) -> &'static str {
        match self {
            MetadataField::Hash => "hash",
            MetadataField::Subject => "subject",
            MetadataField::Date => "date",
            MetadataField::Abbv => "abbv",
            MetadataField::Body => "body",
            MetadataField::Notes => "notes",
            MetadataField::Parent => "parent",
            MetadataField::Author => "author",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetadataField {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetadataField::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| LensError::Validation(format!("unknown metadata field: {s}")))
    }
}

/// Commit author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Email address; empty for Subversion.
    pub email: String,
}

/// Metadata of a single commit, restricted to the fields that were asked for.
///
/// Fields that were not requested stay `None`. `parent` is only ever the
/// first parent; merge commits are collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMetadata {
    /// Full commit id / revision number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Abbreviated commit id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abbreviated_hash: Option<String>,
    /// First line of the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Message body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Attached notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Timestamp, `YYYY-MM-DD HH:MM:SS +ZZZZ`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Author name and email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    /// First parent, `None` for root commits or when not requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Marker character of a diff line.
///
/// # Examples
///
/// ```
/// use repolens_core::LineMarker;
///
/// assert_eq!(LineMarker::from_char('+'), Some(LineMarker::Added));
/// assert_eq!(LineMarker::Removed.as_char(), '-');
/// assert_eq!(LineMarker::from_char('\\'), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineMarker {
    /// Unchanged line (` `).
    #[serde(rename = " ")]
    Context,
    /// Removed line (`-`).
    #[serde(rename = "-")]
    Removed,
    /// Added line (`+`).
    #[serde(rename = "+")]
    Added,
}

impl LineMarker {
    /// Classify a diff line by its leading character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            ' ' => Some(LineMarker::Context),
            '-' => Some(LineMarker::Removed),
            '+' => Some(LineMarker::Added),
            _ => None,
        }
    }

    /// The marker as it appears in unified diff text.
    pub fn as_char(self) -> char {
        match self {
            LineMarker::Context => ' ',
            LineMarker::Removed => '-',
            LineMarker::Added => '+',
        }
    }
}

/// A single line inside a hunk.
///
/// Context lines carry both numbers, removed lines only the old one, added
/// lines only the new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    /// Line classification.
    pub marker: LineMarker,
    /// Line number in the old version.
    pub old_line: Option<u32>,
    /// Line number in the new version.
    pub new_line: Option<u32>,
    /// Line text without the marker.
    pub text: String,
}

/// A contiguous block of changed lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// Lines in diff order.
    pub lines: Vec<DiffLine>,
}

/// A `start,len` pair from a hunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    /// First line covered.
    pub start: u32,
    /// Number of lines covered.
    pub len: u32,
}

/// Parsed `@@ -a,b +c,d @@ heading` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkSummary {
    /// Range in the old version.
    pub old: LineRange,
    /// Range in the new version.
    pub new: LineRange,
    /// Text after the closing `@@`, usually the enclosing function.
    pub heading: String,
}

/// All hunks for one file of a diff.
///
/// `lines_added` / `lines_removed` always equal the number of `+` / `-`
/// lines across `hunks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffFile {
    /// Path of the file, relative to the repository root.
    pub path: String,
    /// Hunks in diff order.
    pub hunks: Vec<Hunk>,
    /// One header summary per hunk, same order as `hunks`.
    pub hunks_summary: Vec<HunkSummary>,
    /// Count of `-` lines.
    pub lines_removed: usize,
    /// Count of `+` lines.
    pub lines_added: usize,
}

impl DiffFile {
    /// An empty entry for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hunks: Vec::new(),
            hunks_summary: Vec::new(),
            lines_removed: 0,
            lines_added: 0,
        }
    }
}

/// Added/removed line counts for one file, as reported by `--numstat`.
///
/// Counts are `None` for binary files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumStat {
    /// Path of the file.
    pub path: String,
    /// Lines added.
    pub added: Option<u64>,
    /// Lines removed.
    pub removed: Option<u64>,
}

/// The `--shared` permission model of a new repository.
///
/// # Examples
///
/// ```
/// use repolens_core::SharedMode;
///
/// assert_eq!("group".parse::<SharedMode>().unwrap().as_arg().as_deref(), Some("group"));
/// assert_eq!("0660".parse::<SharedMode>().unwrap(), SharedMode::Octal("0660".into()));
/// assert_eq!(SharedMode::False.as_arg(), None);
/// assert!("0999".parse::<SharedMode>().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SharedMode {
    /// Not shared.
    #[default]
    False,
    /// Same as `group`.
    True,
    /// Permissions from umask.
    Umask,
    /// Group-writable.
    Group,
    /// Group-writable and world-readable.
    All,
    /// Same as `all`.
    World,
    /// Same as `all`.
    Everybody,
    /// Explicit `0xxx` octal mode.
    Octal(String),
}

impl SharedMode {
    /// Value for `--shared=<value>`, or `None` when not shared.
    pub fn as_arg(&self) -> Option<String> {
        let value = match self {
            SharedMode::False => return None,
            SharedMode::True => "true",
            SharedMode::Umask => "umask",
            SharedMode::Group => "group",
            SharedMode::All => "all",
            SharedMode::World => "world",
            SharedMode::Everybody => "everybody",
            SharedMode::Octal(mode) => mode.as_str(),
        };
        Some(value.to_string())
    }
}

impl FromStr for SharedMode {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "false" | "" => Ok(SharedMode::False),
            "true" => Ok(SharedMode::True),
            "umask" => Ok(SharedMode::Umask),
            "group" => Ok(SharedMode::Group),
            "all" => Ok(SharedMode::All),
            "world" => Ok(SharedMode::World),
            "everybody" => Ok(SharedMode::Everybody),
            octal
                if octal.len() == 4
                    && octal.starts_with('0')
                    && octal.chars().all(|c| ('0'..='7').contains(&c)) =>
            {
                Ok(SharedMode::Octal(octal.to_string()))
            }
            other => Err(LensError::Validation(format!("invalid shared mode: {other}"))),
        }
    }
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use repolens_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_kind_from_str() {
        assert_eq!("GIT".parse::<RepoKind>().unwrap(), RepoKind::Git);
        assert_eq!("1".parse::<RepoKind>().unwrap(), RepoKind::Git);
        assert_eq!("svn".parse::<RepoKind>().unwrap(), RepoKind::Subversion);
        assert_eq!(
            "Subversion".parse::<RepoKind>().unwrap(),
            RepoKind::Subversion
        );
        let err = "3".parse::<RepoKind>().unwrap_err();
        assert!(matches!(err, LensError::UnknownRepoType(t) if t == "3"));
    }

    #[test]
    fn metadata_field_names_round_trip() {
        for field in MetadataField::ALL {
            assert_eq!(field.name().parse::<MetadataField>().unwrap(), field);
        }
        assert!("committer".parse::<MetadataField>().is_err());
    }

    #[test]
    fn entry_kind_parses_git_vocabulary() {
        assert_eq!("tree".parse::<EntryKind>().unwrap(), EntryKind::Tree);
        assert_eq!("commit".parse::<EntryKind>().unwrap(), EntryKind::Commit);
        assert!("dir".parse::<EntryKind>().is_err());
    }

    #[test]
    fn tree_entry_serializes_type_key() {
        let entry = TreeEntry {
            permissions: "040000".into(),
            kind: EntryKind::Tree,
            hash: "abc".into(),
            path: "src".into(),
            name: "src".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "tree");
        assert_eq!(json["permissions"], "040000");
    }

    #[test]
    fn commit_metadata_skips_unrequested_fields() {
        let meta = CommitMetadata {
            hash: Some("abc".into()),
            ..CommitMetadata::default()
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json, serde_json::json!({ "hash": "abc" }));
    }

    #[test]
    fn diff_line_marker_serializes_as_char() {
        let line = DiffLine {
            marker: LineMarker::Added,
            old_line: None,
            new_line: Some(3),
            text: "x".into(),
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["marker"], "+");
        assert_eq!(json["newLine"], 3);
        assert!(json["oldLine"].is_null());
    }

    #[test]
    fn shared_mode_rejects_garbage() {
        assert!("sometimes".parse::<SharedMode>().is_err());
        assert!("06600".parse::<SharedMode>().is_err());
        assert_eq!("".parse::<SharedMode>().unwrap(), SharedMode::False);
        assert_eq!(SharedMode::True.as_arg().as_deref(), Some("true"));
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
