use std::fmt;

use repolens_core::{DiffFile, DiffLine, Hunk, HunkSummary, LensError, LineMarker, LineRange};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A parsed diff: one [`DiffFile`] per path, in order of first appearance.
///
/// Serializes as a JSON object keyed by path.
///
/// # Examples
///
/// ```
/// use repolens_difflens::parse_unified_diff;
///
/// let diff = "diff --git a/hello.rs b/hello.rs\n\
///             --- a/hello.rs\n\
///             +++ b/hello.rs\n\
///             @@ -1,2 +1,3 @@\n\
///              fn main() {\n\
///             +    println!(\"hello\");\n\
///              }\n";
/// let parsed = parse_unified_diff(diff).unwrap();
/// let file = parsed.get("hello.rs").unwrap();
/// assert_eq!(file.lines_added, 1);
/// assert_eq!(file.hunks[0].lines[1].new_line, Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    files: Vec<DiffFile>,
}

impl Diff {
    /// Files in order of first appearance.
    pub fn files(&self) -> &[DiffFile] {
        &self.files
    }

    /// The entry for `path`, if the diff touches it.
    pub fn get(&self, path: &str) -> Option<&DiffFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Remove and return the entry for `path`.
    pub fn take(&mut self, path: &str) -> Option<DiffFile> {
        let idx = self.files.iter().position(|f| f.path == path)?;
        Some(self.files.remove(idx))
    }

    /// Paths in order of first appearance.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the diff touches no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn insert(&mut self, file: DiffFile) {
        match self.files.iter_mut().find(|f| f.path == file.path) {
            Some(existing) => {
                existing.hunks.extend(file.hunks);
                existing.hunks_summary.extend(file.hunks_summary);
                existing.lines_added += file.lines_added;
                existing.lines_removed += file.lines_removed;
            }
            None => self.files.push(file),
        }
    }
}

impl IntoIterator for Diff {
    type Item = DiffFile;
    type IntoIter = std::vec::IntoIter<DiffFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

/// Collecting merges entries that share a path.
impl FromIterator<DiffFile> for Diff {
    fn from_iter<I: IntoIterator<Item = DiffFile>>(iter: I) -> Self {
        let mut diff = Diff::default();
        for file in iter {
            diff.insert(file);
        }
        diff
    }
}

impl Serialize for Diff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.files.len()))?;
        for file in &self.files {
            map.serialize_entry(&file.path, file)?;
        }
        map.end()
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.files {
            writeln!(
                f,
                "{} (+{} -{}, {} hunks)",
                file.path,
                file.lines_added,
                file.lines_removed,
                file.hunks.len()
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PathStyle {
    /// `a/` and `b/` prefixes must be stripped.
    Git,
    /// Paths are used as written (Subversion, plain `diff`).
    Plain,
    /// No header seen yet; decided from the `---`/`+++` pair.
    Unknown,
}

struct Section {
    header_path: Option<String>,
    old_path: Option<String>,
    new_path: Option<String>,
    style: PathStyle,
    file: DiffFile,
}

impl Section {
    fn new(header_path: Option<String>, style: PathStyle) -> Self {
        Self {
            header_path,
            old_path: None,
            new_path: None,
            style,
            file: DiffFile::new(String::new()),
        }
    }

    fn path(&self) -> Option<String> {
        let git = self.style == PathStyle::Git;
        let strip = |path: &str, prefix: &str| -> String {
            if git {
                path.strip_prefix(prefix).unwrap_or(path).to_string()
            } else {
                path.to_string()
            }
        };
        let new = self
            .new_path
            .as_deref()
            .filter(|p| *p != DEV_NULL)
            .map(|p| strip(p, "b/"));
        let old = self
            .old_path
            .as_deref()
            .filter(|p| *p != DEV_NULL)
            .map(|p| strip(p, "a/"));
        new.or(old).or_else(|| self.header_path.clone())
    }
}

const DEV_NULL: &str = "/dev/null";

/// Position inside the hunk currently being read.
struct Cursor {
    hunk: Hunk,
    old_line: u32,
    new_line: u32,
    old_left: u32,
    new_left: u32,
}

enum Consumed {
    Line { complete: bool },
    Ignored,
    NotHunkLine,
}

impl Cursor {
    fn new(summary: &HunkSummary) -> Self {
        Self {
            hunk: Hunk::default(),
            old_line: summary.old.start,
            new_line: summary.new.start,
            old_left: summary.old.len,
            new_left: summary.new.len,
        }
    }

    fn is_complete(&self) -> bool {
        self.old_left == 0 && self.new_left == 0
    }

    fn consume(&mut self, line: &str) -> Consumed {
        if line.starts_with('\\') {
            return Consumed::Ignored;
        }

        // Some tools strip the single space of an empty context line.
        let (marker, text) = match line.chars().next() {
            None if self.old_left > 0 && self.new_left > 0 => (LineMarker::Context, ""),
            None => return Consumed::NotHunkLine,
            Some(c) => match LineMarker::from_char(c) {
                Some(marker) => (marker, &line[1..]),
                None => return Consumed::NotHunkLine,
            },
        };

        let (old_line, new_line) = match marker {
            LineMarker::Context => {
                let numbers = (Some(self.old_line), Some(self.new_line));
                self.old_line = self.old_line.saturating_add(1);
                self.new_line = self.new_line.saturating_add(1);
                self.old_left = self.old_left.saturating_sub(1);
                self.new_left = self.new_left.saturating_sub(1);
                numbers
            }
            LineMarker::Removed => {
                let numbers = (Some(self.old_line), None);
                self.old_line = self.old_line.saturating_add(1);
                self.old_left = self.old_left.saturating_sub(1);
                numbers
            }
            LineMarker::Added => {
                let numbers = (None, Some(self.new_line));
                self.new_line = self.new_line.saturating_add(1);
                self.new_left = self.new_left.saturating_sub(1);
                numbers
            }
        };

        self.hunk.lines.push(DiffLine {
            marker,
            old_line,
            new_line,
            text: text.to_string(),
        });
        Consumed::Line {
            complete: self.is_complete(),
        }
    }
}

/// Parse unified diff text (as produced by `git diff-tree -p` or `svn diff`)
/// into a [`Diff`].
///
/// Recognises `diff --git`, `diff --cc`, other `diff ...` command lines and
/// Subversion `Index:` headers as file boundaries, and also starts a file on a
/// bare `---` line so header-less patches parse too. Text before the first
/// header, file metadata lines and `\ No newline at end of file` markers are
/// skipped. Combined (`@@@`) hunks of merge diffs are not parsed. A path that
/// appears in several sections is merged into one entry.
///
/// # Errors
///
/// Returns [`LensError::Parse`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use repolens_difflens::parse_unified_diff;
///
/// let parsed = parse_unified_diff("").unwrap();
/// assert!(parsed.is_empty());
/// ```
pub fn parse_unified_diff(input: &str) -> Result<Diff, LensError> {
    let mut diff = Diff::default();
    let mut section: Option<Section> = None;
    let mut cursor: Option<Cursor> = None;

    for line in input.lines() {
        if let Some(current) = cursor.as_mut() {
            match current.consume(line) {
                Consumed::Line { complete: false } | Consumed::Ignored => continue,
                Consumed::Line { complete: true } => {
                    flush_hunk(&mut section, &mut cursor);
                    continue;
                }
                Consumed::NotHunkLine => flush_hunk(&mut section, &mut cursor),
            }
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            flush_section(&mut diff, &mut section);
            section = Some(Section::new(parse_git_header(rest), PathStyle::Git));
            continue;
        }

        if let Some(rest) = line
            .strip_prefix("diff --cc ")
            .or_else(|| line.strip_prefix("diff --combined "))
        {
            flush_section(&mut diff, &mut section);
            section = Some(Section::new(Some(clean_path(rest)), PathStyle::Plain));
            continue;
        }

        if line.starts_with("diff ") {
            flush_section(&mut diff, &mut section);
            section = Some(Section::new(None, PathStyle::Unknown));
            continue;
        }

        if let Some(rest) = line.strip_prefix("Index: ") {
            flush_section(&mut diff, &mut section);
            section = Some(Section::new(Some(clean_path(rest)), PathStyle::Plain));
            continue;
        }

        if let Some(rest) = line.strip_prefix("--- ") {
            // A second `---` in the same section means a new, header-less patch.
            let starts_new = section
                .as_ref()
                .map_or(true, |s| s.old_path.is_some() || !s.file.hunks.is_empty());
            if starts_new {
                flush_section(&mut diff, &mut section);
                section = Some(Section::new(None, PathStyle::Unknown));
            }
            if let Some(current) = section.as_mut() {
                current.old_path = Some(clean_path(rest));
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("+++ ") {
            if let Some(current) = section.as_mut() {
                let new_path = clean_path(rest);
                if current.style == PathStyle::Unknown {
                    let old_ok = current
                        .old_path
                        .as_deref()
                        .map_or(true, |p| p == DEV_NULL || p.starts_with("a/"));
                    current.style = if new_path.starts_with("b/") && old_ok {
                        PathStyle::Git
                    } else {
                        PathStyle::Plain
                    };
                }
                current.new_path = Some(new_path);
            }
            continue;
        }

        if line.starts_with("@@@") {
            continue;
        }

        if line.starts_with("@@") {
            let Some(current) = section.as_mut() else {
                continue;
            };
            let summary = parse_hunk_header(line)?;
            let started = Cursor::new(&summary);
            current.file.hunks_summary.push(summary);
            cursor = Some(started);
            if cursor.as_ref().is_some_and(Cursor::is_complete) {
                flush_hunk(&mut section, &mut cursor);
            }
        }
    }

    flush_hunk(&mut section, &mut cursor);
    flush_section(&mut diff, &mut section);

    Ok(diff)
}

fn flush_hunk(section: &mut Option<Section>, cursor: &mut Option<Cursor>) {
    let Some(done) = cursor.take() else {
        return;
    };
    if let Some(current) = section.as_mut() {
        for line in &done.hunk.lines {
            match line.marker {
                LineMarker::Added => current.file.lines_added += 1,
                LineMarker::Removed => current.file.lines_removed += 1,
                LineMarker::Context => {}
            }
        }
        current.file.hunks.push(done.hunk);
    }
}

fn flush_section(diff: &mut Diff, section: &mut Option<Section>) {
    let Some(done) = section.take() else {
        return;
    };
    let Some(path) = done.path() else {
        return;
    };
    let mut file = done.file;
    file.path = path;
    diff.insert(file);
}

/// Path from a `diff --git a/<old> b/<new>` header, `b/` already removed.
fn parse_git_header(rest: &str) -> Option<String> {
    if let Some(idx) = rest.rfind(" \"b/") {
        return Some(rest[idx + 4..].trim_end_matches('"').to_string());
    }
    rest.rfind(" b/").map(|idx| rest[idx + 3..].to_string())
}

/// Drop a tab-separated suffix (`\t(revision 12)`, timestamps) and quotes.
fn clean_path(raw: &str) -> String {
    let raw = raw.split('\t').next().unwrap_or(raw);
    raw.trim().trim_matches('"').to_string()
}

fn parse_hunk_header(line: &str) -> Result<HunkSummary, LensError> {
    let (inner, heading) = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some((&s[..end], &s[end + 3..]))
        })
        .ok_or_else(|| LensError::Parse(format!("invalid hunk header: {line}")))?;

    let parts: Vec<&str> = inner.split(' ').collect();
    if parts.len() != 2 {
        return Err(LensError::Parse(format!("invalid hunk header: {line}")));
    }

    let old = parts[0]
        .strip_prefix('-')
        .ok_or_else(|| LensError::Parse(format!("invalid old range in hunk: {line}")))?;
    let new = parts[1]
        .strip_prefix('+')
        .ok_or_else(|| LensError::Parse(format!("invalid new range in hunk: {line}")))?;

    Ok(HunkSummary {
        old: parse_range(old, line)?,
        new: parse_range(new, line)?,
        heading: heading.trim().to_string(),
    })
}

fn parse_range(range: &str, context: &str) -> Result<LineRange, LensError> {
    let number = |s: &str| -> Result<u32, LensError> {
        s.parse()
            .map_err(|_| LensError::Parse(format!("invalid range number in: {context}")))
    };
    match range.split_once(',') {
        Some((start, len)) => Ok(LineRange {
            start: number(start)?,
            len: number(len)?,
        }),
        None => Ok(LineRange {
            start: number(range)?,
            len: 1,
        }),
    }
}
