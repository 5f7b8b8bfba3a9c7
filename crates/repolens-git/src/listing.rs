//! Parsers for the line-oriented output of `git branch`, `ls-tree`,
//! `diff-tree --name-only` and `diff-tree --numstat`.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use repolens_core::{EntryKind, NumStat, TreeEntry};

fn branch_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[*+]\s+|\s+)?(?P<name>.+)$").expect("branch pattern is valid")
    })
}

fn tree_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^(?P<mode>\d+) (?P<kind>\w+) (?P<hash>[0-9a-fA-F]+)\s(?P<path>.+)$")
            .expect("tree pattern is valid")
    })
}

/// Branch names from `git branch`, with the current-branch (`*`) and
/// other-worktree (`+`) markers removed.
///
/// Detached-HEAD pseudo entries such as `(HEAD detached at 1a2b3c)` are
/// skipped. Whitespace inside a name is kept.
///
/// # Examples
///
/// ```
/// use repolens_git::listing::parse_branches;
///
/// let out = "  feature/login\n* master\n  release 1.0\n";
/// assert_eq!(parse_branches(out), ["feature/login", "master", "release 1.0"]);
/// ```
pub fn parse_branches(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| branch_pattern().captures(line))
        .filter_map(|caps| caps.name("name").map(|m| m.as_str().trim_end()))
        .filter(|name| !name.is_empty() && !name.starts_with('('))
        .map(str::to_string)
        .collect()
}

/// Parse one `ls-tree` record (`<mode> <type> <hash>\t<path>`).
///
/// `name` is the path with `folder/` removed, or the last component when
/// `folder` is `None`. Returns `None` for records that do not match.
pub fn parse_tree_line(record: &str, folder: Option<&str>) -> Option<TreeEntry> {
    let caps = tree_pattern().captures(record)?;
    let kind = EntryKind::from_str(&caps["kind"]).ok()?;
    let path = caps["path"].to_string();
    let name = match folder {
        Some(folder) if !folder.is_empty() => path
            .strip_prefix(folder)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&path)
            .to_string(),
        _ => basename(&path).to_string(),
    };
    Some(TreeEntry {
        permissions: caps["mode"].to_string(),
        kind,
        hash: caps["hash"].to_string(),
        path,
        name,
    })
}

/// Parse the NUL-separated output of `ls-tree -z` for entries of `folder`.
///
/// An empty `folder` means the repository root, where name and path agree.
///
/// # Examples
///
/// ```
/// use repolens_git::listing::parse_tree_listing;
///
/// let out = "100644 blob 6bd106ca427102ce9cdca16aa8560681de69a868\tdocs/read me.md\0\
///            040000 tree 3bf28d1fcf53f5b85e55d37e86d5954a738ac36c\tdocs/img\0";
/// let entries = parse_tree_listing(out, "docs");
/// assert_eq!(entries[0].name, "read me.md");
/// assert_eq!(entries[1].path, "docs/img");
/// ```
pub fn parse_tree_listing(output: &str, folder: &str) -> Vec<TreeEntry> {
    output
        .split('\0')
        .filter(|record| !record.is_empty())
        .filter_map(|record| parse_tree_line(record, Some(folder)))
        .collect()
}

/// Paths from `diff-tree --name-only -r`, without the echoed commit id.
///
/// Against the root, `diff-tree` prints the full commit id before the file
/// list; `id` may be an abbreviation of it.
pub fn parse_changed_files(output: &str, id: &str) -> Vec<String> {
    let mut lines = output.lines().filter(|line| !line.is_empty()).peekable();
    if lines.peek().is_some_and(|first| is_commit_echo(first, id)) {
        lines.next();
    }
    lines.map(str::to_string).collect()
}

fn is_commit_echo(line: &str, id: &str) -> bool {
    line == id
        || (matches!(line.len(), 40 | 64)
            && line.starts_with(id)
            && line.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Per-file counts from `diff-tree --numstat`.
///
/// Binary files are reported by git as `-\t-\tpath` and get `None` counts.
///
/// # Examples
///
/// ```
/// use repolens_git::listing::parse_numstat;
///
/// let stats = parse_numstat("3\t1\tsrc/lib.rs\n-\t-\tlogo.png\n");
/// assert_eq!(stats[0].added, Some(3));
/// assert_eq!(stats[1].removed, None);
/// ```
pub fn parse_numstat(output: &str) -> Vec<NumStat> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');
            let added = parts.next()?;
            let removed = parts.next()?;
            let path = parts.next()?;
            Some(NumStat {
                path: path.to_string(),
                added: added.parse().ok(),
                removed: removed.parse().ok(),
            })
        })
        .collect()
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
