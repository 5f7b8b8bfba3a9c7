//! `.gitmodules` parsing.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// One `[submodule]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submodule {
    /// Section name.
    pub name: String,
    /// Remote with the scheme and any `user@` stripped, as `host/path`.
    pub remote: String,
}

fn section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"\[submodule\s+["'](?P<name>\S*)["']\]\s+path\s*=\s*(?P<path>\S+)\s+url\s*=\s*(?P<remote>\S+)"#,
        )
        .expect("submodule regex is valid")
    })
}

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("scheme regex is valid"))
}

/// Reduce a submodule URL to `host/path`.
///
/// # Examples
///
/// ```
/// use repolens_browse::submodule::normalize_remote;
///
/// assert_eq!(normalize_remote("https://github.com/o/r.git"), "github.com/o/r.git");
/// assert_eq!(normalize_remote("git@github.com:o/r.git"), "github.com/o/r.git");
/// ```
pub fn normalize_remote(url: &str) -> String {
    if let Some(m) = scheme_re().find(url) {
        let rest = &url[m.end()..];
        // user info only counts before the first slash
        let host_end = rest.find('/').unwrap_or(rest.len());
        return match rest[..host_end].rfind('@') {
            Some(at) => rest[at + 1..].to_string(),
            None => rest.to_string(),
        };
    }
    // scp-like `user@host:path`
    let rest = url.split_once('@').map_or(url, |(_, rest)| rest);
    match rest.split_once(':') {
        Some((host, path)) => format!("{host}/{path}"),
        None => rest.to_string(),
    }
}

/// Parse `.gitmodules` content into submodules keyed by their path.
///
/// Sections missing `path` or `url` are skipped. Empty input yields an
/// empty map.
pub fn parse_gitmodules(content: &str) -> BTreeMap<String, Submodule> {
    section_re()
        .captures_iter(content)
        .map(|caps| {
            (
                caps["path"].to_string(),
                Submodule {
                    name: caps["name"].to_string(),
                    remote: normalize_remote(&caps["remote"]),
                },
            )
        })
        .collect()
}
