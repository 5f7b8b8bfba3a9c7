//! Serde mapping of `svn --xml` output for `log`, `info` and `list`.
//!
//! Only the attributes and elements the backend reads are modelled; serde
//! ignores the rest.

use chrono::DateTime;
use serde::Deserialize;

use repolens_core::{EntryKind, LensError};

/// Root of `svn log --xml`.
#[derive(Debug, Deserialize, Default)]
pub struct Log {
    #[serde(rename = "logentry", default)]
    pub entries: Vec<LogEntry>,
}

/// One `<logentry>`.
#[derive(Debug, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "@revision")]
    pub revision: u64,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub paths: Option<LogPaths>,
}

/// `<paths>`, present with `log -v`.
#[derive(Debug, Deserialize, Default)]
pub struct LogPaths {
    #[serde(rename = "path", default)]
    pub paths: Vec<LogPath>,
}

/// A changed path of a log entry.
#[derive(Debug, Deserialize)]
pub struct LogPath {
    #[serde(rename = "@action")]
    pub action: String,
    #[serde(rename = "@kind", default)]
    pub kind: Option<String>,
    #[serde(rename = "$text")]
    pub path: String,
}

/// Root of `svn info --xml`.
#[derive(Debug, Deserialize, Default)]
pub struct Info {
    #[serde(rename = "entry", default)]
    pub entries: Vec<InfoEntry>,
}

/// One `<entry>` of `svn info`.
#[derive(Debug, Deserialize)]
pub struct InfoEntry {
    #[serde(rename = "@kind")]
    pub kind: String,
    #[serde(rename = "@path")]
    pub path: String,
    #[serde(rename = "@revision")]
    pub revision: u64,
}

/// Root of `svn list --xml`.
#[derive(Debug, Deserialize, Default)]
pub struct Lists {
    #[serde(rename = "list", default)]
    pub lists: Vec<List>,
}

/// The listing of one target.
#[derive(Debug, Deserialize)]
pub struct List {
    #[serde(rename = "@path")]
    pub path: String,
    #[serde(rename = "entry", default)]
    pub entries: Vec<ListEntry>,
}

/// One `<entry>` of `svn list`.
#[derive(Debug, Deserialize)]
pub struct ListEntry {
    #[serde(rename = "@kind")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub commit: Option<ListCommit>,
}

/// Last change of a listed entry.
#[derive(Debug, Deserialize)]
pub struct ListCommit {
    #[serde(rename = "@revision")]
    pub revision: u64,
}

fn parse<'de, T: Deserialize<'de>>(what: &str, xml: &'de str) -> Result<T, LensError> {
    quick_xml::de::from_str(xml).map_err(|e| LensError::Parse(format!("svn {what} xml: {e}")))
}

/// Parse `svn log --xml`.
///
/// # Errors
///
/// Returns [`LensError::Parse`] if the document does not match the log schema.
///
/// # Examples
///
/// ```
/// use repolens_svn::xml::parse_log;
///
/// let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
/// <log>
/// <logentry revision="7"><author>alice</author><msg>Fix build</msg></logentry>
/// </log>"#;
/// let log = parse_log(xml).unwrap();
/// assert_eq!(log.entries[0].revision, 7);
/// assert_eq!(log.entries[0].msg.as_deref(), Some("Fix build"));
/// ```
pub fn parse_log(xml: &str) -> Result<Log, LensError> {
    parse("log", xml)
}

/// Parse `svn info --xml`.
///
/// # Errors
///
/// Returns [`LensError::Parse`] if the document does not match the info schema.
pub fn parse_info(xml: &str) -> Result<Info, LensError> {
    parse("info", xml)
}

/// Parse `svn list --xml`.
///
/// # Errors
///
/// Returns [`LensError::Parse`] if the document does not match the list schema.
pub fn parse_list(xml: &str) -> Result<Lists, LensError> {
    parse("list", xml)
}

/// Map an SVN node kind onto the shared entry vocabulary.
///
/// Subversion exposes no execute bit here, so permissions are fixed tokens:
/// `100664` for directories and `100400` for files.
///
/// # Examples
///
/// ```
/// use repolens_core::EntryKind;
/// use repolens_svn::xml::map_kind;
///
/// assert_eq!(map_kind("dir"), (EntryKind::Tree, "100664"));
/// assert_eq!(map_kind("file"), (EntryKind::Blob, "100400"));
/// ```
pub fn map_kind(kind: &str) -> (EntryKind, &'static str) {
    match kind {
        "dir" => (EntryKind::Tree, "100664"),
        _ => (EntryKind::Blob, "100400"),
    }
}

/// Render an SVN timestamp (`2013-01-28T16:48:34.123456Z`) like git's `%ci`.
///
/// Values chrono cannot read are returned unchanged.
///
/// # Examples
///
/// ```
/// use repolens_svn::xml::normalize_date;
///
/// assert_eq!(normalize_date("2013-01-28T16:48:34.123456Z"), "2013-01-28 16:48:34 +0000");
/// assert_eq!(normalize_date("yesterday"), "yesterday");
/// ```
pub fn normalize_date(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(date) => date.format("%Y-%m-%d %H:%M:%S %z").to_string(),
        Err(_) => raw.to_string(),
    }
}
