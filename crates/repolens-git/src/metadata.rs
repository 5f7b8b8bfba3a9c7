//! Sentinel-delimited extraction of several commit fields in one `git show`.
//!
//! For a requested field list the codec emits a `--format` string in which
//! every placeholder is wrapped in an open and a close sentinel, e.g.
//! `{@{%H}@}{@{%s}@}`, and a regex that mirrors the same order with one
//! named group per placeholder. Composite fields (the author) expand to one
//! placeholder per sub-field.
//!
//! The sentinels only have to be unlikely in commit text, not impossible. A
//! message that contains them makes [`MetadataCodec::decode`] return `None`,
//! and the backend then asks for each field separately.

use regex::Regex;
use repolens_core::{Author, CommitMetadata, LensError, MetadataConfig, MetadataField};

/// One `git log` placeholder and the group name it is captured under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    /// Regex group name (unique across all fields).
    pub group: &'static str,
    /// Pretty-format specifier, e.g. `%H`.
    pub spec: &'static str,
}

/// Placeholders that make up `field`, in output order.
///
/// # Examples
///
/// ```
/// use repolens_core::MetadataField;
/// use repolens_git::metadata::placeholders;
///
/// let specs: Vec<_> = placeholders(MetadataField::Author).iter().map(|p| p.spec).collect();
/// assert_eq!(specs, ["%cn", "%ce"]);
/// ```
pub fn placeholders(field: MetadataField) -> &'static [Placeholder] {
    match field {
        MetadataField::Hash => &[Placeholder { group: "hash", spec: "%H" }],
        MetadataField::Subject => &[Placeholder { group: "subject", spec: "%s" }],
        MetadataField::Date => &[Placeholder { group: "date", spec: "%ci" }],
        MetadataField::Abbv => &[Placeholder { group: "abbv", spec: "%h" }],
        MetadataField::Body => &[Placeholder { group: "body", spec: "%b" }],
        MetadataField::Notes => &[Placeholder { group: "notes", spec: "%N" }],
        MetadataField::Parent => &[Placeholder { group: "parent", spec: "%P" }],
        MetadataField::Author => &[
            Placeholder { group: "author_name", spec: "%cn" },
            Placeholder { group: "author_email", spec: "%ce" },
        ],
    }
}

/// Builds the `--format` string and matching extraction regex for a field list.
///
/// # Examples
///
/// ```
/// use repolens_core::MetadataField;
/// use repolens_git::MetadataCodec;
///
/// let codec = MetadataCodec::default();
/// let fields = [MetadataField::Hash, MetadataField::Author];
/// assert_eq!(codec.format_string(&fields), "{@{%H}@}{@{%cn}@}{@{%ce}@}");
///
/// let meta = codec
///     .decode(&fields, "{@{4f2a}@}{@{Alice}@}{@{alice@example.com}@}")
///     .unwrap()
///     .unwrap();
/// assert_eq!(meta.hash.as_deref(), Some("4f2a"));
/// assert_eq!(meta.author.unwrap().email, "alice@example.com");
/// assert!(meta.subject.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct MetadataCodec {
    open: String,
    close: String,
}

impl Default for MetadataCodec {
    fn default() -> Self {
        Self::from_config(&MetadataConfig::default())
    }
}

impl MetadataCodec {
    /// A codec using the given sentinel tokens.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// A codec using the configured sentinel tokens.
    pub fn from_config(config: &MetadataConfig) -> Self {
        Self::new(&config.open_delimiter, &config.close_delimiter)
    }

    /// `--format` value for `fields`, duplicates dropped.
    pub fn format_string(&self, fields: &[MetadataField]) -> String {
        expand(fields)
            .into_iter()
            .map(|p| format!("{}{}{}", self.open, p.spec, self.close))
            .collect()
    }

    /// Regex matching the output of [`format_string`](Self::format_string)
    /// for the same `fields`, one named group per placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Parse`] if the regex cannot be compiled.
    pub fn pattern(&self, fields: &[MetadataField]) -> Result<Regex, LensError> {
        let open = regex::escape(&self.open);
        let close = regex::escape(&self.close);
        let body: String = expand(fields)
            .into_iter()
            .map(|p| format!("{open}(?P<{}>.*){close}", p.group))
            .collect();
        Regex::new(&format!("(?s)^{body}$"))
            .map_err(|e| LensError::Parse(format!("metadata pattern: {e}")))
    }

    /// Extract `fields` from one `git show` output.
    ///
    /// Returns `Ok(None)` when the output does not match, or when a sentinel
    /// appears more often than the format string put it there, meaning the
    /// commit text itself contains one.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Parse`] if the regex cannot be compiled.
    pub fn decode(
        &self,
        fields: &[MetadataField],
        output: &str,
    ) -> Result<Option<CommitMetadata>, LensError> {
        let expected = expand(fields).len();
        if output.matches(self.open.as_str()).count() != expected
            || output.matches(self.close.as_str()).count() != expected
        {
            return Ok(None);
        }

        let pattern = self.pattern(fields)?;
        let Some(caps) = pattern.captures(output) else {
            return Ok(None);
        };

        let mut meta = CommitMetadata::default();
        for p in expand(fields) {
            let value = caps.name(p.group).map_or("", |m| m.as_str());
            apply(&mut meta, p.group, value);
        }
        Ok(Some(meta))
    }
}

/// Store one extracted placeholder value in `meta`.
///
/// Trailing whitespace is dropped; `%P` is reduced to its first parent.
pub fn apply(meta: &mut CommitMetadata, group: &str, raw: &str) {
    let value = raw.trim_end().to_string();
    match group {
        "hash" => meta.hash = Some(value),
        "subject" => meta.subject = Some(value),
        "date" => meta.date = Some(value),
        "abbv" => meta.abbreviated_hash = Some(value),
        "body" => meta.body = Some(value),
        "notes" => meta.notes = Some(value),
        "parent" => meta.parent = value.split_whitespace().next().map(str::to_string),
        "author_name" => meta.author.get_or_insert_with(Author::default).name = value,
        "author_email" => meta.author.get_or_insert_with(Author::default).email = value,
        _ => {}
    }
}

/// Placeholders for `fields` in output order, duplicate fields dropped.
///
/// This is also the list of single-placeholder queries the backend issues
/// when the combined output cannot be decoded.
pub fn expand(fields: &[MetadataField]) -> Vec<Placeholder> {
    unique(fields)
        .into_iter()
        .flat_map(placeholders)
        .copied()
        .collect()
}

fn unique(fields: &[MetadataField]) -> Vec<MetadataField> {
    let mut seen = Vec::with_capacity(fields.len());
    for field in fields {
        if !seen.contains(field) {
            seen.push(*field);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mimic git expanding a format string with the given values.
    fn render(codec: &MetadataCodec, fields: &[MetadataField], values: &[(&str, &str)]) -> String {
        let mut out = codec.format_string(fields);
        for (spec, value) in values {
            out = out.replace(spec, value);
        }
        out
    }

    #[test]
    fn every_field_has_placeholders() {
        for field in MetadataField::ALL {
            let list = placeholders(field);
            assert!(!list.is_empty(), "{field:?}");
            assert!(list.iter().all(|p| p.spec.starts_with('%')), "{field:?}");
        }
        let mut groups: Vec<_> = expand(&MetadataField::ALL).iter().map(|p| p.group).collect();
        groups.sort_unstable();
        groups.dedup();
        assert_eq!(groups.len(), 9);
    }

    #[test]
    fn format_string_follows_field_order() {
        let codec = MetadataCodec::default();
        let fields = [MetadataField::Subject, MetadataField::Hash];
        assert_eq!(codec.format_string(&fields), "{@{%s}@}{@{%H}@}");
    }

    #[test]
    fn duplicate_fields_are_emitted_once() {
        let codec = MetadataCodec::default();
        let fields = [MetadataField::Hash, MetadataField::Hash];
        assert_eq!(codec.format_string(&fields), "{@{%H}@}");
        assert!(codec.pattern(&fields).is_ok());
    }

    #[test]
    fn round_trip_recovers_requested_fields() {
        let codec = MetadataCodec::default();
        let fields = MetadataField::ALL;
        let output = render(
            &codec,
            &fields,
            &[
                ("%H", "b1bcad6cc5be9a89df080a810a03c81970ddcfb5"),
                ("%s", "Commit Subject"),
                ("%ci", "2013-01-28 16:48:34 +0000"),
                ("%cn", "Author1"),
                ("%ce", "author@example.com"),
                ("%h", "b1bcad6"),
                ("%b", "More chat about the commit\n"),
                ("%N", ""),
                ("%P", "3bf28d1fcf53f5b85e55d37e86d5954a738ac36c"),
            ],
        );
        let meta = codec.decode(&fields, &output).unwrap().unwrap();
        assert_eq!(
            meta,
            CommitMetadata {
                hash: Some("b1bcad6cc5be9a89df080a810a03c81970ddcfb5".into()),
                abbreviated_hash: Some("b1bcad6".into()),
                subject: Some("Commit Subject".into()),
                body: Some("More chat about the commit".into()),
                notes: Some(String::new()),
                date: Some("2013-01-28 16:48:34 +0000".into()),
                author: Some(Author {
                    name: "Author1".into(),
                    email: "author@example.com".into(),
                }),
                parent: Some("3bf28d1fcf53f5b85e55d37e86d5954a738ac36c".into()),
            }
        );
    }

    #[test]
    fn only_author_is_populated_when_asked_for_author() {
        let codec = MetadataCodec::default();
        let fields = [MetadataField::Author];
        let output = "{@{Phillip Whittlesea}@}{@{pw.github@thega.me.uk}@}";
        let meta = codec.decode(&fields, output).unwrap().unwrap();
        assert_eq!(
            meta,
            CommitMetadata {
                author: Some(Author {
                    name: "Phillip Whittlesea".into(),
                    email: "pw.github@thega.me.uk".into(),
                }),
                ..CommitMetadata::default()
            }
        );
    }

    #[test]
    fn hostile_text_between_sentinels_survives() {
        let codec = MetadataCodec::default();
        let fields = [MetadataField::Subject, MetadataField::Body];
        let body = "quotes ' \" and $(rm -rf /)\nsecond line\twith tab\u{7}";
        let output = render(&codec, &fields, &[("%s", "Fix 'it' \"now\""), ("%b", body)]);
        let meta = codec.decode(&fields, &output).unwrap().unwrap();
        assert_eq!(meta.subject.as_deref(), Some("Fix 'it' \"now\""));
        assert_eq!(meta.body.as_deref(), Some(body));
    }

    #[test]
    fn merge_parents_collapse_to_first() {
        let codec = MetadataCodec::default();
        let fields = [MetadataField::Parent];
        let meta = codec
            .decode(&fields, "{@{aaa111 bbb222}@}")
            .unwrap()
            .unwrap();
        assert_eq!(meta.parent.as_deref(), Some("aaa111"));
    }

    #[test]
    fn root_commit_has_no_parent() {
        let codec = MetadataCodec::default();
        let meta = codec
            .decode(&[MetadataField::Parent], "{@{}@}")
            .unwrap()
            .unwrap();
        assert_eq!(meta.parent, None);
    }

    #[test]
    fn sentinel_in_payload_is_reported_as_no_match() {
        let codec = MetadataCodec::default();
        let fields = [MetadataField::Subject, MetadataField::Body];
        let output = "{@{Subject with }@}{@{ inside}@}{@{body}@}";
        assert_eq!(codec.decode(&fields, output).unwrap(), None);
    }

    #[test]
    fn unrelated_output_is_no_match() {
        let codec = MetadataCodec::default();
        assert_eq!(
            codec.decode(&[MetadataField::Hash], "fatal: bad object").unwrap(),
            None
        );
    }

    #[test]
    fn custom_sentinels_are_escaped_in_pattern() {
        let codec = MetadataCodec::new("[[(", ")]]");
        let fields = [MetadataField::Hash, MetadataField::Subject];
        assert_eq!(codec.format_string(&fields), "[[(%H)]][[(%s)]]");
        let meta = codec
            .decode(&fields, "[[(abc)]][[(a.b*c)]]")
            .unwrap()
            .unwrap();
        assert_eq!(meta.subject.as_deref(), Some("a.b*c"));
    }

    #[test]
    fn empty_field_list() {
        let codec = MetadataCodec::default();
        assert_eq!(codec.format_string(&[]), "");
        assert_eq!(
            codec.decode(&[], "").unwrap(),
            Some(CommitMetadata::default())
        );
    }
}
