//! Browse-layer tests against an in-memory backend.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use repolens_browse::{
    commit_diff, fetch_commit, fetch_path, file_diff, history, load_submodules, PathView,
};
use repolens_core::{
    Author, CommitMetadata, EntryKind, LensError, LineMarker, MetadataField, NumStat, RepoKind,
    Result, SourceControl, TreeEntry,
};

const HEAD: &str = "b1bcad6cc5be9a89df080a810a03c81970ddcfb5";
const PARENT: &str = "3bf28d1fcf53f5b85e55d37e86d5954a738ac36c";
const OLDER: &str = "6bd106ca427102ce9cdca16aa8560681de69a000";

const XML_SHELL_DIFF: &str = "
diff --git a/app/Console/Command/XmlShell.php b/app/Console/Command/XmlShell.php
index 419a2ab..c0aa714 100644
--- a/app/Console/Command/XmlShell.php
+++ b/app/Console/Command/XmlShell.php
@@ -27,4 +27,4 @@ class XmlShell extends AppShell {
 \tpublic function import() {
-\t\t$this->ImportXml->execute($this->_collectParameters());
+\t\t$this->ImportXml->execute($this->__collectParameters());
 \t}";

/// Canned answers plus a record of the calls made.
#[derive(Default)]
struct FakeRepo {
    branches: Vec<String>,
    heads: HashMap<String, String>,
    commits: HashMap<String, CommitMetadata>,
    entries: HashMap<String, TreeEntry>,
    listings: HashMap<String, Vec<TreeEntry>>,
    objects: HashMap<String, Vec<u8>>,
    last_changes: HashMap<String, String>,
    changed: Vec<String>,
    diff_text: String,
    calls: RefCell<Vec<String>>,
}

impl FakeRepo {
    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn calls_to(&self, method: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(method))
            .cloned()
            .collect()
    }
}

impl SourceControl for FakeRepo {
    fn kind(&self) -> RepoKind {
        RepoKind::Git
    }

    fn open(&mut self, _location: &Path) -> Result<()> {
        Ok(())
    }

    fn branches(&self) -> Result<&[String]> {
        Ok(&self.branches)
    }

    fn resolve(&self, rev: &str) -> Result<Option<String>> {
        Ok(self.heads.get(rev).cloned().or_else(|| {
            self.commits.contains_key(rev).then(|| rev.to_string())
        }))
    }

    fn commit_metadata(&self, id: &str, fields: &[MetadataField]) -> Result<CommitMetadata> {
        self.record(format!("commit_metadata {id} {}", fields.len()));
        let full = self
            .commits
            .get(id)
            .ok_or_else(|| LensError::Validation(format!("unknown commit {id}")))?;
        let mut meta = CommitMetadata::default();
        for field in fields {
            match field {
                MetadataField::Hash => meta.hash = full.hash.clone(),
                MetadataField::Subject => meta.subject = full.subject.clone(),
                MetadataField::Date => meta.date = full.date.clone(),
                MetadataField::Author => meta.author = full.author.clone(),
                MetadataField::Abbv => meta.abbreviated_hash = full.abbreviated_hash.clone(),
                MetadataField::Body => meta.body = full.body.clone(),
                MetadataField::Notes => meta.notes = full.notes.clone(),
                MetadataField::Parent => meta.parent = full.parent.clone(),
            }
        }
        Ok(meta)
    }

    fn changed_files(&self, id: &str, parent: Option<&str>) -> Result<Vec<String>> {
        self.record(format!("changed_files {id} {}", parent.unwrap_or("-")));
        Ok(self.changed.clone())
    }

    fn diff(&self, id: &str, parent: Option<&str>, file: Option<&str>) -> Result<String> {
        self.record(format!(
            "diff {id} {} {}",
            parent.unwrap_or("-"),
            file.unwrap_or("-")
        ));
        Ok(self.diff_text.clone())
    }

    fn diff_stats(
        &self,
        _id: &str,
        _parent: Option<&str>,
        _file: Option<&str>,
    ) -> Result<Vec<NumStat>> {
        Ok(Vec::new())
    }

    fn path_details(&self, branch: &str, path: &str) -> Result<Option<TreeEntry>> {
        self.record(format!("path_details {branch} {path}"));
        Ok(self.entries.get(path).cloned())
    }

    fn revision_list(
        &self,
        branch: &str,
        count: usize,
        offset: usize,
        file: Option<&str>,
    ) -> Result<Vec<String>> {
        let file = file.unwrap_or("-");
        self.record(format!("revision_list {branch} {count} {offset} {file}"));
        Ok(self.last_changes.get(file).cloned().into_iter().collect())
    }

    fn show(&self, id: &str) -> Result<Vec<u8>> {
        self.record(format!("show {id}"));
        self.objects
            .get(id)
            .cloned()
            .ok_or_else(|| LensError::Validation(format!("unknown object {id}")))
    }

    fn tree_list(&self, branch: &str, folder: &str) -> Result<Vec<TreeEntry>> {
        self.record(format!("tree_list {branch} {folder}"));
        Ok(self.listings.get(folder).cloned().unwrap_or_default())
    }
}

fn entry(kind: EntryKind, hash: &str, path: &str) -> TreeEntry {
    TreeEntry {
        permissions: match kind {
            EntryKind::Tree => "040000",
            EntryKind::Blob => "100644",
            EntryKind::Commit => "160000",
        }
        .into(),
        kind,
        hash: hash.into(),
        path: path.into(),
        name: path.rsplit('/').next().unwrap_or(path).into(),
    }
}

fn metadata(hash: &str, subject: &str, parent: Option<&str>) -> CommitMetadata {
    CommitMetadata {
        hash: Some(hash.into()),
        abbreviated_hash: Some(hash[..7].into()),
        subject: Some(subject.into()),
        body: Some(String::new()),
        notes: Some(String::new()),
        date: Some("2013-01-28 16:48:34 +0000".into()),
        author: Some(Author {
            name: "Phil Whittlesea".into(),
            email: "pwhittlesea@gmail.com".into(),
        }),
        parent: parent.map(Into::into),
    }
}

fn repo() -> FakeRepo {
    let mut repo = FakeRepo {
        branches: vec!["master".into()],
        changed: vec!["app/Console/Command/XmlShell.php".into()],
        diff_text: XML_SHELL_DIFF.into(),
        ..FakeRepo::default()
    };
    repo.heads.insert("master".into(), HEAD.into());
    repo.commits
        .insert(HEAD.into(), metadata(HEAD, "Fix shell", Some(PARENT)));
    repo.commits
        .insert(PARENT.into(), metadata(PARENT, "Add shell", Some(OLDER)));
    repo.commits
        .insert(OLDER.into(), metadata(OLDER, "Initial commit", None));
    repo.entries
        .insert(".".into(), repolens_core::root_entry("master"));
    repo.entries
        .insert("file.php".into(), entry(EntryKind::Blob, "f11e", "file.php"));
    repo.objects.insert("f11e".into(), b"Test Content".to_vec());
    repo.last_changes.insert("file.php".into(), PARENT.into());
    repo
}

#[test]
fn unknown_path_is_invalid() {
    let repo = repo();
    let view = fetch_path(&repo, "master", "missing.php").unwrap();
    assert!(view.is_invalid());
    assert_eq!(repo.calls_to("path_details"), ["path_details master missing.php"]);
    assert_eq!(serde_json::to_value(&view).unwrap(), serde_json::json!({"type": "invalid"}));
}

#[test]
fn unknown_branch_is_invalid() {
    let repo = repo();
    assert!(fetch_path(&repo, "develop", "").unwrap().is_invalid());
    assert!(fetch_path(&repo, "develop", "file.php").unwrap().is_invalid());
    assert!(repo.calls_to("path_details").is_empty());
}

#[test]
fn file_view_has_content_and_last_change() {
    let repo = repo();
    let PathView::Blob {
        path,
        content,
        updated,
        commit,
    } = fetch_path(&repo, "master", "file.php").unwrap()
    else {
        panic!("expected a blob");
    };
    assert_eq!(path, "file.php");
    assert_eq!(content, "Test Content");
    assert_eq!(repo.calls_to("show"), ["show f11e"]);

    let updated = updated.unwrap();
    assert_eq!(updated.metadata.subject.as_deref(), Some("Add shell"));
    assert_eq!(updated.metadata.parent, None, "basic details only");
    assert_eq!(updated.changeset, None);
    assert_eq!(commit.metadata.hash.as_deref(), Some(HEAD));
    assert_eq!(
        repo.calls_to("revision_list"),
        ["revision_list master 1 0 file.php"]
    );
}

#[test]
fn root_lookup_uses_dot() {
    let repo = repo();
    let view = fetch_path(&repo, "master", "").unwrap();
    assert_eq!(repo.calls_to("path_details")[0], "path_details master .");
    let PathView::Tree { path, entries, .. } = view else {
        panic!("expected a tree");
    };
    assert_eq!(path, ".");
    assert!(entries.is_empty());
}

#[test]
fn folder_trailing_slash_is_trimmed() {
    let mut repo = repo();
    repo.entries
        .insert("src".into(), entry(EntryKind::Tree, "7ree", "src"));
    repo.listings.insert(
        "src".into(),
        vec![
            entry(EntryKind::Blob, "a1", "src/lib.rs"),
            entry(EntryKind::Tree, "a2", "src/bin"),
        ],
    );
    repo.last_changes.insert("src/lib.rs".into(), OLDER.into());

    for spelling in ["src", "src/"] {
        let PathView::Tree {
            path,
            entries,
            commit,
        } = fetch_path(&repo, "master", spelling).unwrap()
        else {
            panic!("expected a tree for {spelling}");
        };
        assert_eq!(path, "src");
        assert_eq!(commit.metadata.subject.as_deref(), Some("Fix shell"));
        let names: Vec<_> = entries.iter().map(|e| e.entry.name.as_str()).collect();
        assert_eq!(names, ["lib.rs", "bin"]);
        assert_eq!(
            entries[0].updated.as_ref().unwrap().metadata.hash.as_deref(),
            Some(OLDER)
        );
        assert!(entries[1].updated.is_none());
        assert!(entries.iter().all(|e| e.remote.is_none()));
    }
    assert_eq!(repo.calls_to("tree_list"), ["tree_list master src"; 2]);
}

#[test]
fn folder_with_submodules_gets_remotes() {
    let mut repo = repo();
    repo.entries
        .insert("folder".into(), entry(EntryKind::Tree, "f01d", "folder"));
    repo.entries.insert(
        ".gitmodules".into(),
        entry(EntryKind::Blob, "6bd106ca427102ce9cdca16aa8560681de69a820", ".gitmodules"),
    );
    repo.objects.insert(
        "6bd106ca427102ce9cdca16aa8560681de69a820".into(),
        b"\n\t\t\t[submodule \"folder/subproject1\"]\n\t\t\t\tpath = folder/subproject1\n\t\t\t\turl = git://github.com/cakephp/cakephp.git"
            .to_vec(),
    );
    repo.listings.insert(
        "folder".into(),
        vec![
            entry(EntryKind::Commit, "5ub1", "folder/subproject1"),
            entry(EntryKind::Commit, "5ub2", "folder/unlisted"),
            entry(EntryKind::Blob, "b10b", "folder/notes.txt"),
        ],
    );

    let PathView::Tree { entries, .. } = fetch_path(&repo, "master", "folder").unwrap() else {
        panic!("expected a tree");
    };
    let remotes: Vec<_> = entries.iter().map(|e| e.remote.as_deref()).collect();
    assert_eq!(
        remotes,
        [Some("github.com/cakephp/cakephp.git"), Some(""), None]
    );
    // .gitmodules is read once for the whole listing
    assert_eq!(
        repo.calls_to("show"),
        ["show 6bd106ca427102ce9cdca16aa8560681de69a820"]
    );

    let json = serde_json::to_value(&entries[0]).unwrap();
    assert_eq!(json["type"], "commit");
    assert_eq!(json["remote"], "github.com/cakephp/cakephp.git");
    assert!(json.get("updated").is_none());
}

#[test]
fn missing_gitmodules_means_no_submodules() {
    let repo = repo();
    assert!(load_submodules(&repo, "master").unwrap().is_empty());
    assert!(repo.calls_to("show").is_empty());
}

#[test]
fn fetch_commit_adds_changeset_against_parent() {
    let repo = repo();
    let details = fetch_commit(&repo, HEAD).unwrap();
    assert_eq!(details.metadata.parent.as_deref(), Some(PARENT));
    assert_eq!(details.metadata.abbreviated_hash.as_deref(), Some("b1bcad6"));
    assert_eq!(
        details.changeset.as_deref(),
        Some(&["app/Console/Command/XmlShell.php".to_string()][..])
    );
    assert_eq!(
        repo.calls_to("changed_files"),
        [format!("changed_files {HEAD} {PARENT}")]
    );

    let json = serde_json::to_value(&details).unwrap();
    assert_eq!(json["abbreviatedHash"], "b1bcad6");
    assert_eq!(json["author"]["email"], "pwhittlesea@gmail.com");
    assert_eq!(json["changeset"][0], "app/Console/Command/XmlShell.php");
}

#[test]
fn root_commit_changeset_uses_no_parent() {
    let repo = repo();
    fetch_commit(&repo, OLDER).unwrap();
    assert_eq!(
        repo.calls_to("changed_files"),
        [format!("changed_files {OLDER} -")]
    );
}

#[test]
fn full_diff_is_parsed() {
    let repo = repo();
    let diff = commit_diff(&repo, HEAD, Some(PARENT), None).unwrap();
    assert_eq!(diff.len(), 1);
    let file = diff.get("app/Console/Command/XmlShell.php").unwrap();
    assert_eq!((file.lines_added, file.lines_removed), (1, 1));
    assert_eq!(file.hunks_summary[0].heading, "class XmlShell extends AppShell {");
    assert_eq!((file.hunks_summary[0].old.start, file.hunks_summary[0].old.len), (27, 4));

    let lines = &file.hunks[0].lines;
    let shape: Vec<_> = lines
        .iter()
        .map(|l| (l.marker, l.old_line, l.new_line))
        .collect();
    assert_eq!(
        shape,
        [
            (LineMarker::Context, Some(27), Some(27)),
            (LineMarker::Removed, Some(28), None),
            (LineMarker::Added, None, Some(28)),
            (LineMarker::Context, Some(29), Some(29)),
        ]
    );
    assert_eq!(
        lines[1].text,
        "\t\t$this->ImportXml->execute($this->_collectParameters());"
    );
}

#[test]
fn file_diff_narrows_client_side() {
    let mut repo = repo();
    repo.diff_text.push_str(
        "\ndiff --git a/README.md b/README.md\n--- a/README.md\n+++ b/README.md\n@@ -1 +1 @@\n-old\n+new\n",
    );

    let scoped = commit_diff(&repo, HEAD, Some(PARENT), Some("./README.md")).unwrap();
    assert_eq!(scoped.paths().collect::<Vec<_>>(), ["README.md"]);
    assert_eq!(
        repo.calls_to("diff"),
        [format!("diff {HEAD} {PARENT} README.md")]
    );

    let file = file_diff(&repo, HEAD, Some(PARENT), "app/Console/Command/XmlShell.php")
        .unwrap()
        .unwrap();
    assert_eq!(file.path, "app/Console/Command/XmlShell.php");
    assert!(file_diff(&repo, HEAD, Some(PARENT), "other.txt").unwrap().is_none());
}

#[test]
fn history_normalizes_file() {
    let repo = repo();
    assert_eq!(history(&repo, "master", 1, 0, Some("./file.php")).unwrap(), [PARENT]);
    assert!(history(&repo, "master", 5, 2, None).unwrap().is_empty());
    assert_eq!(
        repo.calls_to("revision_list"),
        ["revision_list master 1 0 file.php", "revision_list master 5 2 -"]
    );
}
