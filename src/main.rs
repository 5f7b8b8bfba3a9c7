use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use repolens_browse::{
    commit_details, commit_diff, fetch_commit, fetch_path, history, CommitDetails, PathView,
    Repository,
};
use repolens_core::{
    CommitMetadata, LensConfig, MetadataField, OutputFormat, RepoKind, SharedMode, SourceControl,
};
use repolens_difflens::Diff;

#[derive(Parser)]
#[command(
    name = "repolens",
    version,
    about = "Read-only queries over Git and Subversion repositories",
    long_about = "Read-only queries over Git and Subversion repositories.\n\n\
                   Every query runs the `git` or `svn` client against the repository and\n\
                   normalizes the answer, so both kinds report the same shapes.\n\n\
                   Examples:\n  \
                     repolens branches                       List branches\n  \
                     repolens log main --count 5             Last five commits on main\n  \
                     repolens commit HEAD --format json      Commit metadata and changeset\n  \
                     repolens diff HEAD --file src/lib.rs    Parsed diff of one file\n  \
                     repolens browse main docs/              Folder listing with last changes\n  \
                     repolens --type svn --repo /srv/svn/p log HEAD"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Repository location (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Repository type: git or svn
    #[arg(long = "type", global = true, default_value = "git")]
    kind: RepoKind,

    /// Path to configuration file (default: .repolens.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Log every tool invocation to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List branches
    Branches,
    /// Check whether a revision exists (exit status 1 if not)
    Exists {
        /// Commit id, ref, revision number or HEAD
        rev: String,
    },
    /// List recent commits on a branch
    Log {
        /// Branch, or HEAD for Subversion
        branch: String,

        /// Maximum number of commits
        #[arg(long, default_value = "10")]
        count: usize,

        /// Commits to skip first
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Only commits touching this file
        #[arg(long)]
        file: Option<String>,
    },
    /// Show commit metadata and the files it changed
    Commit {
        /// Commit id, ref, revision number or HEAD
        id: String,
    },
    /// Show the parsed diff of a commit
    #[command(long_about = "Show the parsed diff of a commit.\n\n\
        Compares against --parent when given, otherwise against the commit's\n\
        first parent (or the empty tree for a root commit).")]
    Diff {
        /// Commit id, ref, revision number or HEAD
        id: String,

        /// Compare against this commit instead of the first parent
        #[arg(long)]
        parent: Option<String>,

        /// Only this file
        #[arg(long)]
        file: Option<String>,
    },
    /// Show added/removed line counts per file
    Stat {
        /// Commit id, ref, revision number or HEAD
        id: String,

        /// Compare against this commit instead of the first parent
        #[arg(long)]
        parent: Option<String>,

        /// Only this file
        #[arg(long)]
        file: Option<String>,
    },
    /// List the entries of a folder
    Tree {
        /// Branch, or HEAD / a revision for Subversion
        branch: String,

        /// Folder (default: root)
        path: Option<String>,
    },
    /// Show a file or folder with the commits that last touched it
    Browse {
        /// Branch, or HEAD / a revision for Subversion
        branch: String,

        /// File or folder (default: root)
        path: Option<String>,
    },
    /// Write the raw content of an object to stdout
    Show {
        /// Blob hash (Git) or `path@revision` (Subversion)
        id: String,
    },
    /// Create a new bare repository
    Create {
        /// Where to create it
        base: PathBuf,

        /// chmod-style mode applied recursively afterwards (e.g. 0770, g+w)
        #[arg(long)]
        mode: Option<String>,

        /// Git --shared value: false, true, umask, group, all, world, everybody or 0xxx
        #[arg(long, default_value = "false")]
        shared: SharedMode,
    },
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn load_config(path: Option<&Path>) -> Result<LensConfig> {
    match path {
        Some(path) => LensConfig::from_file(path).into_diagnostic(),
        None => {
            let default_path = Path::new(".repolens.toml");
            if default_path.exists() {
                LensConfig::from_file(default_path).into_diagnostic()
            } else {
                Ok(LensConfig::default())
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn resolve(repo: &Repository, rev: &str) -> Result<String> {
    repo.resolve(rev)
        .into_diagnostic()?
        .ok_or_else(|| miette::miette!("unknown revision: {rev}"))
}

/// `--parent` if given, otherwise the first parent of `id`.
fn parent_of(repo: &Repository, id: &str, explicit: Option<&str>) -> Result<Option<String>> {
    if let Some(parent) = explicit {
        return resolve(repo, parent).map(Some);
    }
    Ok(repo
        .commit_metadata(id, &[MetadataField::Parent])
        .into_diagnostic()?
        .parent)
}

fn format_commit(meta: &CommitMetadata) -> String {
    let mut out = String::new();
    if let Some(hash) = &meta.hash {
        out.push_str(&format!("commit {hash}\n"));
    }
    if let Some(parent) = &meta.parent {
        out.push_str(&format!("Parent: {parent}\n"));
    }
    if let Some(author) = &meta.author {
        if author.email.is_empty() {
            out.push_str(&format!("Author: {}\n", author.name));
        } else {
            out.push_str(&format!("Author: {} <{}>\n", author.name, author.email));
        }
    }
    if let Some(date) = &meta.date {
        out.push_str(&format!("Date:   {date}\n"));
    }
    if let Some(subject) = &meta.subject {
        out.push_str(&format!("\n    {subject}\n"));
    }
    if let Some(body) = meta.body.as_deref().filter(|b| !b.is_empty()) {
        out.push('\n');
        for line in body.lines() {
            out.push_str(&format!("    {line}\n"));
        }
    }
    out
}

fn print_commit(details: &CommitDetails) {
    print!("{}", format_commit(&details.metadata));
    if let Some(changeset) = &details.changeset {
        println!();
        for path in changeset {
            println!("  {path}");
        }
    }
}

fn print_diff(diff: &Diff) {
    for file in diff.files() {
        println!(
            "{} (+{} -{})",
            file.path, file.lines_added, file.lines_removed
        );
        for (hunk, summary) in file.hunks.iter().zip(&file.hunks_summary) {
            println!(
                "@@ -{},{} +{},{} @@ {}",
                summary.old.start, summary.old.len, summary.new.start, summary.new.len, summary.heading
            );
            for line in &hunk.lines {
                let number = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_default();
                println!(
                    "{:>5} {:>5} {}{}",
                    number(line.old_line),
                    number(line.new_line),
                    line.marker.as_char(),
                    line.text
                );
            }
        }
    }
}

fn print_view(view: &PathView, branch: &str) -> Result<()> {
    match view {
        PathView::Invalid => miette::bail!("no such path on {branch}"),
        PathView::Blob { content, .. } => print!("{content}"),
        PathView::Tree { path, entries, commit } => {
            println!(
                "{path} @ {}",
                commit.metadata.hash.as_deref().unwrap_or(branch)
            );
            for item in entries {
                let subject = item
                    .updated
                    .as_ref()
                    .and_then(|u| u.metadata.subject.as_deref())
                    .unwrap_or("");
                let kind = item.entry.kind.to_string();
                match item.remote.as_deref() {
                    Some(remote) => println!("{kind:<6} {} -> {remote}\t{subject}", item.entry.name),
                    None => println!("{kind:<6} {}\t{subject}", item.entry.name),
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    let repo = match cli.command {
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "repolens", &mut std::io::stdout());
            return Ok(());
        }
        Command::Create {
            ref base,
            ref mode,
            ref shared,
        } => {
            let repo = Repository::create(cli.kind, base, mode.as_deref(), shared, &config)
                .into_diagnostic()?;
            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "type": repo.kind(),
                    "location": base,
                }))?,
                OutputFormat::Text => println!("Created {} repository at {}", repo.kind(), base.display()),
            }
            return Ok(());
        }
        _ => Repository::open(cli.kind, &cli.repo, &config).into_diagnostic()?,
    };

    match cli.command {
        Command::Branches => {
            let branches = repo.branches().into_diagnostic()?;
            match cli.format {
                OutputFormat::Json => print_json(&branches)?,
                OutputFormat::Text => {
                    for branch in branches {
                        println!("{branch}");
                    }
                }
            }
        }
        Command::Exists { rev } => {
            let exists = repo.exists(&rev).into_diagnostic()?;
            match cli.format {
                OutputFormat::Json => print_json(&exists)?,
                OutputFormat::Text => println!("{exists}"),
            }
            if !exists {
                std::io::stdout().flush().into_diagnostic()?;
                std::process::exit(1);
            }
        }
        Command::Log {
            branch,
            count,
            offset,
            file,
        } => {
            let ids = history(&repo, &branch, count, offset, file.as_deref()).into_diagnostic()?;
            let commits = ids
                .iter()
                .map(|id| commit_details(&repo, id, false))
                .collect::<repolens_core::Result<Vec<_>>>()
                .into_diagnostic()?;
            match cli.format {
                OutputFormat::Json => print_json(&commits)?,
                OutputFormat::Text => {
                    for commit in &commits {
                        println!(
                            "{} {}",
                            commit.metadata.hash.as_deref().unwrap_or_default(),
                            commit.metadata.subject.as_deref().unwrap_or_default()
                        );
                    }
                }
            }
        }
        Command::Commit { id } => {
            let id = resolve(&repo, &id)?;
            let details = fetch_commit(&repo, &id).into_diagnostic()?;
            match cli.format {
                OutputFormat::Json => print_json(&details)?,
                OutputFormat::Text => print_commit(&details),
            }
        }
        Command::Diff { id, parent, file } => {
            let id = resolve(&repo, &id)?;
            let parent = parent_of(&repo, &id, parent.as_deref())?;
            let diff = commit_diff(&repo, &id, parent.as_deref(), file.as_deref())
                .into_diagnostic()?;
            match cli.format {
                OutputFormat::Json => print_json(&diff)?,
                OutputFormat::Text => print_diff(&diff),
            }
        }
        Command::Stat { id, parent, file } => {
            let id = resolve(&repo, &id)?;
            let parent = parent_of(&repo, &id, parent.as_deref())?;
            let stats = repo
                .diff_stats(&id, parent.as_deref(), file.as_deref())
                .into_diagnostic()?;
            match cli.format {
                OutputFormat::Json => print_json(&stats)?,
                OutputFormat::Text => {
                    for stat in &stats {
                        let count = |n: Option<u64>| n.map_or_else(|| "-".to_string(), |n| n.to_string());
                        println!("{}\t{}\t{}", count(stat.added), count(stat.removed), stat.path);
                    }
                }
            }
        }
        Command::Tree { branch, path } => {
            let entries = repo.tree_list(&branch, path.as_deref().unwrap_or("")).into_diagnostic()?;
            match cli.format {
                OutputFormat::Json => print_json(&entries)?,
                OutputFormat::Text => {
                    for entry in &entries {
                        println!(
                            "{} {} {}\t{}",
                            entry.permissions, entry.kind, entry.hash, entry.name
                        );
                    }
                }
            }
        }
        Command::Browse { branch, path } => {
            let view = fetch_path(&repo, &branch, path.as_deref().unwrap_or("")).into_diagnostic()?;
            match cli.format {
                OutputFormat::Json => print_json(&view)?,
                OutputFormat::Text => print_view(&view, &branch)?,
            }
        }
        Command::Show { id } => {
            let content = repo.show(&id).into_diagnostic()?;
            std::io::stdout().write_all(&content).into_diagnostic()?;
        }
        Command::Create { .. } | Command::Completions { .. } => {}
    }

    Ok(())
}
