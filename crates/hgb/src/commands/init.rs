use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::{env, fs, process};

use clap::{Parser, ValueEnum};
use semver::Version;

use crate::prelude::*;

/// The exported tables are not versioned, the manual corrections are.
const GITIGNORE: &str = "# hgb\n\
    /data/*\n\
    !/data/dossier_overrides.csv\n\
    !/data/manual_relationships.csv\n\
    /out\n";

/// Initialize a new or re-initialize an existing project.
#[derive(Debug, Parser)]
pub(crate) struct Init {
    /// The name of the project.
    #[arg(short, long)]
    name: Option<String>,

    /// The version of the project data.
    #[arg(long, default_value = "0.1.0")]
    version: Version,

    /// A short blurb about the project.
    #[arg(short, long)]
    description: Option<String>,

    /// A list of people or organizations, which are considered as the
    /// authors of the project data. By default the list is populated
    /// with the git identity (if available).
    #[arg(short, long = "author")]
    authors: Vec<String>,

    /// Initialize the project for the given version control system
    /// (VCS).
    #[arg(long, default_value = "git")]
    vcs: Vcs,

    /// Whether to overwrite config with default values or not.
    #[arg(short, long)]
    force: bool,

    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// The location of the project.
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, ValueEnum)]
enum Vcs {
    Git,
    None,
}

fn git(path: &Path, args: &[&str]) -> Option<String> {
    let output = process::Command::new("git")
        .args(args)
        .current_dir(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim_end().to_string())
}

fn git_user(path: &Path) -> Option<String> {
    let name = git(path, &["config", "--get", "user.name"])
        .filter(|name| !name.is_empty())?;

    Some(match git(path, &["config", "--get", "user.email"]) {
        Some(email) if !email.is_empty() => format!("{name} <{email}>"),
        _ => name,
    })
}

impl Init {
    pub(crate) fn execute(mut self) -> HgbResult<()> {
        init_logger(self.verbose, self.quiet);

        let root_dir = env::current_dir()?.join(&self.path);
        let data_dir = root_dir.join(Project::DATA_DIR);
        let config_path = root_dir.join(Project::CONFIG);

        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
            log::info!("initialize new project in {}", root_dir.display());
        } else {
            log::info!(
                "re-initialize existing project in {}",
                root_dir.display()
            );
        }

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
        }

        if self.vcs == Vcs::Git {
            let args = ["rev-parse", "--is-inside-work-tree"];
            let inside = git(&root_dir, &args).is_some();
            if !inside && git(&root_dir, &["init"]).is_none() {
                bail!("Failed to initialize Git repository");
            }

            if !root_dir.join(".gitignore").is_file() {
                fs::write(root_dir.join(".gitignore"), GITIGNORE)?;
            }
        }

        if !config_path.exists() || self.force {
            if self.authors.is_empty() {
                if let Some(author) = git_user(&root_dir) {
                    log::info!("set authors to Git identity '{author}'");
                    self.authors.push(author)
                }
            }

            let mut config = Config::create(config_path)?;
            config.metadata.description = self.description;
            config.metadata.authors = self.authors;
            config.metadata.version = self.version;
            config.metadata.name = self.name.unwrap_or(
                root_dir
                    .file_name()
                    .and_then(OsStr::to_str)
                    .unwrap_or_default()
                    .to_string(),
            );

            config.save()?;
        }

        Ok(())
    }
}
