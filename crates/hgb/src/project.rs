use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::config::Config;
use crate::dossier::Dossier;
use crate::error::{bail, HgbResult};
use crate::overlay::Overlay;
use crate::table::{read_dossiers, read_entries};
use crate::year::Entry;

pub struct Project {
    /// The root directory of the project.
    root_dir: PathBuf,
}

impl Project {
    pub const CONFIG: &'static str = "hgb.toml";
    pub const DATA_DIR: &'static str = "data";

    /// Discovers the root of the project.
    ///
    /// This function fails, if neither the current directory nor any
    /// parent directory contains a project [Config].
    pub fn discover() -> HgbResult<Self> {
        Self::discover_from(env::current_dir()?)
    }

    /// Discovers the root of the project starting at `dir`.
    pub fn discover_from<P: AsRef<Path>>(dir: P) -> HgbResult<Self> {
        let mut root_dir = dir.as_ref().to_path_buf();

        loop {
            if let Ok(metadata) =
                fs::metadata(root_dir.join(Self::CONFIG))
            {
                if metadata.is_file() {
                    break;
                }
            }

            if !root_dir.pop() {
                bail!("not a hgb project (or any parent directory)");
            }
        }

        Ok(Self { root_dir })
    }

    /// Returns the config associated with the project.
    #[inline]
    pub fn config(&self) -> HgbResult<Config> {
        Config::from_path(self.root_dir.join(Self::CONFIG))
    }

    /// Returns the base directory of the project.
    #[inline]
    pub fn base_dir(&self) -> &PathBuf {
        &self.root_dir
    }

    /// Returns the data directory of the project.
    #[inline]
    pub fn data_dir(&self) -> PathBuf {
        self.root_dir.join(Self::DATA_DIR)
    }

    /// Resolves a table path of the config against the project root.
    #[inline]
    pub fn table<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.root_dir.join(path)
    }

    /// Reads the dossier table.
    pub fn dossiers(&self, config: &Config) -> HgbResult<Vec<Dossier>> {
        read_dossiers(self.table(&config.tables.dossier))
    }

    /// Reads the entry table.
    pub fn entries(&self, config: &Config) -> HgbResult<Vec<Entry>> {
        read_entries(self.table(&config.tables.entry))
    }

    /// Reads the manual corrections.
    pub fn overlay(&self, config: &Config) -> HgbResult<Overlay> {
        Overlay::from_paths(
            self.table(&config.tables.overrides),
            self.table(&config.tables.relationships),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn discover_from_subdir() -> TestResult {
        let dir = tempfile::tempdir()?;
        Config::create(dir.path().join(Project::CONFIG))?.save()?;
        let sub = dir.path().join("data").join("raw");
        fs::create_dir_all(&sub)?;

        let project = Project::discover_from(&sub)?;
        assert_eq!(project.base_dir(), &dir.path().to_path_buf());
        assert_eq!(project.data_dir(), dir.path().join("data"));
        assert_eq!(
            project.table("data/x.csv"),
            dir.path().join("data/x.csv")
        );
        Ok(())
    }

    #[test]
    fn read_project_tables() -> TestResult {
        let dir = tempfile::tempdir()?;
        let config = Config::create(dir.path().join(Project::CONFIG))?;
        config.save()?;
        fs::create_dir_all(dir.path().join(Project::DATA_DIR))?;
        fs::write(
            dir.path().join(&config.tables.dossier),
            "dossierId,title,descriptiveNote\n\
             HGB_1_001,Eisengasse 1,Seit 1600.\n",
        )?;
        fs::write(
            dir.path().join(&config.tables.entry),
            "entryId,dossierId,pageId,year\n1,HGB_1_001,{10},1610\n",
        )?;

        let project = Project::discover_from(dir.path())?;
        let config = project.config()?;
        assert_eq!(project.dossiers(&config)?.len(), 1);
        assert_eq!(project.entries(&config)?[0].year, Some(1610));
        assert!(project.overlay(&config)?.edges().is_empty());
        Ok(())
    }
}
