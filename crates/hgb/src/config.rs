use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{bail, HgbResult};
use crate::trigram::Metric;

/// Project config (`hgb.toml`).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The path of the config.
    #[serde(skip)]
    path: PathBuf,

    /// Project metadata.
    pub metadata: Metadata,

    /// Runtime options.
    pub runtime: Option<Runtime>,

    /// Locations of the exported database tables.
    #[serde(default)]
    pub tables: Tables,

    /// Options of the similarity clusterer.
    #[serde(default)]
    pub clustering: Clustering,

    /// Options of the relationship builder.
    #[serde(default)]
    pub relation: Relation,

    /// Options of the validity review.
    #[serde(default)]
    pub review: Review,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// The name of the project.
    pub name: String,

    /// The version of the project data.
    pub version: Version,

    /// A short blurb about the project.
    pub description: Option<String>,

    /// A list of people or organizations, which are considered as the
    /// authors of the project data.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub authors: Vec<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: "".into(),
            version: Version::new(0, 1, 0),
            description: None,
            authors: vec![],
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Runtime {
    /// Number of threads to use. If this options isn't set or a value
    /// of "0" is chosen, the maximum number of available threads
    /// is used.
    pub num_jobs: Option<usize>,
}

/// Paths of the table exports, relative to the project root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub dossier: PathBuf,
    pub entry: PathBuf,
    pub transcript: PathBuf,
    pub textregion: PathBuf,
    pub page: PathBuf,

    /// Manual dossier corrections. The file is optional.
    pub overrides: PathBuf,

    /// Manually added or removed relationships. The file is optional.
    pub relationships: PathBuf,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            dossier: "data/stabs_dossier.csv".into(),
            entry: "data/project_entry.csv".into(),
            transcript: "data/transkribus_transcript.csv".into(),
            textregion: "data/transkribus_textregion.csv".into(),
            page: "data/transkribus_page.csv".into(),
            overrides: "data/dossier_overrides.csv".into(),
            relationships: "data/manual_relationships.csv".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// The similarity measure used to compare street names.
    pub metric: Metric,

    /// Two street names denote the same street, if their similarity
    /// is greater than or equal to the threshold.
    pub threshold: f64,
}

impl Default for Clustering {
    fn default() -> Self {
        Self {
            metric: Metric::Trigram,
            threshold: 0.8,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Number of years a successor may start before its predecessor
    /// ends.
    pub overlap_tolerance: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Gaps (in years) between related dossiers larger than this value
    /// are reported.
    pub max_gap: u16,
}

impl Default for Review {
    fn default() -> Self {
        Self { max_gap: 20 }
    }
}

impl Config {
    /// Creates a new default config and sets the file location.
    pub fn create<P>(path: P) -> HgbResult<Self>
    where
        P: AsRef<Path>,
    {
        Ok(Self {
            path: path.as_ref().into(),
            ..Default::default()
        })
    }

    /// Loads an existing config from a path.
    pub fn from_path<P>(path: P) -> HgbResult<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().into();
        let content = fs::read_to_string(&path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.path = path;

        if !(0.0..=1.0).contains(&config.clustering.threshold) {
            bail!("clustering.threshold must be in the range [0, 1]");
        }

        Ok(config)
    }

    /// Saves the config.
    pub fn save(&self) -> HgbResult<()> {
        let content = toml::to_string(self).expect("valid toml");
        let mut out = File::create(&self.path)?;
        out.write_all(content.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.clustering.metric, Metric::Trigram);
        assert_eq!(config.clustering.threshold, 0.8);
        assert_eq!(config.relation.overlap_tolerance, 0);
        assert_eq!(config.review.max_gap, 20);
        assert!(config.runtime.is_none());
    }

    #[test]
    fn config_save_and_load() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("hgb.toml");

        let mut config = Config::create(&path)?;
        config.metadata.name = "hgb".into();
        config.clustering.metric = Metric::JaroWinkler;
        config.clustering.threshold = 0.9;
        config.runtime = Some(Runtime { num_jobs: Some(2) });
        config.save()?;

        let config = Config::from_path(&path)?;
        assert_eq!(config.metadata.name, "hgb");
        assert_eq!(config.clustering.metric, Metric::JaroWinkler);
        assert_eq!(config.clustering.threshold, 0.9);
        assert_eq!(config.runtime.unwrap().num_jobs, Some(2));
        assert_eq!(config.tables, Tables::default());

        Ok(())
    }

    #[test]
    fn config_missing_sections() -> TestResult {
        let config: Config = toml::from_str(
            "[metadata]\nname = \"hgb\"\nversion = \"0.2.0\"\n",
        )?;

        assert_eq!(config.metadata.version, Version::new(0, 2, 0));
        assert_eq!(config.review, Review::default());
        assert_eq!(config.clustering, Clustering::default());
        Ok(())
    }

    #[test]
    fn config_invalid_threshold() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("hgb.toml");

        let mut config = Config::create(&path)?;
        config.clustering.threshold = 1.5;
        config.save()?;

        assert!(Config::from_path(&path).is_err());
        Ok(())
    }
}
