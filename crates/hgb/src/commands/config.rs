use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{self, Runtime};
use crate::prelude::*;
use crate::trigram::Metric;

/// Get and set project config options.
#[derive(Debug, Parser)]
pub(crate) struct Config {
    /// Get the value for the given key.
    #[arg(long, conflicts_with_all = ["value", "unset", "set"])]
    get: bool,

    /// Reset the key to its default value.
    #[arg(long, conflicts_with_all = ["value", "get", "set"])]
    unset: bool,

    /// Set the value for the given key.
    #[arg(long, requires = "value", conflicts_with_all = ["get", "unset"])]
    set: bool,

    /// The name of the config option.
    name: String,

    /// The (new) value of the config option.
    #[arg(conflicts_with_all = ["get", "unset"])]
    value: Option<String>,
}

const OPTIONS: [&str; 14] = [
    "runtime.num_jobs",
    "tables.dossier",
    "tables.entry",
    "tables.transcript",
    "tables.textregion",
    "tables.page",
    "tables.overrides",
    "tables.relationships",
    "clustering.metric",
    "clustering.threshold",
    "relation.overlap_tolerance",
    "review.max_gap",
    "metadata.name",
    "metadata.description",
];

fn table_mut<'a>(
    tables: &'a mut config::Tables,
    name: &str,
) -> Option<&'a mut PathBuf> {
    Some(match name {
        "tables.dossier" => &mut tables.dossier,
        "tables.entry" => &mut tables.entry,
        "tables.transcript" => &mut tables.transcript,
        "tables.textregion" => &mut tables.textregion,
        "tables.page" => &mut tables.page,
        "tables.overrides" => &mut tables.overrides,
        "tables.relationships" => &mut tables.relationships,
        _ => return None,
    })
}

fn parse<T: std::str::FromStr>(value: &str) -> HgbResult<T> {
    match value.parse::<T>() {
        Ok(value) => Ok(value),
        Err(_) => bail!("invalid value `{value}`"),
    }
}

fn get_option(config: &mut config::Config, name: &str) -> Option<String> {
    if let Some(path) = table_mut(&mut config.tables, name) {
        return Some(path.display().to_string());
    }

    match name {
        "runtime.num_jobs" => config
            .runtime
            .as_ref()
            .and_then(|rt| rt.num_jobs)
            .map(|n| n.to_string()),
        "clustering.metric" => Some(config.clustering.metric.to_string()),
        "clustering.threshold" => {
            Some(config.clustering.threshold.to_string())
        }
        "relation.overlap_tolerance" => {
            Some(config.relation.overlap_tolerance.to_string())
        }
        "review.max_gap" => Some(config.review.max_gap.to_string()),
        "metadata.name" => Some(config.metadata.name.clone()),
        "metadata.description" => config.metadata.description.clone(),
        _ => unreachable!(),
    }
}

fn set_option(
    config: &mut config::Config,
    name: &str,
    value: &str,
) -> HgbResult<()> {
    if let Some(path) = table_mut(&mut config.tables, name) {
        *path = value.into();
        return Ok(());
    }

    match name {
        "runtime.num_jobs" => {
            let value = parse::<usize>(value)?;
            match config.runtime {
                Some(ref mut runtime) => runtime.num_jobs = Some(value),
                None => {
                    config.runtime = Some(Runtime {
                        num_jobs: Some(value),
                    })
                }
            }
        }
        "clustering.metric" => {
            config.clustering.metric = match Metric::from_str(value, true)
            {
                Ok(metric) => metric,
                Err(_) => bail!("invalid value `{value}`"),
            };
        }
        "clustering.threshold" => {
            let value = parse::<f64>(value)?;
            if !(0.0..=1.0).contains(&value) {
                bail!("threshold must be in the range [0, 1]");
            }

            config.clustering.threshold = value;
        }
        "relation.overlap_tolerance" => {
            config.relation.overlap_tolerance = parse(value)?;
        }
        "review.max_gap" => config.review.max_gap = parse(value)?,
        "metadata.name" => config.metadata.name = value.into(),
        "metadata.description" => {
            config.metadata.description = Some(value.into())
        }
        _ => unreachable!(),
    }

    Ok(())
}

fn unset_option(config: &mut config::Config, name: &str) {
    let defaults = config::Config::default();
    if let Some(path) = table_mut(&mut config.tables, name) {
        let mut tables = defaults.tables;
        if let Some(default) = table_mut(&mut tables, name) {
            *path = default.clone();
        }

        return;
    }

    match name {
        "runtime.num_jobs" => config.runtime = None,
        "clustering.metric" => {
            config.clustering.metric = defaults.clustering.metric
        }
        "clustering.threshold" => {
            config.clustering.threshold = defaults.clustering.threshold
        }
        "relation.overlap_tolerance" => {
            config.relation.overlap_tolerance =
                defaults.relation.overlap_tolerance
        }
        "review.max_gap" => config.review.max_gap = defaults.review.max_gap,
        "metadata.name" => config.metadata.name = defaults.metadata.name,
        "metadata.description" => config.metadata.description = None,
        _ => unreachable!(),
    }
}

impl Config {
    pub(crate) fn execute(self) -> HgbResult<()> {
        let project = Project::discover()?;
        let mut config = project.config()?;

        let name = self.name.as_str();
        if !OPTIONS.contains(&name) {
            bail!("unknown config option `{name}`");
        }

        if let Some(ref value) = self.value {
            set_option(&mut config, name, value)?;
            config.save()?;
        } else if self.unset {
            unset_option(&mut config, name);
            config.save()?;
        } else {
            println!(
                "{name} = {}",
                get_option(&mut config, name)
                    .unwrap_or_else(|| "None".to_string())
            );
        }

        Ok(())
    }
}
