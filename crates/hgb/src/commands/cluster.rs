use std::path::PathBuf;

use clap::Parser;
use polars::prelude::*;

use crate::cluster::Clusterer;
use crate::pipeline::build_records;
use crate::prelude::*;
use crate::table::write_table;
use crate::trigram::Metric;

/// Group the dossiers into clusters of the same physical unit.
#[derive(Debug, Default, Parser)]
pub(crate) struct Cluster {
    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// The similarity measure used to compare street names. If not
    /// set, the metric of the project config is used.
    #[arg(long, value_name = "metric")]
    metric: Option<Metric>,

    /// The minimum similarity of two street names denoting the same
    /// street. If not set, the threshold of the project config is
    /// used.
    #[arg(long, short, value_name = "value")]
    threshold: Option<f64>,

    /// Write the table into `filename` instead of `stdout`. A file
    /// with the extension `.csv` is written as CSV, every other file
    /// as Arrow IPC.
    #[arg(short, long, value_name = "filename")]
    output: Option<PathBuf>,
}

impl Cluster {
    pub(crate) fn execute(self) -> HgbResult<()> {
        init_logger(self.verbose, self.quiet);

        let project = Project::discover()?;
        let config = project.config()?;
        let dossiers = project.dossiers(&config)?;
        let entries = project.entries(&config)?;
        let overlay = project.overlay(&config)?;
        let records = build_records(&dossiers, &entries, &overlay)?;

        let threshold = self.threshold.unwrap_or(config.clustering.threshold);
        if !(0.0..=1.0).contains(&threshold) {
            bail!("threshold must be in the range [0, 1]");
        }

        let clusterer = Clusterer::new(
            self.metric.unwrap_or(config.clustering.metric),
            threshold,
        );
        let clustering = clusterer.cluster(&records, &overlay);

        let mut dossier_id: Vec<&str> = vec![];
        let mut cluster_id: Vec<&str> = vec![];
        let mut cluster_size: Vec<u32> = vec![];

        for (id, cid) in clustering.assignments.iter() {
            dossier_id.push(id);
            cluster_id.push(cid);
            cluster_size.push(clustering.members_of(id).len() as u32);
        }

        let mut df = DataFrame::new(vec![
            Series::new("dossierId", dossier_id),
            Series::new("clusterId", cluster_id),
            Series::new("clusterSize", cluster_size),
        ])?;

        write_table(&mut df, self.output.as_deref())
    }
}
