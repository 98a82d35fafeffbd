use std::path::PathBuf;

use clap::Parser;

use crate::cluster::Clusterer;
use crate::pipeline::Pipeline;
use crate::prelude::*;
use crate::relation::RelationBuilder;
use crate::table::write_table;

/// Derive the predecessor/successor relationships of the dossiers.
#[derive(Debug, Default, Parser)]
pub(crate) struct Relate {
    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Number of years a successor may start before its predecessor
    /// ends. If not set, the value of the project config is used.
    #[arg(long, value_name = "years")]
    overlap_tolerance: Option<u16>,

    /// Write the derived dossier table (cluster ids, years and review
    /// notes) into `filename`.
    #[arg(long, value_name = "filename")]
    dossiers: Option<PathBuf>,

    /// Write the relationship table into `filename` instead of
    /// `stdout`. A file with the extension `.csv` is written as CSV,
    /// every other file as Arrow IPC.
    #[arg(short, long, value_name = "filename")]
    output: Option<PathBuf>,
}

impl Relate {
    pub(crate) fn execute(self) -> HgbResult<()> {
        init_logger(self.verbose, self.quiet);

        let project = Project::discover()?;
        let config = project.config()?;
        let dossiers = project.dossiers(&config)?;
        let entries = project.entries(&config)?;
        let overlay = project.overlay(&config)?;

        let tolerance = self
            .overlap_tolerance
            .unwrap_or(config.relation.overlap_tolerance);
        let pipeline = Pipeline::new(
            Clusterer::from_config(&config.clustering),
            RelationBuilder::new(tolerance),
            config.review.max_gap,
        );

        let outcome = pipeline.run(&dossiers, &entries, &overlay)?;

        if let Some(path) = self.dossiers {
            let mut df = outcome.dossier_frame(&overlay)?;
            write_table(&mut df, Some(path.as_path()))?;
        }

        let mut df = outcome.relationship_frame()?;
        write_table(&mut df, self.output.as_deref())
    }
}
