use std::path::PathBuf;

use clap::Parser;
use comfy_table::{presets, Row, Table};
use polars::prelude::*;

use crate::pipeline::Pipeline;
use crate::prelude::*;
use crate::table::write_table;

/// List the dossiers that need a manual review.
#[derive(Debug, Default, Parser)]
pub(crate) struct Review {
    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print the number of findings per kind instead of the list of
    /// findings.
    #[arg(long, short, conflicts_with = "output")]
    counts: bool,

    /// Write the findings into `filename` instead of `stdout`. A file
    /// with the extension `.csv` is written as CSV, every other file
    /// as Arrow IPC.
    #[arg(short, long, value_name = "filename")]
    output: Option<PathBuf>,
}

impl Review {
    pub(crate) fn execute(self) -> HgbResult<()> {
        init_logger(self.verbose, self.quiet);

        let project = Project::discover()?;
        let config = project.config()?;
        let dossiers = project.dossiers(&config)?;
        let entries = project.entries(&config)?;
        let overlay = project.overlay(&config)?;

        let outcome = Pipeline::from_config(&config)
            .run(&dossiers, &entries, &overlay)?;
        let review = &outcome.review;

        if self.counts {
            let mut table = Table::new();
            table.load_preset(presets::UTF8_FULL_CONDENSED);
            table.set_header(Row::from(vec!["kind", "count"]));

            for (kind, count) in review.counts() {
                table.add_row([kind.to_string(), count.to_string()]);
            }

            println!("{table}");
            return Ok(());
        }

        let mut dossier_id: Vec<&str> = vec![];
        let mut cluster_id: Vec<Option<&str>> = vec![];
        let mut kind: Vec<&str> = vec![];
        let mut message: Vec<String> = vec![];

        for (id, flag) in review.iter() {
            dossier_id.push(id);
            cluster_id.push(
                outcome.clustering.cluster_id(id).map(String::as_str),
            );
            kind.push(flag.kind());
            message.push(flag.to_string());
        }

        let mut df = DataFrame::new(vec![
            Series::new("dossierId", dossier_id),
            Series::new("clusterId", cluster_id),
            Series::new("kind", kind),
            Series::new("message", message),
        ])?;

        write_table(&mut df, self.output.as_deref())
    }
}
