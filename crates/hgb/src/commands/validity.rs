use std::path::PathBuf;

use clap::Parser;
use polars::prelude::*;

use crate::interval::Year;
use crate::pipeline::build_records;
use crate::prelude::*;
use crate::table::write_table;

/// Extract the validity intervals of the dossiers.
#[derive(Debug, Default, Parser)]
pub(crate) struct Validity {
    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write the table into `filename` instead of `stdout`. A file
    /// with the extension `.csv` is written as CSV, every other file
    /// as Arrow IPC.
    #[arg(short, long, value_name = "filename")]
    output: Option<PathBuf>,
}

impl Validity {
    pub(crate) fn execute(self) -> HgbResult<()> {
        init_logger(self.verbose, self.quiet);

        let project = Project::discover()?;
        let config = project.config()?;
        let dossiers = project.dossiers(&config)?;
        let entries = project.entries(&config)?;
        let overlay = project.overlay(&config)?;
        let records = build_records(&dossiers, &entries, &overlay)?;

        let mut dossier_id: Vec<&str> = vec![];
        let mut validity: Vec<&str> = vec![];
        let mut year_from1: Vec<Option<Year>> = vec![];
        let mut year_to1: Vec<Option<Year>> = vec![];
        let mut year_from2: Vec<Option<Year>> = vec![];
        let mut year_to2: Vec<Option<Year>> = vec![];
        let mut year_from_source: Vec<Option<String>> = vec![];
        let mut year_to_source: Vec<Option<String>> = vec![];

        for record in records.iter() {
            let resolved = &record.resolved;
            let (first, second) = (resolved.interval(0), resolved.interval(1));

            dossier_id.push(&record.id);
            validity.push(resolved.validity.kind());
            year_from1.push(first.from);
            year_to1.push(first.to);
            year_from2.push(second.from);
            year_to2.push(second.to);
            year_from_source.push(resolved.from_source.map(|s| s.to_string()));
            year_to_source.push(resolved.to_source.map(|s| s.to_string()));
        }

        let mut df = DataFrame::new(vec![
            Series::new("dossierId", dossier_id),
            Series::new("validity", validity),
            Series::new("yearFrom1", year_from1),
            Series::new("yearTo1", year_to1),
            Series::new("yearFrom2", year_from2),
            Series::new("yearTo2", year_to2),
            Series::new("yearFromSource", year_from_source),
            Series::new("yearToSource", year_to_source),
        ])?;

        write_table(&mut df, self.output.as_deref())
    }
}
