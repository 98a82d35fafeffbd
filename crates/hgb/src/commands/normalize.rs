use std::path::PathBuf;

use clap::Parser;
use indicatif::ParallelProgressIterator;
use polars::prelude::*;
use rayon::prelude::*;

use crate::address::Address;
use crate::normalize::normalize;
use crate::prelude::*;
use crate::table::write_table;

const PBAR_NORMALIZE: &str =
    "Normalizing titles: {human_pos} ({percent}%) | \
        elapsed: {elapsed_precise}{msg}";

/// Normalize the dossier titles and split them into addresses.
#[derive(Debug, Default, Parser)]
pub(crate) struct Normalize {
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

impl Normalize {
    pub(crate) fn execute(self) -> HgbResult<()> {
        init_logger(self.verbose, self.quiet);

        let project = Project::discover()?;
        let config = project.config()?;
        let dossiers = project.dossiers(&config)?;

        let pbar = ProgressBarBuilder::new(PBAR_NORMALIZE, self.quiet)
            .len(dossiers.len() as u64)
            .build();

        let rows: Vec<(&Dossier, String, Address)> = dossiers
            .par_iter()
            .progress_with(pbar)
            .map(|dossier| {
                let key = normalize(&dossier.title);
                let address = Address::from_key(&key);
                (dossier, key, address)
            })
            .collect();

        let mut dossier_id: Vec<&str> = vec![];
        let mut title: Vec<&str> = vec![];
        let mut key: Vec<&str> = vec![];
        let mut street: Vec<Option<&str>> = vec![];
        let mut numbers: Vec<Option<String>> = vec![];
        let mut part_of: Vec<Option<&str>> = vec![];
        let mut postfix: Vec<Option<&str>> = vec![];

        for (dossier, k, address) in rows.iter() {
            dossier_id.push(&dossier.id);
            title.push(&dossier.title);
            key.push(k);
            street.push(
                Some(address.street.as_str()).filter(|s| !s.is_empty()),
            );
            numbers.push(if address.numbers.is_empty() {
                None
            } else {
                Some(address.numbers.join(", "))
            });
            part_of.push(address.part_of.as_deref());
            postfix.push(address.postfix.as_deref());
        }

        let mut df = DataFrame::new(vec![
            Series::new("dossierId", dossier_id),
            Series::new("title", title),
            Series::new("key", key),
            Series::new("street", street),
            Series::new("houseNumbers", numbers),
            Series::new("partOf", part_of),
            Series::new("postfix", postfix),
        ])?;

        write_table(&mut df, self.output.as_deref())
    }
}
