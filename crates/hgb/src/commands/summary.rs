use std::str::FromStr;

use clap::Parser;
use comfy_table::{presets, Row, Table};
use polars::datatypes::DataType;
use polars::lazy::dsl::col;
use polars::prelude::IntoLazy;

use crate::pipeline::Pipeline;
use crate::prelude::*;
use crate::relation::EdgeOrigin;

/// Prints a summary of the derived clusters and relationships.
#[derive(Debug, Default, Parser)]
pub(crate) struct Summary {
    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn table<I, S>(header: [&str; 2], rows: I) -> Table
where
    I: IntoIterator<Item = (S, String)>,
    S: ToString,
{
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(Row::from(header.to_vec()));

    for (key, value) in rows {
        table.add_row([key.to_string(), value]);
    }

    table
}

impl Summary {
    pub(crate) fn execute(self) -> HgbResult<()> {
        init_logger(self.verbose, self.quiet);

        let project = Project::discover()?;
        let config = project.config()?;
        let dossiers = project.dossiers(&config)?;
        let entries = project.entries(&config)?;
        let overlay = project.overlay(&config)?;

        let outcome = Pipeline::from_config(&config)
            .run(&dossiers, &entries, &overlay)?;
        let clusters = &outcome.clustering.clusters;

        let singletons = clusters.values().filter(|m| m.len() == 1).count();
        let largest = clusters.values().map(Vec::len).max();

        println!(
            "{}",
            table(
                ["", "count"],
                [
                    ("dossiers", outcome.records.len().to_string()),
                    ("clusters", clusters.len().to_string()),
                    ("singletons", singletons.to_string()),
                    ("largest cluster", largest.unwrap_or(0).to_string()),
                    ("relations", outcome.edges.len().to_string()),
                    ("reviews", outcome.review.len().to_string()),
                ]
            )
        );

        let df = outcome
            .relationship_frame()?
            .lazy()
            .group_by([col("origin")])
            .agg([col("sourceDossierId").count().alias("relations")])
            .select([
                col("origin"),
                col("relations").cast(DataType::UInt64),
            ])
            .collect()?;

        let origins = df.column("origin")?.str()?;
        let counts = df.column("relations")?.u64()?;

        let mut rows = vec![];
        for idx in 0..df.height() {
            let (Some(origin), Some(count)) =
                (origins.get(idx), counts.get(idx))
            else {
                continue;
            };

            rows.push((EdgeOrigin::from_str(origin)?, count.to_string()));
        }

        rows.sort_by_key(|(origin, _)| *origin);
        println!("{}", table(["origin", "relations"], rows));

        let counts = outcome.review.counts();
        if !counts.is_empty() {
            println!(
                "{}",
                table(
                    ["review", "dossiers"],
                    counts.into_iter().map(|(k, n)| (k, n.to_string()))
                )
            );
        }

        Ok(())
    }
}
