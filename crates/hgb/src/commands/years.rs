use std::path::PathBuf;

use clap::Parser;
use polars::prelude::*;

use crate::interval::Year;
use crate::prelude::*;
use crate::table::{
    read_pages, read_textregions, read_transcripts, write_table,
};
use crate::year::{analyse_years, extract_years, Entry, Transcription};

/// Extract the years of the register entries from the transcriptions.
#[derive(Debug, Default, Parser)]
pub(crate) struct Years {
    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Instead of the years, write the analysis of the years per page
    /// (pages without a year, decreasing years within a document).
    #[arg(long)]
    analysis: bool,

    /// Write the table into `filename` instead of `stdout`. A file
    /// with the extension `.csv` is written as CSV, every other file
    /// as Arrow IPC.
    #[arg(short, long, value_name = "filename")]
    output: Option<PathBuf>,
}

impl Years {
    pub(crate) fn execute(self) -> HgbResult<()> {
        init_logger(self.verbose, self.quiet);

        let project = Project::discover()?;
        let config = project.config()?;
        let tables = &config.tables;

        let entries = project.entries(&config)?;
        let transcripts = read_transcripts(project.table(&tables.transcript))?;
        let regions = read_textregions(project.table(&tables.textregion))?;
        let transcription = Transcription::new(&transcripts, &regions);

        let years = extract_years(&entries, &transcription);
        log::info!(
            "found a year for {} of {} entries",
            years.iter().filter(|y| y.year.is_some()).count(),
            entries.len()
        );

        let mut df = if self.analysis {
            let pages = read_pages(project.table(&tables.page))?;
            let entries: Vec<Entry> = entries
                .into_iter()
                .zip(years.iter())
                .map(|(entry, found)| Entry {
                    year: found.year,
                    ..entry
                })
                .collect();

            let rows = analyse_years(&entries, &pages, &transcription);

            let mut doc_id: Vec<&str> = vec![];
            let mut page_nr: Vec<u32> = vec![];
            let mut page_id: Vec<&str> = vec![];
            let mut entry_id: Vec<&str> = vec![];
            let mut year: Vec<Option<Year>> = vec![];
            let mut has_text_region: Vec<bool> = vec![];
            let mut note: Vec<Option<&str>> = vec![];

            for row in rows.iter() {
                doc_id.push(&row.doc_id);
                page_nr.push(row.page_nr);
                page_id.push(&row.page_id);
                entry_id.push(&row.entry_id);
                year.push(row.year);
                has_text_region.push(row.has_text_region);
                note.push(row.note);
            }

            DataFrame::new(vec![
                Series::new("docId", doc_id),
                Series::new("pageNr", page_nr),
                Series::new("pageId", page_id),
                Series::new("entryId", entry_id),
                Series::new("year", year),
                Series::new("hasTextRegion", has_text_region),
                Series::new("note", note),
            ])?
        } else {
            let mut entry_id: Vec<&str> = vec![];
            let mut dossier_id: Vec<&str> = vec![];
            let mut year: Vec<Option<Year>> = vec![];
            let mut year_source: Vec<Option<&str>> = vec![];

            for row in years.iter() {
                entry_id.push(&row.entry_id);
                dossier_id.push(&row.dossier_id);
                year.push(row.year);
                year_source.push(row.year_source.as_deref());
            }

            DataFrame::new(vec![
                Series::new("entryId", entry_id),
                Series::new("dossierId", dossier_id),
                Series::new("year", year),
                Series::new("yearSource", year_source),
            ])?
        };

        write_table(&mut df, self.output.as_deref())
    }
}
