//! Reading the exported database tables and writing derived tables.
//!
//! Tables are read either from CSV (all columns as strings) or from
//! Arrow IPC files, depending on the file extension.

use std::ffi::OsStr;
use std::fmt::Display;
use std::fs::File;
use std::io::stdout;
use std::path::Path;
use std::str::FromStr;

use polars::prelude::*;

use crate::interval::Year;
use crate::prelude::*;
use crate::year::{Entry, Page, TextRegion, Transcript};

/// Reads a table into a data frame.
pub fn read_table<P: AsRef<Path>>(path: P) -> HgbResult<DataFrame> {
    let path = path.as_ref();
    if !path.is_file() {
        bail!("table {} not found", path.display());
    }

    log::debug!("read table {}", path.display());

    Ok(match path.extension().and_then(OsStr::to_str) {
        Some("ipc" | "arrow") => IpcReader::new(File::open(path)?)
            .memory_mapped(None)
            .finish()?,
        _ => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.into()))?
            .finish()?,
    })
}

/// Writes a data frame. Without a path the table is written as CSV to
/// stdout, otherwise the extension selects between CSV and Arrow IPC
/// (ZSTD compressed).
pub fn write_table(
    df: &mut DataFrame,
    output: Option<&Path>,
) -> HgbResult<()> {
    match output {
        None => {
            let mut writer = CsvWriter::new(stdout().lock());
            writer.finish(df)?;
        }
        Some(path)
            if path.extension().and_then(OsStr::to_str) == Some("csv") =>
        {
            let mut writer = CsvWriter::new(File::create(path)?);
            writer.finish(df)?;
        }
        Some(path) => {
            let mut writer = IpcWriter::new(File::create(path)?)
                .with_compression(Some(IpcCompression::ZSTD));
            writer.finish(df)?;
        }
    }

    Ok(())
}

/// Returns the values of a column as (trimmed, non-empty) strings.
fn strings(df: &DataFrame, name: &str) -> HgbResult<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect())
}

/// Like [strings], but a missing column yields null values.
fn optional_strings(
    df: &DataFrame,
    name: &str,
) -> HgbResult<Vec<Option<String>>> {
    if df.column(name).is_err() {
        return Ok(vec![None; df.height()]);
    }

    strings(df, name)
}

fn required(value: Option<String>, name: &str) -> HgbResult<String> {
    match value {
        Some(value) => Ok(value),
        None => bail!("missing value in column `{name}`"),
    }
}

fn parse<T>(value: Option<String>, name: &str) -> HgbResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    let value = required(value, name)?;
    value
        .parse::<T>()
        .map_err(|e| HgbError::Other(format!("{name}: '{value}': {e}")))
}

/// Parses a year. Exports written by pandas carry floats (`1600.0`).
fn parse_year(value: Option<String>) -> HgbResult<Option<Year>> {
    let Some(value) = value else {
        return Ok(None);
    };

    if let Ok(year) = value.parse::<Year>() {
        return Ok(Some(year));
    }

    match value.parse::<f64>() {
        Ok(year) if year.is_nan() => Ok(None),
        Ok(year)
            if year.fract() == 0.0
                && (Year::MIN as f64..=Year::MAX as f64).contains(&year) =>
        {
            Ok(Some(year as Year))
        }
        _ => bail!("invalid year '{value}'"),
    }
}

/// Parses an array of ids (`{1,2}`, `[1, 2]` or `1`).
pub fn parse_ids(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_start_matches(['{', '['])
        .trim_end_matches(['}', ']'])
        .split(',')
        .map(|id| id.trim().trim_matches(['"', '\'']))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads the dossier table (`stabs_dossier`).
pub fn read_dossiers<P: AsRef<Path>>(path: P) -> HgbResult<Vec<Dossier>> {
    let df = read_table(path)?;
    let ids = strings(&df, "dossierId")?;
    let titles = strings(&df, "title")?;
    let series = optional_strings(&df, "serieId")?;
    let notes = optional_strings(&df, "descriptiveNote")?;

    let mut dossiers = Vec::with_capacity(df.height());
    for (((id, title), serie_id), note) in
        ids.into_iter().zip(titles).zip(series).zip(notes)
    {
        dossiers.push(Dossier {
            id: required(id, "dossierId")?,
            serie_id,
            title: title.unwrap_or_default(),
            note,
        });
    }

    Ok(dossiers)
}

/// Reads the entry table (`project_entry`).
pub fn read_entries<P: AsRef<Path>>(path: P) -> HgbResult<Vec<Entry>> {
    let df = read_table(path)?;
    let entry_ids = strings(&df, "entryId")?;
    let dossier_ids = strings(&df, "dossierId")?;
    let page_ids = strings(&df, "pageId")?;
    let years = optional_strings(&df, "year")?;

    let mut entries = Vec::with_capacity(df.height());
    for (((entry_id, dossier_id), page_ids), year) in entry_ids
        .into_iter()
        .zip(dossier_ids)
        .zip(page_ids)
        .zip(years)
    {
        entries.push(Entry {
            entry_id: required(entry_id, "entryId")?,
            dossier_id: required(dossier_id, "dossierId")?,
            page_ids: page_ids.as_deref().map(parse_ids).unwrap_or_default(),
            year: parse_year(year)?,
        });
    }

    Ok(entries)
}

/// Reads the transcript table (`transkribus_transcript`).
pub fn read_transcripts<P: AsRef<Path>>(
    path: P,
) -> HgbResult<Vec<Transcript>> {
    let df = read_table(path)?;
    let keys = strings(&df, "key")?;
    let page_ids = strings(&df, "pageId")?;
    let status = optional_strings(&df, "status")?;
    let timestamps = strings(&df, "timestamp")?;

    let mut transcripts = Vec::with_capacity(df.height());
    for (((key, page_id), status), timestamp) in keys
        .into_iter()
        .zip(page_ids)
        .zip(status)
        .zip(timestamps)
    {
        transcripts.push(Transcript {
            key: required(key, "key")?,
            page_id: required(page_id, "pageId")?,
            status,
            timestamp: parse(timestamp, "timestamp")?,
        });
    }

    Ok(transcripts)
}

/// Reads the text region table (`transkribus_textregion`).
pub fn read_textregions<P: AsRef<Path>>(
    path: P,
) -> HgbResult<Vec<TextRegion>> {
    let df = read_table(path)?;
    let ids = strings(&df, "textRegionId")?;
    let keys = strings(&df, "key")?;
    let indices = strings(&df, "index")?;
    let kinds = optional_strings(&df, "type")?;
    let texts = optional_strings(&df, "text")?;

    let mut regions = Vec::with_capacity(df.height());
    for ((((id, key), index), kind), text) in ids
        .into_iter()
        .zip(keys)
        .zip(indices)
        .zip(kinds)
        .zip(texts)
    {
        regions.push(TextRegion {
            text_region_id: required(id, "textRegionId")?,
            key: required(key, "key")?,
            index: parse(index, "index")?,
            kind,
            text,
        });
    }

    Ok(regions)
}

/// Reads the page table (`transkribus_page`).
pub fn read_pages<P: AsRef<Path>>(path: P) -> HgbResult<Vec<Page>> {
    let df = read_table(path)?;
    let page_ids = strings(&df, "pageId")?;
    let doc_ids = strings(&df, "docId")?;
    let page_nrs = strings(&df, "pageNr")?;

    let mut pages = Vec::with_capacity(df.height());
    for ((page_id, doc_id), page_nr) in
        page_ids.into_iter().zip(doc_ids).zip(page_nrs)
    {
        pages.push(Page {
            page_id: required(page_id, "pageId")?,
            doc_id: required(doc_id, "docId")?,
            page_nr: parse(page_nr, "pageNr")?,
        });
    }

    Ok(pages)
}
