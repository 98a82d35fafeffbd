//! Years of the register entries.
//!
//! The year of an entry is taken from the HTR transcription of its
//! pages. Only the latest transcript of a page is considered.

use std::cmp::Ordering;
use std::sync::LazyLock;

use hashbrown::HashMap;
use rayon::prelude::*;
use regex::Regex;

use crate::interval::Year;
use crate::prelude::*;

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"1[0-9]{3}").expect("valid regex"));

/// Headers of the pages of the "Zinsverzeichnis".
static ZINS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[Zz][iü]n[n]?s").expect("valid regex")
});

pub const NOTE_NO_YEAR: &str =
    "Has non-empty text region(s) but no year detected.";
pub const NOTE_DECREASING: &str =
    "Year number is smaller than previous year.";

/// A register entry (`project_entry`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub entry_id: String,
    pub dossier_id: DossierId,
    pub page_ids: Vec<String>,
    pub year: Option<Year>,
}

/// A transcript of a page (`transkribus_transcript`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub key: String,
    pub page_id: String,
    pub status: Option<String>,
    pub timestamp: i64,
}

/// A text region of a transcript (`transkribus_textregion`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRegion {
    pub text_region_id: String,
    pub key: String,
    pub index: u32,
    pub kind: Option<String>,
    pub text: Option<String>,
}

impl TextRegion {
    #[inline]
    fn is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    #[inline]
    fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// A page of a Transkribus document (`transkribus_page`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub page_id: String,
    pub doc_id: String,
    pub page_nr: u32,
}

/// Index of the latest transcript of every page and its text regions.
#[derive(Debug, Default)]
pub struct Transcription<'a> {
    latest: HashMap<&'a str, &'a Transcript>,
    regions: HashMap<&'a str, Vec<&'a TextRegion>>,
}

impl<'a> Transcription<'a> {
    pub fn new(
        transcripts: &'a [Transcript],
        regions: &'a [TextRegion],
    ) -> Self {
        let mut latest: HashMap<&str, &Transcript> = HashMap::new();
        for transcript in transcripts.iter() {
            latest
                .entry(transcript.page_id.as_str())
                .and_modify(|current| {
                    let ord = transcript
                        .timestamp
                        .cmp(&current.timestamp)
                        .then_with(|| transcript.key.cmp(&current.key));
                    if ord == Ordering::Greater {
                        *current = transcript;
                    }
                })
                .or_insert(transcript);
        }

        let mut by_key: HashMap<&str, Vec<&TextRegion>> = HashMap::new();
        for region in regions.iter() {
            by_key.entry(region.key.as_str()).or_default().push(region);
        }

        by_key.values_mut().for_each(|regions| {
            regions.sort_by_key(|r| (r.index, r.text_region_id.as_str()))
        });

        Self {
            latest,
            regions: by_key,
        }
    }

    /// Returns the latest transcript of a page.
    #[inline]
    pub fn latest(&self, page_id: &str) -> Option<&'a Transcript> {
        self.latest.get(page_id).copied()
    }

    /// Returns the text regions of the latest transcript of a page,
    /// ordered by their index.
    pub fn regions(&self, page_id: &str) -> &[&'a TextRegion] {
        self.latest(page_id)
            .and_then(|ts| self.regions.get(ts.key.as_str()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the year of an entry and the id of the text region it
    /// was found in.
    ///
    /// The pages are searched in order. The first year in a header
    /// region wins; if no header contains a year but one of them
    /// mentions the "Zins", the first year of a paragraph region is
    /// taken.
    pub fn entry_year(&self, page_ids: &[String]) -> Option<(Year, &'a str)> {
        for page_id in page_ids.iter() {
            let regions = self.regions(page_id);
            let headers: Vec<_> =
                regions.iter().filter(|r| r.is("header")).collect();

            if headers.is_empty() {
                continue;
            }

            for header in headers.iter() {
                if let Some(year) = find_year(header.text()) {
                    return Some((year, header.text_region_id.as_str()));
                }
            }

            if headers.iter().any(|h| ZINS.is_match(h.text())) {
                for paragraph in regions.iter().filter(|r| r.is("paragraph"))
                {
                    if let Some(year) = find_year(paragraph.text()) {
                        return Some((
                            year,
                            paragraph.text_region_id.as_str(),
                        ));
                    }
                }
            }
        }

        None
    }
}

#[inline]
fn find_year(text: &str) -> Option<Year> {
    YEAR.find(text).and_then(|m| m.as_str().parse().ok())
}

/// The extracted year of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryYear {
    pub entry_id: String,
    pub dossier_id: DossierId,
    pub year: Option<Year>,

    /// The id of the text region the year was taken from.
    pub year_source: Option<String>,
}

/// Extracts the year of every entry.
pub fn extract_years(
    entries: &[Entry],
    transcription: &Transcription,
) -> Vec<EntryYear> {
    entries
        .par_iter()
        .map(|entry| {
            let found = transcription.entry_year(&entry.page_ids);
            EntryYear {
                entry_id: entry.entry_id.clone(),
                dossier_id: entry.dossier_id.clone(),
                year: found.map(|(year, _)| year),
                year_source: found.map(|(_, id)| id.to_string()),
            }
        })
        .collect()
}

/// A row of the year analysis, one per page of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageYear {
    pub doc_id: String,
    pub page_nr: u32,
    pub page_id: String,
    pub entry_id: String,
    pub year: Option<Year>,
    pub has_text_region: bool,
    pub note: Option<&'static str>,
}

/// Checks the entry years for plausibility.
///
/// A page is noted if its latest transcript has text regions but the
/// entry has no year, or if the year decreases within a document
/// (ordered by page number). Pages unknown to the page table are
/// skipped.
pub fn analyse_years(
    entries: &[Entry],
    pages: &[Page],
    transcription: &Transcription,
) -> Vec<PageYear> {
    let pages: HashMap<&str, &Page> =
        pages.iter().map(|p| (p.page_id.as_str(), p)).collect();

    let mut rows = vec![];
    for entry in entries.iter() {
        for page_id in entry.page_ids.iter() {
            let Some(page) = pages.get(page_id.as_str()) else {
                log::warn!("skip unknown page {page_id}");
                continue;
            };

            let has_text_region = !transcription.regions(page_id).is_empty();
            let note = if has_text_region && entry.year.is_none() {
                Some(NOTE_NO_YEAR)
            } else {
                None
            };

            rows.push(PageYear {
                doc_id: page.doc_id.clone(),
                page_nr: page.page_nr,
                page_id: page_id.clone(),
                entry_id: entry.entry_id.clone(),
                year: entry.year,
                has_text_region,
                note,
            });
        }
    }

    rows.sort_by(|a, b| {
        (a.doc_id.as_str(), a.page_nr, a.page_id.as_str()).cmp(&(
            b.doc_id.as_str(),
            b.page_nr,
            b.page_id.as_str(),
        ))
    });

    let mut previous: Option<(&str, Option<Year>)> = None;
    let mut decreasing = vec![];

    for (i, row) in rows.iter().enumerate() {
        match previous {
            Some((doc_id, last)) if doc_id == row.doc_id => {
                if let Some(year) = row.year {
                    if last.is_some_and(|last| year < last) {
                        decreasing.push(i);
                    }

                    previous = Some((doc_id, Some(year)));
                }
            }
            _ => previous = Some((row.doc_id.as_str(), row.year)),
        }
    }

    for i in decreasing {
        rows[i].note = Some(NOTE_DECREASING);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(key: &str, page_id: &str, timestamp: i64) -> Transcript {
        Transcript {
            key: key.into(),
            page_id: page_id.into(),
            status: None,
            timestamp,
        }
    }

    fn region(
        id: &str,
        key: &str,
        index: u32,
        kind: &str,
        text: &str,
    ) -> TextRegion {
        TextRegion {
            text_region_id: id.into(),
            key: key.into(),
            index,
            kind: Some(kind.into()),
            text: Some(text.into()),
        }
    }

    fn entry(id: &str, pages: &[&str], year: Option<Year>) -> Entry {
        Entry {
            entry_id: id.into(),
            dossier_id: "HGB_1_001".into(),
            page_ids: pages.iter().map(|p| p.to_string()).collect(),
            year,
        }
    }

    #[test]
    fn latest_transcript() {
        let transcripts = vec![
            transcript("k1", "p1", 10),
            transcript("k2", "p1", 30),
            transcript("k3", "p1", 20),
        ];
        let transcription = Transcription::new(&transcripts, &[]);

        assert_eq!(transcription.latest("p1").unwrap().key, "k2");
        assert!(transcription.latest("p2").is_none());
        assert!(transcription.regions("p1").is_empty());
    }

    #[test]
    fn year_from_header() {
        let transcripts =
            vec![transcript("old", "p1", 1), transcript("new", "p1", 2)];
        let regions = vec![
            region("r1", "old", 0, "header", "Anno 1500"),
            region("r2", "new", 1, "header", "Kauf 1602 und 1603"),
            region("r3", "new", 0, "paragraph", "1590"),
        ];
        let transcription = Transcription::new(&transcripts, &regions);

        assert_eq!(
            transcription.entry_year(&["p1".into()]),
            Some((1602, "r2"))
        );
    }

    #[test]
    fn year_from_zins_paragraph() {
        let transcripts = vec![transcript("k1", "p1", 1)];
        let regions = vec![
            region("r1", "k1", 0, "header", "Zinsverzeichnis"),
            region("r2", "k1", 1, "paragraph", "ohne Jahr"),
            region("r3", "k1", 2, "paragraph", "item 1633 und 1640"),
        ];
        let transcription = Transcription::new(&transcripts, &regions);

        assert_eq!(
            transcription.entry_year(&["p1".into()]),
            Some((1633, "r3"))
        );
    }

    #[test]
    fn year_not_found() {
        let transcripts =
            vec![transcript("k1", "p1", 1), transcript("k2", "p2", 1)];
        let regions = vec![
            region("r1", "k1", 0, "paragraph", "1633"),
            region("r2", "k2", 0, "header", "Kauf"),
            region("r3", "k2", 1, "paragraph", "1640"),
        ];
        let transcription = Transcription::new(&transcripts, &regions);

        assert_eq!(transcription.entry_year(&["p1".into()]), None);
        assert_eq!(transcription.entry_year(&["p2".into()]), None);
        assert_eq!(transcription.entry_year(&["p9".into()]), None);
    }

    #[test]
    fn year_from_second_page() {
        let transcripts =
            vec![transcript("k1", "p1", 1), transcript("k2", "p2", 1)];
        let regions = vec![
            region("r1", "k1", 0, "paragraph", "1633"),
            region("r2", "k2", 0, "header", "Kauf 1701"),
        ];
        let transcription = Transcription::new(&transcripts, &regions);

        let entries = vec![entry("e1", &["p1", "p2"], None)];
        let years = extract_years(&entries, &transcription);
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].year, Some(1701));
        assert_eq!(years[0].year_source.as_deref(), Some("r2"));
    }

    #[test]
    fn analyse() {
        let transcripts = vec![
            transcript("k1", "p1", 1),
            transcript("k2", "p2", 1),
            transcript("k3", "p3", 1),
            transcript("k4", "p4", 1),
        ];
        let regions = vec![
            region("r1", "k1", 0, "header", "Kauf 1600"),
            region("r2", "k2", 0, "header", "Kauf"),
            region("r3", "k3", 0, "header", "Kauf 1590"),
        ];
        let transcription = Transcription::new(&transcripts, &regions);

        let pages = vec![
            Page {
                page_id: "p1".into(),
                doc_id: "d1".into(),
                page_nr: 1,
            },
            Page {
                page_id: "p2".into(),
                doc_id: "d1".into(),
                page_nr: 2,
            },
            Page {
                page_id: "p3".into(),
                doc_id: "d1".into(),
                page_nr: 3,
            },
            Page {
                page_id: "p4".into(),
                doc_id: "d2".into(),
                page_nr: 1,
            },
        ];

        let entries = vec![
            entry("e3", &["p3"], Some(1590)),
            entry("e1", &["p1"], Some(1600)),
            entry("e2", &["p2"], None),
            entry("e4", &["p4", "p9"], Some(1500)),
        ];

        let rows = analyse_years(&entries, &pages, &transcription);
        let notes: Vec<_> = rows
            .iter()
            .map(|r| (r.page_id.as_str(), r.has_text_region, r.note))
            .collect();

        assert_eq!(
            notes,
            vec![
                ("p1", true, None),
                ("p2", true, Some(NOTE_NO_YEAR)),
                ("p3", true, Some(NOTE_DECREASING)),
                ("p4", false, None),
            ]
        );
    }
}
