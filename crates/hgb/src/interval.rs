//! Validity intervals of dossiers.
//!
//! The descriptive note of a dossier documents, for the most frequent
//! cases, when the dossier was opened and closed:
//!
//! * `Seit 1600.`, `Errichtet 1600.`, `Ab 1600.`, `Wieder seit 1700.`
//!   start an interval,
//! * `Bis 1650.`, `Abgebrochen 1650.` end an interval,
//! * `1734-1819` is a complete interval.
//!
//! A dossier may be valid in two disjoint periods (e.g. when the house
//! was renumbered and later got its old number back). Notes that yield
//! more than two intervals or intervals with a start after their end
//! are ambiguous and are left for the manual review.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{bail, HgbError};

pub type Year = i16;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \b(?P<start>Seit|Errichtet|Ab|Wieder\ seit)\ (?P<sy>1[0-9]{3})\.
        | \b(?P<end>Bis|Abgebrochen)\ (?P<ey>1[0-9]{3})\.
        | \b(?P<rf>1[0-9]{3})\ ?-\ ?(?P<rt>1[0-9]{3})\b\.?
        ",
    )
    .expect("valid regex")
});

/// A (possibly open) interval of years.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub from: Option<Year>,
    pub to: Option<Year>,
}

impl Interval {
    pub fn new(from: Option<Year>, to: Option<Year>) -> Self {
        Self { from, to }
    }

    /// Returns true if neither start nor end is known.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Returns true if start and end are known and the start is after
    /// the end.
    #[inline]
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(f), Some(t)) if f > t)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.from, self.to) {
            (Some(from), Some(to)) => write!(f, "{from}-{to}"),
            (Some(from), None) => write!(f, "{from}-"),
            (None, Some(to)) => write!(f, "-{to}"),
            (None, None) => write!(f, "-"),
        }
    }
}

/// The validity of a dossier according to its descriptive note.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// The note doesn't document the validity.
    #[default]
    Unknown,
    Single(Interval),
    /// Two disjoint periods, the first ending before the second.
    Double(Interval, Interval),
    /// The note documents the validity, but not in a consistent way.
    Ambiguous,
}

#[derive(Debug)]
enum Marker {
    Start(Year),
    End(Year),
    Range(Year, Year),
}

fn markers(note: &str) -> Vec<Marker> {
    let year = |m: regex::Match| m.as_str().parse::<Year>().ok();

    MARKER
        .captures_iter(note)
        .filter_map(|caps| {
            if caps.name("start").is_some() {
                Some(Marker::Start(year(caps.name("sy")?)?))
            } else if caps.name("end").is_some() {
                Some(Marker::End(year(caps.name("ey")?)?))
            } else {
                Some(Marker::Range(
                    year(caps.name("rf")?)?,
                    year(caps.name("rt")?)?,
                ))
            }
        })
        .collect()
}

/// Removes all validity markers from a note.
pub fn strip_markers(note: &str) -> String {
    MARKER.replace_all(note, "").into_owned()
}

impl Validity {
    /// A short name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Single(_) => "single",
            Self::Double(_, _) => "double",
            Self::Ambiguous => "ambiguous",
        }
    }

    /// Extracts the validity from a descriptive note. Missing or
    /// unparseable notes yield [Validity::Unknown].
    pub fn extract(note: Option<&str>) -> Self {
        let Some(note) = note else {
            return Self::Unknown;
        };

        let mut intervals: Vec<Interval> = vec![];
        let mut current = Interval::default();

        for marker in markers(note) {
            match marker {
                Marker::Start(year) => {
                    if !current.is_empty() {
                        intervals.push(current);
                        current = Interval::default();
                    }
                    current.from = Some(year);
                }
                Marker::End(year) => {
                    if current.to.is_some() {
                        intervals.push(current);
                        current = Interval::default();
                    }
                    current.to = Some(year);
                }
                Marker::Range(from, to) => {
                    if !current.is_empty() {
                        intervals.push(current);
                    }
                    intervals.push(Interval::new(Some(from), Some(to)));
                    current = Interval::default();
                }
            }
        }

        if !current.is_empty() {
            intervals.push(current);
        }

        if intervals.iter().any(Interval::is_inverted) {
            return Self::Ambiguous;
        }

        match intervals.as_slice() {
            [] => Self::Unknown,
            [first] => Self::Single(*first),
            [first, second] => match (first.to, second.from) {
                (Some(to), Some(from)) if to <= from => {
                    Self::Double(*first, *second)
                }
                _ => Self::Ambiguous,
            },
            _ => Self::Ambiguous,
        }
    }

    /// Returns the intervals in chronological order.
    pub fn intervals(&self) -> Vec<Interval> {
        match self {
            Self::Single(first) => vec![*first],
            Self::Double(first, second) => vec![*first, *second],
            _ => vec![],
        }
    }
}

/// The origin of a resolved year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum YearSource {
    /// Set by a manual correction.
    Manual,
    /// Extracted from `stabs_dossier.descriptiveNote`.
    DescriptiveNote,
    /// Minimum/maximum year of the entries of the dossier.
    Entry,
}

impl Display for YearSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::DescriptiveNote => {
                write!(f, "stabs_dossier.descriptiveNote")
            }
            Self::Entry => write!(f, "project_entry.year"),
        }
    }
}

impl FromStr for YearSource {
    type Err = HgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "stabs_dossier.descriptiveNote" => Ok(Self::DescriptiveNote),
            "project_entry.year" => Ok(Self::Entry),
            _ => bail!("invalid year source '{s}'"),
        }
    }
}

/// The validity of a dossier after combining the descriptive note,
/// the entry years and manual corrections.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The validity as documented by the descriptive note.
    pub validity: Validity,

    /// The resolved intervals in chronological order (at most two).
    pub intervals: Vec<Interval>,

    pub from_source: Option<YearSource>,
    pub to_source: Option<YearSource>,
}

impl Resolved {
    /// Resolves the validity of a dossier. Manual years take
    /// precedence over the note, the note over the entry years.
    pub fn new(
        validity: Validity,
        entry_years: &[Year],
        manual_from: Option<Year>,
        manual_to: Option<Year>,
    ) -> Self {
        let mut intervals = validity.intervals();
        let mut from_source = None;
        let mut to_source = None;

        if validity == Validity::Ambiguous {
            // only a complete manual interval resolves the ambiguity
            if let (Some(from), Some(to)) = (manual_from, manual_to) {
                return Self {
                    validity,
                    intervals: vec![Interval::new(Some(from), Some(to))],
                    from_source: Some(YearSource::Manual),
                    to_source: Some(YearSource::Manual),
                };
            }

            return Self {
                validity,
                ..Default::default()
            };
        }

        if intervals.is_empty() {
            intervals.push(Interval::default());
        }

        let first = intervals.first_mut().expect("non-empty");
        if first.from.is_some() {
            from_source = Some(YearSource::DescriptiveNote);
        }
        if let Some(year) = manual_from {
            first.from = Some(year);
            from_source = Some(YearSource::Manual);
        } else if first.from.is_none() {
            if let Some(min) = entry_years.iter().min() {
                first.from = Some(*min);
                from_source = Some(YearSource::Entry);
            }
        }

        let last = intervals.last_mut().expect("non-empty");
        if last.to.is_some() {
            to_source = Some(YearSource::DescriptiveNote);
        }
        if let Some(year) = manual_to {
            last.to = Some(year);
            to_source = Some(YearSource::Manual);
        } else if last.to.is_none() {
            if let Some(max) = entry_years.iter().max() {
                last.to = Some(*max);
                to_source = Some(YearSource::Entry);
            }
        }

        intervals.retain(|interval| !interval.is_empty());

        Self {
            validity,
            intervals,
            from_source,
            to_source,
        }
    }

    /// Returns true if the validity couldn't be determined at all.
    #[inline]
    pub fn is_undated(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Returns true if the note is ambiguous and no manual correction
    /// resolved it.
    #[inline]
    pub fn is_ambiguous(&self) -> bool {
        self.validity == Validity::Ambiguous && self.intervals.is_empty()
    }

    /// Returns true if start and end are known and consistent.
    pub fn is_complete(&self) -> bool {
        self.start().is_some()
            && self.end().is_some()
            && !self.intervals.iter().any(Interval::is_inverted)
    }

    /// The first year of validity.
    #[inline]
    pub fn start(&self) -> Option<Year> {
        self.intervals.first().and_then(|i| i.from)
    }

    /// The last year of validity.
    #[inline]
    pub fn end(&self) -> Option<Year> {
        self.intervals.last().and_then(|i| i.to)
    }

    /// The last year of the first period of validity. Successors of
    /// the first period are compared against it.
    #[inline]
    pub fn first_end(&self) -> Option<Year> {
        self.intervals.first().and_then(|i| i.to)
    }

    /// Returns the n-th interval (zero-based).
    #[inline]
    pub fn interval(&self, n: usize) -> Interval {
        self.intervals.get(n).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(from: Option<Year>, to: Option<Year>) -> Validity {
        Validity::Single(Interval::new(from, to))
    }

    #[test]
    fn extract_start_and_end() {
        assert_eq!(
            Validity::extract(Some("Seit 1735.")),
            single(Some(1735), None)
        );
        assert_eq!(
            Validity::extract(Some("Errichtet 1612. Bis 1794.")),
            single(Some(1612), Some(1794))
        );
        assert_eq!(
            Validity::extract(Some("Bis 1478. Nachher siehe 10/ 12.")),
            single(None, Some(1478))
        );
        assert_eq!(
            Validity::extract(Some("Ab 1600. Abgebrochen 1850.")),
            single(Some(1600), Some(1850))
        );
    }

    #[test]
    fn extract_range() {
        assert_eq!(
            Validity::extract(Some("1734-1819.")),
            single(Some(1734), Some(1819))
        );
        assert_eq!(
            Validity::extract(Some("1734 - 1819")),
            single(Some(1734), Some(1819))
        );
    }

    #[test]
    fn extract_two_intervals() {
        assert_eq!(
            Validity::extract(Some(
                "Seit 1500. Bis 1600. Wieder seit 1700."
            )),
            Validity::Double(
                Interval::new(Some(1500), Some(1600)),
                Interval::new(Some(1700), None),
            )
        );
        assert_eq!(
            Validity::extract(Some("1500-1600, 1650-1700.")),
            Validity::Double(
                Interval::new(Some(1500), Some(1600)),
                Interval::new(Some(1650), Some(1700)),
            )
        );
    }

    #[test]
    fn extract_ambiguous() {
        // more than two intervals
        assert_eq!(
            Validity::extract(Some("1500-1550, 1560-1600, 1650-1700.")),
            Validity::Ambiguous
        );
        // start after end
        assert_eq!(
            Validity::extract(Some("Seit 1700. Bis 1600.")),
            Validity::Ambiguous
        );
        // overlapping periods
        assert_eq!(
            Validity::extract(Some("Seit 1500. Seit 1550.")),
            Validity::Ambiguous
        );
    }

    #[test]
    fn extract_unknown() {
        assert_eq!(Validity::extract(None), Validity::Unknown);
        assert_eq!(Validity::extract(Some("")), Validity::Unknown);
        assert_eq!(
            Validity::extract(Some("Vorher siehe 7/1621, 9/1622.")),
            Validity::Unknown
        );
        assert_eq!(
            Validity::extract(Some("seit 16xx unbekannt")),
            Validity::Unknown
        );
        // not followed by a full stop
        assert_eq!(
            Validity::extract(Some("Seit 1600 im Besitz")),
            Validity::Unknown
        );
    }

    #[test]
    fn strip_markers_from_note() {
        assert_eq!(
            strip_markers("Seit 1735. Vorher siehe 7."),
            " Vorher siehe 7."
        );
        assert_eq!(strip_markers("1734-1819."), "");
    }

    #[test]
    fn resolve_with_entry_years() {
        let resolved = Resolved::new(
            single(Some(1600), None),
            &[1610, 1590, 1700],
            None,
            None,
        );
        assert_eq!(resolved.start(), Some(1600));
        assert_eq!(resolved.end(), Some(1700));
        assert_eq!(
            resolved.from_source,
            Some(YearSource::DescriptiveNote)
        );
        assert_eq!(resolved.to_source, Some(YearSource::Entry));
        assert!(resolved.is_complete());

        let resolved =
            Resolved::new(Validity::Unknown, &[1610, 1590], None, None);
        assert_eq!(
            resolved.interval(0),
            Interval::new(Some(1590), Some(1610))
        );
        assert_eq!(resolved.from_source, Some(YearSource::Entry));
    }

    #[test]
    fn resolve_manual_precedence() {
        let resolved = Resolved::new(
            single(Some(1600), Some(1650)),
            &[1500],
            Some(1601),
            None,
        );
        assert_eq!(resolved.start(), Some(1601));
        assert_eq!(resolved.end(), Some(1650));
        assert_eq!(resolved.from_source, Some(YearSource::Manual));
        assert_eq!(resolved.to_source, Some(YearSource::DescriptiveNote));
    }

    #[test]
    fn resolve_undated_and_ambiguous() {
        let resolved = Resolved::new(Validity::Unknown, &[], None, None);
        assert!(resolved.is_undated());
        assert!(!resolved.is_ambiguous());

        let resolved =
            Resolved::new(Validity::Ambiguous, &[1600, 1700], None, None);
        assert!(resolved.is_ambiguous());
        assert!(resolved.is_undated());

        let resolved = Resolved::new(
            Validity::Ambiguous,
            &[],
            Some(1600),
            Some(1700),
        );
        assert!(!resolved.is_ambiguous());
        assert_eq!(resolved.from_source, Some(YearSource::Manual));
    }

    #[test]
    fn resolve_two_intervals() {
        let validity = Validity::extract(Some(
            "Seit 1500. Bis 1600. Wieder seit 1700.",
        ));
        let resolved = Resolved::new(validity, &[1510, 1790], None, None);
        assert_eq!(resolved.intervals.len(), 2);
        assert_eq!(resolved.start(), Some(1500));
        assert_eq!(resolved.end(), Some(1790));
        assert_eq!(
            resolved.interval(1),
            Interval::new(Some(1700), Some(1790))
        );
    }

    #[test]
    fn year_source_round_trip() {
        for source in [
            YearSource::Manual,
            YearSource::DescriptiveNote,
            YearSource::Entry,
        ] {
            assert_eq!(
                YearSource::from_str(&source.to_string()).unwrap(),
                source
            );
        }
    }
}
