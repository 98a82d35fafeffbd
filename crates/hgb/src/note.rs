//! Cross references of descriptive notes.
//!
//! Besides the validity (see [crate::interval]) the descriptive note
//! refers to the dossiers of the same street that precede or follow
//! the dossier:
//!
//! ```text
//! Bis 1478. Nachher siehe 10/ 12.
//! Seit 1537. Vorher siehe 38, 40 vereinigt.
//! Seit 1542. Vorher siehe 31 u. 33 getrennt.
//! Seit 1735. Vorher siehe 7/1621, 9/1622.
//! ```
//!
//! Numbers following a slash are house numbers as well, unless they
//! have more than two digits (`7/1621` refers to house number 7 only).

use std::fmt::{self, Display};
use std::sync::LazyLock;

use regex::Regex;

use crate::interval::{strip_markers, Year};

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?P<dir>[Nn]achher|[Vv]orher)\s+(?:siehe|s\.|S\.)\s+
        (?P<refs>(?:[0-9]+[a-z]?|[/,]|\s|und\b|u\.)+)
        (?P<merged>,?\s*vereinigt)?
        (?:\s*getrennt)?
        ",
    )
    .expect("valid regex")
});

static CHANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>Bis|Seit) (?P<year>[0-9]{4})")
        .expect("valid regex")
});

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/|[0-9]+[a-z]?").expect("valid regex")
});

static FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)ganz|vereinigt|getrennt|\[\.\.\.\]|[0-9]{4}|/[0-9]{3,4}|[.,;:\s]",
    )
    .expect("valid regex")
});

/// Temporal direction of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// "Vorher siehe": the referenced dossiers precede the dossier.
    Preceding,
    /// "Nachher siehe": the referenced dossiers follow the dossier.
    Following,
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preceding => write!(f, "preceding"),
            Self::Following => write!(f, "following"),
        }
    }
}

/// A reference to other house numbers of the same street.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub direction: Direction,

    /// The referenced house numbers in order of appearance.
    pub numbers: Vec<String>,

    /// Set if the referenced house numbers were merged into (or
    /// split from) a single dossier ("vereinigt").
    pub merged: bool,
}

/// The year a house number was split or merged, given by a note
/// starting with "Bis YYYY" or "Seit YYYY".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Until(Year),
    Since(Year),
}

impl Change {
    #[inline]
    pub fn year(&self) -> Year {
        match self {
            Self::Until(year) | Self::Since(year) => *year,
        }
    }
}

/// The result of the analysis of a descriptive note.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Note {
    pub references: Vec<Reference>,
    pub change: Option<Change>,

    /// Set if the note contains text that isn't covered by any of the
    /// recognized patterns.
    pub unprocessed: bool,
}

fn numbers(refs: &str) -> Vec<String> {
    let mut result: Vec<String> = vec![];
    let mut after_slash = false;

    for m in NUMBER.find_iter(refs) {
        let s = m.as_str();
        if s == "/" {
            after_slash = true;
            continue;
        }

        let digits = s.chars().filter(char::is_ascii_digit).count();
        if (!after_slash || digits <= 2) && !result.iter().any(|n| n == s)
        {
            result.push(s.to_string());
        }

        after_slash = false;
    }

    result
}

impl Note {
    /// Analyses a descriptive note. Missing notes yield an empty
    /// analysis.
    pub fn parse(note: Option<&str>) -> Self {
        let Some(note) = note.map(str::trim).filter(|s| !s.is_empty())
        else {
            return Self::default();
        };

        let references: Vec<Reference> = REFERENCE
            .captures_iter(note)
            .filter_map(|caps| {
                let direction = match &caps["dir"] {
                    "Nachher" | "nachher" => Direction::Following,
                    _ => Direction::Preceding,
                };

                let numbers = numbers(&caps["refs"]);
                if numbers.is_empty() {
                    return None;
                }

                Some(Reference {
                    direction,
                    numbers,
                    merged: caps.name("merged").is_some(),
                })
            })
            .collect();

        let change = CHANGE.captures(note).and_then(|caps| {
            let year = caps["year"].parse::<Year>().ok()?;
            Some(match &caps["kind"] {
                "Bis" => Change::Until(year),
                _ => Change::Since(year),
            })
        });

        let residual = strip_markers(note);
        let residual = REFERENCE.replace_all(&residual, "");
        let residual = FILLER.replace_all(&residual, "");

        Self {
            references,
            change,
            unprocessed: !residual.is_empty(),
        }
    }

    /// Returns the references of the given direction.
    pub fn references(
        &self,
        direction: Direction,
    ) -> impl Iterator<Item = &Reference> {
        self.references
            .iter()
            .filter(move |r| r.direction == direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(note: &str) -> Vec<(Direction, Vec<String>, bool)> {
        Note::parse(Some(note))
            .references
            .into_iter()
            .map(|r| (r.direction, r.numbers, r.merged))
            .collect()
    }

    fn strings(numbers: &[&str]) -> Vec<String> {
        numbers.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parse_following() {
        use Direction::*;

        assert_eq!(
            refs("Bis 1478. Nachher siehe 10/ 12."),
            vec![(Following, strings(&["10", "12"]), false)]
        );
        assert_eq!(
            refs("Bis 1593. Nachher siehe 45, 49 vereinigt."),
            vec![(Following, strings(&["45", "49"]), true)]
        );
        assert_eq!(
            refs("Bis 1607. Nachher siehe 68/995 und 70/996."),
            vec![(Following, strings(&["68", "70"]), false)]
        );
    }

    #[test]
    fn parse_preceding() {
        use Direction::*;

        assert_eq!(
            refs("Seit 1735. Vorher siehe 7/1621, 9/1622."),
            vec![(Preceding, strings(&["7", "9"]), false)]
        );
        assert_eq!(
            refs("Seit 1542. Vorher siehe 31 u. 33 getrennt."),
            vec![(Preceding, strings(&["31", "33"]), false)]
        );
        assert_eq!(
            refs("Seit 1537. vorher s. 38, 40 vereinigt."),
            vec![(Preceding, strings(&["38", "40"]), true)]
        );
    }

    #[test]
    fn parse_both_directions() {
        let note = Note::parse(Some(
            "Seit 1600. Vorher siehe 3. Bis 1700. Nachher siehe 5.",
        ));
        assert_eq!(note.references(Direction::Preceding).count(), 1);
        assert_eq!(note.references(Direction::Following).count(), 1);
        assert!(!note.unprocessed);
    }

    #[test]
    fn parse_change() {
        let note = Note::parse(Some("Bis 1600. Nachher siehe 20."));
        assert_eq!(note.change, Some(Change::Until(1600)));
        assert_eq!(note.change.map(|c| c.year()), Some(1600));

        let note = Note::parse(Some("Seit 1600."));
        assert_eq!(note.change, Some(Change::Since(1600)));

        let note = Note::parse(Some("Errichtet 1600."));
        assert_eq!(note.change, None);
    }

    #[test]
    fn parse_unprocessed() {
        assert!(!Note::parse(Some("Seit 1735.")).unprocessed);
        assert!(!Note::parse(Some("Seit 1735. Ganz vereinigt.")).unprocessed);
        assert!(!Note::parse(Some("Bis 1600. [...]")).unprocessed);
        assert!(
            Note::parse(Some("Seit 1735. Hinterhaus zu 12.")).unprocessed
        );
        assert!(!Note::parse(None).unprocessed);
        assert!(!Note::parse(Some("  ")).unprocessed);
    }

    #[test]
    fn parse_without_numbers() {
        let note = Note::parse(Some("Nachher siehe Spalenberg."));
        assert!(note.references.is_empty());
        assert!(note.unprocessed);
    }
}
