//! Review notes for the manual post-processing.
//!
//! The inference never guesses where the data is inconsistent;
//! instead it attaches a [Flag] to the dossiers in question. The flags
//! of a dossier are rendered into the `note_postprocessing` column,
//! one sentence per flag.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use crate::dossier::DossierId;
use crate::interval::{Resolved, Year};
use crate::relation::Edge;

/// A finding of the inference that needs a manual review. The variant
/// order is the order in which the flags of a dossier are reported.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    YearMissing,
    Ambiguous,
    PrecedingAndSubsequent,
    PredecessorOverlap {
        id: DossierId,
        year_to: Year,
        year_from: Year,
    },
    SuccessorOverlap {
        id: DossierId,
        year_from: Year,
        year_to: Year,
    },
    PredecessorGap {
        id: DossierId,
        year_to: Year,
        year_from: Year,
        max_gap: u16,
    },
    SuccessorGap {
        id: DossierId,
        year_to: Year,
        year_from: Year,
        max_gap: u16,
    },
    Cycle,
    NoteUnprocessed,
    NoFollowing,
    NoPreceding,
    Contradiction {
        source: DossierId,
        target: DossierId,
    },
    NoHouseNumber,
    AdditionalAddress(String),
    ManualEdgeSeparated {
        source: DossierId,
        target: DossierId,
    },
}

impl Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YearMissing => write!(f, "Year is missing."),
            Self::Ambiguous => write!(f, "Validity is ambiguous."),
            Self::PrecedingAndSubsequent => write!(
                f,
                "Dossier has preceding and subsequent dossier."
            ),
            Self::PredecessorOverlap {
                id,
                year_to,
                year_from,
            } => write!(
                f,
                "yearto {year_to} of preceding dossier {id} is larger \
                 than yearfrom1 {year_from}."
            ),
            Self::SuccessorOverlap {
                id,
                year_from,
                year_to,
            } => write!(
                f,
                "yearfrom {year_from} of following dossier {id} is \
                 smaller than yearto1 {year_to}."
            ),
            Self::PredecessorGap {
                id,
                year_to,
                year_from,
                max_gap,
            } => write!(
                f,
                "The difference between yearto {year_to} of the \
                 preceding dossier {id} and yearfrom1 {year_from} is \
                 more than {max_gap} years."
            ),
            Self::SuccessorGap {
                id,
                year_to,
                year_from,
                max_gap,
            } => write!(
                f,
                "The difference between yearto1 {year_to} and yearfrom \
                 {year_from} of the following dossier {id} is more \
                 than {max_gap} years."
            ),
            Self::Cycle => {
                write!(f, "Dossier is part of a relationship cycle.")
            }
            Self::NoteUnprocessed => write!(
                f,
                "Not (all) content of descriptiveNote automatically \
                 processed."
            ),
            Self::NoFollowing => write!(f, "No following relation found."),
            Self::NoPreceding => write!(f, "No preceding relation found."),
            Self::Contradiction { source, target } => write!(
                f,
                "Relation {source} -> {target} contradicts the years \
                 and was dropped."
            ),
            Self::NoHouseNumber => write!(f, "No house number available."),
            Self::AdditionalAddress(address) => write!(
                f,
                "No dossier found for additional address '{address}'."
            ),
            Self::ManualEdgeSeparated { source, target } => write!(
                f,
                "Manual relation {source} -> {target} connects \
                 different clusters and was dropped."
            ),
        }
    }
}

/// The flags of all dossiers, ordered and free of duplicates.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Review {
    flags: BTreeMap<DossierId, BTreeSet<Flag>>,
}

impl Review {
    pub fn push<S: Into<DossierId>>(&mut self, id: S, flag: Flag) {
        self.flags.entry(id.into()).or_default().insert(flag);
    }

    pub fn extend<I>(&mut self, flags: I)
    where
        I: IntoIterator<Item = (DossierId, Flag)>,
    {
        for (id, flag) in flags {
            self.push(id, flag);
        }
    }

    /// Returns the flags of a dossier in reporting order.
    pub fn get(&self, id: &str) -> impl Iterator<Item = &Flag> {
        self.flags.get(id).into_iter().flatten()
    }

    /// Iterates over all flags, ordered by dossier id.
    pub fn iter(&self) -> impl Iterator<Item = (&DossierId, &Flag)> {
        self.flags
            .iter()
            .flat_map(|(id, flags)| flags.iter().map(move |flag| (id, flag)))
    }

    /// Returns true if the dossier carries the given flag.
    pub fn contains(&self, id: &str, flag: &Flag) -> bool {
        self.flags.get(id).is_some_and(|flags| flags.contains(flag))
    }

    /// Renders the flags of a dossier into a single note.
    pub fn note(&self, id: &str) -> Option<String> {
        let note = self
            .get(id)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        if note.is_empty() { None } else { Some(note) }
    }

    /// Number of dossiers with at least one flag.
    pub fn len(&self) -> usize {
        self.flags.values().filter(|flags| !flags.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts the flags by message kind.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for flag in self.flags.values().flatten() {
            *counts.entry(flag.kind()).or_insert(0) += 1;
        }

        counts
    }
}

impl Flag {
    /// A short, stable name of the flag variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::YearMissing => "year-missing",
            Self::Ambiguous => "ambiguous",
            Self::PrecedingAndSubsequent => "preceding-and-subsequent",
            Self::PredecessorOverlap { .. } => "predecessor-overlap",
            Self::SuccessorOverlap { .. } => "successor-overlap",
            Self::PredecessorGap { .. } => "predecessor-gap",
            Self::SuccessorGap { .. } => "successor-gap",
            Self::Cycle => "cycle",
            Self::NoteUnprocessed => "note-unprocessed",
            Self::NoFollowing => "no-following",
            Self::NoPreceding => "no-preceding",
            Self::Contradiction { .. } => "contradiction",
            Self::NoHouseNumber => "no-house-number",
            Self::AdditionalAddress(_) => "additional-address",
            Self::ManualEdgeSeparated { .. } => "manual-edge-separated",
        }
    }
}

/// Checks the validity of every dossier against its related dossiers.
///
/// Dossiers without a complete validity are reported as such and not
/// compared with their neighbours.
pub fn check_validity(
    resolved: &BTreeMap<DossierId, Resolved>,
    edges: &[Edge],
    max_gap: u16,
) -> Vec<(DossierId, Flag)> {
    let mut preceding: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut following: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for edge in edges.iter() {
        preceding
            .entry(edge.target.as_str())
            .or_default()
            .push(edge.source.as_str());
        following
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let gap = max_gap as i32;
    let mut flags = vec![];

    for (id, validity) in resolved.iter() {
        if validity.is_ambiguous() {
            flags.push((id.clone(), Flag::Ambiguous));
        }

        let (Some(year_from), Some(year_to)) =
            (validity.start(), validity.first_end())
        else {
            flags.push((id.clone(), Flag::YearMissing));
            continue;
        };

        let prev = preceding.get(id.as_str());
        let next = following.get(id.as_str());

        if prev.is_some() && next.is_some() {
            flags.push((id.clone(), Flag::PrecedingAndSubsequent));
        }

        for other in prev.into_iter().flatten() {
            let Some(other_to) =
                resolved.get(*other).and_then(Resolved::first_end)
            else {
                continue;
            };

            if other_to > year_from {
                flags.push((
                    id.clone(),
                    Flag::PredecessorOverlap {
                        id: other.to_string(),
                        year_to: other_to,
                        year_from,
                    },
                ));
            } else if other_to as i32 + gap < year_from as i32 {
                flags.push((
                    id.clone(),
                    Flag::PredecessorGap {
                        id: other.to_string(),
                        year_to: other_to,
                        year_from,
                        max_gap,
                    },
                ));
            }
        }

        for other in next.into_iter().flatten() {
            let Some(other_from) =
                resolved.get(*other).and_then(Resolved::start)
            else {
                continue;
            };

            if other_from < year_to {
                flags.push((
                    id.clone(),
                    Flag::SuccessorOverlap {
                        id: other.to_string(),
                        year_from: other_from,
                        year_to,
                    },
                ));
            } else if year_to as i32 + gap < other_from as i32 {
                flags.push((
                    id.clone(),
                    Flag::SuccessorGap {
                        id: other.to_string(),
                        year_to,
                        year_from: other_from,
                        max_gap,
                    },
                ));
            }
        }
    }

    flags
}

/// Returns the dossiers that are part of a cycle of the relationship
/// graph.
pub fn find_cycles(edges: &[Edge]) -> BTreeSet<DossierId> {
    let mut graph: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for edge in edges.iter() {
        graph
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
        graph.entry(edge.target.as_str()).or_default();
    }

    // Tarjan's algorithm, iteratively.
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    let mut lowlink: BTreeMap<&str, usize> = BTreeMap::new();
    let mut on_stack: BTreeSet<&str> = BTreeSet::new();
    let mut stack: Vec<&str> = vec![];
    let mut result = BTreeSet::new();
    let mut counter = 0;

    for &root in graph.keys() {
        if index.contains_key(root) {
            continue;
        }

        let mut work: Vec<(&str, usize)> = vec![(root, 0)];
        while let Some((node, pos)) = work.pop() {
            if pos == 0 {
                index.insert(node, counter);
                lowlink.insert(node, counter);
                counter += 1;
                stack.push(node);
                on_stack.insert(node);
            }

            let succs = &graph[node];
            if let Some(&next) = succs.get(pos) {
                work.push((node, pos + 1));
                if !index.contains_key(next) {
                    work.push((next, 0));
                } else if on_stack.contains(next) {
                    let low = lowlink[node].min(index[next]);
                    lowlink.insert(node, low);
                }
                continue;
            }

            if lowlink[node] == index[node] {
                let mut component = vec![];
                while let Some(member) = stack.pop() {
                    on_stack.remove(member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }

                if component.len() > 1 {
                    result.extend(component.into_iter().map(String::from));
                }
            }

            if let Some(&(parent, _)) = work.last() {
                let low = lowlink[parent].min(lowlink[node]);
                lowlink.insert(parent, low);
            }
        }
    }

    result
}
