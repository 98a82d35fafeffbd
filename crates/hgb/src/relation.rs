//! Predecessor/successor relationships within a cluster.
//!
//! The rules are applied in order of their precedence; if a pair of
//! dossiers is derived by more than one rule, the edge keeps the origin
//! of the first one:
//!
//! 1. `note`: cross references of the descriptive notes,
//! 2. `triple`: a house number shared by three dossiers whose notes
//!    start with "Bis YYYY"/"Seit YYYY" of the same year,
//! 3. `type`: clusters of three dossiers with a characteristic mix of
//!    dossier types, ordered by the median year of their entries,
//! 4. `temporal`: adjacency of the validity intervals.
//!
//! Manual relationships always win over derived ones.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::cluster::Clustering;
use crate::config;
use crate::note::{Change, Direction};
use crate::overlay::{EdgeAction, ManualEdge};
use crate::prelude::*;
use crate::record::Record;
use crate::review::Flag;

/// The rule an edge was derived from. The variant order is the
/// precedence of the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeOrigin {
    Manual,
    Note,
    Triple,
    Type,
    Temporal,
}

impl Display for EdgeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Note => write!(f, "note"),
            Self::Triple => write!(f, "triple"),
            Self::Type => write!(f, "type"),
            Self::Temporal => write!(f, "temporal"),
        }
    }
}

impl FromStr for EdgeOrigin {
    type Err = HgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "note" => Ok(Self::Note),
            "triple" => Ok(Self::Triple),
            "type" => Ok(Self::Type),
            "temporal" => Ok(Self::Temporal),
            _ => bail!("invalid edge origin '{s}'"),
        }
    }
}

/// A directed relationship: `source` temporally precedes `target`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub source: DossierId,
    pub target: DossierId,
    pub origin: EdgeOrigin,
}

impl Edge {
    pub fn new<S, T>(source: S, target: T, origin: EdgeOrigin) -> Self
    where
        S: Into<DossierId>,
        T: Into<DossierId>,
    {
        Self {
            source: source.into(),
            target: target.into(),
            origin,
        }
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.source, self.target, self.origin)
    }
}

/// The relationships of a single cluster.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Relations {
    /// The edges, sorted by source and target.
    pub edges: Vec<Edge>,
    pub flags: Vec<(DossierId, Flag)>,
}

type EdgeMap<'a> = BTreeMap<(&'a str, &'a str), EdgeOrigin>;

fn insert<'a>(
    edges: &mut EdgeMap<'a>,
    source: &'a str,
    target: &'a str,
    origin: EdgeOrigin,
) {
    if source == target {
        return;
    }

    edges
        .entry((source, target))
        .and_modify(|value| *value = (*value).min(origin))
        .or_insert(origin);
}

/// Derives the relationships within a cluster.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelationBuilder {
    overlap_tolerance: u16,
}

impl RelationBuilder {
    pub fn new(overlap_tolerance: u16) -> Self {
        Self { overlap_tolerance }
    }

    pub fn from_config(config: &config::Relation) -> Self {
        Self::new(config.overlap_tolerance)
    }

    fn note_rule<'a>(
        &self,
        members: &[&'a Record],
        ids: &BTreeSet<&'a str>,
        clustering: &'a Clustering,
        edges: &mut EdgeMap<'a>,
    ) {
        for record in members.iter() {
            for link in clustering.links(&record.id) {
                for target in link.targets.iter() {
                    let Some(target) = ids.get(target.as_str()).copied()
                    else {
                        log::debug!(
                            "skip reference {} -> {target} across clusters",
                            record.id
                        );
                        continue;
                    };

                    let (source, target) = match link.direction {
                        Direction::Following => (record.id.as_str(), target),
                        Direction::Preceding => (target, record.id.as_str()),
                    };

                    insert(edges, source, target, EdgeOrigin::Note);
                }
            }
        }
    }

    fn triple_rule<'a>(
        &self,
        members: &[&'a Record],
        edges: &mut EdgeMap<'a>,
    ) {
        let mut groups: BTreeMap<(&str, &str), Vec<&'a Record>> =
            BTreeMap::new();

        for record in members.iter().copied() {
            for number in record.address.numbers.iter() {
                groups
                    .entry((record.address.street.as_str(), number.as_str()))
                    .or_default()
                    .push(record);
            }
        }

        for group in groups.values().filter(|group| group.len() == 3) {
            let Some(changes) = group
                .iter()
                .map(|r| r.note.change)
                .collect::<Option<Vec<Change>>>()
            else {
                continue;
            };

            if changes.iter().any(|c| c.year() != changes[0].year()) {
                continue;
            }

            let (until, since): (Vec<_>, Vec<_>) = group
                .iter()
                .zip(changes.iter())
                .partition(|(_, c)| matches!(c, Change::Until(_)));

            match (until.as_slice(), since.as_slice()) {
                // merge
                ([(a, _), (b, _)], [(c, _)]) => {
                    insert(edges, &a.id, &c.id, EdgeOrigin::Triple);
                    insert(edges, &b.id, &c.id, EdgeOrigin::Triple);
                }
                // split
                ([(a, _)], [(b, _), (c, _)]) => {
                    insert(edges, &a.id, &b.id, EdgeOrigin::Triple);
                    insert(edges, &a.id, &c.id, EdgeOrigin::Triple);
                }
                _ => {}
            }
        }
    }

    fn type_rule<'a>(
        &self,
        members: &[&'a Record],
        edges: &mut EdgeMap<'a>,
    ) {
        if members.len() != 3 {
            return;
        }

        let of = |kind: DossierType| -> Vec<(&'a str, Option<f64>)> {
            members
                .iter()
                .filter(|r| r.kind == kind)
                .map(|r| (r.id.as_str(), r.median_year))
                .collect()
        };

        let (pair, single) = match (
            of(DossierType::PartOf).as_slice(),
            of(DossierType::Unchanged).as_slice(),
            of(DossierType::Joined).as_slice(),
        ) {
            ([a, b], [u], []) => ([*a, *b], *u),
            ([], [a, b], [j]) => ([*a, *b], *j),
            _ => return,
        };

        let (Some(m0), Some(m1), Some(m)) = (pair[0].1, pair[1].1, single.1)
        else {
            return;
        };

        if m > m0 && m > m1 {
            // merged
            insert(edges, pair[0].0, single.0, EdgeOrigin::Type);
            insert(edges, pair[1].0, single.0, EdgeOrigin::Type);
        } else if m < m0 && m < m1 {
            // split
            insert(edges, single.0, pair[0].0, EdgeOrigin::Type);
            insert(edges, single.0, pair[1].0, EdgeOrigin::Type);
        }
    }

    fn temporal_rule<'a>(
        &self,
        members: &[&'a Record],
        manual: &[&'a ManualEdge],
        edges: &mut EdgeMap<'a>,
    ) {
        let mut has_successor: BTreeSet<&str> = BTreeSet::new();
        let mut has_predecessor: BTreeSet<&str> = BTreeSet::new();

        for (source, target) in edges.keys() {
            has_successor.insert(*source);
            has_predecessor.insert(*target);
        }

        for edge in manual.iter().filter(|e| e.action == EdgeAction::Add) {
            has_successor.insert(&edge.source_dossier_id);
            has_predecessor.insert(&edge.target_dossier_id);
        }

        // undated and ambiguous dossiers have no start
        let dated: Vec<(&'a str, i32, Option<i32>)> = members
            .iter()
            .filter_map(|r| {
                let start = r.resolved.start()? as i32;
                Some((r.id.as_str(), start, r.resolved.end().map(i32::from)))
            })
            .collect();

        let tolerance = self.overlap_tolerance as i32;
        let mut derived = vec![];

        for &(id, start, end) in dated.iter() {
            let Some(end) = end else {
                continue;
            };

            if has_successor.contains(id) {
                continue;
            }

            let candidates: Vec<(&str, i32)> = dated
                .iter()
                .filter(|(other, other_start, _)| {
                    (*other_start, *other) > (start, id)
                        && *other_start >= end - tolerance
                })
                .map(|(other, other_start, _)| (*other, *other_start))
                .collect();

            let Some(next) = candidates.iter().map(|(_, s)| *s).min()
            else {
                continue;
            };

            for (other, other_start) in candidates {
                if other_start == next && !has_predecessor.contains(other) {
                    derived.push((id, other));
                }
            }
        }

        for (source, target) in derived {
            insert(edges, source, target, EdgeOrigin::Temporal);
        }
    }

    /// Derives the edges between the members of a cluster. `manual`
    /// holds the manual relationships whose source is a member.
    pub fn build(
        &self,
        members: &[&Record],
        clustering: &Clustering,
        manual: &[&ManualEdge],
    ) -> Relations {
        let ids: BTreeSet<&str> =
            members.iter().map(|r| r.id.as_str()).collect();
        let by_id: BTreeMap<&str, &Record> =
            members.iter().map(|r| (r.id.as_str(), *r)).collect();

        let mut edges: EdgeMap = BTreeMap::new();
        let mut flags = vec![];

        self.note_rule(members, &ids, clustering, &mut edges);
        self.triple_rule(members, &mut edges);
        self.type_rule(members, &mut edges);
        self.temporal_rule(members, manual, &mut edges);

        // Drop automatic edges that contradict the validity years.
        let tolerance = self.overlap_tolerance as i32;
        edges.retain(|(source, target), origin| {
            let end = by_id[source].resolved.first_end();
            let start = by_id[target].resolved.start();

            match (end, start) {
                (Some(end), Some(start))
                    if end as i32 > start as i32 + tolerance =>
                {
                    log::debug!(
                        "drop {origin} relation {source} -> {target} \
                         ({end} > {start})"
                    );
                    flags.push((
                        source.to_string(),
                        Flag::Contradiction {
                            source: source.to_string(),
                            target: target.to_string(),
                        },
                    ));
                    false
                }
                _ => true,
            }
        });

        for edge in manual.iter() {
            let (source, target) = (
                edge.source_dossier_id.as_str(),
                edge.target_dossier_id.as_str(),
            );

            match edge.action {
                EdgeAction::Remove => {
                    edges.remove(&(source, target));
                }
                EdgeAction::Add if ids.contains(target) => {
                    edges.insert((source, target), EdgeOrigin::Manual);
                }
                EdgeAction::Add => {
                    log::warn!(
                        "drop manual relation {source} -> {target} \
                         across clusters"
                    );
                    flags.push((
                        source.to_string(),
                        Flag::ManualEdgeSeparated {
                            source: source.to_string(),
                            target: target.to_string(),
                        },
                    ));
                }
            }
        }

        Relations {
            edges: edges
                .into_iter()
                .map(|((source, target), origin)| {
                    Edge::new(source, target, origin)
                })
                .collect(),
            flags,
        }
    }
}
