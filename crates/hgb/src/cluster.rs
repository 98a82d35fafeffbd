//! Address-based clustering of dossiers.
//!
//! Dossiers referring to the same physical unit across time are
//! grouped into clusters. Two dossiers are linked if
//!
//! 1. their normalized titles are identical,
//! 2. their street names are similar and they share a house number,
//! 3. the descriptive note of one refers to the other,
//! 4. a manual additional address of one names the other, or
//! 5. a manual relationship connects them.
//!
//! The clusters are the connected components of these links. Dossiers
//! with a manual cluster id are pinned and take no part in the
//! automatic linking.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::config;
use crate::note::{Direction, Reference};
use crate::overlay::{EdgeAction, Overlay};
use crate::prelude::*;
use crate::record::Record;
use crate::review::Flag;
use crate::trigram::Metric;

pub type ClusterId = String;

/// A note reference resolved to dossiers of the same street.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub direction: Direction,
    pub targets: Vec<DossierId>,

    /// Set if every referenced house number could be resolved.
    pub complete: bool,
}

/// The result of the clustering.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Clustering {
    /// The cluster id of every dossier.
    pub assignments: BTreeMap<DossierId, ClusterId>,

    /// The (sorted) members of every cluster.
    pub clusters: BTreeMap<ClusterId, Vec<DossierId>>,

    /// The resolved note references of every dossier.
    pub links: BTreeMap<DossierId, Vec<Link>>,

    pub flags: Vec<(DossierId, Flag)>,
}

impl Clustering {
    #[inline]
    pub fn cluster_id(&self, id: &str) -> Option<&ClusterId> {
        self.assignments.get(id)
    }

    /// Returns the members of the cluster of a dossier.
    pub fn members_of(&self, id: &str) -> &[DossierId] {
        self.cluster_id(id)
            .and_then(|cid| self.clusters.get(cid))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[inline]
    pub fn links(&self, id: &str) -> &[Link] {
        self.links.get(id).map(Vec::as_slice).unwrap_or_default()
    }
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }

        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }

        match self.rank[a].cmp(&self.rank[b]) {
            std::cmp::Ordering::Less => self.parent[a] = b,
            std::cmp::Ordering::Greater => self.parent[b] = a,
            std::cmp::Ordering::Equal => {
                self.parent[b] = a;
                self.rank[a] += 1;
            }
        }
    }
}

/// Groups dossiers into clusters.
#[derive(Debug, Clone, Copy)]
pub struct Clusterer {
    metric: Metric,
    threshold: f64,
}

impl Default for Clusterer {
    fn default() -> Self {
        Self::from_config(&config::Clustering::default())
    }
}

impl Clusterer {
    pub fn new(metric: Metric, threshold: f64) -> Self {
        Self { metric, threshold }
    }

    pub fn from_config(config: &config::Clustering) -> Self {
        Self::new(config.metric, config.threshold)
    }

    /// Assigns every street a class; streets of the same class are
    /// considered to be spellings of the same street.
    fn street_classes<'a>(
        &self,
        records: &'a [Record],
    ) -> BTreeMap<&'a str, usize> {
        let streets: Vec<&str> = records
            .iter()
            .map(|r| r.address.street.as_str())
            .filter(|s| !s.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (metric, threshold) = (self.metric, self.threshold);
        let pairs: Vec<(usize, usize)> = (0..streets.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                let streets = &streets;
                ((i + 1)..streets.len())
                    .filter(move |&j| {
                        metric.similarity(streets[i], streets[j])
                            >= threshold
                    })
                    .map(move |j| (i, j))
            })
            .collect();

        let mut uf = UnionFind::new(streets.len());
        for (i, j) in pairs {
            uf.union(i, j);
        }

        streets
            .iter()
            .enumerate()
            .map(|(i, street)| (*street, uf.find(i)))
            .collect()
    }

    /// Clusters the records. The function is pure over its inputs.
    pub fn cluster(
        &self,
        records: &[Record],
        overlay: &Overlay,
    ) -> Clustering {
        let n = records.len();
        let index: BTreeMap<&str, usize> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        let pinned: Vec<Option<&str>> =
            records.iter().map(|r| overlay.cluster_id(&r.id)).collect();

        let mut flags = vec![];
        let mut uf = UnionFind::new(n);
        let link = |uf: &mut UnionFind, a: usize, b: usize| {
            if pinned[a].is_none() && pinned[b].is_none() {
                uf.union(a, b);
            }
        };

        // identical keys
        let mut keys: BTreeMap<&str, usize> = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            if record.key.is_empty() || pinned[i].is_some() {
                continue;
            }

            match keys.get(record.key.as_str()) {
                Some(&j) => link(&mut uf, i, j),
                None => {
                    keys.insert(record.key.as_str(), i);
                }
            }
        }

        // similar streets sharing a house number
        let classes = self.street_classes(records);
        let class_of = |record: &Record| -> Option<usize> {
            classes.get(record.address.street.as_str()).copied()
        };

        let mut numbers: BTreeMap<(usize, &str), usize> = BTreeMap::new();
        let mut streets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            let Some(class) = class_of(record) else {
                continue;
            };

            streets.entry(class).or_default().push(i);
            if pinned[i].is_some() {
                continue;
            }

            for number in record.address.numbers.iter() {
                match numbers.get(&(class, number.as_str())) {
                    Some(&j) => link(&mut uf, i, j),
                    None => {
                        numbers.insert((class, number.as_str()), i);
                    }
                }
            }
        }

        // note references
        let mut links: BTreeMap<DossierId, Vec<Link>> = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            let candidates = class_of(record)
                .and_then(|class| streets.get(&class))
                .map(Vec::as_slice)
                .unwrap_or_default();

            for reference in record.note.references.iter() {
                let (targets, complete) =
                    resolve(i, reference, candidates, records);

                if !complete {
                    flags.push((
                        record.id.clone(),
                        match reference.direction {
                            Direction::Following => Flag::NoFollowing,
                            Direction::Preceding => Flag::NoPreceding,
                        },
                    ));
                }

                for &j in targets.iter() {
                    link(&mut uf, i, j);
                }

                links.entry(record.id.clone()).or_default().push(Link {
                    direction: reference.direction,
                    targets: targets
                        .into_iter()
                        .map(|j| records[j].id.clone())
                        .collect(),
                    complete,
                });
            }
        }

        // manual additional addresses
        for correction in overlay.overrides() {
            let Some(&i) = index.get(correction.dossier_id.as_str()) else {
                continue;
            };

            for address in correction.additional_addresses() {
                let matches: Vec<usize> = records
                    .iter()
                    .enumerate()
                    .filter(|(j, r)| {
                        *j != i
                            && r.address.street == address.street
                            && r.address.has_numbers(&address.numbers)
                    })
                    .map(|(j, _)| j)
                    .collect();

                if matches.is_empty() {
                    log::warn!(
                        "no dossier found for additional address '{address}' \
                         of {}",
                        correction.dossier_id
                    );
                    flags.push((
                        correction.dossier_id.clone(),
                        Flag::AdditionalAddress(address.to_string()),
                    ));
                }

                for j in matches {
                    link(&mut uf, i, j);
                }
            }
        }

        // manual relationships
        for edge in overlay.edges_with(EdgeAction::Add) {
            if let (Some(&a), Some(&b)) = (
                index.get(edge.source_dossier_id.as_str()),
                index.get(edge.target_dossier_id.as_str()),
            ) {
                link(&mut uf, a, b);
            }
        }

        // The id of an automatic cluster is its lowest dossier id.
        let mut roots: BTreeMap<usize, ClusterId> = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            if pinned[i].is_some() {
                continue;
            }

            let root = uf.find(i);
            roots
                .entry(root)
                .and_modify(|id| {
                    if record.id < *id {
                        id.clone_from(&record.id);
                    }
                })
                .or_insert_with(|| record.id.clone());
        }

        let mut assignments: BTreeMap<DossierId, ClusterId> =
            BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            let cluster_id = match pinned[i] {
                None => roots[&uf.find(i)].clone(),
                Some(mut label) => {
                    // A label naming a dossier joins the cluster of that
                    // dossier; labels of pinned dossiers are followed.
                    let mut seen = BTreeSet::from([i]);
                    loop {
                        match index.get(label).copied() {
                            Some(j) if seen.insert(j) => match pinned[j] {
                                None => break roots[&uf.find(j)].clone(),
                                Some(next) => label = next,
                            },
                            _ => break label.to_string(),
                        }
                    }
                }
            };

            assignments.insert(record.id.clone(), cluster_id);
        }

        let mut clusters: BTreeMap<ClusterId, Vec<DossierId>> =
            BTreeMap::new();
        for (id, cluster_id) in assignments.iter() {
            clusters.entry(cluster_id.clone()).or_default().push(id.clone());
        }

        log::info!(
            "grouped {} dossiers into {} clusters",
            records.len(),
            clusters.len()
        );

        Clustering {
            assignments,
            clusters,
            links,
            flags,
        }
    }
}

/// Resolves a note reference of record `i` among the candidates of the
/// same street. Returns the targets and whether the reference was
/// resolved completely.
fn resolve(
    i: usize,
    reference: &Reference,
    candidates: &[usize],
    records: &[Record],
) -> (Vec<usize>, bool) {
    let numbers = &reference.numbers;
    let others = move || {
        candidates
            .iter()
            .copied()
            .filter(move |&j| j != i)
            .map(move |j| (j, &records[j]))
    };

    if reference.merged {
        let found: Vec<usize> = others()
            .filter(|(_, r)| r.is_whole() && r.address.has_numbers(numbers))
            .map(|(j, _)| j)
            .collect();

        return match found.as_slice() {
            [j] => (vec![*j], true),
            _ => (vec![], false),
        };
    }

    // A dossier combining some of the referenced numbers makes the
    // single numbers ambiguous.
    let combined = others().any(|(_, r)| {
        r.address.numbers.len() > 1
            && r.address.numbers.iter().all(|n| numbers.contains(n))
    });

    if combined {
        return (vec![], false);
    }

    let mut targets = vec![];
    let mut complete = true;

    for number in numbers.iter() {
        let found: Vec<usize> = others()
            .filter(|(_, r)| {
                r.is_whole() && r.address.has_numbers(&[number.clone()])
            })
            .map(|(j, _)| j)
            .collect();

        match found.as_slice() {
            [j] => targets.push(*j),
            _ => complete = false,
        }
    }

    (targets, complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{DossierOverride, ManualEdge};

    type TestResult = anyhow::Result<()>;

    fn record(id: &str, title: &str, note: Option<&str>) -> Record {
        let mut dossier = Dossier::new(id, title);
        dossier.note = note.map(String::from);
        Record::new(&dossier, &[], None)
    }

    fn ids(members: &[DossierId]) -> Vec<&str> {
        members.iter().map(String::as_str).collect()
    }

    #[test]
    fn union_find() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(3, 4);
        uf.union(1, 4);

        assert_eq!(uf.find(0), uf.find(3));
        assert_ne!(uf.find(0), uf.find(2));
    }

    #[test]
    fn cluster_shared_numbers() {
        let records = vec![
            record("D1", "Eisengasse 21", None),
            record("D2", "Eisengasse 21, 23", None),
            record("D3", "Eisengasse 23", None),
            record("D4", "Eisengasse 25", None),
            record("D5", "Gerbergasse 21", None),
        ];

        let clustering =
            Clusterer::default().cluster(&records, &Overlay::default());

        assert_eq!(clustering.clusters.len(), 3);
        assert_eq!(
            ids(clustering.members_of("D3")),
            vec!["D1", "D2", "D3"]
        );
        assert_eq!(clustering.cluster_id("D3").unwrap(), "D1");
        assert_eq!(ids(clustering.members_of("D4")), vec!["D4"]);
        assert_eq!(clustering.cluster_id("D5").unwrap(), "D5");
    }

    #[test]
    fn cluster_identical_keys() {
        let records = vec![
            record("D2", "Kornhaus", None),
            record("D1", "kornhaus ", None),
        ];

        let clustering =
            Clusterer::default().cluster(&records, &Overlay::default());
        assert_eq!(clustering.clusters.len(), 1);
        assert_eq!(clustering.cluster_id("D2").unwrap(), "D1");
    }

    #[test]
    fn cluster_similar_streets() {
        let records = vec![
            record("D1", "Petersgraben 20", None),
            record("D2", "Petersgrabe 20", None),
            record("D3", "Spalenberg 20", None),
        ];

        // similarity("petersgraben", "petersgrabe") = 11 / 14
        let clustering = Clusterer::new(Metric::Trigram, 0.7)
            .cluster(&records, &Overlay::default());
        assert_eq!(ids(clustering.members_of("D2")), vec!["D1", "D2"]);
        assert_eq!(ids(clustering.members_of("D3")), vec!["D3"]);

        let clustering = Clusterer::new(Metric::Trigram, 0.9)
            .cluster(&records, &Overlay::default());
        assert_eq!(clustering.clusters.len(), 3);
    }

    #[test]
    fn cluster_note_references() {
        let records = vec![
            record(
                "D1",
                "Eisengasse 10",
                Some("Bis 1478. Nachher siehe 12."),
            ),
            record(
                "D2",
                "Eisengasse 12",
                Some("Seit 1478. Vorher siehe 10."),
            ),
            record("D3", "Eisengasse 14", Some("Nachher siehe 99.")),
        ];

        let clustering =
            Clusterer::default().cluster(&records, &Overlay::default());
        assert_eq!(ids(clustering.members_of("D1")), vec!["D1", "D2"]);

        let links = clustering.links("D1");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].direction, Direction::Following);
        assert_eq!(links[0].targets, vec!["D2".to_string()]);
        assert!(links[0].complete);

        assert!(!clustering.links("D3")[0].complete);
        assert!(clustering
            .flags
            .contains(&("D3".into(), Flag::NoFollowing)));
    }

    #[test]
    fn resolve_merged_and_combined() {
        let records = vec![
            record(
                "D1",
                "Eisengasse 45",
                Some("Nachher siehe 45, 49 vereinigt."),
            ),
            record("D2", "Eisengasse 49, 45", None),
            record("D3", "Eisengasse 7", Some("Nachher siehe 9, 11.")),
            record("D4", "Eisengasse 9, 11", None),
            record("D5", "Eisengasse 9", None),
            record("D6", "Eisengasse Th. v. 30", Some("Vorher siehe 30.")),
            record("D7", "Eisengasse 30", Some("Nachher siehe 31.")),
            record("D8", "Eisengasse Theil von 31", None),
        ];

        let clustering =
            Clusterer::default().cluster(&records, &Overlay::default());

        assert_eq!(
            clustering.links("D1")[0].targets,
            vec!["D2".to_string()]
        );

        // "9, 11" is combined in D4, single numbers are ambiguous
        let link = &clustering.links("D3")[0];
        assert!(link.targets.is_empty());
        assert!(!link.complete);

        assert_eq!(
            clustering.links("D6")[0].targets,
            vec!["D7".to_string()]
        );

        // part-of dossiers are never resolved for a single number
        assert!(clustering.links("D7")[0].targets.is_empty());
    }

    #[test]
    fn cluster_pinned() -> TestResult {
        let records = vec![
            record("D1", "Eisengasse 21", None),
            record("D2", "Eisengasse 21", None),
            record("D3", "Hutgasse 4", None),
            record("D4", "Hutgasse 5", None),
            record("D5", "Hutgasse 6", None),
        ];

        let mut pin1 = DossierOverride::new("D2");
        pin1.cluster_id = Some("X".into());
        let mut pin2 = DossierOverride::new("D4");
        pin2.cluster_id = Some("D3".into());
        let mut pin3 = DossierOverride::new("D5");
        pin3.cluster_id = Some("X".into());

        let overlay = Overlay::new(vec![pin1, pin2, pin3], vec![])?;
        let clustering = Clusterer::default().cluster(&records, &overlay);

        assert_eq!(clustering.cluster_id("D1").unwrap(), "D1");
        assert_eq!(ids(clustering.members_of("D1")), vec!["D1"]);
        assert_eq!(ids(clustering.members_of("D2")), vec!["D2", "D5"]);
        assert_eq!(clustering.cluster_id("D2").unwrap(), "X");
        assert_eq!(ids(clustering.members_of("D3")), vec!["D3", "D4"]);
        Ok(())
    }

    #[test]
    fn cluster_pinned_first() -> TestResult {
        let records = vec![
            record("D1", "Eisengasse 21", None),
            record("D2", "Eisengasse 21", None),
            record("D3", "Eisengasse 21", None),
            record("D4", "Eisengasse 23, 25", None),
            record("D5", "Eisengasse 25", None),
            record("D6", "Eisengasse 25, 27", None),
        ];

        let mut pin1 = DossierOverride::new("D1");
        pin1.cluster_id = Some("X".into());
        let mut pin2 = DossierOverride::new("D4");
        pin2.cluster_id = Some("X".into());

        let overlay = Overlay::new(vec![pin1, pin2], vec![])?;
        let clustering = Clusterer::default().cluster(&records, &overlay);

        assert_eq!(clustering.clusters.len(), 3);
        assert_eq!(ids(clustering.members_of("D1")), vec!["D1", "D4"]);
        assert_eq!(ids(clustering.members_of("D3")), vec!["D2", "D3"]);
        assert_eq!(clustering.cluster_id("D3").unwrap(), "D2");
        assert_eq!(ids(clustering.members_of("D6")), vec!["D5", "D6"]);
        assert_eq!(clustering.cluster_id("D6").unwrap(), "D5");
        Ok(())
    }

    #[test]
    fn cluster_pinned_chain() -> TestResult {
        let records = vec![
            record("D1", "Hutgasse 4", None),
            record("D2", "Hutgasse 6", None),
            record("D3", "Hutgasse 8", None),
            record("D4", "Hutgasse 10", None),
            record("D5", "Hutgasse 12", None),
        ];

        let pin = |id: &str, label: &str| {
            let mut correction = DossierOverride::new(id);
            correction.cluster_id = Some(label.into());
            correction
        };

        let overlay = Overlay::new(
            vec![
                pin("D2", "X"),
                pin("D3", "D2"),
                pin("D4", "D1"),
                pin("D5", "D5"),
            ],
            vec![],
        )?;
        let clustering = Clusterer::default().cluster(&records, &overlay);

        assert_eq!(clustering.cluster_id("D3").unwrap(), "X");
        assert_eq!(ids(clustering.members_of("D2")), vec!["D2", "D3"]);
        assert_eq!(ids(clustering.members_of("D4")), vec!["D1", "D4"]);
        assert_eq!(clustering.cluster_id("D4").unwrap(), "D1");
        assert_eq!(ids(clustering.members_of("D5")), vec!["D5"]);
        Ok(())
    }

    #[test]
    fn cluster_manual_links() -> TestResult {
        let records = vec![
            record("D1", "Eisengasse 21", None),
            record("D2", "Hutgasse 4", None),
            record("D3", "Spalenberg 3", None),
            record("D4", "Rheinsprung 7", None),
        ];

        let mut correction = DossierOverride::new("D1");
        correction.additional_addresses =
            Some("Hutgasse 4, Hutgasse 99".into());

        let overlay = Overlay::new(
            vec![correction],
            vec![
                ManualEdge::add("D3", "D4"),
                ManualEdge::remove("D1", "D3"),
            ],
        )?;

        let clustering = Clusterer::default().cluster(&records, &overlay);
        assert_eq!(ids(clustering.members_of("D2")), vec!["D1", "D2"]);
        assert_eq!(ids(clustering.members_of("D4")), vec!["D3", "D4"]);
        assert_eq!(
            clustering.flags,
            vec![(
                "D1".into(),
                Flag::AdditionalAddress("hutgasse 99".into())
            )]
        );
        Ok(())
    }

    #[test]
    fn cluster_total_partition() {
        let records = vec![
            record("D1", "Eisengasse 21", None),
            record("D2", "", None),
            record("D3", "Eisengasse Bank vor 26", None),
            record("D4", "", None),
        ];

        let clustering =
            Clusterer::default().cluster(&records, &Overlay::default());
        assert_eq!(clustering.assignments.len(), records.len());

        let total: usize = clustering.clusters.values().map(Vec::len).sum();
        assert_eq!(total, records.len());
    }
}
