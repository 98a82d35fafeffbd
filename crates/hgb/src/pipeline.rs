//! The inference pass over the dossier table.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;
use rayon::prelude::*;

use crate::cluster::{Clusterer, Clustering};
use crate::config::Config;
use crate::interval::{Resolved, Year};
use crate::overlay::Overlay;
use crate::prelude::*;
use crate::record::Record;
use crate::relation::{Edge, RelationBuilder, Relations};
use crate::review::{check_validity, find_cycles, Flag, Review};
use crate::year::Entry;

/// Clusters the dossiers, derives their relationships and reviews the
/// result.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    clusterer: Clusterer,
    builder: RelationBuilder,
    max_gap: u16,
}

/// The derived data of a run, sorted by dossier id.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub records: Vec<Record>,
    pub clustering: Clustering,
    pub edges: Vec<Edge>,
    pub review: Review,
}

/// Builds the records of all dossiers, sorted by id.
pub fn build_records(
    dossiers: &[Dossier],
    entries: &[Entry],
    overlay: &Overlay,
) -> HgbResult<Vec<Record>> {
    let mut ids = BTreeSet::new();
    for dossier in dossiers.iter() {
        if !ids.insert(dossier.id.as_str()) {
            bail!("duplicate dossier {}", dossier.id);
        }
    }

    overlay.validate(&ids)?;

    let mut years: BTreeMap<&str, Vec<Year>> = BTreeMap::new();
    for entry in entries.iter() {
        if !ids.contains(entry.dossier_id.as_str()) {
            log::debug!(
                "skip entry {} of unknown dossier {}",
                entry.entry_id,
                entry.dossier_id
            );
            continue;
        }

        if let Some(year) = entry.year {
            years.entry(entry.dossier_id.as_str()).or_default().push(year);
        }
    }

    let mut records: Vec<Record> = dossiers
        .par_iter()
        .map(|dossier| {
            let years = years
                .get(dossier.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            Record::new(dossier, years, overlay.get(&dossier.id))
        })
        .collect();

    records.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(records)
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Pipeline {
    pub fn new(
        clusterer: Clusterer,
        builder: RelationBuilder,
        max_gap: u16,
    ) -> Self {
        Self {
            clusterer,
            builder,
            max_gap,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Clusterer::from_config(&config.clustering),
            RelationBuilder::from_config(&config.relation),
            config.review.max_gap,
        )
    }

    /// Derives the relationships of every cluster. Clusters are
    /// independent and processed in parallel.
    pub fn relate(
        &self,
        records: &[Record],
        clustering: &Clustering,
        overlay: &Overlay,
    ) -> Vec<Relations> {
        let by_id: BTreeMap<&str, &Record> =
            records.iter().map(|r| (r.id.as_str(), r)).collect();

        clustering
            .clusters
            .par_iter()
            .map(|(_, ids)| {
                let members: Vec<&Record> = ids
                    .iter()
                    .filter_map(|id| by_id.get(id.as_str()).copied())
                    .collect();

                let manual: Vec<_> = overlay
                    .edges()
                    .iter()
                    .filter(|e| ids.contains(&e.source_dossier_id))
                    .collect();

                self.builder.build(&members, clustering, &manual)
            })
            .collect()
    }

    /// Collects the review flags of a run.
    pub fn review(
        &self,
        records: &[Record],
        clustering: &Clustering,
        relations: Vec<Relations>,
        edges: &[Edge],
    ) -> Review {
        let mut review = Review::default();

        let resolved: BTreeMap<DossierId, Resolved> = records
            .iter()
            .map(|r| (r.id.clone(), r.resolved.clone()))
            .collect();

        review.extend(check_validity(&resolved, edges, self.max_gap));
        review.extend(
            find_cycles(edges).into_iter().map(|id| (id, Flag::Cycle)),
        );

        for record in records.iter() {
            if record.note.unprocessed {
                review.push(record.id.clone(), Flag::NoteUnprocessed);
            }

            if record.address.numbers.is_empty() {
                review.push(record.id.clone(), Flag::NoHouseNumber);
            }
        }

        review.extend(clustering.flags.iter().cloned());
        for relation in relations {
            review.extend(relation.flags);
        }

        review
    }

    /// Runs the whole pass.
    pub fn run(
        &self,
        dossiers: &[Dossier],
        entries: &[Entry],
        overlay: &Overlay,
    ) -> HgbResult<Outcome> {
        let records = build_records(dossiers, entries, overlay)?;
        let clustering = self.clusterer.cluster(&records, overlay);
        let relations = self.relate(&records, &clustering, overlay);

        let mut edges: Vec<Edge> = relations
            .iter()
            .flat_map(|relation| relation.edges.iter().cloned())
            .collect();
        edges.sort_by(|a, b| {
            (&a.source, &a.target).cmp(&(&b.source, &b.target))
        });

        log::info!("derived {} relations", edges.len());

        let review = self.review(&records, &clustering, relations, &edges);
        log::info!("{} dossiers need a manual review", review.len());

        Ok(Outcome {
            records,
            clustering,
            edges,
            review,
        })
    }
}

impl Outcome {
    /// The number of relations within every cluster.
    fn relations_per_cluster(&self) -> BTreeMap<&str, u32> {
        let mut counts = BTreeMap::new();
        for edge in self.edges.iter() {
            if let Some(cluster_id) = self.clustering.cluster_id(&edge.source)
            {
                *counts.entry(cluster_id.as_str()).or_insert(0) += 1;
            }
        }

        counts
    }

    /// Returns the derived dossier table.
    pub fn dossier_frame(&self, overlay: &Overlay) -> HgbResult<DataFrame> {
        let relations = self.relations_per_cluster();

        let mut dossier_id: Vec<&str> = vec![];
        let mut cluster_id: Vec<Option<&str>> = vec![];
        let mut cluster_size: Vec<u32> = vec![];
        let mut cluster_relations: Vec<u32> = vec![];
        let mut year_from1: Vec<Option<Year>> = vec![];
        let mut year_to1: Vec<Option<Year>> = vec![];
        let mut year_from2: Vec<Option<Year>> = vec![];
        let mut year_to2: Vec<Option<Year>> = vec![];
        let mut year_from_source: Vec<Option<String>> = vec![];
        let mut year_to_source: Vec<Option<String>> = vec![];
        let mut kind: Vec<String> = vec![];
        let mut location_accuracy: Vec<Option<&str>> = vec![];
        let mut location_origin: Vec<Option<&str>> = vec![];
        let mut note: Vec<Option<String>> = vec![];

        for record in self.records.iter() {
            let id = record.id.as_str();
            let cid = self.clustering.cluster_id(id).map(String::as_str);
            let correction = overlay.get(id);
            let first = record.resolved.interval(0);
            let second = record.resolved.interval(1);

            dossier_id.push(id);
            cluster_id.push(cid);
            cluster_size.push(self.clustering.members_of(id).len() as u32);
            cluster_relations.push(
                cid.and_then(|cid| relations.get(cid))
                    .copied()
                    .unwrap_or_default(),
            );
            year_from1.push(first.from);
            year_to1.push(first.to);
            year_from2.push(second.from);
            year_to2.push(second.to);
            year_from_source
                .push(record.resolved.from_source.map(|s| s.to_string()));
            year_to_source
                .push(record.resolved.to_source.map(|s| s.to_string()));
            kind.push(record.kind.to_string());
            location_accuracy.push(
                correction.and_then(|c| c.location_accuracy.as_deref()),
            );
            location_origin.push(
                correction.and_then(|c| c.location_origin.as_deref()),
            );
            note.push(self.review.note(id));
        }

        Ok(DataFrame::new(vec![
            Series::new("dossierId", dossier_id),
            Series::new("clusterId", cluster_id),
            Series::new("clusterSize", cluster_size),
            Series::new("clusterRelations", cluster_relations),
            Series::new("yearFrom1", year_from1),
            Series::new("yearTo1", year_to1),
            Series::new("yearFrom2", year_from2),
            Series::new("yearTo2", year_to2),
            Series::new("yearFromSource", year_from_source),
            Series::new("yearToSource", year_to_source),
            Series::new("type", kind),
            Series::new("locationAccuracy", location_accuracy),
            Series::new("locationOrigin", location_origin),
            Series::new("notePostprocessing", note),
        ])?)
    }

    /// Returns the relationship table.
    pub fn relationship_frame(&self) -> HgbResult<DataFrame> {
        let mut source: Vec<&str> = vec![];
        let mut target: Vec<&str> = vec![];
        let mut origin: Vec<String> = vec![];

        for edge in self.edges.iter() {
            source.push(&edge.source);
            target.push(&edge.target);
            origin.push(edge.origin.to_string());
        }

        Ok(DataFrame::new(vec![
            Series::new("sourceDossierId", source),
            Series::new("targetDossierId", target),
            Series::new("origin", origin),
        ])?)
    }
}
