//! Manual corrections.
//!
//! Corrections live in their own tables and are applied on top of the
//! derived data on every run; they are never written back into the
//! derived tables. Both tables are optional.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::address::Address;
use crate::interval::Year;
use crate::prelude::*;

/// Manual corrections of a single dossier.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DossierOverride {
    pub dossier_id: DossierId,

    /// Pins the dossier to the cluster with this id.
    #[serde(default)]
    pub cluster_id: Option<String>,

    /// Replaces the house numbers of the title. A value of `-` removes
    /// all house numbers.
    #[serde(default)]
    pub house_numbers: Option<String>,

    /// Further addresses of the dossier (`Eisengasse 21, Hutgasse 4`).
    #[serde(default)]
    pub additional_addresses: Option<String>,

    #[serde(default)]
    pub year_from: Option<Year>,

    #[serde(default)]
    pub year_to: Option<Year>,

    #[serde(default, rename = "type")]
    pub kind: Option<DossierType>,

    #[serde(default)]
    pub location_accuracy: Option<String>,

    #[serde(default)]
    pub location_origin: Option<String>,
}

impl DossierOverride {
    pub fn new<S: Into<DossierId>>(dossier_id: S) -> Self {
        Self {
            dossier_id: dossier_id.into(),
            ..Default::default()
        }
    }

    /// Returns the manually set house numbers, if any.
    pub fn house_numbers(&self) -> Option<Vec<String>> {
        let value = self.house_numbers.as_deref()?.trim();
        if value.is_empty() {
            return None;
        }

        if value == "-" {
            return Some(vec![]);
        }

        Some(
            value
                .split([',', '/'])
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_lowercase)
                .collect(),
        )
    }

    /// Returns the additional addresses. Entries without exactly one
    /// house number are skipped.
    pub fn additional_addresses(&self) -> Vec<Address> {
        let Some(value) = self.additional_addresses.as_deref() else {
            return vec![];
        };

        value
            .split(", ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| {
                let address = Address::parse(s);
                if address.street.is_empty() || address.numbers.len() != 1
                {
                    log::warn!("skip invalid additional address '{s}'");
                    return None;
                }

                Some(address)
            })
            .collect()
    }

    /// Returns the manual cluster id, if it is non-empty.
    #[inline]
    pub fn cluster_id(&self) -> Option<&str> {
        self.cluster_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeAction {
    Add,
    Remove,
}

impl Display for EdgeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// A manually added or removed relationship.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEdge {
    pub source_dossier_id: DossierId,
    pub target_dossier_id: DossierId,
    pub action: EdgeAction,
}

impl ManualEdge {
    pub fn add<S, T>(source: S, target: T) -> Self
    where
        S: Into<DossierId>,
        T: Into<DossierId>,
    {
        Self {
            source_dossier_id: source.into(),
            target_dossier_id: target.into(),
            action: EdgeAction::Add,
        }
    }

    pub fn remove<S, T>(source: S, target: T) -> Self
    where
        S: Into<DossierId>,
        T: Into<DossierId>,
    {
        Self {
            action: EdgeAction::Remove,
            ..Self::add(source, target)
        }
    }
}

/// All manual corrections of a run.
#[derive(Debug, Default, Clone)]
pub struct Overlay {
    overrides: BTreeMap<DossierId, DossierOverride>,
    edges: Vec<ManualEdge>,
}

fn read_rows<T, P>(path: P) -> HgbResult<Vec<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.is_file() {
        log::info!("skip missing correction table {}", path.display());
        return Ok(vec![]);
    }

    let mut reader =
        ReaderBuilder::new().trim(Trim::All).from_path(path)?;
    let mut rows = vec![];

    for result in reader.deserialize() {
        rows.push(result?);
    }

    log::debug!("read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

impl Overlay {
    pub fn new<I, J>(overrides: I, edges: J) -> HgbResult<Self>
    where
        I: IntoIterator<Item = DossierOverride>,
        J: IntoIterator<Item = ManualEdge>,
    {
        let mut map = BTreeMap::new();
        for row in overrides {
            if map.contains_key(&row.dossier_id) {
                bail!("duplicate override for dossier {}", row.dossier_id);
            }

            map.insert(row.dossier_id.clone(), row);
        }

        let edges: Vec<ManualEdge> = edges.into_iter().collect();
        if let Some(edge) = edges
            .iter()
            .find(|e| e.source_dossier_id == e.target_dossier_id)
        {
            bail!(
                "manual relationship of dossier {} with itself",
                edge.source_dossier_id
            );
        }

        Ok(Self {
            overrides: map,
            edges,
        })
    }

    /// Reads the correction tables. Missing files are treated as
    /// empty tables.
    pub fn from_paths<P, Q>(overrides: P, edges: Q) -> HgbResult<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        Self::new(read_rows(overrides)?, read_rows(edges)?)
    }

    /// Checks that every correction names a known dossier.
    pub fn validate(&self, ids: &BTreeSet<&str>) -> HgbResult<()> {
        for id in self.overrides.keys() {
            if !ids.contains(id.as_str()) {
                bail!("override for unknown dossier {id}");
            }
        }

        for edge in self.edges.iter() {
            for id in [&edge.source_dossier_id, &edge.target_dossier_id] {
                if !ids.contains(id.as_str()) {
                    bail!("manual relationship with unknown dossier {id}");
                }
            }
        }

        Ok(())
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&DossierOverride> {
        self.overrides.get(id)
    }

    /// Returns the manual cluster id of a dossier.
    #[inline]
    pub fn cluster_id(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(DossierOverride::cluster_id)
    }

    pub fn overrides(&self) -> impl Iterator<Item = &DossierOverride> {
        self.overrides.values()
    }

    #[inline]
    pub fn edges(&self) -> &[ManualEdge] {
        &self.edges
    }

    /// Returns the manual edges with the given action.
    pub fn edges_with(
        &self,
        action: EdgeAction,
    ) -> impl Iterator<Item = &ManualEdge> {
        self.edges.iter().filter(move |e| e.action == action)
    }
}
