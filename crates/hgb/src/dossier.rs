use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{bail, HgbError};

/// Identifier of a dossier, e.g. `HGB_1_074_075`.
pub type DossierId = String;

/// A dossier row of the land register metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dossier {
    pub id: DossierId,
    pub serie_id: Option<String>,
    pub title: String,
    pub note: Option<String>,
}

impl Dossier {
    pub fn new<S, T>(id: S, title: T) -> Self
    where
        S: Into<DossierId>,
        T: Into<String>,
    {
        Self {
            id: id.into(),
            serie_id: None,
            title: title.into(),
            note: None,
        }
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_serie<S: Into<String>>(mut self, serie_id: S) -> Self {
        self.serie_id = Some(serie_id.into());
        self
    }

    /// Returns the descriptive note, if it is non-empty.
    #[inline]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Classification of a dossier with respect to its house number,
/// maintained manually.
#[derive(
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Hash,
    Clone,
    Copy,
    PartialOrd,
    Ord,
)]
#[serde(rename_all = "camelCase")]
pub enum DossierType {
    /// The dossier covers a whole house number, which did not change.
    Unchanged,
    /// The dossier covers a part of a house number.
    PartOf,
    /// The dossier covers several joined house numbers.
    Joined,
    #[default]
    Other,
}

impl Display for DossierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::PartOf => write!(f, "partOf"),
            Self::Joined => write!(f, "joined"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl FromStr for DossierType {
    type Err = HgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unchanged" => Ok(Self::Unchanged),
            "partOf" | "partof" => Ok(Self::PartOf),
            "joined" => Ok(Self::Joined),
            "other" | "" => Ok(Self::Other),
            _ => bail!("invalid dossier type '{s}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dossier_type_from_str() {
        use DossierType::*;

        assert_eq!(DossierType::from_str("unchanged").unwrap(), Unchanged);
        assert_eq!(DossierType::from_str("partOf").unwrap(), PartOf);
        assert_eq!(DossierType::from_str("partof").unwrap(), PartOf);
        assert_eq!(DossierType::from_str("joined").unwrap(), Joined);
        assert_eq!(DossierType::from_str("").unwrap(), Other);

        assert!(DossierType::from_str("merged").is_err());
    }

    #[test]
    fn dossier_type_to_string() {
        use DossierType::*;

        assert_eq!(Unchanged.to_string(), "unchanged");
        assert_eq!(PartOf.to_string(), "partOf");
        assert_eq!(Joined.to_string(), "joined");
        assert_eq!(Other.to_string(), "other");
    }

    #[test]
    fn dossier_blank_note() {
        let dossier = Dossier::new("HGB_1_001_001", "Eisengasse 1")
            .with_note("   ");
        assert_eq!(dossier.note(), None);

        let dossier = dossier.with_note(" Seit 1600. ");
        assert_eq!(dossier.note(), Some("Seit 1600."));
    }
}
