use crate::address::Address;
use crate::interval::{Resolved, Validity, Year};
use crate::normalize::normalize;
use crate::note::Note;
use crate::overlay::DossierOverride;
use crate::prelude::*;

/// A dossier together with everything derived from its text fields
/// and its manual corrections.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: DossierId,

    /// The normalized title.
    pub key: String,

    pub address: Address,
    pub note: Note,
    pub kind: DossierType,
    pub resolved: Resolved,

    /// The median year of the entries of the dossier.
    pub median_year: Option<f64>,
}

/// Returns the median of a list of years.
pub fn median(years: &[Year]) -> Option<f64> {
    if years.is_empty() {
        return None;
    }

    let mut years = years.to_vec();
    years.sort_unstable();

    let mid = years.len() / 2;
    Some(if years.len() % 2 == 0 {
        (years[mid - 1] as f64 + years[mid] as f64) / 2.0
    } else {
        years[mid] as f64
    })
}

impl Record {
    pub fn new(
        dossier: &Dossier,
        entry_years: &[Year],
        correction: Option<&DossierOverride>,
    ) -> Self {
        let key = normalize(&dossier.title);
        let mut address = Address::from_key(&key);

        if let Some(numbers) =
            correction.and_then(DossierOverride::house_numbers)
        {
            if address
                .part_of
                .as_ref()
                .is_some_and(|n| !numbers.contains(n))
            {
                address.part_of = None;
            }

            address.numbers = numbers;
        }

        let resolved = Resolved::new(
            Validity::extract(dossier.note()),
            entry_years,
            correction.and_then(|c| c.year_from),
            correction.and_then(|c| c.year_to),
        );

        Self {
            id: dossier.id.clone(),
            key,
            address,
            note: Note::parse(dossier.note()),
            kind: correction.and_then(|c| c.kind).unwrap_or_default(),
            resolved,
            median_year: median(entry_years),
        }
    }

    /// Returns true if the dossier covers a whole house number.
    #[inline]
    pub fn is_whole(&self) -> bool {
        self.address.part_of.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::YearSource;

    #[test]
    fn median_years() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[1600]), Some(1600.0));
        assert_eq!(median(&[1700, 1600, 1650]), Some(1650.0));
        assert_eq!(median(&[1600, 1601]), Some(1600.5));
    }

    #[test]
    fn record_from_dossier() {
        let dossier = Dossier::new("HGB_1_001", "Petersgraben Th. v. 20")
            .with_note("Seit 1600. Vorher siehe 18.");
        let record = Record::new(&dossier, &[1610, 1690], None);

        assert_eq!(record.key, "petersgraben theil von 20");
        assert_eq!(record.address.part_of.as_deref(), Some("20"));
        assert!(!record.is_whole());
        assert_eq!(record.note.references.len(), 1);
        assert_eq!(record.kind, DossierType::Other);
        assert_eq!(record.resolved.start(), Some(1600));
        assert_eq!(record.resolved.end(), Some(1690));
        assert_eq!(record.resolved.to_source, Some(YearSource::Entry));
        assert_eq!(record.median_year, Some(1650.0));
    }

    #[test]
    fn record_with_correction() {
        let dossier = Dossier::new("HGB_1_001", "Petersgraben Th. v. 20");
        let mut correction = DossierOverride::new("HGB_1_001");
        correction.house_numbers = Some("22".into());
        correction.year_from = Some(1550);
        correction.kind = Some(DossierType::Unchanged);

        let record = Record::new(&dossier, &[1600], Some(&correction));
        assert_eq!(record.address.numbers, vec!["22".to_string()]);
        assert!(record.is_whole());
        assert_eq!(record.kind, DossierType::Unchanged);
        assert_eq!(record.resolved.start(), Some(1550));
        assert_eq!(record.resolved.from_source, Some(YearSource::Manual));
    }
}
