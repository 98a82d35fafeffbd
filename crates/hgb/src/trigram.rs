use std::collections::BTreeSet;
use std::fmt::{self, Display};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// String similarity measures available to the clusterer.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// Trigram similarity as computed by PostgreSQL's `pg_trgm`.
    #[default]
    Trigram,
    /// Jaro-Winkler similarity.
    JaroWinkler,
}

impl Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigram => write!(f, "trigram"),
            Self::JaroWinkler => write!(f, "jaro-winkler"),
        }
    }
}

impl Metric {
    /// Returns the similarity of `a` and `b` in the range $[0, 1]$.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        match self {
            Self::Trigram => similarity(a, b),
            Self::JaroWinkler => strsim::jaro_winkler(a, b),
        }
    }
}

/// Returns the set of trigrams of a string.
///
/// The string is split into words at every non-alphanumeric
/// character; every word is lower-cased and padded with two spaces in
/// front and one space at the end before the trigrams are taken. Thus
/// `"Hof"` has the trigrams `"  h"`, `" ho"`, `"hof"` and `"of "`.
pub fn trigrams(s: &str) -> BTreeSet<[char; 3]> {
    let mut result = BTreeSet::new();

    for word in s
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.to_lowercase().chars())
            .chain(" ".chars())
            .collect();

        result.extend(padded.windows(3).map(|w| [w[0], w[1], w[2]]));
    }

    result
}

/// Returns the trigram similarity of two strings, the number of shared
/// trigrams divided by the number of distinct trigrams of both.
///
/// ## Note
///
/// The similarity of two strings without any trigram is defined to
/// $0.0$.
pub fn similarity(a: &str, b: &str) -> f64 {
    let lhs = trigrams(a);
    let rhs = trigrams(b);

    let union = lhs.union(&rhs).count();
    if union == 0 {
        return 0.0;
    }

    let common = lhs.intersection(&rhs).count();
    common as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn trigrams_of_word() {
        let trigrams = trigrams("Hof");
        assert_eq!(trigrams.len(), 4);
        assert!(trigrams.contains(&[' ', ' ', 'h']));
        assert!(trigrams.contains(&[' ', 'h', 'o']));
        assert!(trigrams.contains(&['h', 'o', 'f']));
        assert!(trigrams.contains(&['o', 'f', ' ']));
    }

    #[test]
    fn trigrams_of_words() {
        assert_eq!(super::trigrams("a-b"), super::trigrams("a b"));
        assert!(super::trigrams(" .,").is_empty());
    }

    #[test]
    fn similarity_bounds() {
        assert_relative_eq!(similarity("eisengasse", "eisengasse"), 1.0);
        assert_relative_eq!(similarity("Eisengasse", "eisengasse"), 1.0);
        assert_relative_eq!(similarity("abc", "xyz"), 0.0);
        assert_relative_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn similarity_of_variants() {
        // 5 shared trigrams out of 10 distinct ones
        assert_relative_eq!(similarity("spalen", "spahlen"), 0.5);

        let score = similarity("petersgraben", "petersgrabe");
        assert!(score > 0.7, "score = {score}");
        assert!(similarity("eisengasse", "gerbergasse") < 0.5);
    }

    #[test]
    fn metric_similarity() {
        assert_relative_eq!(Metric::Trigram.similarity("hof", "hof"), 1.0);
        assert_relative_eq!(
            Metric::JaroWinkler.similarity("hof", "hof"),
            1.0
        );
        assert!(Metric::JaroWinkler.similarity("spalen", "spahlen") > 0.9);
    }
}
