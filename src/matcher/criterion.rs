//! Criterion parsing and predicate compilation.

use std::fmt;

use crate::config::ConfigError;

/// Size of the Base58 alphabet, used for difficulty estimates.
const BASE58_RADIX: u64 = 58;

/// Wire form of the caller's pattern: at least one of `start` / `end`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// The desired shape of an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// Address must start with the text
    Prefix(String),
    /// Address must end with the text
    Suffix(String),
    /// Address must start with the first text and end with the second
    PrefixAndSuffix(String, String),
}

impl TryFrom<Criteria> for Criterion {
    type Error = ConfigError;

    fn try_from(criteria: Criteria) -> Result<Self, Self::Error> {
        match (criteria.start, criteria.end) {
            (Some(start), Some(end)) => Ok(Criterion::PrefixAndSuffix(start, end)),
            (Some(start), None) => Ok(Criterion::Prefix(start)),
            (None, Some(end)) => Ok(Criterion::Suffix(end)),
            (None, None) => Err(ConfigError::MissingCriteria),
        }
    }
}

impl Criterion {
    /// Compiles the criterion into a predicate.
    ///
    /// The variant is inspected here once; the returned closure does no dispatch.
    pub fn compile(&self) -> MatchPredicate {
        let test: Box<dyn Fn(&str) -> bool + Send + Sync> = match self.clone() {
            Criterion::Prefix(prefix) => Box::new(move |addr: &str| addr.starts_with(&prefix)),
            Criterion::Suffix(suffix) => Box::new(move |addr: &str| addr.ends_with(&suffix)),
            Criterion::PrefixAndSuffix(prefix, suffix) => {
                Box::new(move |addr: &str| addr.starts_with(&prefix) && addr.ends_with(&suffix))
            }
        };
        MatchPredicate { test }
    }

    /// Number of pattern characters the address must hit.
    pub fn pattern_len(&self) -> usize {
        match self {
            Criterion::Prefix(p) | Criterion::Suffix(p) => p.chars().count(),
            Criterion::PrefixAndSuffix(p, s) => p.chars().count() + s.chars().count(),
        }
    }

    /// Returns the estimated difficulty (number of attempts to find a match).
    ///
    /// Each Base58 character has 58 possible values, so the expected number of
    /// attempts is roughly 58^n where n is the total pattern length.
    pub fn estimated_difficulty(&self) -> u64 {
        BASE58_RADIX.saturating_pow(self.pattern_len() as u32)
    }

    /// Returns a human-readable difficulty estimate.
    pub fn difficulty_description(&self) -> String {
        let diff = self.estimated_difficulty();
        match diff {
            0..=10_000 => "Very Easy (< 1 second)".into(),
            10_001..=1_000_000 => "Easy (seconds)".into(),
            1_000_001..=100_000_000 => "Medium (minutes)".into(),
            100_000_001..=10_000_000_000 => "Hard (hours)".into(),
            _ => "Very Hard (days or more)".into(),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Prefix(p) => write!(f, "{}... (prefix)", p),
            Criterion::Suffix(s) => write!(f, "...{} (suffix)", s),
            Criterion::PrefixAndSuffix(p, s) => write!(f, "{}...{} (prefix+suffix)", p, s),
        }
    }
}

/// A compiled address test.
pub struct MatchPredicate {
    test: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl MatchPredicate {
    #[inline]
    pub fn matches(&self, address: &str) -> bool {
        (self.test)(address)
    }
}

impl fmt::Debug for MatchPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MatchPredicate")
    }
}
