//! Runtime configuration for the vanity address generator.
//!
//! Two layers live here: the clap-driven [`Config`] of the command line tool, and the
//! [`SearchRequest`] / [`SearchConfig`] pair consumed by a single search worker.

use clap::Parser;

use crate::matcher::{Criteria, Criterion};

/// Keypairs generated per batch when none (or zero) is requested.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Attempts between two progress events when none (or zero) is requested.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Characters that can appear in a Solana address.
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Longest Base58 encoding of a 32-byte public key.
const MAX_ADDRESS_LEN: usize = 44;

/// Solana Vanity Address Generator
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Required address prefix (Base58 characters only)
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Required address suffix (Base58 characters only)
    #[arg(short, long)]
    pub suffix: Option<String>,

    /// Total attempt budget across all workers (default: unbounded)
    #[arg(short, long)]
    pub attempts: Option<u64>,

    /// Stop after finding N addresses (0 = only stop on the attempt budget)
    #[arg(short = 'n', long, default_value = "1")]
    pub matches: usize,

    /// Keypairs generated per batch
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Progress report interval in seconds
    #[arg(short, long, default_value = "5")]
    pub report_interval: u64,
}

impl Config {
    /// Returns the number of workers, defaulting to CPU count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// Returns the attempt budget, `u64::MAX` when unbounded.
    pub fn attempt_budget(&self) -> u64 {
        self.attempts.unwrap_or(u64::MAX)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_none() && self.suffix.is_none() {
            return Err(ConfigError::MissingCriteria);
        }

        let mut total_len = 0;
        for (name, text) in [("Prefix", &self.prefix), ("Suffix", &self.suffix)] {
            let Some(text) = text else { continue };

            if text.is_empty() {
                return Err(ConfigError::InvalidPattern(format!("{} cannot be empty", name)));
            }

            if let Some(bad) = text.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
                return Err(ConfigError::InvalidPattern(format!(
                    "{} contains '{}', which is not a Base58 character (0, O, I and l are excluded)",
                    name, bad
                )));
            }

            total_len += text.len();
        }

        if total_len > MAX_ADDRESS_LEN {
            return Err(ConfigError::InvalidPattern(format!(
                "Combined prefix + suffix cannot be longer than {} characters",
                MAX_ADDRESS_LEN
            )));
        }

        if self.workers == Some(0) {
            return Err(ConfigError::InvalidWorkers);
        }

        Ok(())
    }

    /// Returns the pattern as wire-level criteria.
    pub fn criteria(&self) -> Criteria {
        Criteria {
            start: self.prefix.clone(),
            end: self.suffix.clone(),
        }
    }

    /// Builds the request for the whole search, before it is split across workers.
    pub fn search_request(&self) -> SearchRequest {
        SearchRequest {
            count: self.attempt_budget(),
            batch_size: Some(self.batch_size),
            progress_interval: None,
            criteria: self.criteria(),
        }
    }
}

/// Input for one search worker, as handed over by its caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// Number of attempts to make before exiting
    pub count: u64,
    /// Keypairs per batch; `None` or `Some(0)` means the default
    pub batch_size: Option<usize>,
    /// Attempts between progress events; `None` or `Some(0)` means the default
    pub progress_interval: Option<u64>,
    /// The pattern to search for
    pub criteria: Criteria,
}

/// Validated, immutable configuration of one search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub target_count: u64,
    pub batch_size: usize,
    pub progress_interval: u64,
    pub criterion: Criterion,
}

impl TryFrom<SearchRequest> for SearchConfig {
    type Error = ConfigError;

    fn try_from(request: SearchRequest) -> Result<Self, Self::Error> {
        let criterion = Criterion::try_from(request.criteria)?;

        Ok(Self {
            target_count: request.count,
            batch_size: request
                .batch_size
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            progress_interval: request
                .progress_interval
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_PROGRESS_INTERVAL),
            criterion,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("At least one of prefix (start) or suffix (end) is required")]
    MissingCriteria,

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Worker count must be at least 1")]
    InvalidWorkers,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_config(prefix: Option<&str>, suffix: Option<&str>) -> Config {
        Config {
            prefix: prefix.map(Into::into),
            suffix: suffix.map(Into::into),
            attempts: None,
            matches: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: None,
            report_interval: 5,
        }
    }

    fn request(batch_size: Option<usize>) -> SearchRequest {
        SearchRequest {
            count: 50,
            batch_size,
            progress_interval: None,
            criteria: Criteria {
                start: Some("So1".into()),
                end: None,
            },
        }
    }

    #[test]
    fn test_valid_pattern() {
        assert!(make_test_config(Some("So1"), None).validate().is_ok());
        assert!(make_test_config(None, Some("pump")).validate().is_ok());
        assert!(make_test_config(Some("ab"), Some("yz")).validate().is_ok());
    }

    #[test]
    fn test_invalid_pattern() {
        // '0', 'O', 'I' and 'l' are not part of the Base58 alphabet
        for bad in ["0x", "Oak", "Ice", "lol"] {
            assert!(matches!(
                make_test_config(Some(bad), None).validate(),
                Err(ConfigError::InvalidPattern(_))
            ));
        }
    }

    #[test]
    fn test_missing_pattern() {
        assert_eq!(
            make_test_config(None, None).validate(),
            Err(ConfigError::MissingCriteria)
        );
    }

    #[test]
    fn test_empty_and_overlong_pattern() {
        assert!(make_test_config(Some(""), None).validate().is_err());
        let long = "a".repeat(30);
        assert!(make_test_config(Some(&long), Some(&long)).validate().is_err());
    }

    #[test]
    fn test_zero_workers() {
        let mut config = make_test_config(Some("a"), None);
        config.workers = Some(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidWorkers));
    }

    #[test]
    fn test_batch_size_defaults() {
        assert_eq!(SearchConfig::try_from(request(None)).unwrap().batch_size, 10);
        assert_eq!(SearchConfig::try_from(request(Some(0))).unwrap().batch_size, 10);
        assert_eq!(SearchConfig::try_from(request(Some(3))).unwrap().batch_size, 3);
        assert_eq!(
            SearchConfig::try_from(request(None)).unwrap().progress_interval,
            100
        );
    }

    #[test]
    fn test_request_without_criteria() {
        let mut req = request(None);
        req.criteria = Criteria::default();
        assert_eq!(SearchConfig::try_from(req), Err(ConfigError::MissingCriteria));
    }

    #[test]
    fn test_cli_request() {
        let mut config = make_test_config(Some("So1"), Some("xyz"));
        config.attempts = Some(1_000);
        let req = config.search_request();
        assert_eq!(req.count, 1_000);
        assert_eq!(req.batch_size, Some(DEFAULT_BATCH_SIZE));
        assert_eq!(
            SearchConfig::try_from(req).unwrap().criterion,
            Criterion::PrefixAndSuffix("So1".into(), "xyz".into())
        );
    }
}
