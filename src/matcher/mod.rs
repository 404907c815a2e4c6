//! Pattern matching for Solana addresses.
//!
//! Supports three matching strategies:
//! - Prefix: Match at the start of the address
//! - Suffix: Match at the end of the address
//! - PrefixAndSuffix: Match both ends

mod criterion;

pub use criterion::{Criteria, Criterion, MatchPredicate};
