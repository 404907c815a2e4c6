//! # sol_vanity
//!
//! Solana vanity address generator: brute-force Ed25519 keypairs until the
//! Base58 address matches a prefix and/or suffix.
//!
//! ## Architecture
//!
//! - `crypto`: Key generation, address derivation and key export
//! - `matcher`: Criterion parsing and predicate compilation
//! - `worker`: The search loop, its event stream, and the worker pool
//! - `config`: CLI and per-search configuration

pub mod config;
pub mod crypto;
pub mod matcher;
pub mod worker;

pub use config::{Config, ConfigError, SearchConfig, SearchRequest};
pub use crypto::{CryptoError, Keypair, MatchResult};
pub use matcher::{Criteria, Criterion, MatchPredicate};
pub use worker::{SearchController, SearchEvent, SearchOutcome, WorkerEvent, WorkerPool};
