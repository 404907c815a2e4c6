//! Cryptographic operations for Solana key and address generation.
//!
//! This module provides:
//! - Batched Ed25519 key generation from a secure RNG
//! - Solana address derivation (Base58 of the public key)
//! - Export of matched keypairs into the 64-byte Solana keypair layout

mod address;
mod export;
mod keypair;

pub use address::{AddressDeriver, Base58Deriver};
pub use export::{KeyExporter, MatchResult, Pkcs8Exporter};
pub use keypair::{KeyGenerator, Keypair, RngKeyGenerator};

/// Faults raised while producing or processing a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The key-generation primitive failed for a batch.
    #[error("key generation failed: {0}")]
    Generation(String),

    /// The public key could not be turned into an address.
    #[error("address derivation failed: {0}")]
    Derivation(String),

    /// The matched keypair could not be exported.
    #[error("key export failed: {0}")]
    Export(String),
}
