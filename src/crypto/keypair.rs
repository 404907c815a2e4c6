//! Ed25519 keypair generation.

use std::fmt;

use ed25519_dalek::{SigningKey, SECRET_KEY_LENGTH};
use rand::rngs::StdRng;
use rand::{CryptoRng, RngCore, SeedableRng};

use super::CryptoError;

/// An Ed25519 keypair (32-byte seed + derived public key).
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a new keypair from the given RNG.
    ///
    /// Fails only if the RNG cannot produce bytes.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        rng.try_fill_bytes(&mut seed)
            .map_err(|e| CryptoError::Generation(e.to_string()))?;
        Ok(Self::from_seed(seed))
    }

    /// Builds a keypair from an existing 32-byte seed.
    pub fn from_seed(seed: [u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Returns the 32-byte secret seed.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Returns the raw 32-byte public key.
    #[inline]
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", hex::encode(self.public_key_bytes()))
    }
}

/// Source of fresh keypairs for the search loop.
pub trait KeyGenerator {
    /// Generates exactly `n` keypairs, or fails for the whole batch.
    fn generate_batch(&mut self, n: usize) -> Result<Vec<Keypair>, CryptoError>;
}

/// Key generator backed by a cryptographically secure RNG.
#[derive(Debug)]
pub struct RngKeyGenerator<R = StdRng> {
    rng: R,
}

impl RngKeyGenerator<StdRng> {
    /// Creates a generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Creates a reproducible generator. Not for real key material.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + CryptoRng> RngKeyGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore + CryptoRng> KeyGenerator for RngKeyGenerator<R> {
    fn generate_batch(&mut self, n: usize) -> Result<Vec<Keypair>, CryptoError> {
        (0..n).map(|_| Keypair::generate(&mut self.rng)).collect()
    }
}
