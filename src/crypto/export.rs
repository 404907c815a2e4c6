//! Packaging of matched keypairs into the 64-byte Solana keypair layout.

use ed25519_dalek::pkcs8::EncodePrivateKey;

use super::{AddressDeriver, Base58Deriver, CryptoError, Keypair};

/// Length of the PKCS#8 prefix in front of an Ed25519 seed.
///
/// `SEQUENCE { INTEGER version, SEQUENCE { OID 1.3.101.112 }, OCTET STRING { OCTET STRING(32) } }`
const PKCS8_SEED_OFFSET: usize = 16;

/// Tag and length of the inner `OCTET STRING` that holds the seed.
const PKCS8_SEED_TAG: [u8; 2] = [0x04, 0x20];

/// A matched keypair, exported as `seed (32 bytes) || public key (32 bytes)`.
#[derive(Clone, PartialEq, Eq)]
pub struct MatchResult {
    key_bytes: [u8; 64],
}

impl MatchResult {
    /// Wraps already packed keypair bytes.
    pub fn from_bytes(key_bytes: [u8; 64]) -> Self {
        Self { key_bytes }
    }

    /// The full 64-byte keypair.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.key_bytes
    }

    pub fn secret_bytes(&self) -> &[u8] {
        &self.key_bytes[..32]
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(&self.key_bytes[32..]);
        public_key
    }

    /// The Solana address of the public half.
    pub fn address(&self) -> Result<String, CryptoError> {
        Base58Deriver.derive(&self.public_key_bytes())
    }

    /// Base58 of all 64 bytes, the format wallets import.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.key_bytes).into_string()
    }

    /// JSON byte array, the format of `solana-keygen` keypair files.
    pub fn to_json_array(&self) -> String {
        let bytes: Vec<String> = self.key_bytes.iter().map(u8::to_string).collect();
        format!("[{}]", bytes.join(","))
    }
}

impl std::fmt::Debug for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatchResult({})", hex::encode(&self.key_bytes[32..]))
    }
}

/// Turns a matched keypair into its exported byte form.
pub trait KeyExporter {
    fn pack(&self, keypair: &Keypair) -> Result<MatchResult, CryptoError>;
}

/// Exports the private key as PKCS#8 DER and lifts the seed out of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pkcs8Exporter;

impl Pkcs8Exporter {
    fn seed_from_der(der: &[u8]) -> Result<[u8; 32], CryptoError> {
        let header = der
            .get(PKCS8_SEED_OFFSET - PKCS8_SEED_TAG.len()..PKCS8_SEED_OFFSET)
            .ok_or_else(|| CryptoError::Export("PKCS#8 document too short".into()))?;
        if header != PKCS8_SEED_TAG {
            return Err(CryptoError::Export(format!(
                "unexpected PKCS#8 seed header {}",
                hex::encode(header)
            )));
        }

        let seed = der
            .get(PKCS8_SEED_OFFSET..PKCS8_SEED_OFFSET + 32)
            .ok_or_else(|| CryptoError::Export("PKCS#8 seed truncated".into()))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(seed);
        Ok(out)
    }
}

impl KeyExporter for Pkcs8Exporter {
    fn pack(&self, keypair: &Keypair) -> Result<MatchResult, CryptoError> {
        let document = keypair
            .signing_key()
            .to_pkcs8_der()
            .map_err(|e| CryptoError::Export(e.to_string()))?;
        let seed = Self::seed_from_der(document.as_bytes())?;
        let public_key = keypair.public_key_bytes();

        let mut key_bytes = [0u8; 64];
        key_bytes[..32].copy_from_slice(&seed);
        key_bytes[32..].copy_from_slice(&public_key);
        Ok(MatchResult::from_bytes(key_bytes))
    }
}
