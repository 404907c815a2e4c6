//! Solana address derivation.

use super::CryptoError;

/// Shortest and longest Base58 encodings of a 32-byte key.
const MIN_ADDRESS_LEN: usize = 32;
const MAX_ADDRESS_LEN: usize = 44;

/// Maps a raw public key to its textual address.
pub trait AddressDeriver {
    /// Derives the address for `public_key`. Must be deterministic.
    fn derive(&self, public_key: &[u8; 32]) -> Result<String, CryptoError>;
}

/// Solana address: Base58 (Bitcoin alphabet) of the public key bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base58Deriver;

impl AddressDeriver for Base58Deriver {
    #[inline]
    fn derive(&self, public_key: &[u8; 32]) -> Result<String, CryptoError> {
        let address = bs58::encode(public_key).into_string();
        if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&address.len()) {
            return Err(CryptoError::Derivation(format!(
                "encoded address has invalid length {}",
                address.len()
            )));
        }
        Ok(address)
    }
}
