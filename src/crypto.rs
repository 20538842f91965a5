//! Cryptographic capability consumed by components outside admission.
//!
//! Admission never encrypts or verifies anything; the trait exists so that
//! the gateway can be handed a provider at construction time.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("cannot read key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not supported by this provider")]
    Unsupported(&'static str),

    #[error("crypto operation failed: {0}")]
    Operation(String),
}

/// Output of symmetric encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetricCiphertext {
    pub ciphertext: Vec<u8>,
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
}

pub trait Crypto: Send + Sync {
    /// Encrypt `plaintext` with a freshly generated key and IV.
    fn encrypt_symmetric(&self, plaintext: &[u8]) -> Result<SymmetricCiphertext, CryptoError>;

    /// Encrypt `plaintext` for the holder of the key at `public_key_path`.
    fn encrypt_asymmetric(
        &self,
        plaintext: &[u8],
        public_key_path: &Path,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Check `signature` over `data` against the key at `public_key_path`.
    fn verify_signature(
        &self,
        public_key_path: &Path,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError>;
}

/// Provider used when no crypto backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedCrypto;

fn read_key(path: &Path) -> Result<Vec<u8>, CryptoError> {
    std::fs::read(path).map_err(|source| CryptoError::KeyFile {
        path: path.display().to_string(),
        source,
    })
}

impl Crypto for UnsupportedCrypto {
    fn encrypt_symmetric(&self, _plaintext: &[u8]) -> Result<SymmetricCiphertext, CryptoError> {
        Err(CryptoError::Unsupported("symmetric encryption"))
    }

    fn encrypt_asymmetric(
        &self,
        _plaintext: &[u8],
        public_key_path: &Path,
    ) -> Result<Vec<u8>, CryptoError> {
        read_key(public_key_path)?;
        Err(CryptoError::Unsupported("asymmetric encryption"))
    }

    fn verify_signature(
        &self,
        public_key_path: &Path,
        _signature: &[u8],
        _data: &[u8],
    ) -> Result<bool, CryptoError> {
        read_key(public_key_path)?;
        Err(CryptoError::Unsupported("signature verification"))
    }
}
