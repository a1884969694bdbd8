//! AES key wrapping (RFC 3394) of content encryption keys.

use std::fmt;

use aes::cipher::consts::U16;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockCipher, BlockDecrypt, BlockEncrypt, BlockSizeUser, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use aes_kw::Kek;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::algorithm::{KW_AES128, KW_AES192, KW_AES256};
use crate::error::{Error, Result};

/// Length of the RFC 3394 integrity block prepended to wrapped keys.
const KW_OVERHEAD: usize = 8;

/// Supported AES key wrap algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWrapAlgorithm {
    /// `kw-aes128`
    Aes128Kw,
    /// `kw-aes192`
    Aes192Kw,
    /// `kw-aes256`
    Aes256Kw,
}

impl KeyWrapAlgorithm {
    /// Looks up a key wrap algorithm by URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            KW_AES128 => Some(Self::Aes128Kw),
            KW_AES192 => Some(Self::Aes192Kw),
            KW_AES256 => Some(Self::Aes256Kw),
            _ => None,
        }
    }

    /// The algorithm URI.
    #[must_use]
    pub fn uri(self) -> &'static str {
        match self {
            Self::Aes128Kw => KW_AES128,
            Self::Aes192Kw => KW_AES192,
            Self::Aes256Kw => KW_AES256,
        }
    }

    /// Size of the key encryption key in bytes.
    #[must_use]
    pub fn key_size(self) -> usize {
        match self {
            Self::Aes128Kw => 16,
            Self::Aes192Kw => 24,
            Self::Aes256Kw => 32,
        }
    }
}

impl fmt::Display for KeyWrapAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

/// A key encryption key derived through key agreement.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyEncryptionKey {
    key: Vec<u8>,
}

impl KeyEncryptionKey {
    /// Creates a key encryption key from raw bytes.
    #[must_use]
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    /// Gets the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for KeyEncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEncryptionKey")
            .field("len", &self.key.len())
            .finish_non_exhaustive()
    }
}

/// A symmetric content encryption key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ContentEncryptionKey {
    key: Vec<u8>,
}

impl ContentEncryptionKey {
    /// Creates a content encryption key from raw bytes.
    #[must_use]
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    /// Generates a random key of `size` bytes.
    #[must_use]
    pub fn generate(size: usize) -> Self {
        Self::new(crate::utils::generate_random_key(size))
    }

    /// Gets the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.key.len()
    }

    /// Returns `true` for a zero-length key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl fmt::Debug for ContentEncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentEncryptionKey")
            .field("len", &self.key.len())
            .finish_non_exhaustive()
    }
}

/// Wraps a content encryption key with AES-KW.
///
/// # Errors
/// * `Error::InvalidParameter` - If the KEK size does not match `algorithm`,
///   or the content key is not a multiple of 8 bytes of at least 16 bytes
pub fn wrap_key(
    algorithm: KeyWrapAlgorithm,
    kek: &KeyEncryptionKey,
    cek: &ContentEncryptionKey,
) -> Result<Vec<u8>> {
    check_kek(algorithm, kek)?;
    let data = cek.as_bytes();
    if data.len() < 16 || data.len() % 8 != 0 {
        return Err(Error::InvalidParameter(format!(
            "Cannot wrap a {}-byte key with {algorithm}",
            data.len()
        )));
    }

    let mut out = vec![0u8; data.len() + KW_OVERHEAD];
    let result = match algorithm {
        KeyWrapAlgorithm::Aes128Kw => kek_for::<Aes128>(kek).wrap(data, &mut out),
        KeyWrapAlgorithm::Aes192Kw => kek_for::<Aes192>(kek).wrap(data, &mut out),
        KeyWrapAlgorithm::Aes256Kw => kek_for::<Aes256>(kek).wrap(data, &mut out),
    };
    result.map_err(|e| Error::InvalidParameter(format!("Failed to wrap key: {e}")))?;
    Ok(out)
}

/// Unwraps a content encryption key with AES-KW.
///
/// # Errors
/// * `Error::InvalidParameter` - If the KEK size does not match `algorithm`
/// * `Error::UnwrapIntegrity` - If the wrapped key is truncated, tampered
///   with, or was wrapped under a different key
pub fn unwrap_key(
    algorithm: KeyWrapAlgorithm,
    kek: &KeyEncryptionKey,
    wrapped_key: &[u8],
) -> Result<ContentEncryptionKey> {
    check_kek(algorithm, kek)?;
    if wrapped_key.len() < 16 + KW_OVERHEAD || wrapped_key.len() % 8 != 0 {
        return Err(Error::UnwrapIntegrity);
    }

    let mut out = Zeroizing::new(vec![0u8; wrapped_key.len() - KW_OVERHEAD]);
    let result = match algorithm {
        KeyWrapAlgorithm::Aes128Kw => kek_for::<Aes128>(kek).unwrap(wrapped_key, &mut out),
        KeyWrapAlgorithm::Aes192Kw => kek_for::<Aes192>(kek).unwrap(wrapped_key, &mut out),
        KeyWrapAlgorithm::Aes256Kw => kek_for::<Aes256>(kek).unwrap(wrapped_key, &mut out),
    };
    result.map_err(|_| Error::UnwrapIntegrity)?;
    Ok(ContentEncryptionKey::new(out.to_vec()))
}

fn check_kek(algorithm: KeyWrapAlgorithm, kek: &KeyEncryptionKey) -> Result<()> {
    if kek.as_bytes().len() == algorithm.key_size() {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "{algorithm} needs a {}-byte key encryption key, got {}",
            algorithm.key_size(),
            kek.as_bytes().len()
        )))
    }
}

// Callers check the KEK length first; `from_slice` panics on a mismatch.
fn kek_for<A>(kek: &KeyEncryptionKey) -> Kek<A>
where
    A: KeyInit + BlockSizeUser<BlockSize = U16> + BlockCipher + BlockEncrypt + BlockDecrypt,
{
    Kek::new(GenericArray::from_slice(kek.as_bytes()))
}
