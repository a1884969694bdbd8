//! AES-GCM payload encryption.
//!
//! The cipher value is `IV (12 bytes) ‖ ciphertext ‖ tag (16 bytes)`, the
//! layout XML Encryption 1.1 prescribes for the AES-GCM algorithms.

use aes::Aes192;
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, AeadCore, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};
use rand_core::OsRng;

use crate::algorithm::{AES128_GCM, AES192_GCM, AES256_GCM};
use crate::ecdh::ContentEncryptionKey;
use crate::error::{Error, Result};
use crate::plugin::PayloadCipher;

type Aes192Gcm = AesGcm<Aes192, U12>;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Default [`PayloadCipher`] for the XML Encryption 1.1 AES-GCM algorithms.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmPayloadCipher;

impl AesGcmPayloadCipher {
    /// Creates the cipher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Key size in bytes for a supported algorithm URI.
    #[must_use]
    pub fn key_size(algorithm: &str) -> Option<usize> {
        match algorithm {
            AES128_GCM => Some(16),
            AES192_GCM => Some(24),
            AES256_GCM => Some(32),
            _ => None,
        }
    }
}

impl PayloadCipher for AesGcmPayloadCipher {
    fn encrypt(
        &self,
        algorithm: &str,
        key: &ContentEncryptionKey,
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        check_key(algorithm, key)?;
        match algorithm {
            AES128_GCM => seal::<Aes128Gcm>(key.as_bytes(), plaintext),
            AES192_GCM => seal::<Aes192Gcm>(key.as_bytes(), plaintext),
            _ => seal::<Aes256Gcm>(key.as_bytes(), plaintext),
        }
    }

    fn decrypt(
        &self,
        algorithm: &str,
        key: &ContentEncryptionKey,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        check_key(algorithm, key)?;
        if ciphertext.len() < IV_LEN + TAG_LEN {
            return Err(Error::Decryption(
                "Cipher value is shorter than IV and tag".to_string(),
            ));
        }
        match algorithm {
            AES128_GCM => open::<Aes128Gcm>(key.as_bytes(), ciphertext),
            AES192_GCM => open::<Aes192Gcm>(key.as_bytes(), ciphertext),
            _ => open::<Aes256Gcm>(key.as_bytes(), ciphertext),
        }
    }
}

fn check_key(algorithm: &str, key: &ContentEncryptionKey) -> Result<()> {
    let expected = AesGcmPayloadCipher::key_size(algorithm).ok_or_else(|| {
        Error::UnsupportedAlgorithm(format!(
            "{algorithm} is not a supported data encryption algorithm"
        ))
    })?;
    if key.len() != expected {
        return Err(Error::InvalidParameter(format!(
            "{algorithm} needs a {expected}-byte key, got {}",
            key.len()
        )));
    }
    Ok(())
}

fn seal<C>(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: Aead + AeadCore<NonceSize = U12> + KeyInit,
{
    let cipher = C::new_from_slice(key).map_err(|e| Error::Encryption(e.to_string()))?;
    let nonce = C::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Encryption(e.to_string()))?;

    let mut output = Vec::with_capacity(IV_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

fn open<C>(key: &[u8], data: &[u8]) -> Result<Vec<u8>>
where
    C: Aead + AeadCore<NonceSize = U12> + KeyInit,
{
    let cipher = C::new_from_slice(key).map_err(|e| Error::Decryption(e.to_string()))?;
    let (iv, ciphertext) = data.split_at(IV_LEN);
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| Error::Decryption("Payload authentication failed".to_string()))
}
