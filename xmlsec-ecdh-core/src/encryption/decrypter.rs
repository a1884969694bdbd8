//! Decryption of ECDH-ES encrypted data.
//!
//! Encrypted keys are located in this order: keys inline in the data, the
//! peer key named by the data's retrieval reference, then peer keys whose
//! data references name the data. Each candidate is tried in turn; the first
//! whose content key is recovered decrypts the payload. The payload cipher
//! is never invoked unless a content key was recovered.

use tracing::{debug, warn};

use super::encrypter::data_key_size;
use super::{AesGcmPayloadCipher, EncryptedEnvelope, EncryptedKey};
use crate::algorithm::support::is_key_wrapping_algorithm;
use crate::algorithm::AlgorithmRegistry;
use crate::ecdh::{ContentEncryptionKey, KeyAgreementEngine, WrappedKey};
use crate::error::{Error, Result};
use crate::plugin::PayloadCipher;
use crate::resolver::CredentialResolutionChain;
use crate::types::KeyInfoHints;

/// Decrypts envelopes produced by
/// [`ExtendedEncrypter`](super::ExtendedEncrypter).
#[derive(Debug)]
pub struct ExtendedDecrypter<P = AesGcmPayloadCipher> {
    resolver: CredentialResolutionChain,
    registry: AlgorithmRegistry,
    engine: KeyAgreementEngine,
    payload: P,
}

impl ExtendedDecrypter<AesGcmPayloadCipher> {
    /// Creates a decrypter using AES-GCM for the payload.
    #[must_use]
    pub fn new(resolver: CredentialResolutionChain) -> Self {
        Self::with_payload_cipher(resolver, AesGcmPayloadCipher::new())
    }
}

impl<P: PayloadCipher> ExtendedDecrypter<P> {
    /// Creates a decrypter with a custom payload cipher.
    #[must_use]
    pub fn with_payload_cipher(resolver: CredentialResolutionChain, payload: P) -> Self {
        Self {
            resolver,
            registry: AlgorithmRegistry::default(),
            engine: KeyAgreementEngine::new(),
            payload,
        }
    }

    /// Replaces the algorithm registry.
    #[must_use]
    pub fn with_registry(mut self, registry: AlgorithmRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Decrypts an envelope.
    ///
    /// # Errors
    /// * `Error::UnsupportedAlgorithm` - If the data or key algorithm is not supported
    /// * `Error::EncryptedKeyNotFound` - If no encrypted key belongs to the data
    /// * `Error::CredentialNotFound` - If no credential resolves for any encrypted key
    /// * Any error of [`KeyAgreementEngine::recover_content_key`]
    /// * `Error::Decryption` - If the payload fails authentication
    pub fn decrypt(&self, envelope: &EncryptedEnvelope) -> Result<Vec<u8>> {
        let data = &envelope.data;
        let key_size = data_key_size(&self.registry, &data.encryption_method)?;

        let candidates = locate_encrypted_keys(envelope);
        if candidates.is_empty() {
            return Err(Error::EncryptedKeyNotFound(format!(
                "No encrypted key for data {}",
                data.id
            )));
        }

        let mut last_error = None;
        let mut cek = None;
        for candidate in candidates {
            match self.recover_key(candidate, key_size) {
                Ok(key) => {
                    debug!("Recovered content key from encrypted key {}", candidate.id);
                    cek = Some(key);
                    break;
                }
                Err(e) => {
                    warn!("Encrypted key {} could not be decrypted: {e}", candidate.id);
                    last_error = Some(e);
                }
            }
        }
        let Some(cek) = cek else {
            return Err(last_error.unwrap_or_else(|| {
                Error::EncryptedKeyNotFound(format!("No encrypted key for data {}", data.id))
            }));
        };

        self.payload
            .decrypt(&data.encryption_method, &cek, &data.cipher_value)
    }

    fn recover_key(
        &self,
        encrypted_key: &EncryptedKey,
        key_size: usize,
    ) -> Result<ContentEncryptionKey> {
        let metadata = &encrypted_key.agreement_method;
        if encrypted_key.encryption_method != metadata.key_wrap_algorithm {
            return Err(Error::MalformedMetadata(format!(
                "Encrypted key uses {}, agreement method declares {}",
                encrypted_key.encryption_method, metadata.key_wrap_algorithm
            )));
        }
        if !is_key_wrapping_algorithm(self.registry.get(&encrypted_key.encryption_method)) {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{} is not a key wrapping algorithm",
                encrypted_key.encryption_method
            )));
        }

        let hints = key_info_hints(encrypted_key);
        let credential = self.resolver.resolve(&hints)?.ok_or_else(|| {
            Error::CredentialNotFound(format!(
                "No credential for encrypted key {}",
                encrypted_key.id
            ))
        })?;

        let cek = self.engine.recover_content_key(
            &credential,
            metadata,
            &WrappedKey::new(encrypted_key.cipher_value.clone()),
        )?;
        if cek.len() != key_size {
            return Err(Error::InvalidParameter(format!(
                "Recovered {}-byte content key, data algorithm needs {key_size}",
                cek.len()
            )));
        }
        Ok(cek)
    }
}

/// Hints for resolving the recipient credential of an encrypted key.
fn key_info_hints(encrypted_key: &EncryptedKey) -> KeyInfoHints {
    let metadata = &encrypted_key.agreement_method;
    let mut hints = metadata.recipient_key_info.clone().unwrap_or_default();
    hints.agreement_method = Some(Box::new(metadata.clone()));
    hints
}

/// Encrypted keys that may belong to the envelope's data, in trial order.
fn locate_encrypted_keys(envelope: &EncryptedEnvelope) -> Vec<&EncryptedKey> {
    let data = &envelope.data;
    let mut candidates: Vec<&EncryptedKey> = data.encrypted_keys.iter().collect();

    if let Some(reference) = &data.key_reference {
        let id = reference.strip_prefix('#').unwrap_or(reference);
        candidates.extend(envelope.peer_keys.iter().filter(|key| key.id == id));
    }
    for key in &envelope.peer_keys {
        if key.references_data(&data.id) && !candidates.iter().any(|c| c.id == key.id) {
            candidates.push(key);
        }
    }
    debug!("Located {} encrypted key candidate(s)", candidates.len());
    candidates
}
