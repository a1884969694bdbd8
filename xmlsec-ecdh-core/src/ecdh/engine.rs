//! ECDH-ES key encryption in both directions.
//!
//! Encrypting: fresh ephemeral key pair on the peer's curve, ECDH with the
//! peer's static key, ConcatKDF to the key-wrap key size, AES-KW of the
//! content key. Decrypting repeats the derivation from the metadata with the
//! recipient's static private key. Every intermediate secret is held in a
//! zeroizing container and dropped before the function returns, on every path.

use tracing::debug;

use super::kdf::{concat_kdf, ConcatKdfParams};
use super::key_agreement::{static_agreement, EphemeralKeyPair};
use super::key_wrapping::{
    unwrap_key, wrap_key, ContentEncryptionKey, KeyEncryptionKey, KeyWrapAlgorithm,
};
use super::parameters::{AgreementMethod, KeyAgreementParameters, WrappedKey};
use crate::algorithm::support::supports_key_agreement;
use crate::algorithm::ECDH_ES;
use crate::error::{Error, Result};
use crate::types::Credential;

/// Performs ECDH-ES key agreement, key derivation and key wrapping.
///
/// The engine holds no state; one instance may serve concurrent operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyAgreementEngine;

impl KeyAgreementEngine {
    /// Creates a new engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Wraps `cek` for the holder of `peer`'s static key.
    ///
    /// # Errors
    /// * `Error::UnsupportedCredential` - If `peer` has no EC public key
    /// * `Error::UnsupportedAlgorithm` - If the key wrap or digest algorithm is unknown
    /// * `Error::CurveMismatch` - If the peer's curve does not support key agreement
    /// * `Error::InvalidParameter` - If the content key cannot be wrapped
    pub fn prepare_key_encryption(
        &self,
        peer: &Credential,
        params: &KeyAgreementParameters,
        cek: &ContentEncryptionKey,
    ) -> Result<(WrappedKey, AgreementMethod)> {
        if !supports_key_agreement(Some(peer)) {
            return Err(Error::UnsupportedCredential(format!(
                "Peer credential with {:?} key cannot be used for key agreement",
                peer.key_family()
            )));
        }
        let peer_key = peer.ec_public_key().ok_or_else(|| {
            Error::UnsupportedCredential("Peer credential has no EC public key".to_string())
        })?;
        let key_wrap = params.key_wrap()?;
        // Validate the digest before generating any key material.
        params.kdf.digest()?;

        let ephemeral = EphemeralKeyPair::generate(peer_key.curve())?;
        let metadata = AgreementMethod::ecdh_es(ephemeral.public_key(), params);
        let shared_secret = ephemeral.agree(peer_key)?;

        let kek = derive_kek(shared_secret.as_bytes(), &params.kdf, key_wrap)?;
        drop(shared_secret);
        let wrapped = wrap_key(key_wrap, &kek, cek)?;

        debug!(
            curve = %peer_key.curve(),
            key_wrap = %key_wrap,
            "Prepared ECDH-ES key encryption"
        );
        Ok((WrappedKey::new(wrapped), metadata))
    }

    /// Recovers a content key wrapped with [`Self::prepare_key_encryption`].
    ///
    /// # Errors
    /// * `Error::UnsupportedCredential` - If `own` has no EC private key
    /// * `Error::UnsupportedAlgorithm` - If the agreement, key wrap or digest algorithm is unknown
    /// * `Error::CurveMismatch` - If `own` is on a different curve than the ephemeral key
    /// * `Error::MalformedMetadata` - If the ephemeral public key is invalid
    /// * `Error::UnwrapIntegrity` - If the wrapped key fails its integrity check
    pub fn recover_content_key(
        &self,
        own: &Credential,
        metadata: &AgreementMethod,
        wrapped: &WrappedKey,
    ) -> Result<ContentEncryptionKey> {
        if metadata.algorithm != ECDH_ES {
            return Err(Error::UnsupportedAlgorithm(format!(
                "Key agreement method {} is not supported",
                metadata.algorithm
            )));
        }
        let private_key = own.ec_private_key().ok_or_else(|| {
            Error::UnsupportedCredential("Credential has no EC private key".to_string())
        })?;
        if private_key.curve() != &metadata.ephemeral_curve {
            return Err(Error::CurveMismatch(format!(
                "Credential is on {}, originator key is on {}",
                private_key.curve(),
                metadata.ephemeral_curve
            )));
        }
        let key_wrap = metadata.key_wrap()?;
        let ephemeral_key = metadata.ephemeral_key()?;

        let shared_secret = static_agreement(private_key, &ephemeral_key)?;
        let kek = derive_kek(shared_secret.as_bytes(), &metadata.key_derivation, key_wrap)?;
        drop(shared_secret);
        let cek = unwrap_key(key_wrap, &kek, wrapped.as_bytes())?;

        debug!(
            curve = %metadata.ephemeral_curve,
            key_wrap = %key_wrap,
            "Recovered content key via ECDH-ES"
        );
        Ok(cek)
    }
}

fn derive_kek(
    shared_secret: &[u8],
    kdf: &ConcatKdfParams,
    key_wrap: KeyWrapAlgorithm,
) -> Result<KeyEncryptionKey> {
    let derived = concat_kdf(shared_secret, kdf, key_wrap.key_size() * 8)?;
    Ok(KeyEncryptionKey::new(derived.to_vec()))
}
