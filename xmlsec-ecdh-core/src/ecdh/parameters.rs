//! Key agreement parameters and the agreement metadata carried to the recipient.

use serde::{Deserialize, Serialize};

use super::kdf::ConcatKdfParams;
use super::key_wrapping::KeyWrapAlgorithm;
use crate::algorithm::ECDH_ES;
use crate::error::{Error, Result};
use crate::types::{EcPublicKey, KeyInfoHints, NamedCurve};
use crate::utils::base64_bytes;

/// Parameters attached to a peer credential before encrypting to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAgreementParameters {
    /// URI of the key wrap algorithm applied with the derived key
    pub key_wrap_algorithm: String,

    /// Key derivation parameters
    pub kdf: ConcatKdfParams,
}

impl KeyAgreementParameters {
    /// Creates key agreement parameters.
    #[must_use]
    pub fn new(key_wrap_algorithm: impl Into<String>, kdf: ConcatKdfParams) -> Self {
        Self {
            key_wrap_algorithm: key_wrap_algorithm.into(),
            kdf,
        }
    }

    /// Resolves the key wrap algorithm.
    ///
    /// # Errors
    /// * `Error::UnsupportedAlgorithm` - If the URI is not an AES key wrap algorithm
    pub fn key_wrap(&self) -> Result<KeyWrapAlgorithm> {
        resolve_key_wrap(&self.key_wrap_algorithm)
    }
}

/// The `AgreementMethod` emitted alongside a wrapped key.
///
/// Everything the recipient needs to repeat the derivation is public: the
/// ephemeral public key, the KDF inputs and the wrap algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementMethod {
    /// Key agreement algorithm URI (ECDH-ES)
    pub algorithm: String,

    /// Key derivation parameters
    pub key_derivation: ConcatKdfParams,

    /// Curve of the originator's ephemeral key
    pub ephemeral_curve: NamedCurve,

    /// Uncompressed SEC1 encoding of the originator's ephemeral public key
    #[serde(with = "base64_bytes")]
    pub ephemeral_public_key: Vec<u8>,

    /// URI of the key wrap algorithm
    pub key_wrap_algorithm: String,

    /// Describes the recipient's static key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_key_info: Option<KeyInfoHints>,
}

impl AgreementMethod {
    /// Builds ECDH-ES metadata for an ephemeral public key.
    #[must_use]
    pub fn ecdh_es(
        ephemeral_public_key: &EcPublicKey,
        parameters: &KeyAgreementParameters,
    ) -> Self {
        Self {
            algorithm: ECDH_ES.to_string(),
            key_derivation: parameters.kdf.clone(),
            ephemeral_curve: ephemeral_public_key.curve().clone(),
            ephemeral_public_key: ephemeral_public_key.as_bytes().to_vec(),
            key_wrap_algorithm: parameters.key_wrap_algorithm.clone(),
            recipient_key_info: None,
        }
    }

    /// Sets the recipient key info.
    #[must_use]
    pub fn with_recipient_key_info(mut self, key_info: KeyInfoHints) -> Self {
        self.recipient_key_info = Some(key_info);
        self
    }

    /// Parses and validates the originator's ephemeral public key.
    ///
    /// # Errors
    /// * `Error::MalformedMetadata` - If the point is not on the declared curve
    pub fn ephemeral_key(&self) -> Result<EcPublicKey> {
        EcPublicKey::from_sec1_bytes(self.ephemeral_curve.clone(), &self.ephemeral_public_key)
            .map_err(|e| {
                Error::MalformedMetadata(format!("Invalid originator ephemeral key: {e}"))
            })
    }

    /// Resolves the key wrap algorithm.
    ///
    /// # Errors
    /// * `Error::UnsupportedAlgorithm` - If the URI is not an AES key wrap algorithm
    pub fn key_wrap(&self) -> Result<KeyWrapAlgorithm> {
        resolve_key_wrap(&self.key_wrap_algorithm)
    }
}

fn resolve_key_wrap(uri: &str) -> Result<KeyWrapAlgorithm> {
    KeyWrapAlgorithm::from_uri(uri).ok_or_else(|| {
        Error::UnsupportedAlgorithm(format!("{uri} is not a supported key wrap algorithm"))
    })
}

/// A content encryption key wrapped under a derived key encryption key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey(Vec<u8>);

impl WrappedKey {
    /// Wraps raw cipher value bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The wrapped key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the value, returning the bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for WrappedKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{DIGEST_SHA256, KW_AES256};
    use crate::types::EcPrivateKey;

    fn parameters() -> KeyAgreementParameters {
        KeyAgreementParameters::new(
            KW_AES256,
            ConcatKdfParams::new(DIGEST_SHA256, vec![0, 0], vec![0x03, 0xd8], vec![0x03, 0xd0]),
        )
    }

    #[test]
    fn test_key_wrap_resolution() {
        assert_eq!(parameters().key_wrap().unwrap(), KeyWrapAlgorithm::Aes256Kw);

        let mut params = parameters();
        params.key_wrap_algorithm = "http://www.w3.org/2001/04/xmlenc#aes256-cbc".into();
        assert!(matches!(params.key_wrap(), Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_agreement_method_metadata() {
        let ephemeral = EcPrivateKey::generate(NamedCurve::P384)
            .unwrap()
            .public_key()
            .unwrap();
        let method = AgreementMethod::ecdh_es(&ephemeral, &parameters());

        assert_eq!(method.algorithm, ECDH_ES);
        assert_eq!(method.ephemeral_curve, NamedCurve::P384);
        assert_eq!(method.ephemeral_key().unwrap(), ephemeral);
        assert_eq!(method.key_derivation, parameters().kdf);

        let json = serde_json::to_string(&method).unwrap();
        let back: AgreementMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, method);
    }

    #[test]
    fn test_malformed_ephemeral_key() {
        let ephemeral = EcPrivateKey::generate(NamedCurve::P256)
            .unwrap()
            .public_key()
            .unwrap();
        let mut method = AgreementMethod::ecdh_es(&ephemeral, &parameters());
        method.ephemeral_public_key[40] ^= 0x01;
        assert!(matches!(
            method.ephemeral_key(),
            Err(Error::MalformedMetadata(_))
        ));

        let mut method = AgreementMethod::ecdh_es(&ephemeral, &parameters());
        method.ephemeral_curve = NamedCurve::P521;
        assert!(matches!(
            method.ephemeral_key(),
            Err(Error::MalformedMetadata(_))
        ));
    }
}
