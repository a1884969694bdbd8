//! Encrypted data structures and the encrypter/decrypter façade.
//!
//! The structures here mirror `EncryptedData` and `EncryptedKey` of XML
//! Encryption in structured form. Turning them into XML elements is left to
//! a serialization collaborator; JSON (de)serialization is provided.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xmlsec_ecdh_core::prelude::*;
//!
//! fn example() -> xmlsec_ecdh_core::Result<()> {
//!     let recipient = Credential::generate_ec(NamedCurve::P256)?;
//!     let peer = Arc::new(recipient.to_public());
//!
//!     let encrypter = ExtendedEncrypter::new(
//!         DataEncryptionParameters::default(),
//!         vec![KeyEncryptionParameters::new(KW_AES256, peer)],
//!     )?;
//!     let envelope = encrypter.encrypt(b"https://www.idsec.se")?;
//!
//!     let decrypter = ExtendedDecrypter::new(CredentialResolutionChain::local(vec![
//!         Arc::new(recipient),
//!     ]));
//!     let plaintext = decrypter.decrypt(&envelope)?;
//!     assert_eq!(plaintext, b"https://www.idsec.se");
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::algorithm::{AES256_GCM, DIGEST_SHA256};
use crate::ecdh::{AgreementMethod, ConcatKdfParams, KeyAgreementParameters};
use crate::error::{Error, Result};
use crate::types::Credential;
use crate::utils::base64_bytes;

pub mod decrypter;
pub mod encrypter;
pub mod payload;

pub use decrypter::ExtendedDecrypter;
pub use encrypter::ExtendedEncrypter;
pub use payload::AesGcmPayloadCipher;

/// Where encrypted keys are placed relative to the encrypted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPlacement {
    /// Inside the `EncryptedData`'s key info
    #[default]
    Inline,
    /// Next to the `EncryptedData`, linked by reference
    Peer,
}

/// An `EncryptedKey` produced by ECDH-ES key agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKey {
    /// Element identifier
    pub id: String,

    /// Key wrap algorithm URI
    pub encryption_method: String,

    /// Key agreement metadata
    pub agreement_method: AgreementMethod,

    /// The wrapped content key
    #[serde(with = "base64_bytes")]
    pub cipher_value: Vec<u8>,

    /// Intended recipient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// `#id` references to the encrypted data this key belongs to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_references: Vec<String>,
}

impl EncryptedKey {
    /// Returns `true` if this key lists `data_id` among its data references.
    #[must_use]
    pub fn references_data(&self, data_id: &str) -> bool {
        self.data_references
            .iter()
            .any(|reference| reference.strip_prefix('#') == Some(data_id))
    }
}

/// An `EncryptedData` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    /// Element identifier
    pub id: String,

    /// Block encryption algorithm URI
    pub encryption_method: String,

    /// Inline encrypted keys
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encrypted_keys: Vec<EncryptedKey>,

    /// `#id` retrieval reference to a peer encrypted key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_reference: Option<String>,

    /// The encrypted payload
    #[serde(with = "base64_bytes")]
    pub cipher_value: Vec<u8>,
}

/// The output of [`ExtendedEncrypter::encrypt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// The encrypted data
    pub data: EncryptedData,

    /// Encrypted keys placed next to the data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peer_keys: Vec<EncryptedKey>,
}

impl EncryptedEnvelope {
    /// Serializes the envelope to JSON.
    ///
    /// # Errors
    /// * `Error::Serialization` - If serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an envelope from JSON.
    ///
    /// # Errors
    /// * `Error::Serialization` - If the JSON is not a valid envelope
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Parameters for the payload encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEncryptionParameters {
    /// Block encryption algorithm URI
    pub algorithm: String,
}

impl Default for DataEncryptionParameters {
    /// AES-256-GCM.
    fn default() -> Self {
        Self {
            algorithm: AES256_GCM.to_string(),
        }
    }
}

/// Parameters for encrypting the content key to one recipient.
#[derive(Debug, Clone)]
pub struct KeyEncryptionParameters {
    /// Key wrap algorithm URI
    pub algorithm: String,

    /// The recipient's static public credential
    pub credential: Arc<Credential>,

    /// Intended recipient name
    pub recipient: Option<String>,
}

impl KeyEncryptionParameters {
    /// Creates key encryption parameters.
    #[must_use]
    pub fn new(algorithm: impl Into<String>, credential: Arc<Credential>) -> Self {
        Self {
            algorithm: algorithm.into(),
            credential,
            recipient: None,
        }
    }

    /// Sets the intended recipient.
    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// The key agreement parameters for this recipient.
    ///
    /// Parameters attached to the credential are used if present; their key
    /// wrap algorithm must then agree with [`Self::algorithm`]. Otherwise
    /// ConcatKDF with SHA-256 and empty context octets is used.
    ///
    /// # Errors
    /// * `Error::InvalidParameter` - If the attached parameters name another key wrap algorithm
    pub fn key_agreement_parameters(&self) -> Result<KeyAgreementParameters> {
        match self.credential.key_agreement_parameters() {
            Some(params) if params.key_wrap_algorithm == self.algorithm => Ok(params.clone()),
            Some(params) => Err(Error::InvalidParameter(format!(
                "Credential key agreement parameters use {}, key encryption uses {}",
                params.key_wrap_algorithm, self.algorithm
            ))),
            None => Ok(KeyAgreementParameters::new(
                self.algorithm.clone(),
                ConcatKdfParams::new(DIGEST_SHA256, Vec::new(), Vec::new(), Vec::new()),
            )),
        }
    }
}

/// Encrypter options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncrypterConfig {
    /// Placement of the encrypted keys
    pub key_placement: KeyPlacement,

    /// Describe the recipient key by its public key value
    pub emit_public_key_value: bool,

    /// Describe the recipient key by its entity certificate
    pub emit_certificate: bool,
}

impl Default for EncrypterConfig {
    fn default() -> Self {
        Self {
            key_placement: KeyPlacement::Inline,
            emit_public_key_value: true,
            emit_certificate: false,
        }
    }
}
