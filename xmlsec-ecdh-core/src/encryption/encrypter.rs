//! Encryption with ECDH-ES key agreement.

use tracing::debug;

use super::{
    AesGcmPayloadCipher, DataEncryptionParameters, EncryptedData, EncryptedEnvelope,
    EncryptedKey, EncrypterConfig, KeyEncryptionParameters, KeyPlacement,
};
use crate::algorithm::support::{is_key_wrapping_algorithm, supports_key_agreement};
use crate::algorithm::{AlgorithmRegistry, AlgorithmType};
use crate::ecdh::{ContentEncryptionKey, KeyAgreementEngine};
use crate::error::{Error, Result};
use crate::plugin::PayloadCipher;
use crate::types::{Credential, KeyInfoHints, KeyValueHint};
use crate::utils::generate_id;

/// Encrypts payloads for one or more recipients whose keys are used in
/// ECDH-ES key agreement.
///
/// A fresh content key is generated per call and wrapped for every
/// recipient; the payload itself is encrypted by the [`PayloadCipher`].
#[derive(Debug)]
pub struct ExtendedEncrypter<P = AesGcmPayloadCipher> {
    data_parameters: DataEncryptionParameters,
    key_parameters: Vec<KeyEncryptionParameters>,
    config: EncrypterConfig,
    registry: AlgorithmRegistry,
    engine: KeyAgreementEngine,
    payload: P,
}

impl ExtendedEncrypter<AesGcmPayloadCipher> {
    /// Creates an encrypter using AES-GCM for the payload.
    ///
    /// # Errors
    /// See [`ExtendedEncrypter::with_payload_cipher`]
    pub fn new(
        data_parameters: DataEncryptionParameters,
        key_parameters: Vec<KeyEncryptionParameters>,
    ) -> Result<Self> {
        Self::with_payload_cipher(data_parameters, key_parameters, AesGcmPayloadCipher::new())
    }
}

impl<P: PayloadCipher> ExtendedEncrypter<P> {
    /// Creates an encrypter with a custom payload cipher.
    ///
    /// # Errors
    /// * `Error::InvalidParameter` - If no recipient is given, or a recipient's
    ///   attached key agreement parameters disagree with its key wrap algorithm
    /// * `Error::UnsupportedAlgorithm` - If the data algorithm is not a block
    ///   encryption algorithm, or a key algorithm is not a key wrap algorithm
    /// * `Error::UnsupportedCredential` - If a recipient credential cannot be
    ///   used for key agreement
    pub fn with_payload_cipher(
        data_parameters: DataEncryptionParameters,
        key_parameters: Vec<KeyEncryptionParameters>,
        payload: P,
    ) -> Result<Self> {
        let encrypter = Self {
            data_parameters,
            key_parameters,
            config: EncrypterConfig::default(),
            registry: AlgorithmRegistry::default(),
            engine: KeyAgreementEngine::new(),
            payload,
        };
        encrypter.validate()?;
        Ok(encrypter)
    }

    /// Replaces the encrypter options.
    #[must_use]
    pub fn with_config(mut self, config: EncrypterConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the algorithm registry, validating the setup against it.
    ///
    /// # Errors
    /// See [`ExtendedEncrypter::with_payload_cipher`]
    pub fn with_registry(mut self, registry: AlgorithmRegistry) -> Result<Self> {
        self.registry = registry;
        self.validate()?;
        Ok(self)
    }

    /// The encrypter options.
    #[must_use]
    pub fn config(&self) -> &EncrypterConfig {
        &self.config
    }

    fn validate(&self) -> Result<()> {
        data_key_size(&self.registry, &self.data_parameters.algorithm)?;
        if self.key_parameters.is_empty() {
            return Err(Error::InvalidParameter(
                "At least one key encryption parameter set is required".to_string(),
            ));
        }
        for parameters in &self.key_parameters {
            if !is_key_wrapping_algorithm(self.registry.get(&parameters.algorithm)) {
                return Err(Error::UnsupportedAlgorithm(format!(
                    "{} is not a key wrapping algorithm",
                    parameters.algorithm
                )));
            }
            if !supports_key_agreement(Some(parameters.credential.as_ref())) {
                return Err(Error::UnsupportedCredential(format!(
                    "Credential with {:?} key does not support key agreement",
                    parameters.credential.key_family()
                )));
            }
            parameters.key_agreement_parameters()?;
        }
        Ok(())
    }

    /// Encrypts `plaintext`.
    ///
    /// # Errors
    /// * Any error of [`KeyAgreementEngine::prepare_key_encryption`]
    /// * `Error::Encryption` - If the payload cipher fails
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedEnvelope> {
        let key_size = data_key_size(&self.registry, &self.data_parameters.algorithm)?;
        let cek = ContentEncryptionKey::generate(key_size);
        let data_id = generate_id();

        let mut encrypted_keys = Vec::with_capacity(self.key_parameters.len());
        for parameters in &self.key_parameters {
            encrypted_keys.push(self.encrypt_key(parameters, &cek, &data_id)?);
        }

        let cipher_value = self
            .payload
            .encrypt(&self.data_parameters.algorithm, &cek, plaintext)?;
        drop(cek);

        let mut data = EncryptedData {
            id: data_id,
            encryption_method: self.data_parameters.algorithm.clone(),
            encrypted_keys: Vec::new(),
            key_reference: None,
            cipher_value,
        };
        let peer_keys = match self.config.key_placement {
            KeyPlacement::Inline => {
                data.encrypted_keys = encrypted_keys;
                Vec::new()
            }
            KeyPlacement::Peer => {
                data.key_reference = encrypted_keys.first().map(|key| format!("#{}", key.id));
                encrypted_keys
            }
        };

        debug!(
            "Encrypted {} bytes for {} recipient(s), key placement {:?}",
            plaintext.len(),
            self.key_parameters.len(),
            self.config.key_placement
        );
        Ok(EncryptedEnvelope { data, peer_keys })
    }

    fn encrypt_key(
        &self,
        parameters: &KeyEncryptionParameters,
        cek: &ContentEncryptionKey,
        data_id: &str,
    ) -> Result<EncryptedKey> {
        let agreement_parameters = parameters.key_agreement_parameters()?;
        let (wrapped, mut agreement_method) = self.engine.prepare_key_encryption(
            &parameters.credential,
            &agreement_parameters,
            cek,
        )?;
        agreement_method.recipient_key_info = self.recipient_key_info(&parameters.credential);

        let data_references = match self.config.key_placement {
            KeyPlacement::Inline => Vec::new(),
            KeyPlacement::Peer => vec![format!("#{data_id}")],
        };
        Ok(EncryptedKey {
            id: generate_id(),
            encryption_method: parameters.algorithm.clone(),
            agreement_method,
            cipher_value: wrapped.into_bytes(),
            recipient: parameters.recipient.clone(),
            data_references,
        })
    }

    /// Describes the recipient's static key so the recipient can find it.
    fn recipient_key_info(&self, credential: &Credential) -> Option<KeyInfoHints> {
        let mut hints = KeyInfoHints::default();
        if self.config.emit_public_key_value {
            if let Some(key) = credential.ec_public_key() {
                hints.key_values.push(KeyValueHint::from_ec_public_key(key));
            }
        }
        if self.config.emit_certificate {
            if let Some(certificate) = credential.entity_certificate() {
                hints.certificates.push(certificate.to_vec());
            }
        }
        (!hints.is_empty()).then_some(hints)
    }
}

/// Key size in bytes of a registered block encryption algorithm.
pub(crate) fn data_key_size(registry: &AlgorithmRegistry, algorithm: &str) -> Result<usize> {
    registry
        .get(algorithm)
        .filter(|descriptor| descriptor.algorithm_type == AlgorithmType::BlockEncryption)
        .and_then(|descriptor| descriptor.key_size())
        .ok_or_else(|| {
            Error::UnsupportedAlgorithm(format!(
                "{algorithm} is not a supported data encryption algorithm"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{AES128_GCM, DIGEST_SHA256, ECDH_ES, KW_AES256};
    use crate::types::{NamedCurve, PublicKey};
    use std::sync::Arc;

    fn peer(curve: NamedCurve) -> Arc<Credential> {
        Arc::new(Credential::generate_ec(curve).unwrap().to_public())
    }

    #[test]
    fn test_setup_validation() {
        let data = DataEncryptionParameters::default();

        let result = ExtendedEncrypter::new(data.clone(), vec![]);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let result = ExtendedEncrypter::new(
            data.clone(),
            vec![KeyEncryptionParameters::new(DIGEST_SHA256, peer(NamedCurve::P256))],
        );
        assert!(matches!(result, Err(Error::UnsupportedAlgorithm(_))));

        let rsa = Arc::new(Credential::from_public_key(PublicKey::Rsa(vec![0x30])));
        let result = ExtendedEncrypter::new(
            data.clone(),
            vec![KeyEncryptionParameters::new(KW_AES256, rsa)],
        );
        assert!(matches!(result, Err(Error::UnsupportedCredential(_))));

        let result = ExtendedEncrypter::new(
            DataEncryptionParameters {
                algorithm: KW_AES256.to_string(),
            },
            vec![KeyEncryptionParameters::new(KW_AES256, peer(NamedCurve::P256))],
        );
        assert!(matches!(result, Err(Error::UnsupportedAlgorithm(_))));

        let encrypter = ExtendedEncrypter::new(
            data,
            vec![KeyEncryptionParameters::new(KW_AES256, peer(NamedCurve::P256))],
        )
        .unwrap();
        let result = encrypter.with_registry(AlgorithmRegistry::empty());
        assert!(matches!(result, Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_inline_placement() {
        let encrypter = ExtendedEncrypter::new(
            DataEncryptionParameters::default(),
            vec![KeyEncryptionParameters::new(KW_AES256, peer(NamedCurve::P256))
                .with_recipient("https://sp.example.com")],
        )
        .unwrap();
        let envelope = encrypter.encrypt(b"payload").unwrap();

        assert!(envelope.peer_keys.is_empty());
        assert!(envelope.data.key_reference.is_none());
        assert!(envelope.data.id.starts_with('_'));
        assert_eq!(envelope.data.encrypted_keys.len(), 1);

        let key = &envelope.data.encrypted_keys[0];
        assert_eq!(key.encryption_method, KW_AES256);
        assert_eq!(key.agreement_method.algorithm, ECDH_ES);
        assert_eq!(key.recipient.as_deref(), Some("https://sp.example.com"));
        assert_eq!(key.cipher_value.len(), 40);
        assert!(key.data_references.is_empty());

        let key_info = key.agreement_method.recipient_key_info.as_ref().unwrap();
        assert_eq!(key_info.key_values.len(), 1);
        assert!(key_info.certificates.is_empty());
    }

    #[test]
    fn test_peer_placement_and_multiple_recipients() {
        let encrypter = ExtendedEncrypter::new(
            DataEncryptionParameters {
                algorithm: AES128_GCM.to_string(),
            },
            vec![
                KeyEncryptionParameters::new(KW_AES256, peer(NamedCurve::P256)),
                KeyEncryptionParameters::new(KW_AES256, peer(NamedCurve::P521)),
            ],
        )
        .unwrap()
        .with_config(EncrypterConfig {
            key_placement: KeyPlacement::Peer,
            ..EncrypterConfig::default()
        });
        let envelope = encrypter.encrypt(b"payload").unwrap();

        assert!(envelope.data.encrypted_keys.is_empty());
        assert_eq!(envelope.peer_keys.len(), 2);
        assert_eq!(
            envelope.data.key_reference,
            Some(format!("#{}", envelope.peer_keys[0].id))
        );
        for key in &envelope.peer_keys {
            assert!(key.references_data(&envelope.data.id));
            // 128-bit content key wrapped: 16 + 8 bytes
            assert_eq!(key.cipher_value.len(), 24);
        }
        assert_eq!(
            envelope.peer_keys[1].agreement_method.ephemeral_curve,
            NamedCurve::P521
        );
    }

    #[test]
    fn test_recipient_key_info_options() {
        let credential = Arc::new(
            Credential::generate_ec(NamedCurve::P256)
                .unwrap()
                .to_public()
                .with_certificate_chain(vec![vec![0x30, 0x82]]),
        );
        let encrypter = ExtendedEncrypter::new(
            DataEncryptionParameters::default(),
            vec![KeyEncryptionParameters::new(KW_AES256, credential)],
        )
        .unwrap()
        .with_config(EncrypterConfig {
            emit_public_key_value: false,
            emit_certificate: true,
            ..EncrypterConfig::default()
        });
        let envelope = encrypter.encrypt(b"payload").unwrap();
        let key_info = envelope.data.encrypted_keys[0]
            .agreement_method
            .recipient_key_info
            .clone()
            .unwrap();
        assert!(key_info.key_values.is_empty());
        assert_eq!(key_info.certificates, vec![vec![0x30, 0x82]]);

        let encrypter = encrypter.with_config(EncrypterConfig {
            emit_public_key_value: false,
            emit_certificate: false,
            ..EncrypterConfig::default()
        });
        let envelope = encrypter.encrypt(b"payload").unwrap();
        assert!(envelope.data.encrypted_keys[0]
            .agreement_method
            .recipient_key_info
            .is_none());
    }
}
