//! End-to-end encryption and decryption scenarios.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use pretty_assertions::assert_eq;

use crate::prelude::*;
use crate::resolver::{ReferenceCredentialResolver, StaticCredentialResolver};

const PLAINTEXT: &str = "https://www.idsec.se";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn kdf_parameters() -> Result<ConcatKdfParams> {
    Ok(ConcatKdfParams::builder()
        .digest_method(DIGEST_SHA256)
        .algorithm_id(hex::decode("0000")?)
        .party_u_info(hex::decode("03d8")?)
        .party_v_info(hex::decode("03d0")?)
        .build()?)
}

/// The recipient key pair, and its public half carrying the agreement parameters.
fn recipient(curve: NamedCurve) -> Result<(Credential, Arc<Credential>)> {
    let recipient = Credential::generate_ec(curve)?;
    let peer = recipient
        .to_public()
        .with_key_agreement_parameters(KeyAgreementParameters::new(KW_AES256, kdf_parameters()?));
    Ok((recipient, Arc::new(peer)))
}

fn encrypter(peer: Arc<Credential>, config: EncrypterConfig) -> Result<ExtendedEncrypter> {
    Ok(ExtendedEncrypter::new(
        DataEncryptionParameters {
            algorithm: AES256_GCM.to_string(),
        },
        vec![KeyEncryptionParameters::new(KW_AES256, peer)],
    )?
    .with_config(config))
}

/// Records which payloads reach the payload collaborator.
#[derive(Default)]
struct RecordingCipher {
    decrypted: Mutex<Vec<Vec<u8>>>,
}

impl PayloadCipher for Arc<RecordingCipher> {
    fn encrypt(
        &self,
        algorithm: &str,
        key: &ContentEncryptionKey,
        plaintext: &[u8],
    ) -> crate::Result<Vec<u8>> {
        crate::encryption::AesGcmPayloadCipher::new().encrypt(algorithm, key, plaintext)
    }

    fn decrypt(
        &self,
        algorithm: &str,
        key: &ContentEncryptionKey,
        ciphertext: &[u8],
    ) -> crate::Result<Vec<u8>> {
        let plaintext =
            crate::encryption::AesGcmPayloadCipher::new().decrypt(algorithm, key, ciphertext)?;
        if let Ok(mut decrypted) = self.decrypted.lock() {
            decrypted.push(plaintext.clone());
        }
        Ok(plaintext)
    }
}

#[test]
fn test_encrypt_decrypt_ecdh_es() -> Result<()> {
    init_tracing();
    let (recipient, peer) = recipient(NamedCurve::P256)?;

    let envelope = encrypter(peer, EncrypterConfig::default())?.encrypt(PLAINTEXT.as_bytes())?;
    let key = &envelope.data.encrypted_keys[0];
    assert_eq!(key.agreement_method.algorithm, ECDH_ES);
    assert_eq!(key.agreement_method.key_wrap_algorithm, KW_AES256);
    assert_eq!(key.agreement_method.key_derivation, kdf_parameters()?);

    let decrypter =
        ExtendedDecrypter::new(CredentialResolutionChain::local(vec![Arc::new(recipient)]));
    let plaintext = decrypter.decrypt(&envelope)?;
    assert_eq!(String::from_utf8(plaintext)?, PLAINTEXT);
    Ok(())
}

#[test]
fn test_all_curves_and_placements() -> Result<()> {
    init_tracing();
    for curve in [NamedCurve::P256, NamedCurve::P384, NamedCurve::P521] {
        for key_placement in [KeyPlacement::Inline, KeyPlacement::Peer] {
            let (recipient, peer) = recipient(curve.clone())?;
            let config = EncrypterConfig {
                key_placement,
                ..EncrypterConfig::default()
            };
            let envelope = encrypter(peer, config)?.encrypt(PLAINTEXT.as_bytes())?;

            let decrypter = ExtendedDecrypter::new(CredentialResolutionChain::local(vec![
                Arc::new(recipient),
            ]));
            assert_eq!(decrypter.decrypt(&envelope)?, PLAINTEXT.as_bytes());
        }
    }
    Ok(())
}

#[test]
fn test_envelope_json_round_trip() -> Result<()> {
    let (recipient, peer) = recipient(NamedCurve::P384)?;
    let config = EncrypterConfig {
        key_placement: KeyPlacement::Peer,
        ..EncrypterConfig::default()
    };
    let envelope = encrypter(peer, config)?.encrypt(PLAINTEXT.as_bytes())?;

    let json = envelope.to_json()?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(
        value["peer_keys"][0]["agreement_method"]["ephemeral_curve"],
        "urn:oid:1.3.132.0.34"
    );
    assert_eq!(
        value["peer_keys"][0]["agreement_method"]["key_derivation"]["party_u_info"],
        "A9g="
    );

    let parsed = EncryptedEnvelope::from_json(&json)?;
    assert_eq!(parsed, envelope);

    let decrypter =
        ExtendedDecrypter::new(CredentialResolutionChain::local(vec![Arc::new(recipient)]));
    assert_eq!(decrypter.decrypt(&parsed)?, PLAINTEXT.as_bytes());
    Ok(())
}

#[test]
fn test_resolution_by_certificate_and_reference() -> Result<()> {
    let certificate = vec![0x30, 0x82, 0x01, 0x0a];
    let recipient = Credential::generate_ec(NamedCurve::P256)?.with_certificate_chain(vec![
        certificate.clone(),
    ]);
    let peer = Arc::new(recipient.to_public());
    let recipient = Arc::new(recipient);

    // Certificate only: the key value resolver has nothing to match.
    let config = EncrypterConfig {
        emit_public_key_value: false,
        emit_certificate: true,
        ..EncrypterConfig::default()
    };
    let envelope = encrypter(Arc::clone(&peer), config)?.encrypt(PLAINTEXT.as_bytes())?;
    let decrypter = ExtendedDecrypter::new(
        CredentialResolutionChain::new().with_resolver(
            crate::resolver::CertificateCredentialResolver::new(vec![Arc::clone(&recipient)]),
        ),
    );
    assert_eq!(decrypter.decrypt(&envelope)?, PLAINTEXT.as_bytes());

    // External reference, resolved through the reference source.
    let mut envelope = encrypter(peer, EncrypterConfig::default())?.encrypt(PLAINTEXT.as_bytes())?;
    let key_info = envelope.data.encrypted_keys[0]
        .agreement_method
        .recipient_key_info
        .get_or_insert_with(KeyInfoHints::default);
    key_info.key_values.clear();
    key_info.references.push("https://keys.example.com/recipient".into());

    let mut source = HashMap::new();
    source.insert(
        "https://keys.example.com/recipient".to_string(),
        Arc::clone(&recipient),
    );
    let decrypter = ExtendedDecrypter::new(
        CredentialResolutionChain::new().with_resolver(ReferenceCredentialResolver::new(source)),
    );
    assert_eq!(decrypter.decrypt(&envelope)?, PLAINTEXT.as_bytes());
    Ok(())
}

#[test]
fn test_tampering_is_detected_before_payload_decryption() -> Result<()> {
    init_tracing();
    let (recipient, peer) = recipient(NamedCurve::P256)?;
    let envelope = encrypter(peer, EncrypterConfig::default())?.encrypt(PLAINTEXT.as_bytes())?;

    let cipher = Arc::new(RecordingCipher::default());
    let decrypter = ExtendedDecrypter::with_payload_cipher(
        CredentialResolutionChain::new()
            .with_resolver(StaticCredentialResolver::new(Arc::new(recipient))),
        Arc::clone(&cipher),
    );

    let mut tampered = envelope.clone();
    tampered.data.encrypted_keys[0].cipher_value[0] ^= 0x01;
    let err = decrypter.decrypt(&tampered).unwrap_err();
    assert!(matches!(err, Error::UnwrapIntegrity));
    assert_eq!(err.category(), ErrorCategory::Integrity);

    let mut tampered = envelope.clone();
    tampered.data.encrypted_keys[0]
        .agreement_method
        .ephemeral_public_key[10] ^= 0x01;
    let err = decrypter.decrypt(&tampered).unwrap_err();
    assert!(err.is_integrity_failure());

    let mut tampered = envelope.clone();
    tampered.data.encrypted_keys[0]
        .agreement_method
        .key_derivation
        .algorithm_id = vec![0x00, 0x01];
    assert!(matches!(
        decrypter.decrypt(&tampered),
        Err(Error::UnwrapIntegrity)
    ));
    assert!(cipher.decrypted.lock().map(|d| d.is_empty()).unwrap_or(false));

    // Payload tampering is caught by the payload collaborator.
    let mut tampered = envelope.clone();
    let last = tampered.data.cipher_value.len() - 1;
    tampered.data.cipher_value[last] ^= 0x01;
    assert!(matches!(
        decrypter.decrypt(&tampered),
        Err(Error::Decryption(_))
    ));

    assert_eq!(decrypter.decrypt(&envelope)?, PLAINTEXT.as_bytes());
    assert_eq!(
        cipher.decrypted.lock().map(|d| d.len()).unwrap_or_default(),
        1
    );
    Ok(())
}

#[test]
fn test_wrong_recipient_cannot_decrypt() -> Result<()> {
    let (_, peer) = recipient(NamedCurve::P256)?;
    let envelope = encrypter(peer, EncrypterConfig::default())?.encrypt(PLAINTEXT.as_bytes())?;

    // Same curve but a different key: the key value does not match and the
    // agreement method resolver picks a credential that fails to unwrap.
    let other = Credential::generate_ec(NamedCurve::P256)?;
    let decrypter =
        ExtendedDecrypter::new(CredentialResolutionChain::local(vec![Arc::new(other)]));
    let err = decrypter.decrypt(&envelope).unwrap_err();
    assert!(matches!(err, Error::UnwrapIntegrity));

    // Different curve: nothing resolves.
    let other = Credential::generate_ec(NamedCurve::P521)?;
    let decrypter =
        ExtendedDecrypter::new(CredentialResolutionChain::local(vec![Arc::new(other)]));
    let err = decrypter.decrypt(&envelope).unwrap_err();
    assert!(matches!(err, Error::CredentialNotFound(_)));
    assert_eq!(err.category(), ErrorCategory::Resolution);
    Ok(())
}

#[test]
fn test_public_copy_of_recipient_does_not_block_decryption() -> Result<()> {
    let (recipient, peer) = recipient(NamedCurve::P256)?;
    let envelope = encrypter(Arc::clone(&peer), EncrypterConfig::default())?
        .encrypt(PLAINTEXT.as_bytes())?;

    let decrypter =
        ExtendedDecrypter::new(CredentialResolutionChain::local(vec![peer, Arc::new(recipient)]));
    assert_eq!(decrypter.decrypt(&envelope)?, PLAINTEXT.as_bytes());
    Ok(())
}

#[test]
fn test_encrypter_config_from_json() -> Result<()> {
    let config: EncrypterConfig = serde_json::from_str(r#"{"key_placement":"peer"}"#)?;
    let (recipient, peer) = recipient(NamedCurve::P256)?;
    let envelope = encrypter(peer, config)?.encrypt(PLAINTEXT.as_bytes())?;
    assert!(envelope.data.key_reference.is_some());

    let decrypter =
        ExtendedDecrypter::new(CredentialResolutionChain::local(vec![Arc::new(recipient)]));
    assert_eq!(decrypter.decrypt(&envelope)?, PLAINTEXT.as_bytes());
    Ok(())
}
