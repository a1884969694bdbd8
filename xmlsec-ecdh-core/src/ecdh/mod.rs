//! ECDH-ES key agreement for XML Encryption 1.1.
//!
//! This module implements the `AgreementMethod` based key encryption of
//! XML Encryption 1.1: the content encryption key is wrapped with AES-KW
//! under a key derived by ConcatKDF from an ECDH shared secret between a
//! fresh ephemeral key and the recipient's static key.
//!
//! # Features
//!
//! - NIST curves `P-256`, `P-384` and `P-521`, with explicit point validation
//! - ConcatKDF over SHA-224, SHA-256, SHA-384 and SHA-512
//! - `kw-aes128`, `kw-aes192` and `kw-aes256` key wrapping
//!
//! # Security Considerations
//!
//! - Ephemeral private keys are consumed by their single agreement
//! - Shared secrets and derived keys are zeroized when dropped
//! - Received public points are validated before use

pub mod engine;
pub mod kdf;
pub mod key_agreement;
pub mod key_wrapping;
pub mod parameters;

pub use engine::KeyAgreementEngine;
pub use kdf::{concat_kdf, ConcatKdfParams, ConcatKdfParamsBuilder, DigestAlgorithm};
pub use key_agreement::{EphemeralKeyPair, SharedSecret};
pub use key_wrapping::{
    unwrap_key, wrap_key, ContentEncryptionKey, KeyEncryptionKey, KeyWrapAlgorithm,
};
pub use parameters::{AgreementMethod, KeyAgreementParameters, WrappedKey};
