//! ECDH-ES key agreement for XML Encryption.
//!
//! This crate adds key-agreement based key encryption (Elliptic-Curve
//! Diffie-Hellman, Ephemeral-Static) to an encrypt-then-key-wrap XML
//! Encryption pipeline, together with the capability checks that decide
//! which algorithms and credentials may take part in it.
//!
//! # Features
//!
//! - ECDH-ES on the NIST curves `P-256`, `P-384` and `P-521`
//! - ConcatKDF (NIST SP 800-56A) key derivation
//! - AES key wrap (RFC 3394) of the content encryption key
//! - Ordered credential resolution from key-info hints
//! - Inline or peer placement of encrypted keys
//! - AES-GCM payload encryption through a pluggable collaborator
//!
//! # Architecture
//!
//! The crate is organized into these main modules:
//! - `algorithm`: Algorithm identifiers, registry and capability predicates
//! - `ecdh`: Key agreement, key derivation and key wrapping
//! - `resolver`: Credential resolution chain
//! - `encryption`: Encrypted data structures, encrypter and decrypter
//! - `plugin`: Collaborator traits for payload encryption and credential retrieval
//! - `types`: Curves, keys, credentials and key-info hints
//! - `error`: Error types and handling
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xmlsec_ecdh_core::prelude::*;
//!
//! fn example() -> xmlsec_ecdh_core::Result<()> {
//!     // The recipient's static key pair
//!     let recipient = Credential::generate_ec(NamedCurve::P256)?;
//!
//!     // Encrypt for the recipient's public key
//!     let kdf = ConcatKdfParams::builder()
//!         .digest_method(DIGEST_SHA256)
//!         .algorithm_id(vec![0x00, 0x00])
//!         .party_u_info(vec![0x03, 0xd8])
//!         .party_v_info(vec![0x03, 0xd0])
//!         .build()?;
//!     let peer = recipient
//!         .to_public()
//!         .with_key_agreement_parameters(KeyAgreementParameters::new(KW_AES256, kdf));
//!     let encrypter = ExtendedEncrypter::new(
//!         DataEncryptionParameters::default(),
//!         vec![KeyEncryptionParameters::new(KW_AES256, Arc::new(peer))],
//!     )?;
//!     let envelope = encrypter.encrypt(b"Hello, XML Encryption!")?;
//!
//!     // Decrypt with the recipient's private key
//!     let decrypter = ExtendedDecrypter::new(CredentialResolutionChain::local(vec![
//!         Arc::new(recipient),
//!     ]));
//!     let plaintext = decrypter.decrypt(&envelope)?;
//!     assert_eq!(plaintext, b"Hello, XML Encryption!");
//!     Ok(())
//! }
//! ```
//!
//! # Security Considerations
//!
//! - Ephemeral private keys are used for exactly one agreement
//! - Shared secrets, derived keys and content keys are zeroized when dropped
//! - Received public points are validated before use
//! - Integrity failures are reported as such and must not be retried with the same input

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithm;
pub mod ecdh;
pub mod encryption;
pub mod error;
pub mod plugin;
pub mod prelude;
pub mod resolver;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod tests;

pub use error::{Error, ErrorCategory, Result};
pub use plugin::{PayloadCipher, ReferenceSource};
pub use types::{Credential, KeyInfoHints, NamedCurve};
