//! Collaborator traits for payload encryption and credential retrieval.
//!
//! The key agreement core never touches payload ciphertext and never fetches
//! credentials itself. Both concerns are delegated through the traits in this
//! module, so callers can plug in their own XML payload processing or key
//! store.
//!
//! # Plugin Architecture
//!
//! - [`PayloadCipher`]: encrypts and decrypts the payload under a content key
//! - [`ReferenceSource`]: fetches a credential named by an external reference
//!
//! [`AesGcmPayloadCipher`](crate::encryption::payload::AesGcmPayloadCipher) is
//! the default payload collaborator, and `HashMap<String, Arc<Credential>>`
//! serves as an in-memory reference source.
//!
//! # Examples
//!
//! Implementing a custom payload cipher:
//!
//! ```rust,no_run
//! use xmlsec_ecdh_core::ecdh::ContentEncryptionKey;
//! use xmlsec_ecdh_core::plugin::PayloadCipher;
//! use xmlsec_ecdh_core::Result;
//!
//! struct ExternalCipher;
//!
//! impl PayloadCipher for ExternalCipher {
//!     fn encrypt(
//!         &self,
//!         algorithm: &str,
//!         key: &ContentEncryptionKey,
//!         plaintext: &[u8],
//!     ) -> Result<Vec<u8>> {
//!         // Hand the payload to an external XML encryption library...
//!         todo!()
//!     }
//!
//!     fn decrypt(
//!         &self,
//!         algorithm: &str,
//!         key: &ContentEncryptionKey,
//!         ciphertext: &[u8],
//!     ) -> Result<Vec<u8>> {
//!         todo!()
//!     }
//! }
//! ```
//!
//! # Security Considerations
//!
//! Implementations must authenticate the payload when decrypting and must
//! not retain the content key beyond the call.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ecdh::ContentEncryptionKey;
use crate::types::Credential;
use crate::Result;

/// Encrypts and decrypts payloads under a content encryption key.
pub trait PayloadCipher: Send + Sync {
    /// Encrypts `plaintext` with the block encryption algorithm `algorithm`.
    ///
    /// # Arguments
    /// * `algorithm` - Block encryption algorithm URI
    /// * `key` - The content encryption key
    /// * `plaintext` - The payload
    ///
    /// # Returns
    /// The opaque cipher value
    ///
    /// # Errors
    /// * `Error::UnsupportedAlgorithm` - If `algorithm` is not supported
    /// * `Error::Encryption` - If encryption fails
    fn encrypt(
        &self,
        algorithm: &str,
        key: &ContentEncryptionKey,
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    /// Decrypts a cipher value produced by [`PayloadCipher::encrypt`].
    ///
    /// # Errors
    /// * `Error::UnsupportedAlgorithm` - If `algorithm` is not supported
    /// * `Error::Decryption` - If the payload fails authentication
    fn decrypt(
        &self,
        algorithm: &str,
        key: &ContentEncryptionKey,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;
}

/// Fetches credentials named by external references (`RetrievalMethod` and
/// similar URIs).
pub trait ReferenceSource: Send + Sync {
    /// Fetches the credential for `reference`.
    ///
    /// # Returns
    /// `Ok(None)` if the source does not know the reference
    ///
    /// # Errors
    /// * `Error::CredentialSource` - If the source itself fails
    fn fetch(&self, reference: &str) -> Result<Option<Arc<Credential>>>;
}

impl ReferenceSource for HashMap<String, Arc<Credential>> {
    fn fetch(&self, reference: &str) -> Result<Option<Arc<Credential>>> {
        Ok(self.get(reference).cloned())
    }
}

impl<S: ReferenceSource + ?Sized> ReferenceSource for Arc<S> {
    fn fetch(&self, reference: &str) -> Result<Option<Arc<Credential>>> {
        (**self).fetch(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NamedCurve;

    #[test]
    fn test_map_reference_source() {
        let credential = Arc::new(Credential::generate_ec(NamedCurve::P256).unwrap());
        let mut source = HashMap::new();
        source.insert("urn:example:recipient".to_string(), Arc::clone(&credential));

        let found = source.fetch("urn:example:recipient").unwrap().unwrap();
        assert!(Arc::ptr_eq(&found, &credential));
        assert!(source.fetch("urn:example:other").unwrap().is_none());

        let shared: Arc<dyn ReferenceSource> = Arc::new(source);
        assert!(shared.fetch("urn:example:recipient").unwrap().is_some());
    }
}
