//! Algorithm identifiers and the descriptor registry.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod support;

/// SHA-1 digest (not usable with ConcatKDF)
pub const DIGEST_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
/// SHA-224 digest
pub const DIGEST_SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#sha224";
/// SHA-256 digest
pub const DIGEST_SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
/// SHA-384 digest
pub const DIGEST_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
/// SHA-512 digest
pub const DIGEST_SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

/// AES-128-GCM block encryption
pub const AES128_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes128-gcm";
/// AES-192-GCM block encryption
pub const AES192_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes192-gcm";
/// AES-256-GCM block encryption
pub const AES256_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes256-gcm";

/// AES-128 key wrap
pub const KW_AES128: &str = "http://www.w3.org/2001/04/xmlenc#kw-aes128";
/// AES-192 key wrap
pub const KW_AES192: &str = "http://www.w3.org/2001/04/xmlenc#kw-aes192";
/// AES-256 key wrap
pub const KW_AES256: &str = "http://www.w3.org/2001/04/xmlenc#kw-aes256";

/// Elliptic-curve Diffie-Hellman, ephemeral-static
pub const ECDH_ES: &str = "http://www.w3.org/2009/xmlenc11#ECDH-ES";
/// Concatenation key derivation function
pub const CONCAT_KDF: &str = "http://www.w3.org/2009/xmlenc11#ConcatKDF";

/// RSA-OAEP key transport
pub const RSA_OAEP: &str = "http://www.w3.org/2009/xmlenc11#rsa-oaep";
/// RSA with SHA-256 signature
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
/// HMAC with SHA-256
pub const HMAC_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#hmac-sha256";

/// The role an algorithm plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmType {
    /// Message digest
    Digest,
    /// Block (data) encryption
    BlockEncryption,
    /// Symmetric key wrap
    SymmetricKeyWrap,
    /// Key agreement
    KeyAgreement,
    /// Asymmetric key transport
    KeyTransport,
    /// Key derivation
    KeyDerivation,
    /// Digital signature
    Signature,
    /// Message authentication code
    MessageAuthentication,
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Digest => "Digest",
            Self::BlockEncryption => "BlockEncryption",
            Self::SymmetricKeyWrap => "SymmetricKeyWrap",
            Self::KeyAgreement => "KeyAgreement",
            Self::KeyTransport => "KeyTransport",
            Self::KeyDerivation => "KeyDerivation",
            Self::Signature => "Signature",
            Self::MessageAuthentication => "MessageAuthentication",
        };
        f.write_str(name)
    }
}

/// Describes an algorithm known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmDescriptor {
    /// Algorithm URI
    pub uri: String,

    /// Declared algorithm type
    pub algorithm_type: AlgorithmType,

    /// Key length in bits, for algorithms with a fixed key size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_length: Option<usize>,
}

impl AlgorithmDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(uri: impl Into<String>, algorithm_type: AlgorithmType) -> Self {
        Self {
            uri: uri.into(),
            algorithm_type,
            key_length: None,
        }
    }

    /// Sets the key length in bits.
    #[must_use]
    pub fn with_key_length(mut self, bits: usize) -> Self {
        self.key_length = Some(bits);
        self
    }

    /// Key length in bytes, if the algorithm has a fixed key size.
    #[must_use]
    pub fn key_size(&self) -> Option<usize> {
        self.key_length.map(|bits| bits / 8)
    }
}

/// Registry of algorithm descriptors, looked up by URI.
///
/// The default registry holds the XML Encryption 1.1 algorithms involved in
/// ECDH-ES key agreement plus the common neighbours it must tell apart.
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    descriptors: HashMap<String, AlgorithmDescriptor>,
}

impl AlgorithmRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }

    /// Adds or replaces a descriptor.
    pub fn register(&mut self, descriptor: AlgorithmDescriptor) {
        self.descriptors.insert(descriptor.uri.clone(), descriptor);
    }

    /// Looks up a descriptor.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&AlgorithmDescriptor> {
        self.descriptors.get(uri)
    }

    /// Number of registered algorithms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        use AlgorithmType::{
            BlockEncryption, Digest, KeyAgreement, KeyDerivation, KeyTransport,
            MessageAuthentication, Signature, SymmetricKeyWrap,
        };

        let mut registry = Self::empty();
        for uri in [DIGEST_SHA1, DIGEST_SHA224, DIGEST_SHA256, DIGEST_SHA384, DIGEST_SHA512] {
            registry.register(AlgorithmDescriptor::new(uri, Digest));
        }
        for (uri, bits) in [(AES128_GCM, 128), (AES192_GCM, 192), (AES256_GCM, 256)] {
            registry.register(AlgorithmDescriptor::new(uri, BlockEncryption).with_key_length(bits));
        }
        for (uri, bits) in [(KW_AES128, 128), (KW_AES192, 192), (KW_AES256, 256)] {
            registry
                .register(AlgorithmDescriptor::new(uri, SymmetricKeyWrap).with_key_length(bits));
        }
        registry.register(AlgorithmDescriptor::new(ECDH_ES, KeyAgreement));
        registry.register(AlgorithmDescriptor::new(CONCAT_KDF, KeyDerivation));
        registry.register(AlgorithmDescriptor::new(RSA_OAEP, KeyTransport));
        registry.register(AlgorithmDescriptor::new(RSA_SHA256, Signature));
        registry.register(AlgorithmDescriptor::new(HMAC_SHA256, MessageAuthentication));
        registry
    }
}
