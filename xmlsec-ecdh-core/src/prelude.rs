//! Prelude module for commonly used types and traits.
//!
//! Import everything from this module with `use xmlsec_ecdh_core::prelude::*`.

// Re-export error types
pub use crate::error::{Error, ErrorCategory, Result};

// Re-export collaborator traits
pub use crate::plugin::{PayloadCipher, ReferenceSource};

// Re-export algorithm identifiers
pub use crate::algorithm::support::{is_key_wrapping_algorithm, supports_key_agreement};
pub use crate::algorithm::{
    AlgorithmDescriptor, AlgorithmRegistry, AlgorithmType, AES128_GCM, AES192_GCM, AES256_GCM,
    CONCAT_KDF, DIGEST_SHA256, DIGEST_SHA384, DIGEST_SHA512, ECDH_ES, KW_AES128, KW_AES192,
    KW_AES256,
};

// Re-export key types
pub use crate::types::{
    Credential, EcPrivateKey, EcPublicKey, KeyFamily, KeyInfoHints, KeyValueHint, NamedCurve,
    PublicKey,
};

// Re-export key agreement types
pub use crate::ecdh::{
    AgreementMethod, ConcatKdfParams, ContentEncryptionKey, KeyAgreementEngine,
    KeyAgreementParameters, WrappedKey,
};

// Re-export resolution and encryption
pub use crate::encryption::{
    DataEncryptionParameters, EncryptedData, EncryptedEnvelope, EncryptedKey, EncrypterConfig,
    ExtendedDecrypter, ExtendedEncrypter, KeyEncryptionParameters, KeyPlacement,
};
pub use crate::resolver::{CredentialResolutionChain, CredentialResolver};
