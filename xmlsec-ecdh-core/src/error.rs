//! Error types for the xmlsec-ecdh-core crate.
//!
//! Every cryptographic step fails fast and aborts the whole operation. The
//! [`ErrorCategory`] of an error tells a caller whether fixing its
//! configuration and retrying makes sense, or whether the input was tampered
//! with and must not be retried as-is.

use thiserror::Error;

/// Error type for key agreement, key wrapping and the encrypter/decrypter façade.
#[derive(Debug, Error)]
pub enum Error {
    /// An algorithm identifier is unknown, or known but not usable in this role.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The credential has the wrong key family or lacks the key needed for its role.
    #[error("Unsupported credential: {0}")]
    UnsupportedCredential(String),

    /// Malformed KDF parameters, output lengths or missing configuration.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The curve is not supported, or two keys are not on the same curve.
    #[error("Curve mismatch: {0}")]
    CurveMismatch(String),

    /// The agreement metadata cannot be used (bad point encoding, inconsistent fields).
    #[error("Malformed agreement metadata: {0}")]
    MalformedMetadata(String),

    /// The key-wrap integrity check failed: tampered data or the wrong key.
    #[error("Key unwrap integrity check failed")]
    UnwrapIntegrity,

    /// Every credential resolver declined.
    #[error("No credential could be resolved: {0}")]
    CredentialNotFound(String),

    /// No encrypted key could be located for the encrypted data.
    #[error("No encrypted key found: {0}")]
    EncryptedKeyNotFound(String),

    /// The payload collaborator failed to encrypt.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// The payload collaborator failed to decrypt or authenticate the payload.
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// A credential source collaborator failed.
    #[error("Credential source error: {0}")]
    CredentialSource(String),

    /// Serialization error
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Fix the algorithm, parameter or credential setup and retry.
    Configuration,
    /// The input failed an integrity check; retrying with the same input is pointless.
    Integrity,
    /// No credential or encrypted key matched the supplied hints.
    Resolution,
    /// An external collaborator failed.
    Collaborator,
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedAlgorithm(_)
            | Self::UnsupportedCredential(_)
            | Self::InvalidParameter(_)
            | Self::CurveMismatch(_) => ErrorCategory::Configuration,
            Self::MalformedMetadata(_) | Self::UnwrapIntegrity | Self::Decryption(_) => {
                ErrorCategory::Integrity
            }
            Self::CredentialNotFound(_) | Self::EncryptedKeyNotFound(_) => {
                ErrorCategory::Resolution
            }
            Self::Encryption(_) | Self::CredentialSource(_) | Self::Serialization(_) => {
                ErrorCategory::Collaborator
            }
        }
    }

    /// Returns `true` if the error indicates tampering or an incorrect key.
    #[must_use]
    pub fn is_integrity_failure(&self) -> bool {
        self.category() == ErrorCategory::Integrity
    }
}

/// Result type for the xmlsec-ecdh-core library
pub type Result<T> = std::result::Result<T, Error>;
