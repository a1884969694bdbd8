//! Concatenation key derivation (NIST SP 800-56A, section 5.8.1).
//!
//! `K(i) = H(counter ‖ Z ‖ AlgorithmID ‖ PartyUInfo ‖ PartyVInfo ‖ [SuppPubInfo] ‖ [SuppPrivInfo])`
//! with a 32-bit big-endian counter starting at 1. The outputs are
//! concatenated and truncated to the requested number of bits.
//!
//! The fixed context fields are always present; an empty field contributes
//! zero octets, which is a different derivation input than a missing field
//! would be. Missing fields are therefore rejected as configuration errors.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use tracing::debug;
use zeroize::Zeroizing;

use crate::algorithm::{DIGEST_SHA224, DIGEST_SHA256, DIGEST_SHA384, DIGEST_SHA512};
use crate::error::{Error, Result};
use crate::utils::{base64_bytes, base64_option};

/// Upper bound on the number of hash invocations per derivation.
pub const MAX_HASH_ITERATIONS: usize = 255;

/// Digest algorithms usable with the concatenation KDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// SHA-224
    Sha224,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Looks up a digest by its XML DSig / XML Enc URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            DIGEST_SHA224 => Some(Self::Sha224),
            DIGEST_SHA256 => Some(Self::Sha256),
            DIGEST_SHA384 => Some(Self::Sha384),
            DIGEST_SHA512 => Some(Self::Sha512),
            _ => None,
        }
    }

    /// The URI of this digest.
    #[must_use]
    pub fn uri(self) -> &'static str {
        match self {
            Self::Sha224 => DIGEST_SHA224,
            Self::Sha256 => DIGEST_SHA256,
            Self::Sha384 => DIGEST_SHA384,
            Self::Sha512 => DIGEST_SHA512,
        }
    }

    /// Digest output size in bytes.
    #[must_use]
    pub fn output_size(self) -> usize {
        match self {
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

/// Parameters of a `ConcatKDF` key derivation method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcatKdfParams {
    /// Digest algorithm URI
    pub digest_method: String,

    /// `AlgorithmID` octets
    #[serde(with = "base64_bytes")]
    pub algorithm_id: Vec<u8>,

    /// `PartyUInfo` octets
    #[serde(with = "base64_bytes")]
    pub party_u_info: Vec<u8>,

    /// `PartyVInfo` octets
    #[serde(with = "base64_bytes")]
    pub party_v_info: Vec<u8>,

    /// Optional `SuppPubInfo` octets
    #[serde(
        default,
        with = "base64_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub supp_pub_info: Option<Vec<u8>>,

    /// Optional `SuppPrivInfo` octets
    #[serde(
        default,
        with = "base64_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub supp_priv_info: Option<Vec<u8>>,
}

impl ConcatKdfParams {
    /// Creates parameters with all fixed fields given explicitly.
    #[must_use]
    pub fn new(
        digest_method: impl Into<String>,
        algorithm_id: Vec<u8>,
        party_u_info: Vec<u8>,
        party_v_info: Vec<u8>,
    ) -> Self {
        Self {
            digest_method: digest_method.into(),
            algorithm_id,
            party_u_info,
            party_v_info,
            supp_pub_info: None,
            supp_priv_info: None,
        }
    }

    /// Starts a builder that insists on every fixed field being set.
    #[must_use]
    pub fn builder() -> ConcatKdfParamsBuilder {
        ConcatKdfParamsBuilder::default()
    }

    /// Resolves the digest algorithm.
    ///
    /// # Errors
    /// * `Error::UnsupportedAlgorithm` - If the digest URI is unknown
    pub fn digest(&self) -> Result<DigestAlgorithm> {
        DigestAlgorithm::from_uri(&self.digest_method).ok_or_else(|| {
            Error::UnsupportedAlgorithm(format!(
                "Digest method {} is not supported for ConcatKDF",
                self.digest_method
            ))
        })
    }

    /// The `OtherInfo` octets fed to the hash after the shared secret.
    fn other_info(&self) -> Vec<u8> {
        let mut info = Vec::with_capacity(
            self.algorithm_id.len() + self.party_u_info.len() + self.party_v_info.len(),
        );
        info.extend_from_slice(&self.algorithm_id);
        info.extend_from_slice(&self.party_u_info);
        info.extend_from_slice(&self.party_v_info);
        if let Some(supp_pub_info) = &self.supp_pub_info {
            info.extend_from_slice(supp_pub_info);
        }
        if let Some(supp_priv_info) = &self.supp_priv_info {
            info.extend_from_slice(supp_priv_info);
        }
        info
    }
}

/// Builder for [`ConcatKdfParams`].
#[derive(Debug, Clone, Default)]
pub struct ConcatKdfParamsBuilder {
    digest_method: Option<String>,
    algorithm_id: Option<Vec<u8>>,
    party_u_info: Option<Vec<u8>>,
    party_v_info: Option<Vec<u8>>,
    supp_pub_info: Option<Vec<u8>>,
    supp_priv_info: Option<Vec<u8>>,
}

impl ConcatKdfParamsBuilder {
    /// Sets the digest algorithm URI.
    #[must_use]
    pub fn digest_method(mut self, uri: impl Into<String>) -> Self {
        self.digest_method = Some(uri.into());
        self
    }

    /// Sets `AlgorithmID`.
    #[must_use]
    pub fn algorithm_id(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.algorithm_id = Some(value.into());
        self
    }

    /// Sets `PartyUInfo`.
    #[must_use]
    pub fn party_u_info(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.party_u_info = Some(value.into());
        self
    }

    /// Sets `PartyVInfo`.
    #[must_use]
    pub fn party_v_info(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.party_v_info = Some(value.into());
        self
    }

    /// Sets `SuppPubInfo`.
    #[must_use]
    pub fn supp_pub_info(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.supp_pub_info = Some(value.into());
        self
    }

    /// Sets `SuppPrivInfo`.
    #[must_use]
    pub fn supp_priv_info(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.supp_priv_info = Some(value.into());
        self
    }

    /// Builds the parameters.
    ///
    /// # Errors
    /// * `Error::InvalidParameter` - If the digest or a fixed context field was never set
    pub fn build(self) -> Result<ConcatKdfParams> {
        fn required<T>(value: Option<T>, name: &str) -> Result<T> {
            value.ok_or_else(|| {
                Error::InvalidParameter(format!("ConcatKDF parameter {name} is absent"))
            })
        }

        Ok(ConcatKdfParams {
            digest_method: required(self.digest_method, "DigestMethod")?,
            algorithm_id: required(self.algorithm_id, "AlgorithmID")?,
            party_u_info: required(self.party_u_info, "PartyUInfo")?,
            party_v_info: required(self.party_v_info, "PartyVInfo")?,
            supp_pub_info: self.supp_pub_info,
            supp_priv_info: self.supp_priv_info,
        })
    }
}

/// Derives `output_bits` bits of keying material from a shared secret.
///
/// # Errors
/// * `Error::InvalidParameter` - If `output_bits` is zero or would need more
///   than [`MAX_HASH_ITERATIONS`] hash blocks
/// * `Error::UnsupportedAlgorithm` - If the digest method is unknown
pub fn concat_kdf(
    shared_secret: &[u8],
    params: &ConcatKdfParams,
    output_bits: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if output_bits == 0 {
        return Err(Error::InvalidParameter(
            "ConcatKDF output length must be positive".to_string(),
        ));
    }
    let digest = params.digest()?;
    let output_len = output_bits.div_ceil(8);
    let iterations = output_len.div_ceil(digest.output_size());
    if iterations > MAX_HASH_ITERATIONS {
        return Err(Error::InvalidParameter(format!(
            "ConcatKDF output of {output_bits} bits exceeds {MAX_HASH_ITERATIONS} {} blocks",
            digest.uri()
        )));
    }

    let other_info = params.other_info();
    debug!(
        digest = digest.uri(),
        output_bits, iterations, "Deriving key with ConcatKDF"
    );

    let mut output = Zeroizing::new(match digest {
        DigestAlgorithm::Sha224 => derive::<Sha224>(shared_secret, &other_info, iterations),
        DigestAlgorithm::Sha256 => derive::<Sha256>(shared_secret, &other_info, iterations),
        DigestAlgorithm::Sha384 => derive::<Sha384>(shared_secret, &other_info, iterations),
        DigestAlgorithm::Sha512 => derive::<Sha512>(shared_secret, &other_info, iterations),
    });
    output.truncate(output_len);

    let trailing = output_bits % 8;
    if trailing != 0 {
        if let Some(last) = output.last_mut() {
            *last &= 0xff_u8 << (8 - trailing);
        }
    }
    Ok(output)
}

fn derive<D: Digest>(shared_secret: &[u8], other_info: &[u8], iterations: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(iterations * <D as Digest>::output_size());
    for counter in (1u32..).take(iterations) {
        let mut hasher = D::new();
        hasher.update(counter.to_be_bytes());
        hasher.update(shared_secret);
        hasher.update(other_info);
        output.extend_from_slice(&hasher.finalize());
    }
    output
}
