//! Credential and key-info type definitions.
//!
//! A [`Credential`] carries its key family explicitly through [`PublicKey`],
//! so capability checks are exhaustive matches rather than inspections of a
//! textual algorithm name.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use crate::ecdh::key_agreement::{decode_spki, normalize_public_point, public_point, random_scalar};
use crate::ecdh::parameters::{AgreementMethod, KeyAgreementParameters};
use crate::error::{Error, Result};
use crate::utils::{base64_bytes, base64_seq};

/// OID of NIST P-256 (secp256r1).
pub const OID_P256: &str = "1.2.840.10045.3.1.7";
/// OID of NIST P-384 (secp384r1).
pub const OID_P384: &str = "1.3.132.0.34";
/// OID of NIST P-521 (secp521r1).
pub const OID_P521: &str = "1.3.132.0.35";

/// A named elliptic curve, as identified in an `ECKeyValue`.
///
/// Only the NIST curves support key agreement. Keys on any other curve can
/// still be represented, and are rejected with [`Error::CurveMismatch`] once
/// key agreement is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NamedCurve {
    /// NIST P-256
    P256,
    /// NIST P-384
    P384,
    /// NIST P-521
    P521,
    /// Any other named curve, identified by its OID.
    Other(String),
}

impl NamedCurve {
    /// Returns the dotted OID of the curve.
    #[must_use]
    pub fn oid(&self) -> &str {
        match self {
            Self::P256 => OID_P256,
            Self::P384 => OID_P384,
            Self::P521 => OID_P521,
            Self::Other(oid) => oid,
        }
    }

    /// Returns the `urn:oid:` URI used for the curve in XML Signature 1.1.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("urn:oid:{}", self.oid())
    }

    /// Parses a curve from a `urn:oid:` URI or a bare dotted OID.
    #[must_use]
    pub fn from_uri(uri: &str) -> Self {
        let oid = uri.strip_prefix("urn:oid:").unwrap_or(uri);
        match oid {
            OID_P256 => Self::P256,
            OID_P384 => Self::P384,
            OID_P521 => Self::P521,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns `true` if ECDH is implemented for this curve.
    #[must_use]
    pub fn supports_key_agreement(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for NamedCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P256 => write!(f, "P-256"),
            Self::P384 => write!(f, "P-384"),
            Self::P521 => write!(f, "P-521"),
            Self::Other(oid) => write!(f, "urn:oid:{oid}"),
        }
    }
}

impl From<String> for NamedCurve {
    fn from(uri: String) -> Self {
        Self::from_uri(&uri)
    }
}

impl From<NamedCurve> for String {
    fn from(curve: NamedCurve) -> Self {
        curve.uri()
    }
}

/// The key family of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// Elliptic curve
    Ec,
    /// RSA
    Rsa,
    /// DSA
    Dsa,
    /// Symmetric (secret) key
    Symmetric,
}

/// An elliptic-curve public key.
///
/// For supported curves the point is validated on construction and kept in
/// uncompressed SEC1 form, so two encodings of the same point compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcPublicKey {
    curve: NamedCurve,
    point: Vec<u8>,
}

impl EcPublicKey {
    /// Creates a public key from a SEC1-encoded point.
    ///
    /// # Errors
    /// * `Error::InvalidParameter` - If the point is not a valid, non-identity point on `curve`
    pub fn from_sec1_bytes(curve: NamedCurve, bytes: &[u8]) -> Result<Self> {
        if !curve.supports_key_agreement() {
            return Ok(Self {
                curve,
                point: bytes.to_vec(),
            });
        }
        let point = normalize_public_point(&curve, bytes).map_err(|reason| {
            Error::InvalidParameter(format!("Invalid {curve} public key: {reason}"))
        })?;
        Ok(Self { curve, point })
    }

    /// Creates a public key from a DER-encoded `SubjectPublicKeyInfo`.
    ///
    /// # Errors
    /// * `Error::InvalidParameter` - If the structure is not an EC key on a supported curve
    pub fn from_public_key_der(der: &[u8]) -> Result<Self> {
        let (curve, point) = decode_spki(der).ok_or_else(|| {
            Error::InvalidParameter(
                "Not a SubjectPublicKeyInfo for a supported EC curve".to_string(),
            )
        })?;
        Ok(Self { curve, point })
    }

    /// The curve of this key.
    #[must_use]
    pub fn curve(&self) -> &NamedCurve {
        &self.curve
    }

    /// The point encoding (uncompressed SEC1 for supported curves).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.point
    }
}

/// An elliptic-curve private key on a supported curve.
#[derive(Clone)]
pub struct EcPrivateKey {
    curve: NamedCurve,
    scalar: Zeroizing<Vec<u8>>,
}

impl EcPrivateKey {
    /// Creates a private key from its big-endian scalar.
    ///
    /// # Errors
    /// * `Error::CurveMismatch` - If the curve does not support key agreement
    /// * `Error::InvalidParameter` - If the scalar is zero or out of range
    pub fn from_bytes(curve: NamedCurve, scalar: &[u8]) -> Result<Self> {
        if !curve.supports_key_agreement() {
            return Err(Error::CurveMismatch(format!(
                "Private keys on {curve} are not supported"
            )));
        }
        public_point(&curve, scalar).map_err(|reason| {
            Error::InvalidParameter(format!("Invalid {curve} private key: {reason}"))
        })?;
        Ok(Self {
            curve,
            scalar: Zeroizing::new(scalar.to_vec()),
        })
    }

    /// Generates a new random private key.
    ///
    /// # Errors
    /// * `Error::CurveMismatch` - If the curve does not support key agreement
    pub fn generate(curve: NamedCurve) -> Result<Self> {
        let scalar = random_scalar(&curve)?;
        Ok(Self { curve, scalar })
    }

    /// The curve of this key.
    #[must_use]
    pub fn curve(&self) -> &NamedCurve {
        &self.curve
    }

    /// Derives the matching public key.
    ///
    /// # Errors
    /// * `Error::InvalidParameter` - If the scalar is invalid for the curve
    pub fn public_key(&self) -> Result<EcPublicKey> {
        let point = public_point(&self.curve, &self.scalar)
            .map_err(|reason| Error::InvalidParameter(reason.to_string()))?;
        Ok(EcPublicKey {
            curve: self.curve.clone(),
            point,
        })
    }

    pub(crate) fn scalar(&self) -> &[u8] {
        &self.scalar
    }
}

impl fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcPrivateKey")
            .field("curve", &self.curve)
            .field("scalar", &"[REDACTED]")
            .finish()
    }
}

/// A public key, tagged with its key family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// Elliptic-curve public key
    Ec(EcPublicKey),
    /// RSA public key (DER `SubjectPublicKeyInfo`, not interpreted)
    Rsa(Vec<u8>),
    /// DSA public key (DER `SubjectPublicKeyInfo`, not interpreted)
    Dsa(Vec<u8>),
}

impl PublicKey {
    /// The key family of this public key.
    #[must_use]
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::Ec(_) => KeyFamily::Ec,
            Self::Rsa(_) => KeyFamily::Rsa,
            Self::Dsa(_) => KeyFamily::Dsa,
        }
    }
}

/// A credential: a public key, and optionally a private key, a secret key,
/// a certificate chain and the key agreement parameters to use with it as a peer.
#[derive(Clone, Default)]
pub struct Credential {
    public_key: Option<PublicKey>,
    private_key: Option<EcPrivateKey>,
    secret_key: Option<Zeroizing<Vec<u8>>>,
    certificate_chain: Vec<Vec<u8>>,
    key_agreement: Option<KeyAgreementParameters>,
}

impl Credential {
    /// Creates a credential holding only a public key.
    #[must_use]
    pub fn from_public_key(public_key: PublicKey) -> Self {
        Self {
            public_key: Some(public_key),
            ..Self::default()
        }
    }

    /// Creates a credential from an EC private key; the public key is derived.
    ///
    /// # Errors
    /// * `Error::InvalidParameter` - If the public key cannot be derived
    pub fn from_ec_private_key(private_key: EcPrivateKey) -> Result<Self> {
        let public_key = private_key.public_key()?;
        Ok(Self {
            public_key: Some(PublicKey::Ec(public_key)),
            private_key: Some(private_key),
            ..Self::default()
        })
    }

    /// Generates a fresh EC key pair credential.
    ///
    /// # Errors
    /// * `Error::CurveMismatch` - If the curve does not support key agreement
    pub fn generate_ec(curve: NamedCurve) -> Result<Self> {
        Self::from_ec_private_key(EcPrivateKey::generate(curve)?)
    }

    /// Creates a symmetric key credential.
    #[must_use]
    pub fn symmetric(key: Vec<u8>) -> Self {
        Self {
            secret_key: Some(Zeroizing::new(key)),
            ..Self::default()
        }
    }

    /// Attaches a certificate chain (entity certificate first, DER encoded).
    #[must_use]
    pub fn with_certificate_chain(mut self, chain: Vec<Vec<u8>>) -> Self {
        self.certificate_chain = chain;
        self
    }

    /// Attaches the key agreement parameters to use when this is the peer credential.
    #[must_use]
    pub fn with_key_agreement_parameters(mut self, parameters: KeyAgreementParameters) -> Self {
        self.key_agreement = Some(parameters);
        self
    }

    /// Returns a copy without private or secret key material.
    #[must_use]
    pub fn to_public(&self) -> Self {
        Self {
            public_key: self.public_key.clone(),
            private_key: None,
            secret_key: None,
            certificate_chain: self.certificate_chain.clone(),
            key_agreement: self.key_agreement.clone(),
        }
    }

    /// The public key, if any.
    #[must_use]
    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref()
    }

    /// The public key if it is an EC key.
    #[must_use]
    pub fn ec_public_key(&self) -> Option<&EcPublicKey> {
        match &self.public_key {
            Some(PublicKey::Ec(key)) => Some(key),
            _ => None,
        }
    }

    /// The EC private key, if any.
    #[must_use]
    pub fn ec_private_key(&self) -> Option<&EcPrivateKey> {
        self.private_key.as_ref()
    }

    /// The symmetric key bytes, if any.
    #[must_use]
    pub fn secret_key(&self) -> Option<&[u8]> {
        self.secret_key.as_deref().map(Vec::as_slice)
    }

    /// The entity certificate (first element of the chain), if any.
    #[must_use]
    pub fn entity_certificate(&self) -> Option<&[u8]> {
        self.certificate_chain.first().map(Vec::as_slice)
    }

    /// The certificate chain.
    #[must_use]
    pub fn certificate_chain(&self) -> &[Vec<u8>] {
        &self.certificate_chain
    }

    /// The attached key agreement parameters, if any.
    #[must_use]
    pub fn key_agreement_parameters(&self) -> Option<&KeyAgreementParameters> {
        self.key_agreement.as_ref()
    }

    /// The key family: that of the public key, or symmetric for a secret-key credential.
    #[must_use]
    pub fn key_family(&self) -> Option<KeyFamily> {
        match (&self.public_key, &self.secret_key) {
            (Some(public_key), _) => Some(public_key.family()),
            (None, Some(_)) => Some(KeyFamily::Symmetric),
            (None, None) => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key)
            .field(
                "secret_key",
                &self.secret_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("certificates", &self.certificate_chain.len())
            .field("key_agreement", &self.key_agreement)
            .finish()
    }
}

/// An embedded key value hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyValueHint {
    /// An `ECKeyValue`: named curve and SEC1 point.
    Ec {
        /// The named curve
        curve: NamedCurve,
        /// The SEC1-encoded point
        #[serde(with = "base64_bytes")]
        public_key: Vec<u8>,
    },
    /// A `DEREncodedKeyValue`: DER `SubjectPublicKeyInfo`.
    DerEncoded {
        /// The DER bytes
        #[serde(with = "base64_bytes")]
        spki: Vec<u8>,
    },
}

impl KeyValueHint {
    /// Builds the hint describing an EC public key.
    #[must_use]
    pub fn from_ec_public_key(key: &EcPublicKey) -> Self {
        Self::Ec {
            curve: key.curve().clone(),
            public_key: key.as_bytes().to_vec(),
        }
    }

    /// Decodes the hint into an EC public key.
    ///
    /// # Errors
    /// * `Error::InvalidParameter` - If the embedded value is not a valid EC key
    pub fn to_ec_public_key(&self) -> Result<EcPublicKey> {
        match self {
            Self::Ec { curve, public_key } => {
                EcPublicKey::from_sec1_bytes(curve.clone(), public_key)
            }
            Self::DerEncoded { spki } => EcPublicKey::from_public_key_der(spki),
        }
    }
}

/// Key-identifying hints extracted from a `KeyInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfoHints {
    /// Embedded key values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_values: Vec<KeyValueHint>,

    /// Embedded certificates (DER)
    #[serde(default, with = "base64_seq", skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<Vec<u8>>,

    /// External references (URIs)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    /// Key agreement metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_method: Option<Box<AgreementMethod>>,
}

impl KeyInfoHints {
    /// Returns `true` if no hint of any kind is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key_values.is_empty()
            && self.certificates.is_empty()
            && self.references.is_empty()
            && self.agreement_method.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::EncodePublicKey;

    #[test]
    fn test_named_curve_uri() {
        assert_eq!(NamedCurve::P256.uri(), "urn:oid:1.2.840.10045.3.1.7");
        assert_eq!(NamedCurve::from_uri("urn:oid:1.3.132.0.34"), NamedCurve::P384);
        assert_eq!(NamedCurve::from_uri("1.3.132.0.35"), NamedCurve::P521);
        assert_eq!(
            NamedCurve::from_uri("urn:oid:1.3.36.3.3.2.8.1.1.7"),
            NamedCurve::Other("1.3.36.3.3.2.8.1.1.7".to_string())
        );
        assert!(!NamedCurve::Other("1.3.132.0.10".into()).supports_key_agreement());
    }

    #[test]
    fn test_named_curve_serde() {
        let json = serde_json::to_string(&NamedCurve::P256).unwrap();
        assert_eq!(json, "\"urn:oid:1.2.840.10045.3.1.7\"");
        let curve: NamedCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(curve, NamedCurve::P256);
    }

    #[test]
    fn test_key_family() {
        let ec = Credential::generate_ec(NamedCurve::P256).unwrap();
        assert_eq!(ec.key_family(), Some(KeyFamily::Ec));
        assert_eq!(
            Credential::from_public_key(PublicKey::Rsa(vec![0x30])).key_family(),
            Some(KeyFamily::Rsa)
        );
        assert_eq!(
            Credential::from_public_key(PublicKey::Dsa(vec![0x30])).key_family(),
            Some(KeyFamily::Dsa)
        );
        assert_eq!(
            Credential::symmetric(vec![0; 16]).key_family(),
            Some(KeyFamily::Symmetric)
        );
        assert_eq!(Credential::default().key_family(), None);
    }

    #[test]
    fn test_public_key_normalization() {
        let private_key = EcPrivateKey::generate(NamedCurve::P256).unwrap();
        let public_key = private_key.public_key().unwrap();
        assert_eq!(public_key.as_bytes().len(), 65);
        assert_eq!(public_key.as_bytes()[0], 0x04);

        let p = p256::PublicKey::from_sec1_bytes(public_key.as_bytes()).unwrap();
        let compressed = p256::elliptic_curve::sec1::ToEncodedPoint::to_encoded_point(&p, true);
        let from_compressed =
            EcPublicKey::from_sec1_bytes(NamedCurve::P256, compressed.as_bytes()).unwrap();
        assert_eq!(from_compressed, public_key);

        let der = p.to_public_key_der().unwrap();
        let from_der = EcPublicKey::from_public_key_der(der.as_bytes()).unwrap();
        assert_eq!(from_der, public_key);
    }

    #[test]
    fn test_invalid_points_rejected() {
        let mut off_curve = vec![0x04];
        off_curve.extend_from_slice(&[1u8; 64]);
        assert!(matches!(
            EcPublicKey::from_sec1_bytes(NamedCurve::P256, &off_curve),
            Err(Error::InvalidParameter(_))
        ));
        assert!(EcPublicKey::from_sec1_bytes(NamedCurve::P256, &[0x00]).is_err());
        assert!(EcPublicKey::from_public_key_der(&[0x30, 0x00]).is_err());
    }

    #[test]
    fn test_private_key_validation() {
        assert!(EcPrivateKey::from_bytes(NamedCurve::P256, &[0u8; 32]).is_err());
        assert!(matches!(
            EcPrivateKey::from_bytes(NamedCurve::Other("1.3.132.0.10".into()), &[1u8; 32]),
            Err(Error::CurveMismatch(_))
        ));
        let key = EcPrivateKey::from_bytes(NamedCurve::P384, &[7u8; 48]).unwrap();
        assert!(!format!("{key:?}").contains("07"));
    }

    #[test]
    fn test_to_public_strips_secrets() {
        let credential = Credential::generate_ec(NamedCurve::P384)
            .unwrap()
            .with_certificate_chain(vec![vec![1, 2, 3]]);
        let public = credential.to_public();
        assert!(public.ec_private_key().is_none());
        assert_eq!(public.ec_public_key(), credential.ec_public_key());
        assert_eq!(public.entity_certificate(), Some(&[1u8, 2, 3][..]));
        assert_eq!(public.certificate_chain(), &[vec![1u8, 2, 3]][..]);
        assert!(public.secret_key().is_none());

        let symmetric = Credential::symmetric(vec![9; 16]);
        assert_eq!(symmetric.secret_key(), Some(&[9u8; 16][..]));
        assert!(symmetric.to_public().secret_key().is_none());
        assert!(symmetric.certificate_chain().is_empty());
    }

    #[test]
    fn test_key_info_hints_serde() {
        let hints = KeyInfoHints {
            key_values: vec![KeyValueHint::Ec {
                curve: NamedCurve::P256,
                public_key: vec![4, 1],
            }],
            references: vec!["https://keys.example.org/recipient".to_string()],
            ..KeyInfoHints::default()
        };
        let json = serde_json::to_value(&hints).unwrap();
        assert_eq!(json["key_values"][0]["type"], "ec");
        assert!(json.get("certificates").is_none());
        let back: KeyInfoHints = serde_json::from_value(json).unwrap();
        assert_eq!(back, hints);
        assert!(KeyInfoHints::default().is_empty());
        assert!(!back.is_empty());
    }
}
