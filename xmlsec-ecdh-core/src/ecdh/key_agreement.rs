//! Elliptic-curve Diffie-Hellman for the NIST curves.
//!
//! The ephemeral side of ECDH-ES is an [`EphemeralKeyPair`]: it can be used for
//! exactly one agreement, which consumes it, and its scalar is wiped on drop.

use p256::elliptic_curve::{
    ecdh::diffie_hellman,
    pkcs8::DecodePublicKey,
    sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint},
    AffinePoint, CurveArithmetic, FieldBytes, FieldBytesSize, PublicKey, SecretKey,
};
use p256::NistP256;
use p384::NistP384;
use p521::NistP521;
use rand_core::OsRng;
use std::fmt;
use tracing::trace;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::types::{EcPrivateKey, EcPublicKey, NamedCurve};

/// An ECDH shared secret `Z`, wiped on drop.
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    /// Gets the raw secret bytes.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

/// A single-use ephemeral key pair.
///
/// The private scalar never leaves this value. [`EphemeralKeyPair::agree`]
/// consumes the pair, so it cannot be reused for a second agreement.
pub struct EphemeralKeyPair {
    secret: Zeroizing<Vec<u8>>,
    public_key: EcPublicKey,
}

impl EphemeralKeyPair {
    /// Generates a fresh key pair on `curve`.
    ///
    /// # Errors
    /// * `Error::CurveMismatch` - If the curve does not support key agreement
    pub fn generate(curve: &NamedCurve) -> Result<Self> {
        let secret = random_scalar(curve)?;
        let point = public_point(curve, &secret)
            .map_err(|reason| Error::InvalidParameter(reason.to_string()))?;
        trace!(%curve, "Generated ephemeral key pair");
        Ok(Self {
            secret,
            public_key: EcPublicKey::from_sec1_bytes(curve.clone(), &point)?,
        })
    }

    /// The public half, to be sent to the recipient.
    #[must_use]
    pub fn public_key(&self) -> &EcPublicKey {
        &self.public_key
    }

    /// Computes the shared secret with the peer's static public key.
    ///
    /// # Errors
    /// * `Error::CurveMismatch` - If the peer key is on another curve
    pub fn agree(self, peer: &EcPublicKey) -> Result<SharedSecret> {
        let curve = self.public_key.curve();
        if peer.curve() != curve {
            return Err(Error::CurveMismatch(format!(
                "Ephemeral key is on {curve}, peer key is on {}",
                peer.curve()
            )));
        }
        agree_raw(curve, &self.secret, peer.as_bytes()).map_err(|failure| match failure {
            AgreementFailure::PrivateKey(reason) => Error::InvalidParameter(reason),
            AgreementFailure::PublicKey(reason) => Error::UnsupportedCredential(format!(
                "Invalid peer public key: {reason}"
            )),
            AgreementFailure::Curve => Error::CurveMismatch(curve.to_string()),
        })
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Computes the shared secret between our static private key and a peer public key.
///
/// # Errors
/// * `Error::CurveMismatch` - If the keys are on different curves
/// * `Error::UnsupportedCredential` - If the private key is unusable
/// * `Error::MalformedMetadata` - If the public point is invalid
pub(crate) fn static_agreement(own: &EcPrivateKey, peer: &EcPublicKey) -> Result<SharedSecret> {
    if own.curve() != peer.curve() {
        return Err(Error::CurveMismatch(format!(
            "Static key is on {}, ephemeral key is on {}",
            own.curve(),
            peer.curve()
        )));
    }
    agree_raw(own.curve(), own.scalar(), peer.as_bytes()).map_err(|failure| match failure {
        AgreementFailure::PrivateKey(reason) => {
            Error::UnsupportedCredential(format!("Invalid private key: {reason}"))
        }
        AgreementFailure::PublicKey(reason) => Error::MalformedMetadata(reason),
        AgreementFailure::Curve => Error::CurveMismatch(own.curve().to_string()),
    })
}

enum AgreementFailure {
    PrivateKey(String),
    PublicKey(String),
    Curve,
}

fn agree_raw(
    curve: &NamedCurve,
    scalar: &[u8],
    point: &[u8],
) -> std::result::Result<SharedSecret, AgreementFailure> {
    match curve {
        NamedCurve::P256 => agree_on::<NistP256>(scalar, point),
        NamedCurve::P384 => agree_on::<NistP384>(scalar, point),
        NamedCurve::P521 => agree_on::<NistP521>(scalar, point),
        NamedCurve::Other(_) => Err(AgreementFailure::Curve),
    }
}

fn agree_on<C>(scalar: &[u8], point: &[u8]) -> std::result::Result<SharedSecret, AgreementFailure>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let secret = SecretKey::<C>::from_slice(scalar)
        .map_err(|e| AgreementFailure::PrivateKey(e.to_string()))?;
    let public = PublicKey::<C>::from_sec1_bytes(point)
        .map_err(|_| AgreementFailure::PublicKey("Point is not on the curve".to_string()))?;
    let shared = diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    Ok(SharedSecret(Zeroizing::new(
        shared.raw_secret_bytes().as_slice().to_vec(),
    )))
}

/// Validates a SEC1 point and returns its uncompressed encoding.
///
/// Off-curve points and the identity are rejected.
pub(crate) fn normalize_public_point(
    curve: &NamedCurve,
    bytes: &[u8],
) -> std::result::Result<Vec<u8>, &'static str> {
    match curve {
        NamedCurve::P256 => normalize_on::<NistP256>(bytes),
        NamedCurve::P384 => normalize_on::<NistP384>(bytes),
        NamedCurve::P521 => normalize_on::<NistP521>(bytes),
        NamedCurve::Other(_) => Err("unsupported curve"),
    }
}

fn normalize_on<C>(bytes: &[u8]) -> std::result::Result<Vec<u8>, &'static str>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let public =
        PublicKey::<C>::from_sec1_bytes(bytes).map_err(|_| "point is not on the curve")?;
    Ok(public.to_encoded_point(false).as_bytes().to_vec())
}

/// Derives the uncompressed public point for a private scalar.
pub(crate) fn public_point(
    curve: &NamedCurve,
    scalar: &[u8],
) -> std::result::Result<Vec<u8>, &'static str> {
    match curve {
        NamedCurve::P256 => public_point_on::<NistP256>(scalar),
        NamedCurve::P384 => public_point_on::<NistP384>(scalar),
        NamedCurve::P521 => public_point_on::<NistP521>(scalar),
        NamedCurve::Other(_) => Err("unsupported curve"),
    }
}

fn public_point_on<C>(scalar: &[u8]) -> std::result::Result<Vec<u8>, &'static str>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let secret = SecretKey::<C>::from_slice(scalar).map_err(|_| "scalar is out of range")?;
    Ok(secret.public_key().to_encoded_point(false).as_bytes().to_vec())
}

/// Generates a random private scalar on `curve`.
pub(crate) fn random_scalar(curve: &NamedCurve) -> Result<Zeroizing<Vec<u8>>> {
    match curve {
        NamedCurve::P256 => Ok(random_scalar_on::<NistP256>()),
        NamedCurve::P384 => Ok(random_scalar_on::<NistP384>()),
        NamedCurve::P521 => Ok(random_scalar_on::<NistP521>()),
        NamedCurve::Other(_) => Err(Error::CurveMismatch(format!(
            "Key agreement is not supported on {curve}"
        ))),
    }
}

fn random_scalar_on<C: CurveArithmetic>() -> Zeroizing<Vec<u8>> {
    let bytes: Zeroizing<FieldBytes<C>> =
        Zeroizing::new(SecretKey::<C>::random(&mut OsRng).to_bytes());
    Zeroizing::new(bytes.to_vec())
}

/// Decodes a DER `SubjectPublicKeyInfo` for any supported curve.
pub(crate) fn decode_spki(der: &[u8]) -> Option<(NamedCurve, Vec<u8>)> {
    decode_spki_on::<NistP256>(der)
        .map(|point| (NamedCurve::P256, point))
        .or_else(|| decode_spki_on::<NistP384>(der).map(|point| (NamedCurve::P384, point)))
        .or_else(|| decode_spki_on::<NistP521>(der).map(|point| (NamedCurve::P521, point)))
}

fn decode_spki_on<C>(der: &[u8]) -> Option<Vec<u8>>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
    PublicKey<C>: DecodePublicKey,
{
    PublicKey::<C>::from_public_key_der(der)
        .ok()
        .map(|public| public.to_encoded_point(false).as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVES: [NamedCurve; 3] = [NamedCurve::P256, NamedCurve::P384, NamedCurve::P521];

    // JWA (RFC 7518) Appendix C key pairs.
    const ALICE_D: &str = "d3f3716913d4310a0026de741b3f18893afc8114f0c84682ba677e313a13988a";
    const BOB_D: &str = "5449836690d75caf29f0dd029ddb31b3ddb8aba9d2d515c5012465e817d4a9dc";
    const BOB_PUB: &str = "04c1e349cb61ec70248ce801034c3834e1b88ebe1161cb25af38741f785fcfc4c4\
                           7bc96708ef80952b53f8d2555fe72b841ed04588628b1d378a594939500ec9c9";
    const ALICE_PUB: &str = "04808d060082c176eed3e776a4ac598cc8672c1779f974eecc9b03411ca5b9495d\
                             48b5bfc527dfce53d6ac7115237d031ccff87a0570b77350a9e503ee7305a69b";
    const Z: &str = "9e56d91d817135d372834283bf84269cfb316ea3da806a48f6daa7798cfe90c4";

    #[test]
    fn test_static_agreement_known_vector() {
        let alice = EcPrivateKey::from_bytes(NamedCurve::P256, &hex::decode(ALICE_D).unwrap())
            .unwrap();
        let bob_public =
            EcPublicKey::from_sec1_bytes(NamedCurve::P256, &hex::decode(BOB_PUB).unwrap())
                .unwrap();
        let z = static_agreement(&alice, &bob_public).unwrap();
        assert_eq!(hex::encode(z.as_bytes()), Z);

        let bob = EcPrivateKey::from_bytes(NamedCurve::P256, &hex::decode(BOB_D).unwrap())
            .unwrap();
        assert_eq!(hex::encode(bob.public_key().unwrap().as_bytes()), BOB_PUB);
        let alice_public =
            EcPublicKey::from_sec1_bytes(NamedCurve::P256, &hex::decode(ALICE_PUB).unwrap())
                .unwrap();
        let z = static_agreement(&bob, &alice_public).unwrap();
        assert_eq!(hex::encode(z.as_bytes()), Z);
    }

    #[test]
    fn test_ephemeral_static_agreement() {
        for curve in CURVES {
            let recipient = EcPrivateKey::generate(curve.clone()).unwrap();
            let recipient_public = recipient.public_key().unwrap();

            let ephemeral = EphemeralKeyPair::generate(&curve).unwrap();
            let ephemeral_public = ephemeral.public_key().clone();
            let sender_z = ephemeral.agree(&recipient_public).unwrap();

            let recipient_z = static_agreement(&recipient, &ephemeral_public).unwrap();
            assert_eq!(sender_z.as_bytes(), recipient_z.as_bytes());
        }
    }

    #[test]
    fn test_ephemeral_keys_are_fresh() {
        let first = EphemeralKeyPair::generate(&NamedCurve::P256).unwrap();
        let second = EphemeralKeyPair::generate(&NamedCurve::P256).unwrap();
        assert_ne!(first.public_key(), second.public_key());
    }

    #[test]
    fn test_random_scalar_sizes() {
        for (curve, len) in [
            (NamedCurve::P256, 32),
            (NamedCurve::P384, 48),
            (NamedCurve::P521, 66),
        ] {
            let scalar = random_scalar(&curve).unwrap();
            assert_eq!(scalar.len(), len);
            assert!(EcPrivateKey::from_bytes(curve, &scalar).is_ok());
        }
        assert!(matches!(
            random_scalar(&NamedCurve::Other("1.3.132.0.10".into())),
            Err(Error::CurveMismatch(_))
        ));
    }

    #[test]
    fn test_curve_mismatch() {
        let ephemeral = EphemeralKeyPair::generate(&NamedCurve::P256).unwrap();
        let peer = EcPrivateKey::generate(NamedCurve::P384)
            .unwrap()
            .public_key()
            .unwrap();
        assert!(matches!(ephemeral.agree(&peer), Err(Error::CurveMismatch(_))));

        let own = EcPrivateKey::generate(NamedCurve::P521).unwrap();
        assert!(matches!(
            static_agreement(&own, &peer),
            Err(Error::CurveMismatch(_))
        ));

        assert!(matches!(
            EphemeralKeyPair::generate(&NamedCurve::Other("1.3.132.0.10".into())),
            Err(Error::CurveMismatch(_))
        ));
    }

    #[test]
    fn test_decode_spki_for_each_curve() {
        use p256::pkcs8::EncodePublicKey;

        let key = p384::SecretKey::random(&mut OsRng).public_key();
        let der = key.to_public_key_der().unwrap();
        let (curve, point) = decode_spki(der.as_bytes()).unwrap();
        assert_eq!(curve, NamedCurve::P384);
        assert_eq!(point, key.to_encoded_point(false).as_bytes());

        assert!(decode_spki(b"not der").is_none());
    }

    #[test]
    fn test_debug_is_redacted() {
        let ephemeral = EphemeralKeyPair::generate(&NamedCurve::P256).unwrap();
        let debug = format!("{ephemeral:?}");
        assert!(debug.contains("public_key"));
        assert!(!debug.contains("secret"));
    }
}
