//! Capability predicates for algorithms and credentials.
//!
//! These are total functions: they never fail, and an absent input is
//! simply not capable.

use super::{AlgorithmDescriptor, AlgorithmType};
use crate::types::{Credential, KeyFamily};

/// Returns `true` if `descriptor` is a symmetric key wrap algorithm.
#[must_use]
pub fn is_key_wrapping_algorithm(descriptor: Option<&AlgorithmDescriptor>) -> bool {
    descriptor.is_some_and(|d| d.algorithm_type == AlgorithmType::SymmetricKeyWrap)
}

/// Returns `true` if `credential` can act as a key agreement peer.
///
/// Only elliptic-curve public keys qualify.
#[must_use]
pub fn supports_key_agreement(credential: Option<&Credential>) -> bool {
    match credential.and_then(Credential::public_key) {
        Some(public_key) => match public_key.family() {
            KeyFamily::Ec => true,
            KeyFamily::Rsa | KeyFamily::Dsa | KeyFamily::Symmetric => false,
        },
        None => false,
    }
}
