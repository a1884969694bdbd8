//! Credential resolution from key-info hints.
//!
//! A [`CredentialResolutionChain`] holds an ordered list of
//! [`CredentialResolver`] strategies and returns the credential of the first
//! one that recognises the hints. Resolvers decline (`Ok(None)`) on hints
//! they cannot use; an `Err` is reserved for collaborator failures and stops
//! the chain.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xmlsec_ecdh_core::resolver::CredentialResolutionChain;
//! use xmlsec_ecdh_core::types::{Credential, KeyInfoHints, NamedCurve};
//!
//! fn example(hints: &KeyInfoHints) -> xmlsec_ecdh_core::Result<()> {
//!     let own = Arc::new(Credential::generate_ec(NamedCurve::P256)?);
//!     let chain = CredentialResolutionChain::local(vec![own]);
//!
//!     match chain.resolve(hints)? {
//!         Some(credential) => println!("Resolved {credential:?}"),
//!         None => println!("No credential matched"),
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::Result;
use crate::plugin::ReferenceSource;
use crate::types::{Credential, KeyInfoHints};

/// A strategy that extracts a credential from key-info hints.
pub trait CredentialResolver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Resolves a credential.
    ///
    /// # Returns
    /// `Ok(None)` if this resolver cannot use the hints
    ///
    /// # Errors
    /// * `Error::CredentialSource` - If a collaborator fails
    fn resolve(&self, hints: &KeyInfoHints) -> Result<Option<Arc<Credential>>>;
}

/// Matches embedded key values against local key agreement credentials.
#[derive(Debug, Clone, Default)]
pub struct KeyValueCredentialResolver {
    credentials: Vec<Arc<Credential>>,
}

impl KeyValueCredentialResolver {
    /// Creates a resolver over local credentials.
    #[must_use]
    pub fn new(credentials: Vec<Arc<Credential>>) -> Self {
        Self { credentials }
    }
}

impl CredentialResolver for KeyValueCredentialResolver {
    fn name(&self) -> &'static str {
        "key-value"
    }

    fn resolve(&self, hints: &KeyInfoHints) -> Result<Option<Arc<Credential>>> {
        for hint in &hints.key_values {
            let key = match hint.to_ec_public_key() {
                Ok(key) => key,
                Err(e) => {
                    trace!("Skipping unusable key value: {e}");
                    continue;
                }
            };
            let found = self.credentials.iter().find(|credential| {
                can_agree(credential) && credential.ec_public_key() == Some(&key)
            });
            if let Some(credential) = found {
                return Ok(Some(Arc::clone(credential)));
            }
        }
        Ok(None)
    }
}

/// Matches embedded certificates against the entity certificates of local
/// key agreement credentials.
#[derive(Debug, Clone, Default)]
pub struct CertificateCredentialResolver {
    credentials: Vec<Arc<Credential>>,
}

impl CertificateCredentialResolver {
    /// Creates a resolver over local credentials.
    #[must_use]
    pub fn new(credentials: Vec<Arc<Credential>>) -> Self {
        Self { credentials }
    }
}

impl CredentialResolver for CertificateCredentialResolver {
    fn name(&self) -> &'static str {
        "certificate"
    }

    fn resolve(&self, hints: &KeyInfoHints) -> Result<Option<Arc<Credential>>> {
        let found = hints.certificates.iter().find_map(|certificate| {
            self.credentials.iter().find(|credential| {
                can_agree(credential)
                    && credential.entity_certificate() == Some(certificate.as_slice())
            })
        });
        Ok(found.map(Arc::clone))
    }
}

// Local resolvers only match credentials holding an EC private key.
fn can_agree(credential: &Credential) -> bool {
    credential.ec_private_key().is_some()
}

/// Fetches credentials named by external references.
pub struct ReferenceCredentialResolver<S> {
    source: S,
}

impl<S: ReferenceSource> ReferenceCredentialResolver<S> {
    /// Creates a resolver over a reference source.
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S> fmt::Debug for ReferenceCredentialResolver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceCredentialResolver")
            .finish_non_exhaustive()
    }
}

impl<S: ReferenceSource> CredentialResolver for ReferenceCredentialResolver<S> {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn resolve(&self, hints: &KeyInfoHints) -> Result<Option<Arc<Credential>>> {
        for reference in &hints.references {
            if let Some(credential) = self.source.fetch(reference)? {
                debug!("Fetched credential for reference {reference}");
                return Ok(Some(credential));
            }
        }
        Ok(None)
    }
}

/// Picks the local key agreement credential on the curve of the
/// originator's ephemeral key.
#[derive(Debug, Clone, Default)]
pub struct AgreementMethodCredentialResolver {
    credentials: Vec<Arc<Credential>>,
}

impl AgreementMethodCredentialResolver {
    /// Creates a resolver over local credentials.
    #[must_use]
    pub fn new(credentials: Vec<Arc<Credential>>) -> Self {
        Self { credentials }
    }
}

impl CredentialResolver for AgreementMethodCredentialResolver {
    fn name(&self) -> &'static str {
        "agreement-method"
    }

    fn resolve(&self, hints: &KeyInfoHints) -> Result<Option<Arc<Credential>>> {
        let Some(method) = &hints.agreement_method else {
            return Ok(None);
        };
        let found = self.credentials.iter().find(|credential| {
            credential
                .ec_private_key()
                .is_some_and(|key| key.curve() == &method.ephemeral_curve)
        });
        Ok(found.map(Arc::clone))
    }
}

/// Always returns the same credential.
#[derive(Debug, Clone)]
pub struct StaticCredentialResolver {
    credential: Arc<Credential>,
}

impl StaticCredentialResolver {
    /// Creates a resolver for a fixed credential.
    #[must_use]
    pub fn new(credential: Arc<Credential>) -> Self {
        Self { credential }
    }
}

impl CredentialResolver for StaticCredentialResolver {
    fn name(&self) -> &'static str {
        "static"
    }

    fn resolve(&self, _hints: &KeyInfoHints) -> Result<Option<Arc<Credential>>> {
        Ok(Some(Arc::clone(&self.credential)))
    }
}

/// An ordered chain of credential resolvers.
#[derive(Default)]
pub struct CredentialResolutionChain {
    resolvers: Vec<Box<dyn CredentialResolver>>,
}

impl CredentialResolutionChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The default chain over local credentials: embedded key value, then
    /// embedded certificate, then agreement method.
    #[must_use]
    pub fn local(credentials: Vec<Arc<Credential>>) -> Self {
        Self::new()
            .with_resolver(KeyValueCredentialResolver::new(credentials.clone()))
            .with_resolver(CertificateCredentialResolver::new(credentials.clone()))
            .with_resolver(AgreementMethodCredentialResolver::new(credentials))
    }

    /// Appends a resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl CredentialResolver + 'static) -> Self {
        self.push(resolver);
        self
    }

    /// Appends a resolver.
    pub fn push(&mut self, resolver: impl CredentialResolver + 'static) {
        self.resolvers.push(Box::new(resolver));
    }

    /// Number of resolvers in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Returns `true` if the chain has no resolvers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Returns the credential of the first resolver that recognises `hints`.
    ///
    /// # Returns
    /// `Ok(None)` if every resolver declines
    ///
    /// # Errors
    /// Propagates the first resolver error
    pub fn resolve(&self, hints: &KeyInfoHints) -> Result<Option<Arc<Credential>>> {
        for resolver in &self.resolvers {
            if let Some(credential) = resolver.resolve(hints)? {
                debug!("Credential resolved by {} resolver", resolver.name());
                return Ok(Some(credential));
            }
            trace!("{} resolver declined", resolver.name());
        }
        debug!("No resolver matched the key info");
        Ok(None)
    }
}

impl fmt::Debug for CredentialResolutionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(|resolver| resolver.name()))
            .finish()
    }
}
