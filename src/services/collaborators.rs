//! Seams to the outside world: issuer lookup, trust, signature math and
//! revocation data sources.
//!
//! All collaborators are shared as `Arc<dyn Trait>` and must be `Send + Sync`.

use crate::domain::{
    CertificateSource, CrlInfo, OcspResponse, ParsedCertificate, ValidationContext,
    ValidationReport,
};
use crate::infra::error::ValidatorResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// Locates the issuer of a certificate.
pub trait CertificateRetriever: Send + Sync {
    fn find_issuer(&self, certificate: &ParsedCertificate)
        -> ValidatorResult<Option<ParsedCertificate>>;
}

/// Answers "is this certificate a trust anchor".
pub trait TrustedCertificatesStore: Send + Sync {
    fn is_trust_anchor(&self, certificate: &ParsedCertificate) -> bool;

    /// Trust scoped to a usage. Stores without scoped trust fall back to
    /// `is_trust_anchor`.
    fn is_trusted_for(&self, certificate: &ParsedCertificate, source: CertificateSource) -> bool {
        let _ = source;
        self.is_trust_anchor(certificate)
    }
}

/// Raw signature verification.
pub trait SignatureVerifier: Send + Sync {
    /// `public_key` is a DER SubjectPublicKeyInfo; `algorithm_oid` is the
    /// dotted signature algorithm identifier.
    fn verify(
        &self,
        data: &[u8],
        signature: &[u8],
        algorithm_oid: &str,
        public_key: &[u8],
    ) -> ValidatorResult<bool>;
}

#[async_trait]
pub trait CrlClient: Send + Sync {
    async fn fetch(&self, certificate: &ParsedCertificate) -> ValidatorResult<Vec<CrlInfo>>;

    /// Whether fetching touches the network.
    fn is_online(&self) -> bool;
}

#[async_trait]
pub trait OcspClient: Send + Sync {
    async fn fetch(
        &self,
        certificate: &ParsedCertificate,
        issuer: &ParsedCertificate,
    ) -> ValidatorResult<Vec<OcspResponse>>;

    fn is_online(&self) -> bool;
}

/// Deadline distance used when the configured timeout does not fit an `Instant`.
const UNBOUNDED_WALK: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Bounds shared by a validation and every nested issuer walk it spawns.
#[derive(Debug, Clone, Copy)]
pub struct WalkState {
    pub depth: usize,
    pub deadline: Instant,
}

impl WalkState {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            depth: 0,
            deadline: Instant::now()
                .checked_add(timeout)
                .unwrap_or_else(|| Instant::now() + UNBOUNDED_WALK),
        }
    }

    /// State for the next hop.
    #[must_use]
    pub fn descend(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// Re-entry point used by revocation validators to check the chain of a CRL
/// issuer or OCSP responder.
pub trait ChainValidation: Send + Sync {
    fn validate_chain<'a>(
        &'a self,
        context: ValidationContext,
        certificate: &'a ParsedCertificate,
        instant: SystemTime,
        walk: WalkState,
    ) -> BoxFuture<'a, ValidationReport>;
}
