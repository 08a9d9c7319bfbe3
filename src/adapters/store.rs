//! In-memory certificate store: issuer lookup plus trust anchors.

use crate::domain::{CertificateSource, ParsedCertificate};
use crate::infra::error::{ValidatorError, ValidatorResult};
use crate::services::collaborators::{CertificateRetriever, TrustedCertificatesStore};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
struct TrustAnchor {
    certificate: ParsedCertificate,
    /// `None` trusts the anchor for every usage.
    scope: Option<Vec<CertificateSource>>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCertificateStore {
    certificates: Vec<ParsedCertificate>,
    anchors: Vec<TrustAnchor>,
}

impl InMemoryCertificateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an intermediate certificate available for issuer lookup.
    pub fn add_certificate(&mut self, certificate: ParsedCertificate) -> &mut Self {
        if !self.certificates.contains(&certificate) {
            self.certificates.push(certificate);
        }
        self
    }

    pub fn add_certificates(
        &mut self,
        certificates: impl IntoIterator<Item = ParsedCertificate>,
    ) -> &mut Self {
        for certificate in certificates {
            self.add_certificate(certificate);
        }
        self
    }

    /// Trust `certificate` for every usage.
    pub fn add_trust_anchor(&mut self, certificate: ParsedCertificate) -> &mut Self {
        self.anchors.push(TrustAnchor {
            certificate,
            scope: None,
        });
        self
    }

    /// Trust `certificate` only when it is validated in one of `sources`.
    pub fn add_trust_anchor_for(
        &mut self,
        certificate: ParsedCertificate,
        sources: &[CertificateSource],
    ) -> &mut Self {
        self.anchors.push(TrustAnchor {
            certificate,
            scope: Some(sources.to_vec()),
        });
        self
    }

    /// Load every certificate of a PEM file as intermediate.
    pub fn load_certificates_pem<P: AsRef<Path>>(&mut self, path: P) -> ValidatorResult<usize> {
        let certificates = read_pem_file(path.as_ref())?;
        let count = certificates.len();
        self.add_certificates(certificates);
        Ok(count)
    }

    /// Load every certificate of a PEM file as trust anchor.
    pub fn load_trust_anchors_pem<P: AsRef<Path>>(&mut self, path: P) -> ValidatorResult<usize> {
        let certificates = read_pem_file(path.as_ref())?;
        let count = certificates.len();
        for certificate in certificates {
            self.add_trust_anchor(certificate);
        }
        Ok(count)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.certificates.len() + self.anchors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_pem_file(path: &Path) -> ValidatorResult<Vec<ParsedCertificate>> {
    let pem = fs::read(path).map_err(|e| {
        ValidatorError::IoError(format!("Failed to read {}: {e}", path.display()))
    })?;
    let certificates = ParsedCertificate::load_pem_chain(&pem)?;
    if certificates.is_empty() {
        return Err(ValidatorError::InvalidCertificate(format!(
            "No certificates found in {}",
            path.display()
        )));
    }
    log::debug!("Loaded {} certificates from {}", certificates.len(), path.display());
    Ok(certificates)
}

impl CertificateRetriever for InMemoryCertificateStore {
    fn find_issuer(
        &self,
        certificate: &ParsedCertificate,
    ) -> ValidatorResult<Option<ParsedCertificate>> {
        let issuer = self
            .certificates
            .iter()
            .chain(self.anchors.iter().map(|anchor| &anchor.certificate))
            .filter(|candidate| candidate.subject_der == certificate.issuer_der)
            .find(|candidate| *candidate != certificate || certificate.is_self_signed())
            .cloned();
        if issuer.is_none() {
            log::debug!("No issuer found for {}", certificate.display_name());
        }
        Ok(issuer)
    }
}

impl TrustedCertificatesStore for InMemoryCertificateStore {
    fn is_trust_anchor(&self, certificate: &ParsedCertificate) -> bool {
        self.anchors
            .iter()
            .any(|anchor| anchor.scope.is_none() && anchor.certificate == *certificate)
    }

    fn is_trusted_for(&self, certificate: &ParsedCertificate, source: CertificateSource) -> bool {
        self.anchors.iter().any(|anchor| {
            anchor.certificate == *certificate
                && anchor
                    .scope
                    .as_ref()
                    .map_or(true, |sources| sources.contains(&source))
        })
    }
}
