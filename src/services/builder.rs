//! Assembles a `CertificateChainValidator` from its collaborators.

use crate::domain::SignatureValidationProperties;
use crate::infra::error::{ValidatorError, ValidatorResult};
use crate::services::chain_validator::CertificateChainValidator;
use crate::services::collaborators::{
    CertificateRetriever, CrlClient, OcspClient, SignatureVerifier, TrustedCertificatesStore,
};
use crate::services::revocation::RevocationDataValidator;
use std::sync::Arc;

#[derive(Default)]
pub struct ValidatorChainBuilder {
    properties: SignatureValidationProperties,
    retriever: Option<Arc<dyn CertificateRetriever>>,
    trust_store: Option<Arc<dyn TrustedCertificatesStore>>,
    verifier: Option<Arc<dyn SignatureVerifier>>,
    crl_clients: Vec<Arc<dyn CrlClient>>,
    ocsp_clients: Vec<Arc<dyn OcspClient>>,
}

impl ValidatorChainBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_properties(mut self, properties: SignatureValidationProperties) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub fn with_certificate_retriever(mut self, retriever: Arc<dyn CertificateRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    #[must_use]
    pub fn with_trust_store(mut self, trust_store: Arc<dyn TrustedCertificatesStore>) -> Self {
        self.trust_store = Some(trust_store);
        self
    }

    /// Use one object as both issuer retriever and trust store.
    #[must_use]
    pub fn with_certificate_store<S>(self, store: Arc<S>) -> Self
    where
        S: CertificateRetriever + TrustedCertificatesStore + 'static,
    {
        self.with_certificate_retriever(store.clone())
            .with_trust_store(store)
    }

    #[must_use]
    pub fn with_signature_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    #[must_use]
    pub fn with_crl_client(mut self, client: Arc<dyn CrlClient>) -> Self {
        self.crl_clients.push(client);
        self
    }

    #[must_use]
    pub fn with_ocsp_client(mut self, client: Arc<dyn OcspClient>) -> Self {
        self.ocsp_clients.push(client);
        self
    }

    pub fn build(self) -> ValidatorResult<CertificateChainValidator> {
        let retriever = self.retriever.ok_or_else(|| {
            ValidatorError::ConfigurationError("certificate retriever is required".to_string())
        })?;
        let trust_store = self.trust_store.ok_or_else(|| {
            ValidatorError::ConfigurationError("trusted certificates store is required".to_string())
        })?;
        let verifier = self.verifier.ok_or_else(|| {
            ValidatorError::ConfigurationError("signature verifier is required".to_string())
        })?;

        let properties = Arc::new(self.properties);
        let mut revocation = RevocationDataValidator::new(properties.clone(), verifier.clone());
        for client in self.crl_clients {
            revocation.add_crl_client(client);
        }
        for client in self.ocsp_clients {
            revocation.add_ocsp_client(client);
        }
        log::debug!(
            "Built chain validator (max depth {})",
            properties.max_chain_depth()
        );
        Ok(CertificateChainValidator::new(
            properties,
            retriever,
            trust_store,
            verifier,
            revocation,
        ))
    }
}
