//! Revocation clients over evidence shipped with the document.
//!
//! Neither client touches the network, so `OnlineFetching::Never` still
//! consults them.

use crate::domain::{CrlInfo, OcspResponse, ParsedCertificate};
use crate::infra::error::{ValidatorError, ValidatorResult};
use crate::services::collaborators::{CrlClient, OcspClient};
use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct EmbeddedCrlClient {
    crls: Vec<CrlInfo>,
}

impl EmbeddedCrlClient {
    #[must_use]
    pub fn new(crls: Vec<CrlInfo>) -> Self {
        Self { crls }
    }

    /// Parse DER-encoded CRLs.
    pub fn from_der<B: AsRef<[u8]>>(encoded: &[B]) -> ValidatorResult<Self> {
        let crls = encoded
            .iter()
            .map(|der| CrlInfo::from_der(der.as_ref()))
            .collect::<ValidatorResult<Vec<_>>>()?;
        Ok(Self::new(crls))
    }

    /// Load a CRL file, PEM or DER.
    pub fn load_crl_file<P: AsRef<Path>>(&mut self, path: P) -> ValidatorResult<&mut Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            ValidatorError::IoError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let der = if bytes.starts_with(b"-----BEGIN") {
            let (label, der) = der::pem::decode_vec(&bytes).map_err(der::Error::from)?;
            if label != "X509 CRL" {
                return Err(ValidatorError::RevocationDataError(format!(
                    "{} holds a {label}, not a CRL",
                    path.display()
                )));
            }
            der
        } else {
            bytes
        };
        let crl = CrlInfo::from_der(&der)?;
        log::debug!("Loaded CRL of {} from {}", crl.issuer, path.display());
        Ok(self.add_crl(crl))
    }

    pub fn add_crl(&mut self, crl: CrlInfo) -> &mut Self {
        self.crls.push(crl);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.crls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.crls.is_empty()
    }
}

#[async_trait]
impl CrlClient for EmbeddedCrlClient {
    async fn fetch(&self, certificate: &ParsedCertificate) -> ValidatorResult<Vec<CrlInfo>> {
        Ok(self
            .crls
            .iter()
            .filter(|crl| crl.issuer_der == certificate.issuer_der)
            .cloned()
            .collect())
    }

    fn is_online(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmbeddedOcspClient {
    responses: Vec<OcspResponse>,
}

impl EmbeddedOcspClient {
    #[must_use]
    pub fn new(responses: Vec<OcspResponse>) -> Self {
        Self { responses }
    }

    pub fn add_response(&mut self, response: OcspResponse) -> &mut Self {
        self.responses.push(response);
        self
    }
}

#[async_trait]
impl OcspClient for EmbeddedOcspClient {
    async fn fetch(
        &self,
        certificate: &ParsedCertificate,
        issuer: &ParsedCertificate,
    ) -> ValidatorResult<Vec<OcspResponse>> {
        Ok(self
            .responses
            .iter()
            .filter(|response| response.responses_for(certificate, issuer).next().is_some())
            .cloned()
            .collect())
    }

    fn is_online(&self) -> bool {
        false
    }
}
