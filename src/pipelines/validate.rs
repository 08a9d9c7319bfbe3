//! `ChainValidationWorkflow`: high-level facade for validating the chains
//! behind a document signature and its timestamp.
//!
//! Delegates to `CertificateChainValidator`; picks the validation context
//! matching the role of the certificate.

use crate::domain::{
    CertificateSource, ParsedCertificate, TimeBasedContext, ValidationContext, ValidationReport,
    ValidatorContext,
};
use crate::services::chain_validator::CertificateChainValidator;
use std::time::SystemTime;

/// Orchestrates chain validation for the certificates of a signed document.
pub struct ChainValidationWorkflow {
    validator: CertificateChainValidator,
}

impl ChainValidationWorkflow {
    #[must_use]
    pub fn new(validator: CertificateChainValidator) -> Self {
        Self { validator }
    }

    #[must_use]
    pub fn validator(&self) -> &CertificateChainValidator {
        &self.validator
    }

    /// Validate the signer certificate's chain at `instant`.
    pub async fn validate_signer_chain(
        &self,
        signer: &ParsedCertificate,
        instant: SystemTime,
        time_based_context: TimeBasedContext,
    ) -> ValidationReport {
        log::info!("Validating signer chain of {}", signer.display_name());
        self.validator
            .validate(ValidationContext::for_signer(time_based_context), signer, instant)
            .await
    }

    /// Validate a timestamp authority's chain at the time the stamp was made.
    pub async fn validate_timestamp_chain(
        &self,
        tsa: &ParsedCertificate,
        instant: SystemTime,
    ) -> ValidationReport {
        log::info!("Validating timestamp chain of {}", tsa.display_name());
        let context = ValidationContext::new(
            CertificateSource::Timestamp,
            ValidatorContext::Signature,
            TimeBasedContext::Historical,
        );
        self.validator.validate(context, tsa, instant).await
    }
}
