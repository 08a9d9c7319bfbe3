//! Validation context: why a certificate is being checked.
//!
//! The context is the lookup key for every policy query, so equality and
//! hashing cover all three dimensions. Contexts are `Copy`; deriving a child
//! context never touches the parent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of the certificate under validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateSource {
    SignerCert,
    CertIssuer,
    CrlIssuer,
    OcspIssuer,
    Timestamp,
}

/// Validator stage performing the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidatorContext {
    ChainValidator,
    RevocationDataValidator,
    CrlValidator,
    OcspValidator,
    Signature,
}

/// Whether the validation instant is "now" or a past signing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeBasedContext {
    Present,
    Historical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationContext {
    certificate_source: CertificateSource,
    validator_context: ValidatorContext,
    time_based_context: TimeBasedContext,
}

impl ValidationContext {
    #[must_use]
    pub fn new(
        certificate_source: CertificateSource,
        validator_context: ValidatorContext,
        time_based_context: TimeBasedContext,
    ) -> Self {
        Self {
            certificate_source,
            validator_context,
            time_based_context,
        }
    }

    /// Context used at the public entry point for a signer certificate.
    #[must_use]
    pub fn for_signer(time_based_context: TimeBasedContext) -> Self {
        Self::new(
            CertificateSource::SignerCert,
            ValidatorContext::Signature,
            time_based_context,
        )
    }

    #[must_use]
    pub fn certificate_source(&self) -> CertificateSource {
        self.certificate_source
    }

    #[must_use]
    pub fn validator_context(&self) -> ValidatorContext {
        self.validator_context
    }

    #[must_use]
    pub fn time_based_context(&self) -> TimeBasedContext {
        self.time_based_context
    }

    #[must_use]
    pub fn with_certificate_source(self, certificate_source: CertificateSource) -> Self {
        Self {
            certificate_source,
            ..self
        }
    }

    #[must_use]
    pub fn with_validator_context(self, validator_context: ValidatorContext) -> Self {
        Self {
            validator_context,
            ..self
        }
    }

    #[must_use]
    pub fn with_time_based_context(self, time_based_context: TimeBasedContext) -> Self {
        Self {
            time_based_context,
            ..self
        }
    }
}

impl fmt::Display for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?}/{:?}",
            self.certificate_source, self.validator_context, self.time_based_context
        )
    }
}
