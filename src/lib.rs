//! Signature Chain Validator Library
//!
//! Validates the certificate chain behind a document signature: validity
//! periods, required extensions, trust anchors and revocation status from
//! CRLs and OCSP responses. Every finding is collected into a
//! [`ValidationReport`] whose aggregate status is INFO, INDETERMINATE or
//! INVALID.
//!
//! Layout:
//! - `domain`: certificates, revocation evidence, policy and reports
//! - `services`: the chain, revocation, CRL and OCSP validators
//! - `adapters`: certificate stores, OpenSSL verification, CRL download
//! - `pipelines`: signer and timestamp chain workflows
//! - `infra`: configuration and errors

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

#[cfg(test)]
mod test_fixtures;

pub use adapters::{
    CrlHttpConfig, EmbeddedCrlClient, EmbeddedOcspClient, HttpCrlClient, InMemoryCertificateStore,
    OpenSslSignatureVerifier,
};
pub use domain::{
    CertificateExtension, CertificateSource, ContextPattern, CrlInfo, OcspResponse,
    OnlineFetching, ParsedCertificate, ReportItem, ReportItemStatus,
    SignatureValidationProperties, TimeBasedContext, ValidationContext, ValidationReport,
    ValidatorContext,
};
pub use infra::config::{ConfigManager, ExportFormat, ValidationConfiguration};
pub use infra::error::{ValidatorError, ValidatorResult};
pub use pipelines::ChainValidationWorkflow;
pub use services::{CertificateChainValidator, ValidatorChainBuilder};
