//! Domain layer: certificates, revocation evidence, policy and reports.
//!
//! Types here are plain values. Nothing in this layer performs I/O.

pub mod certificate;
pub mod constants;
pub mod context;
pub mod extensions;
pub mod properties;
pub mod report;
pub mod revocation;

pub use certificate::{BasicConstraintsInfo, KeyUsage, KeyUsageSet, ParsedCertificate, RawExtension};
pub use context::{CertificateSource, TimeBasedContext, ValidationContext, ValidatorContext};
pub use extensions::{BasicConstraintsRequirement, CertificateExtension};
pub use properties::{
    resolve_most_specific, ContextPattern, OnlineFetching, PolicyTable,
    SignatureValidationProperties,
};
pub use report::{checks, ReportItem, ReportItemStatus, ValidationReport};
pub use revocation::{
    CertId, CertStatus, CrlInfo, HashAlgorithm, OcspResponse, RevokedEntry, SingleResponse,
};
