//! Service layer module root.
//! Contains the chain, revocation, CRL and OCSP validators.

pub mod builder;
pub mod chain_validator;
pub mod collaborators;
pub mod crl_validator;
pub mod ocsp_validator;
pub mod revocation;

pub use builder::ValidatorChainBuilder;
pub use chain_validator::CertificateChainValidator;
pub use collaborators::{
    CertificateRetriever, ChainValidation, CrlClient, OcspClient, SignatureVerifier,
    TrustedCertificatesStore, WalkState,
};
pub use crl_validator::CrlValidator;
pub use ocsp_validator::OcspValidator;
pub use revocation::RevocationDataValidator;
