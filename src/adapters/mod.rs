//! Adapter layer modules for external system integration.
//!
//! Provides adapters for:
//! - In-memory issuer lookup and trust anchors
//! - OpenSSL signature verification
//! - CRL download over HTTP with retry and failover
//! - Revocation evidence embedded in the signed document

pub mod crl_http_client;
pub mod embedded;
pub mod openssl_verifier;
pub mod store;

pub use crl_http_client::{CrlHttpConfig, HttpCrlClient};
pub use embedded::{EmbeddedCrlClient, EmbeddedOcspClient};
pub use openssl_verifier::OpenSslSignatureVerifier;
pub use store::InMemoryCertificateStore;
