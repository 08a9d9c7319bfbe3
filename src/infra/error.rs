//! Error handling types and result definitions for validation operations.
//!
//! Ordinary trust failures (expired certificate, revoked serial, stale CRL) are
//! never errors; they are report items. These variants cover the exceptional
//! conditions that validators catch at their boundary.

use thiserror::Error;

/// Result type for validator operations
pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// Exceptional conditions raised by collaborators and parsers
#[derive(Error, Debug, miette::Diagnostic)]
pub enum ValidatorError {
    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("Invalid certificate format: {0}")]
    InvalidCertificate(String),

    #[error("Revocation data error: {0}")]
    RevocationDataError(String),

    #[error("Cryptographic error: {0}")]
    CryptographicError(String),

    #[error("ASN.1 encoding/decoding error: {0}")]
    Asn1Error(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<der::Error> for ValidatorError {
    fn from(error: der::Error) -> Self {
        ValidatorError::Asn1Error(error.to_string())
    }
}

impl From<reqwest::Error> for ValidatorError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ValidatorError::Timeout(error.to_string())
        } else {
            ValidatorError::NetworkError(error.to_string())
        }
    }
}

impl From<openssl::error::ErrorStack> for ValidatorError {
    fn from(error: openssl::error::ErrorStack) -> Self {
        ValidatorError::CryptographicError(error.to_string())
    }
}

impl From<std::io::Error> for ValidatorError {
    fn from(error: std::io::Error) -> Self {
        ValidatorError::IoError(error.to_string())
    }
}
