//! OpenSSL-backed signature verification.

use crate::domain::constants::{
    OID_ECDSA_WITH_SHA1, OID_ECDSA_WITH_SHA256, OID_ECDSA_WITH_SHA384, OID_ECDSA_WITH_SHA512,
    OID_ED25519, OID_SHA1_WITH_RSA, OID_SHA256_WITH_RSA, OID_SHA384_WITH_RSA,
    OID_SHA512_WITH_RSA,
};
use crate::infra::error::{ValidatorError, ValidatorResult};
use crate::services::collaborators::SignatureVerifier;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Verifier;

/// Verifies RSA PKCS#1 v1.5, ECDSA and Ed25519 signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSslSignatureVerifier;

impl OpenSslSignatureVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Digest for a signature algorithm; `None` for pure (digest-less) schemes.
fn digest_for(algorithm_oid: &str) -> ValidatorResult<Option<MessageDigest>> {
    match algorithm_oid {
        OID_SHA1_WITH_RSA | OID_ECDSA_WITH_SHA1 => Ok(Some(MessageDigest::sha1())),
        OID_SHA256_WITH_RSA | OID_ECDSA_WITH_SHA256 => Ok(Some(MessageDigest::sha256())),
        OID_SHA384_WITH_RSA | OID_ECDSA_WITH_SHA384 => Ok(Some(MessageDigest::sha384())),
        OID_SHA512_WITH_RSA | OID_ECDSA_WITH_SHA512 => Ok(Some(MessageDigest::sha512())),
        OID_ED25519 => Ok(None),
        other => Err(ValidatorError::InvalidInput(format!(
            "Unsupported signature algorithm: {other}"
        ))),
    }
}

impl SignatureVerifier for OpenSslSignatureVerifier {
    fn verify(
        &self,
        data: &[u8],
        signature: &[u8],
        algorithm_oid: &str,
        public_key: &[u8],
    ) -> ValidatorResult<bool> {
        let digest = digest_for(algorithm_oid)?;
        let key = PKey::public_key_from_der(public_key)?;
        let mut verifier = match digest {
            Some(digest) => Verifier::new(digest, &key)?,
            None => Verifier::new_without_digest(&key)?,
        };
        let verified = verifier.verify_oneshot(signature, data)?;
        if !verified {
            log::debug!("Signature ({algorithm_oid}) did not verify");
        }
        Ok(verified)
    }
}
