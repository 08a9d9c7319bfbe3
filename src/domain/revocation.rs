//! Revocation evidence: CRLs and decoded OCSP responses.

use crate::domain::certificate::ParsedCertificate;
use crate::domain::constants::{ASN1_ENUMERATED_TAG, CRL_REASON_REMOVE_FROM_CRL, OID_CRL_REASON};
use crate::infra::error::ValidatorResult;
use der::{Decode, Encode};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::time::SystemTime;
use x509_cert::crl::CertificateList;

/// One entry of a CRL's revoked certificate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedEntry {
    pub serial_number: Vec<u8>,
    pub revocation_date: SystemTime,
    /// CRLReason code if the entry carries one.
    pub reason: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrlInfo {
    pub issuer: String,
    pub issuer_der: Vec<u8>,
    pub this_update: SystemTime,
    pub next_update: Option<SystemTime>,
    pub revoked: Vec<RevokedEntry>,
    pub tbs_der: Vec<u8>,
    pub signature: Vec<u8>,
    pub signature_algorithm: String,
}

impl CrlInfo {
    pub fn from_der(der: &[u8]) -> ValidatorResult<Self> {
        let crl = CertificateList::from_der(der)?;
        let tbs = &crl.tbs_cert_list;

        let mut revoked = Vec::new();
        for entry in tbs.revoked_certificates.iter().flatten() {
            let reason = entry
                .crl_entry_extensions
                .iter()
                .flatten()
                .find(|ext| ext.extn_id.to_string() == OID_CRL_REASON)
                .and_then(|ext| reason_code(ext.extn_value.as_bytes()));
            revoked.push(RevokedEntry {
                serial_number: entry.serial_number.as_bytes().to_vec(),
                revocation_date: entry.revocation_date.to_system_time(),
                reason,
            });
        }

        let info = CrlInfo {
            issuer: tbs.issuer.to_string(),
            issuer_der: tbs.issuer.to_der()?,
            this_update: tbs.this_update.to_system_time(),
            next_update: tbs.next_update.map(|t| t.to_system_time()),
            revoked,
            tbs_der: tbs.to_der()?,
            signature: crl.signature.raw_bytes().to_vec(),
            signature_algorithm: crl.signature_algorithm.oid.to_string(),
        };
        log::debug!(
            "Parsed CRL from {} with {} revoked entries",
            info.issuer,
            info.revoked.len()
        );
        Ok(info)
    }

    /// Entry for `serial`, skipping entries released by `removeFromCRL`.
    #[must_use]
    pub fn find_revoked(&self, serial: &[u8]) -> Option<&RevokedEntry> {
        self.revoked.iter().find(|entry| {
            entry.serial_number == serial
                && entry.reason != Some(CRL_REASON_REMOVE_FROM_CRL)
        })
    }
}

// CRLReason ::= ENUMERATED, always a single content byte for defined codes
fn reason_code(value: &[u8]) -> Option<u8> {
    match value {
        [ASN1_ENUMERATED_TAG, 0x01, code] => Some(*code),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// Mandated by the lightweight OCSP profile (RFC 5019) and used by most responders
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Identifies the certificate an OCSP single response is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertId {
    pub hash_algorithm: HashAlgorithm,
    pub issuer_name_hash: Vec<u8>,
    pub issuer_key_hash: Vec<u8>,
    pub serial_number: Vec<u8>,
}

impl CertId {
    #[must_use]
    pub fn for_certificate(
        certificate: &ParsedCertificate,
        issuer: &ParsedCertificate,
        hash_algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            hash_algorithm,
            issuer_name_hash: hash_algorithm.digest(&issuer.subject_der),
            issuer_key_hash: hash_algorithm.digest(&issuer.public_key_bits),
            serial_number: certificate.serial_number.clone(),
        }
    }

    #[must_use]
    pub fn matches(&self, certificate: &ParsedCertificate, issuer: &ParsedCertificate) -> bool {
        *self == Self::for_certificate(certificate, issuer, self.hash_algorithm)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertStatus {
    Good,
    Revoked {
        revocation_time: SystemTime,
        reason: Option<u8>,
    },
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleResponse {
    pub cert_id: CertId,
    pub status: CertStatus,
    pub this_update: SystemTime,
    pub next_update: Option<SystemTime>,
}

/// Decoded basic OCSP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcspResponse {
    /// DER of ResponseData, the bytes covered by `signature`.
    pub tbs_der: Vec<u8>,
    pub signature: Vec<u8>,
    pub signature_algorithm: String,
    /// Certificates shipped with the response (delegated responder chain).
    pub certificates: Vec<ParsedCertificate>,
    pub produced_at: SystemTime,
    pub responses: Vec<SingleResponse>,
}

impl OcspResponse {
    /// Single responses whose `CertId` names `certificate` issued by `issuer`.
    pub fn responses_for<'a>(
        &'a self,
        certificate: &'a ParsedCertificate,
        issuer: &'a ParsedCertificate,
    ) -> impl Iterator<Item = &'a SingleResponse> + 'a {
        self.responses
            .iter()
            .filter(move |single| single.cert_id.matches(certificate, issuer))
    }
}
