//! Shared fixtures for integration tests.
//!
//! Builds a real PKI with OpenSSL (EC P-256 keys, ECDSA-SHA256 signatures):
//! certificates through `X509Builder`, CRLs through `x509-cert` structures
//! signed with the issuer key, and pre-decoded OCSP responses.

#![allow(dead_code)]

use der::asn1::{BitString, UtcTime};
use der::{Decode, Encode};
use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::sign::Signer;
use openssl::x509::extension::{BasicConstraints, ExtendedKeyUsage, KeyUsage};
use openssl::x509::{X509Builder, X509NameBuilder};
use sigchain_validator::domain::constants::OID_ECDSA_WITH_SHA256;
use sigchain_validator::domain::{CertId, CertStatus, HashAlgorithm, SingleResponse};
use sigchain_validator::{CrlInfo, OcspResponse, ParsedCertificate};
use std::time::{Duration, SystemTime};
use x509_cert::crl::{CertificateList, RevokedCert, TbsCertList};
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::time::Time;

/// 2024-01-01T00:00:00Z
pub const BASE_UNIX: u64 = 1_704_067_200;

pub fn day(n: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(BASE_UNIX + n * 86_400)
}

fn unix(at: SystemTime) -> i64 {
    at.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A certificate plus the private key it certifies.
pub struct Identity {
    pub certificate: ParsedCertificate,
    pub key: PKey<Private>,
}

fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

pub fn sign(key: &PKey<Private>, data: &[u8]) -> Vec<u8> {
    let mut signer = Signer::new(MessageDigest::sha256(), key).unwrap();
    signer.sign_oneshot_to_vec(data).unwrap()
}

pub struct IdentityBuilder {
    common_name: String,
    serial: u32,
    not_before: SystemTime,
    not_after: SystemTime,
    ca_path_len: Option<Option<u32>>,
    code_signing: bool,
}

impl IdentityBuilder {
    pub fn new(common_name: &str, serial: u32) -> Self {
        Self {
            common_name: common_name.to_string(),
            serial,
            not_before: day(0),
            not_after: day(3650),
            ca_path_len: None,
            code_signing: false,
        }
    }

    pub fn validity(mut self, not_before: SystemTime, not_after: SystemTime) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    /// CA certificate with keyCertSign and cRLSign.
    pub fn ca(mut self, path_len: Option<u32>) -> Self {
        self.ca_path_len = Some(path_len);
        self
    }

    /// Adds an extended key usage extension with codeSigning.
    pub fn code_signing(mut self) -> Self {
        self.code_signing = true;
        self
    }

    pub fn self_signed(self) -> Identity {
        self.build(None)
    }

    pub fn issued_by(self, issuer: &Identity) -> Identity {
        self.build(Some(issuer))
    }

    fn build(self, issuer: Option<&Identity>) -> Identity {
        let key = ec_key();
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, &self.common_name)
            .unwrap();
        let name = name.build();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        let serial = Asn1Integer::from_bn(&BigNum::from_u32(self.serial).unwrap()).unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&Asn1Time::from_unix(unix(self.not_before)).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::from_unix(unix(self.not_after)).unwrap())
            .unwrap();

        match self.ca_path_len {
            Some(path_len) => {
                let mut constraints = BasicConstraints::new();
                constraints.critical().ca();
                if let Some(path_len) = path_len {
                    constraints.pathlen(path_len);
                }
                builder
                    .append_extension(constraints.build().unwrap())
                    .unwrap();
                builder
                    .append_extension(
                        KeyUsage::new()
                            .critical()
                            .key_cert_sign()
                            .crl_sign()
                            .build()
                            .unwrap(),
                    )
                    .unwrap();
            }
            None => {
                builder
                    .append_extension(
                        KeyUsage::new()
                            .critical()
                            .digital_signature()
                            .non_repudiation()
                            .build()
                            .unwrap(),
                    )
                    .unwrap();
            }
        }

        if self.code_signing {
            builder
                .append_extension(ExtendedKeyUsage::new().code_signing().build().unwrap())
                .unwrap();
        }

        match issuer {
            Some(issuer) => {
                let issuer_x509 = openssl::x509::X509::from_der(&issuer.certificate.der).unwrap();
                builder.set_issuer_name(issuer_x509.subject_name()).unwrap();
                builder.sign(&issuer.key, MessageDigest::sha256()).unwrap();
            }
            None => {
                builder.set_issuer_name(&name).unwrap();
                builder.sign(&key, MessageDigest::sha256()).unwrap();
            }
        }

        let der = builder.build().to_der().unwrap();
        Identity {
            certificate: ParsedCertificate::from_der(&der).unwrap(),
            key,
        }
    }
}

fn time(at: SystemTime) -> Time {
    let since_epoch = at.duration_since(SystemTime::UNIX_EPOCH).unwrap();
    Time::UtcTime(UtcTime::from_unix_duration(since_epoch).unwrap())
}

fn ecdsa_sha256() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: der::oid::ObjectIdentifier::new_unwrap(OID_ECDSA_WITH_SHA256),
        parameters: None,
    }
}

/// DER CRL issued and signed by `issuer`, listing `(certificate, revoked at)`.
pub fn crl_der(
    issuer: &Identity,
    this_update: SystemTime,
    next_update: Option<SystemTime>,
    revoked: &[(&ParsedCertificate, SystemTime)],
) -> Vec<u8> {
    let issuer_name = x509_cert::Certificate::from_der(&issuer.certificate.der)
        .unwrap()
        .tbs_certificate
        .subject;
    let revoked_certificates: Vec<RevokedCert> = revoked
        .iter()
        .map(|(certificate, at)| RevokedCert {
            serial_number: SerialNumber::new(&certificate.serial_number).unwrap(),
            revocation_date: time(*at),
            crl_entry_extensions: None,
        })
        .collect();

    let tbs_cert_list = TbsCertList {
        version: x509_cert::Version::V2,
        signature: ecdsa_sha256(),
        issuer: issuer_name,
        this_update: time(this_update),
        next_update: next_update.map(time),
        revoked_certificates: if revoked_certificates.is_empty() {
            None
        } else {
            Some(revoked_certificates)
        },
        crl_extensions: None,
    };
    let signature = sign(&issuer.key, &tbs_cert_list.to_der().unwrap());
    CertificateList {
        tbs_cert_list,
        signature_algorithm: ecdsa_sha256(),
        signature: BitString::from_bytes(&signature).unwrap(),
    }
    .to_der()
    .unwrap()
}

pub fn crl(
    issuer: &Identity,
    this_update: SystemTime,
    next_update: Option<SystemTime>,
    revoked: &[(&ParsedCertificate, SystemTime)],
) -> CrlInfo {
    CrlInfo::from_der(&crl_der(issuer, this_update, next_update, revoked)).unwrap()
}

/// OCSP response about `certificate`, signed by its issuer.
pub fn ocsp_by_issuer(
    certificate: &ParsedCertificate,
    issuer: &Identity,
    status: CertStatus,
    this_update: SystemTime,
) -> OcspResponse {
    let single = SingleResponse {
        cert_id: CertId::for_certificate(certificate, &issuer.certificate, HashAlgorithm::Sha1),
        status,
        this_update,
        next_update: Some(this_update + Duration::from_secs(7 * 86_400)),
    };
    let mut tbs_der = b"ocsp-response-data".to_vec();
    tbs_der.extend_from_slice(&certificate.serial_number);
    tbs_der.extend_from_slice(&unix(this_update).to_be_bytes());
    OcspResponse {
        signature: sign(&issuer.key, &tbs_der),
        tbs_der,
        signature_algorithm: OID_ECDSA_WITH_SHA256.to_string(),
        certificates: Vec::new(),
        produced_at: this_update,
        responses: vec![single],
    }
}

/// Root, intermediate CA and signer.
pub struct Pki {
    pub root: Identity,
    pub ca: Identity,
    pub signer: Identity,
}

impl Pki {
    pub fn new() -> Self {
        let root = IdentityBuilder::new("Test Root", 1).ca(None).self_signed();
        let ca = IdentityBuilder::new("Test Issuing CA", 2)
            .ca(Some(0))
            .issued_by(&root);
        let signer = IdentityBuilder::new("Document Signer", 3)
            .validity(day(10), day(400))
            .issued_by(&ca);
        Self { root, ca, signer }
    }
}
