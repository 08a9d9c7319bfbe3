//! Synthetic certificates, evidence and collaborators for unit tests.
//!
//! "Signatures" here are `sha256(key || data)`, checked by `FakeVerifier`, so
//! chains can be assembled without any real key material.

use crate::domain::{
    BasicConstraintsInfo, CertId, CertStatus, CertificateSource, CrlInfo, HashAlgorithm,
    KeyUsage, KeyUsageSet, OcspResponse, ParsedCertificate, RevokedEntry, SingleResponse,
    ValidationContext, ValidationReport,
};
use crate::infra::error::{ValidatorError, ValidatorResult};
use crate::services::collaborators::{
    CertificateRetriever, ChainValidation, CrlClient, OcspClient, SignatureVerifier,
    TrustedCertificatesStore, WalkState,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

pub const FAKE_ALGORITHM: &str = "1.2.3.4.5";

/// 2024-01-01T00:00:00Z
pub fn base_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200)
}

pub fn days(n: u64) -> Duration {
    Duration::from_secs(n * 24 * 3600)
}

/// `base_time() + n days`
pub fn day(n: u64) -> SystemTime {
    base_time() + days(n)
}

pub fn fake_sign(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.update(data);
    hasher.finalize().to_vec()
}

pub struct FakeVerifier;

impl SignatureVerifier for FakeVerifier {
    fn verify(
        &self,
        data: &[u8],
        signature: &[u8],
        _algorithm_oid: &str,
        public_key: &[u8],
    ) -> ValidatorResult<bool> {
        Ok(fake_sign(public_key, data) == signature)
    }
}

/// Verifier that always fails with an exception.
pub struct BrokenVerifier;

impl SignatureVerifier for BrokenVerifier {
    fn verify(&self, _: &[u8], _: &[u8], _: &str, _: &[u8]) -> ValidatorResult<bool> {
        Err(ValidatorError::CryptographicError("engine unavailable".to_string()))
    }
}

pub struct CertBuilder {
    subject: String,
    issuer: String,
    issuer_key: Vec<u8>,
    key: Vec<u8>,
    serial: Vec<u8>,
    not_before: SystemTime,
    not_after: SystemTime,
    key_usage: Option<KeyUsageSet>,
    extended_key_usage: Option<Vec<String>>,
    basic_constraints: Option<BasicConstraintsInfo>,
    ocsp_no_check: bool,
}

impl CertBuilder {
    /// Self-signed by default; call `issued_by` to chain.
    pub fn new(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            issuer: subject.to_string(),
            issuer_key: key_of(subject),
            key: key_of(subject),
            serial: vec![0x01],
            not_before: day(0),
            not_after: day(3650),
            key_usage: None,
            extended_key_usage: None,
            basic_constraints: None,
            ocsp_no_check: false,
        }
    }

    pub fn issued_by(mut self, issuer: &ParsedCertificate) -> Self {
        self.issuer = issuer.subject.clone();
        self.issuer_key = issuer.public_key.clone();
        self
    }

    pub fn signed_with(mut self, key: &[u8]) -> Self {
        self.issuer_key = key.to_vec();
        self
    }

    pub fn serial(mut self, serial: &[u8]) -> Self {
        self.serial = serial.to_vec();
        self
    }

    pub fn validity(mut self, not_before: SystemTime, not_after: SystemTime) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn key_usage(mut self, usages: &[KeyUsage]) -> Self {
        self.key_usage = Some(KeyUsageSet::of(usages));
        self
    }

    pub fn eku(mut self, purposes: &[&str]) -> Self {
        self.extended_key_usage = Some(purposes.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn ca(mut self, path_len: Option<u8>) -> Self {
        self.basic_constraints = Some(BasicConstraintsInfo {
            ca: true,
            path_len_constraint: path_len,
        });
        self
    }

    pub fn ocsp_no_check(mut self) -> Self {
        self.ocsp_no_check = true;
        self
    }

    /// Issuing CA profile: keyCertSign + cRLSign, CA=true.
    pub fn issuing_ca(self) -> Self {
        self.key_usage(&[KeyUsage::KeyCertSign, KeyUsage::CrlSign])
            .ca(None)
    }

    pub fn build(self) -> ParsedCertificate {
        let mut tbs = Vec::new();
        tbs.extend_from_slice(self.subject.as_bytes());
        tbs.push(0);
        tbs.extend_from_slice(self.issuer.as_bytes());
        tbs.push(0);
        tbs.extend_from_slice(&self.serial);
        let signature = fake_sign(&self.issuer_key, &tbs);
        let mut der = tbs.clone();
        der.extend_from_slice(&signature);

        let mut extensions = Vec::new();
        if self.ocsp_no_check {
            extensions.push(crate::domain::RawExtension {
                oid: crate::domain::constants::OID_OCSP_NO_CHECK.to_string(),
                critical: false,
                value: vec![0x05, 0x00],
            });
        }

        ParsedCertificate {
            der,
            subject: self.subject.clone(),
            subject_der: self.subject.into_bytes(),
            issuer: self.issuer.clone(),
            issuer_der: self.issuer.into_bytes(),
            serial_number: self.serial,
            not_before: self.not_before,
            not_after: self.not_after,
            public_key: self.key.clone(),
            public_key_bits: self.key,
            tbs_der: tbs,
            signature,
            signature_algorithm: FAKE_ALGORITHM.to_string(),
            extensions,
            key_usage: self.key_usage,
            extended_key_usage: self.extended_key_usage,
            basic_constraints: self.basic_constraints,
            crl_distribution_points: Vec::new(),
            ocsp_urls: Vec::new(),
        }
    }
}

pub fn key_of(subject: &str) -> Vec<u8> {
    format!("key:{subject}").into_bytes()
}

pub fn revoked(serial: &[u8], at: SystemTime) -> RevokedEntry {
    RevokedEntry {
        serial_number: serial.to_vec(),
        revocation_date: at,
        reason: None,
    }
}

/// CRL signed by `issuer`'s key.
pub fn crl(
    issuer: &ParsedCertificate,
    this_update: SystemTime,
    next_update: Option<SystemTime>,
    revoked: Vec<RevokedEntry>,
) -> CrlInfo {
    let mut tbs = issuer.subject_der.clone();
    tbs.extend_from_slice(format!("{this_update:?}{next_update:?}").as_bytes());
    for entry in &revoked {
        tbs.extend_from_slice(&entry.serial_number);
    }
    CrlInfo {
        issuer: issuer.subject.clone(),
        issuer_der: issuer.subject_der.clone(),
        this_update,
        next_update,
        revoked,
        signature: fake_sign(&issuer.public_key, &tbs),
        tbs_der: tbs,
        signature_algorithm: FAKE_ALGORITHM.to_string(),
    }
}

/// OCSP response about `certificate`, signed with `signer_key`.
pub fn ocsp(
    certificate: &ParsedCertificate,
    issuer: &ParsedCertificate,
    signer_key: &[u8],
    status: CertStatus,
    this_update: SystemTime,
    responder_certs: Vec<ParsedCertificate>,
) -> OcspResponse {
    let mut tbs = certificate.serial_number.clone();
    tbs.extend_from_slice(b"ocsp");
    tbs.extend_from_slice(&this_update_bytes(this_update));
    OcspResponse {
        signature: fake_sign(signer_key, &tbs),
        tbs_der: tbs,
        signature_algorithm: FAKE_ALGORITHM.to_string(),
        certificates: responder_certs,
        produced_at: this_update,
        responses: vec![SingleResponse {
            cert_id: CertId::for_certificate(certificate, issuer, HashAlgorithm::Sha256),
            status,
            this_update,
            next_update: Some(this_update + days(7)),
        }],
    }
}

fn this_update_bytes(at: SystemTime) -> Vec<u8> {
    at.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs().to_be_bytes().to_vec())
        .unwrap_or_default()
}

/// Retriever + trust store over a fixed list.
#[derive(Default)]
pub struct FakeStore {
    pub known: Vec<ParsedCertificate>,
    pub anchors: Vec<(ParsedCertificate, Option<CertificateSource>)>,
    pub fail_lookup: bool,
}

impl FakeStore {
    pub fn with(known: Vec<ParsedCertificate>, anchors: Vec<ParsedCertificate>) -> Self {
        Self {
            known,
            anchors: anchors.into_iter().map(|a| (a, None)).collect(),
            fail_lookup: false,
        }
    }
}

impl CertificateRetriever for FakeStore {
    fn find_issuer(
        &self,
        certificate: &ParsedCertificate,
    ) -> ValidatorResult<Option<ParsedCertificate>> {
        if self.fail_lookup {
            return Err(ValidatorError::IoError("store offline".to_string()));
        }
        Ok(self
            .known
            .iter()
            .chain(self.anchors.iter().map(|(a, _)| a))
            .find(|c| c.subject_der == certificate.issuer_der)
            .cloned())
    }
}

impl TrustedCertificatesStore for FakeStore {
    fn is_trust_anchor(&self, certificate: &ParsedCertificate) -> bool {
        self.anchors.iter().any(|(a, scope)| a == certificate && scope.is_none())
    }

    fn is_trusted_for(&self, certificate: &ParsedCertificate, source: CertificateSource) -> bool {
        self.anchors
            .iter()
            .any(|(a, scope)| a == certificate && scope.map_or(true, |s| s == source))
    }
}

/// Chain re-entry stub returning a canned report and recording contexts.
pub struct FakeChain {
    pub report: ValidationReport,
    pub seen: Mutex<Vec<ValidationContext>>,
}

impl FakeChain {
    pub fn trusting() -> Self {
        Self::returning(ValidationReport::new())
    }

    pub fn returning(report: ValidationReport) -> Self {
        Self {
            report,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn contexts(&self) -> Vec<ValidationContext> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ChainValidation for FakeChain {
    fn validate_chain<'a>(
        &'a self,
        context: ValidationContext,
        _certificate: &'a ParsedCertificate,
        _instant: SystemTime,
        _walk: WalkState,
    ) -> BoxFuture<'a, ValidationReport> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(context);
        }
        Box::pin(async move { self.report.clone() })
    }
}

pub struct FakeCrlClient {
    pub crls: Vec<CrlInfo>,
    pub online: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeCrlClient {
    pub fn new(crls: Vec<CrlInfo>, online: bool) -> Arc<Self> {
        Arc::new(Self {
            crls,
            online,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrlClient for FakeCrlClient {
    async fn fetch(&self, _certificate: &ParsedCertificate) -> ValidatorResult<Vec<CrlInfo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.crls.clone())
    }

    fn is_online(&self) -> bool {
        self.online
    }
}

pub struct FakeOcspClient {
    pub responses: Vec<OcspResponse>,
    pub online: bool,
    pub calls: AtomicUsize,
}

impl FakeOcspClient {
    pub fn new(responses: Vec<OcspResponse>, online: bool) -> Arc<Self> {
        Arc::new(Self {
            responses,
            online,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcspClient for FakeOcspClient {
    async fn fetch(
        &self,
        _certificate: &ParsedCertificate,
        _issuer: &ParsedCertificate,
    ) -> ValidatorResult<Vec<OcspResponse>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.responses.clone())
    }

    fn is_online(&self) -> bool {
        self.online
    }
}

/// Root, intermediate CA and leaf, each issued by the previous one.
pub struct TestPki {
    pub root: ParsedCertificate,
    pub ca: ParsedCertificate,
    pub leaf: ParsedCertificate,
}

impl TestPki {
    pub fn new() -> Self {
        let root = CertBuilder::new("CN=Root").issuing_ca().serial(&[0x10]).build();
        let ca = CertBuilder::new("CN=Issuing CA")
            .issued_by(&root)
            .issuing_ca()
            .serial(&[0x20])
            .build();
        let leaf = CertBuilder::new("CN=Signer")
            .issued_by(&ca)
            .key_usage(&[KeyUsage::DigitalSignature, KeyUsage::NonRepudiation])
            .serial(&[0x30])
            .build();
        Self { root, ca, leaf }
    }

    pub fn store(&self) -> FakeStore {
        FakeStore::with(vec![self.ca.clone()], vec![self.root.clone()])
    }
}
