//! Parsed certificate view consumed by the validators.
//!
//! The engine only reads the fields below. Conversion from `x509_cert` happens
//! once at the boundary; after that a certificate is an immutable value.

use crate::domain::constants::{
    EKU_ANY, OID_AD_OCSP, OID_AUTHORITY_INFO_ACCESS, OID_BASIC_CONSTRAINTS,
    OID_CRL_DISTRIBUTION_POINTS, OID_EXTENDED_KEY_USAGE, OID_KEY_USAGE, OID_OCSP_NO_CHECK,
};
use crate::infra::error::{ValidatorError, ValidatorResult};
use der::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{
    AuthorityInfoAccessSyntax, BasicConstraints, CrlDistributionPoints, ExtendedKeyUsage,
    KeyUsage as X509KeyUsage,
};
use x509_cert::Certificate as X509Certificate;

/// Key usage bits as defined in RFC 5280 §4.2.1.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsage {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    KeyCertSign,
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

impl KeyUsage {
    pub const ALL: [KeyUsage; 9] = [
        KeyUsage::DigitalSignature,
        KeyUsage::NonRepudiation,
        KeyUsage::KeyEncipherment,
        KeyUsage::DataEncipherment,
        KeyUsage::KeyAgreement,
        KeyUsage::KeyCertSign,
        KeyUsage::CrlSign,
        KeyUsage::EncipherOnly,
        KeyUsage::DecipherOnly,
    ];

    #[must_use]
    pub fn bit(self) -> u16 {
        1 << (self as u16)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            KeyUsage::DigitalSignature => "digitalSignature",
            KeyUsage::NonRepudiation => "nonRepudiation",
            KeyUsage::KeyEncipherment => "keyEncipherment",
            KeyUsage::DataEncipherment => "dataEncipherment",
            KeyUsage::KeyAgreement => "keyAgreement",
            KeyUsage::KeyCertSign => "keyCertSign",
            KeyUsage::CrlSign => "cRLSign",
            KeyUsage::EncipherOnly => "encipherOnly",
            KeyUsage::DecipherOnly => "decipherOnly",
        }
    }
}

/// Set of key usage bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<KeyUsage>", into = "Vec<KeyUsage>")]
pub struct KeyUsageSet(u16);

impl KeyUsageSet {
    #[must_use]
    pub fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn of(usages: &[KeyUsage]) -> Self {
        Self(usages.iter().fold(0, |acc, usage| acc | usage.bit()))
    }

    #[must_use]
    pub fn contains(&self, usage: KeyUsage) -> bool {
        self.0 & usage.bit() != 0
    }

    #[must_use]
    pub fn is_subset_of(&self, other: &KeyUsageSet) -> bool {
        self.0 & !other.0 == 0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = KeyUsage> + '_ {
        KeyUsage::ALL.into_iter().filter(|usage| self.contains(*usage))
    }
}

impl From<Vec<KeyUsage>> for KeyUsageSet {
    fn from(usages: Vec<KeyUsage>) -> Self {
        Self::of(&usages)
    }
}

impl From<KeyUsageSet> for Vec<KeyUsage> {
    fn from(set: KeyUsageSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Display for KeyUsageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(KeyUsage::name).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Decoded basic constraints extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicConstraintsInfo {
    pub ca: bool,
    pub path_len_constraint: Option<u8>,
}

/// Extension as carried in the certificate, value still DER encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExtension {
    pub oid: String,
    pub critical: bool,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCertificate {
    /// Full DER encoding (empty for synthetic certificates).
    pub der: Vec<u8>,
    pub subject: String,
    pub subject_der: Vec<u8>,
    pub issuer: String,
    pub issuer_der: Vec<u8>,
    pub serial_number: Vec<u8>,
    pub not_before: SystemTime,
    pub not_after: SystemTime,
    /// SubjectPublicKeyInfo DER, as handed to the signature verifier.
    pub public_key: Vec<u8>,
    /// Contents of the subjectPublicKey BIT STRING (OCSP key hash input).
    pub public_key_bits: Vec<u8>,
    pub tbs_der: Vec<u8>,
    pub signature: Vec<u8>,
    pub signature_algorithm: String,
    pub extensions: Vec<RawExtension>,
    pub key_usage: Option<KeyUsageSet>,
    pub extended_key_usage: Option<Vec<String>>,
    pub basic_constraints: Option<BasicConstraintsInfo>,
    pub crl_distribution_points: Vec<String>,
    pub ocsp_urls: Vec<String>,
}

impl Default for ParsedCertificate {
    fn default() -> Self {
        Self {
            der: Vec::new(),
            subject: String::new(),
            subject_der: Vec::new(),
            issuer: String::new(),
            issuer_der: Vec::new(),
            serial_number: Vec::new(),
            not_before: SystemTime::UNIX_EPOCH,
            not_after: SystemTime::UNIX_EPOCH,
            public_key: Vec::new(),
            public_key_bits: Vec::new(),
            tbs_der: Vec::new(),
            signature: Vec::new(),
            signature_algorithm: String::new(),
            extensions: Vec::new(),
            key_usage: None,
            extended_key_usage: None,
            basic_constraints: None,
            crl_distribution_points: Vec::new(),
            ocsp_urls: Vec::new(),
        }
    }
}

impl ParsedCertificate {
    /// Parse a single DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> ValidatorResult<Self> {
        let certificate = X509Certificate::from_der(der)?;
        Self::try_from(&certificate)
    }

    /// Parse every certificate found in a PEM bundle, in file order.
    pub fn load_pem_chain(pem: &[u8]) -> ValidatorResult<Vec<Self>> {
        let certificates = X509Certificate::load_pem_chain(pem)?;
        certificates.iter().map(Self::try_from).collect()
    }

    #[must_use]
    pub fn serial_hex(&self) -> String {
        hex::encode(&self.serial_number)
    }

    /// Name used in report items.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} (serial {})", self.subject, self.serial_hex())
    }

    #[must_use]
    pub fn is_self_signed(&self) -> bool {
        self.subject_der == self.issuer_der
    }

    #[must_use]
    pub fn is_ca(&self) -> bool {
        self.basic_constraints.is_some_and(|bc| bc.ca)
    }

    #[must_use]
    pub fn extension(&self, oid: &str) -> Option<&RawExtension> {
        self.extensions.iter().find(|ext| ext.oid == oid)
    }

    #[must_use]
    pub fn has_extension(&self, oid: &str) -> bool {
        self.extension(oid).is_some()
    }

    /// Responder certificates carrying id-pkix-ocsp-nocheck need no revocation check.
    #[must_use]
    pub fn has_ocsp_no_check(&self) -> bool {
        self.has_extension(OID_OCSP_NO_CHECK)
    }

    #[must_use]
    pub fn has_any_extended_key_usage(&self) -> bool {
        self.extended_key_usage
            .as_ref()
            .is_some_and(|ekus| ekus.iter().any(|oid| oid == EKU_ANY))
    }

    /// True when `instant` lies inside `[not_before, not_after]`.
    #[must_use]
    pub fn is_valid_at(&self, instant: SystemTime) -> bool {
        instant >= self.not_before && instant <= self.not_after
    }
}

impl TryFrom<&X509Certificate> for ParsedCertificate {
    type Error = ValidatorError;

    fn try_from(certificate: &X509Certificate) -> Result<Self, Self::Error> {
        let tbs = &certificate.tbs_certificate;
        let mut parsed = ParsedCertificate {
            der: certificate.to_der()?,
            subject: tbs.subject.to_string(),
            subject_der: tbs.subject.to_der()?,
            issuer: tbs.issuer.to_string(),
            issuer_der: tbs.issuer.to_der()?,
            serial_number: tbs.serial_number.as_bytes().to_vec(),
            not_before: tbs.validity.not_before.to_system_time(),
            not_after: tbs.validity.not_after.to_system_time(),
            public_key: tbs.subject_public_key_info.to_der()?,
            public_key_bits: tbs
                .subject_public_key_info
                .subject_public_key
                .raw_bytes()
                .to_vec(),
            tbs_der: tbs.to_der()?,
            signature: certificate.signature.raw_bytes().to_vec(),
            signature_algorithm: certificate.signature_algorithm.oid.to_string(),
            ..ParsedCertificate::default()
        };

        for extension in tbs.extensions.iter().flatten() {
            let oid = extension.extn_id.to_string();
            let value = extension.extn_value.as_bytes();
            match oid.as_str() {
                OID_KEY_USAGE => parsed.key_usage = Some(decode_key_usage(value)?),
                OID_EXTENDED_KEY_USAGE => {
                    let eku = ExtendedKeyUsage::from_der(value)?;
                    parsed.extended_key_usage =
                        Some(eku.0.iter().map(ToString::to_string).collect());
                }
                OID_BASIC_CONSTRAINTS => {
                    let bc = BasicConstraints::from_der(value)?;
                    parsed.basic_constraints = Some(BasicConstraintsInfo {
                        ca: bc.ca,
                        path_len_constraint: bc.path_len_constraint,
                    });
                }
                OID_CRL_DISTRIBUTION_POINTS => {
                    parsed.crl_distribution_points = decode_crl_distribution_points(value)?;
                }
                OID_AUTHORITY_INFO_ACCESS => parsed.ocsp_urls = decode_ocsp_urls(value)?,
                _ => {}
            }
            parsed.extensions.push(RawExtension {
                oid,
                critical: extension.critical,
                value: value.to_vec(),
            });
        }

        log::debug!("Parsed certificate {}", parsed.display_name());
        Ok(parsed)
    }
}

fn decode_key_usage(value: &[u8]) -> ValidatorResult<KeyUsageSet> {
    let ku = X509KeyUsage::from_der(value)?;
    let flags = [
        (ku.digital_signature(), KeyUsage::DigitalSignature),
        (ku.non_repudiation(), KeyUsage::NonRepudiation),
        (ku.key_encipherment(), KeyUsage::KeyEncipherment),
        (ku.data_encipherment(), KeyUsage::DataEncipherment),
        (ku.key_agreement(), KeyUsage::KeyAgreement),
        (ku.key_cert_sign(), KeyUsage::KeyCertSign),
        (ku.crl_sign(), KeyUsage::CrlSign),
        (ku.encipher_only(), KeyUsage::EncipherOnly),
        (ku.decipher_only(), KeyUsage::DecipherOnly),
    ];
    let usages: Vec<KeyUsage> = flags
        .into_iter()
        .filter_map(|(set, usage)| set.then_some(usage))
        .collect();
    Ok(KeyUsageSet::of(&usages))
}

fn uri_of(name: &GeneralName) -> Option<String> {
    match name {
        GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
        _ => None,
    }
}

fn decode_crl_distribution_points(value: &[u8]) -> ValidatorResult<Vec<String>> {
    let points = CrlDistributionPoints::from_der(value)?;
    let mut urls = Vec::new();
    for point in &points.0 {
        if let Some(DistributionPointName::FullName(names)) = &point.distribution_point {
            urls.extend(names.iter().filter_map(uri_of));
        }
    }
    Ok(urls)
}

fn decode_ocsp_urls(value: &[u8]) -> ValidatorResult<Vec<String>> {
    let access = AuthorityInfoAccessSyntax::from_der(value)?;
    Ok(access
        .0
        .iter()
        .filter(|description| description.access_method.to_string() == OID_AD_OCSP)
        .filter_map(|description| uri_of(&description.access_location))
        .collect())
}
