//! Required-extension predicates.
//!
//! A `CertificateExtension` is a capability a certificate must carry for a
//! given validation context. The variant set is closed; each variant knows how
//! to test itself against a parsed certificate.

use crate::domain::certificate::{KeyUsage, KeyUsageSet, ParsedCertificate};
use crate::domain::constants::{EKU_ANY, EKU_OCSP_SIGNING, EKU_TIME_STAMPING};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requirement carried by a basic constraints predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicConstraintsRequirement {
    /// Certificate must be a CA declaring a path length of at least this value.
    PathLen(i32),
    /// Certificate CA flag must equal this value.
    Ca(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CertificateExtension {
    /// Exact match on the DER-encoded extension value.
    Generic {
        oid: String,
        #[serde(with = "hex_bytes")]
        value: Vec<u8>,
    },
    KeyUsage { usages: KeyUsageSet },
    ExtendedKeyUsage { purposes: Vec<String> },
    BasicConstraints { requirement: BasicConstraintsRequirement },
}

impl CertificateExtension {
    /// "No path length required" sentinel.
    ///
    /// Quirk: a `path_len(NOT_SET)` predicate still fails when the certificate
    /// has no basic constraints or no declared path length.
    pub const NOT_SET: i32 = -2;

    #[must_use]
    pub fn key_usage(usages: &[KeyUsage]) -> Self {
        CertificateExtension::KeyUsage {
            usages: KeyUsageSet::of(usages),
        }
    }

    #[must_use]
    pub fn extended_key_usage<S: AsRef<str>>(purposes: &[S]) -> Self {
        CertificateExtension::ExtendedKeyUsage {
            purposes: purposes.iter().map(|p| p.as_ref().to_string()).collect(),
        }
    }

    #[must_use]
    pub fn path_len(min: i32) -> Self {
        CertificateExtension::BasicConstraints {
            requirement: BasicConstraintsRequirement::PathLen(min),
        }
    }

    #[must_use]
    pub fn ca(is_ca: bool) -> Self {
        CertificateExtension::BasicConstraints {
            requirement: BasicConstraintsRequirement::Ca(is_ca),
        }
    }

    #[must_use]
    pub fn generic(oid: impl Into<String>, value: Vec<u8>) -> Self {
        CertificateExtension::Generic {
            oid: oid.into(),
            value,
        }
    }

    #[must_use]
    pub fn ocsp_signing() -> Self {
        Self::extended_key_usage(&[EKU_OCSP_SIGNING])
    }

    #[must_use]
    pub fn time_stamping() -> Self {
        Self::extended_key_usage(&[EKU_TIME_STAMPING])
    }

    /// Whether `certificate` satisfies this requirement.
    #[must_use]
    pub fn exists_in_certificate(&self, certificate: &ParsedCertificate) -> bool {
        match self {
            CertificateExtension::Generic { oid, value } => certificate
                .extension(oid)
                .is_some_and(|ext| &ext.value == value),
            CertificateExtension::KeyUsage { usages } => {
                if usages.is_empty() {
                    return true;
                }
                certificate
                    .key_usage
                    .is_some_and(|held| usages.is_subset_of(&held))
            }
            CertificateExtension::ExtendedKeyUsage { purposes } => {
                if purposes.is_empty() {
                    return true;
                }
                let Some(held) = &certificate.extended_key_usage else {
                    return false;
                };
                if held.iter().any(|oid| oid == EKU_ANY) {
                    return true;
                }
                purposes.iter().all(|wanted| held.contains(wanted))
            }
            CertificateExtension::BasicConstraints { requirement } => {
                let Some(bc) = certificate.basic_constraints else {
                    // absent extension: CA=false, no path length
                    return matches!(requirement, BasicConstraintsRequirement::Ca(false));
                };
                match requirement {
                    BasicConstraintsRequirement::Ca(is_ca) => bc.ca == *is_ca,
                    BasicConstraintsRequirement::PathLen(min) => {
                        bc.ca
                            && bc
                                .path_len_constraint
                                .is_some_and(|declared| i32::from(declared) >= *min)
                    }
                }
            }
        }
    }

    /// Short description used in report messages.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            CertificateExtension::Generic { oid, .. } => format!("extension {oid}"),
            CertificateExtension::KeyUsage { usages } => format!("key usage {usages}"),
            CertificateExtension::ExtendedKeyUsage { purposes } => {
                format!("extended key usage [{}]", purposes.join(", "))
            }
            CertificateExtension::BasicConstraints { requirement } => match requirement {
                BasicConstraintsRequirement::Ca(true) => "basic constraints CA=true".to_string(),
                BasicConstraintsRequirement::Ca(false) => {
                    "basic constraints CA=false".to_string()
                }
                BasicConstraintsRequirement::PathLen(min) => {
                    format!("basic constraints pathLen >= {min}")
                }
            },
        }
    }
}

impl fmt::Display for CertificateExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}
