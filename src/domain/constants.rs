//! Centralized constants for commonly repeated OIDs and DER tags.
//! Keep this intentionally small; only broadly reused literals should live here.

// === Certificate Extension OIDs ===

/// id-ce-keyUsage
pub const OID_KEY_USAGE: &str = "2.5.29.15";

/// id-ce-basicConstraints
pub const OID_BASIC_CONSTRAINTS: &str = "2.5.29.19";

/// id-ce-extKeyUsage
pub const OID_EXTENDED_KEY_USAGE: &str = "2.5.29.37";

/// id-ce-cRLDistributionPoints
pub const OID_CRL_DISTRIBUTION_POINTS: &str = "2.5.29.31";

/// id-pe-authorityInfoAccess
pub const OID_AUTHORITY_INFO_ACCESS: &str = "1.3.6.1.5.5.7.1.1";

/// id-ce-cRLReasons (CRL entry extension)
pub const OID_CRL_REASON: &str = "2.5.29.21";

/// id-pkix-ocsp-nocheck
pub const OID_OCSP_NO_CHECK: &str = "1.3.6.1.5.5.7.48.1.5";

/// id-ad-ocsp access method
pub const OID_AD_OCSP: &str = "1.3.6.1.5.5.7.48.1";

// === Extended Key Usage Purposes ===

/// anyExtendedKeyUsage (wildcard purpose)
pub const EKU_ANY: &str = "2.5.29.37.0";

/// id-kp-serverAuth
pub const EKU_SERVER_AUTH: &str = "1.3.6.1.5.5.7.3.1";

/// id-kp-codeSigning
pub const EKU_CODE_SIGNING: &str = "1.3.6.1.5.5.7.3.3";

/// id-kp-timeStamping
pub const EKU_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";

/// id-kp-OCSPSigning
pub const EKU_OCSP_SIGNING: &str = "1.3.6.1.5.5.7.3.9";

// === Signature Algorithm OIDs ===

/// sha1WithRSAEncryption (legacy CRLs)
pub const OID_SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";

/// sha256WithRSAEncryption
pub const OID_SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";

/// sha384WithRSAEncryption
pub const OID_SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";

/// sha512WithRSAEncryption
pub const OID_SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";

/// ecdsa-with-SHA1
pub const OID_ECDSA_WITH_SHA1: &str = "1.2.840.10045.4.1";

/// ecdsa-with-SHA256
pub const OID_ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";

/// ecdsa-with-SHA384
pub const OID_ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";

/// ecdsa-with-SHA512
pub const OID_ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";

/// id-Ed25519
pub const OID_ED25519: &str = "1.3.101.112";

// === ASN.1 DER Constants ===

/// ASN.1 ENUMERATED tag
pub const ASN1_ENUMERATED_TAG: u8 = 0x0A;

/// CRLReason value for entries lifted from a delta CRL
pub const CRL_REASON_REMOVE_FROM_CRL: u8 = 8;

// === Chain Walk Limits ===

/// Default hard cap on the number of hops (including nested issuer walks)
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 16;

/// Default freshness tolerance for revocation evidence (30 days)
pub const DEFAULT_FRESHNESS_SECS: u64 = 30 * 24 * 60 * 60;

/// Default freshness tolerance for historical validation (1 day)
pub const DEFAULT_HISTORICAL_FRESHNESS_SECS: u64 = 24 * 60 * 60;

/// Upper bound accepted for freshness windows in configuration files (100 years)
pub const MAX_FRESHNESS_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Upper bound accepted for timeouts in configuration files (one day)
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;
