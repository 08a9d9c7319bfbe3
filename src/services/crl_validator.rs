//! CRL validation service.
//!
//! Checks one CRL against one certificate: issuer binding and signature, the
//! CRL issuer's own chain, freshness at the validation instant, and finally the
//! revocation entry for the certificate's serial number.
//!
//! A CRL issuer chain that cannot be confirmed caps the outcome at
//! INDETERMINATE but does not hide a revocation entry.

use crate::domain::report::format_instant;
use crate::domain::{
    checks, CertificateSource, CrlInfo, ParsedCertificate, ReportItem, ReportItemStatus,
    SignatureValidationProperties, ValidationContext, ValidationReport, ValidatorContext,
};
use crate::services::collaborators::{ChainValidation, SignatureVerifier, WalkState};
use std::sync::Arc;
use std::time::SystemTime;

pub struct CrlValidator {
    properties: Arc<SignatureValidationProperties>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl CrlValidator {
    #[must_use]
    pub fn new(
        properties: Arc<SignatureValidationProperties>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            properties,
            verifier,
        }
    }

    /// Validate `certificate` against `crl` at `instant`.
    ///
    /// `issuer` is the certificate's issuer; it must also be the CRL issuer.
    #[allow(clippy::too_many_arguments)]
    pub async fn validate(
        &self,
        context: ValidationContext,
        certificate: &ParsedCertificate,
        issuer: &ParsedCertificate,
        crl: &CrlInfo,
        instant: SystemTime,
        walk: WalkState,
        chain: &dyn ChainValidation,
    ) -> ValidationReport {
        let context = context.with_validator_context(ValidatorContext::CrlValidator);
        let name = certificate.display_name();
        let mut report = ValidationReport::new();
        let item = |message: String, status| {
            ReportItem::for_certificate(checks::CRL_CHECK, name.clone(), message, status)
        };

        if certificate.is_self_signed() {
            report.add_item(item(
                "CRL check is not required for a self-signed certificate".to_string(),
                ReportItemStatus::Info,
            ));
            return report;
        }

        if crl.issuer_der != certificate.issuer_der || issuer.subject_der != crl.issuer_der {
            report.add_item(item(
                format!(
                    "CRL issuer {} does not match certificate issuer {}",
                    crl.issuer, certificate.issuer
                ),
                ReportItemStatus::Indeterminate,
            ));
            return report;
        }

        match self.verifier.verify(
            &crl.tbs_der,
            &crl.signature,
            &crl.signature_algorithm,
            &issuer.public_key,
        ) {
            Ok(true) => {}
            Ok(false) => {
                report.add_item(item(
                    format!("CRL signature does not verify with the key of {}", issuer.subject),
                    ReportItemStatus::Indeterminate,
                ));
                return report;
            }
            Err(e) => {
                log::warn!("CRL signature verification failed: {e}");
                report.add_item(
                    item(
                        "Internal error while verifying CRL signature".to_string(),
                        ReportItemStatus::Indeterminate,
                    )
                    .with_cause(&e),
                );
                return report;
            }
        }

        let issuer_report = chain
            .validate_chain(
                context.with_certificate_source(CertificateSource::CrlIssuer),
                issuer,
                instant,
                walk.descend(),
            )
            .await
            .capped_at(ReportItemStatus::Indeterminate);
        let issuer_status = issuer_report.validation_result();
        report.extend_from(issuer_report);
        if issuer_status != ReportItemStatus::Info {
            report.add_item(item(
                format!("CRL issuer {} could not be validated", issuer.subject),
                ReportItemStatus::Indeterminate,
            ));
        }

        let freshness = self.properties.freshness(&context);
        // overflow means the window never closes
        let fresh_until = crl
            .next_update
            .unwrap_or(crl.this_update)
            .checked_add(freshness);
        if instant < crl.this_update {
            report.add_item(item(
                format!(
                    "CRL was issued at {}, after the validation time {}",
                    format_instant(crl.this_update),
                    format_instant(instant)
                ),
                ReportItemStatus::Indeterminate,
            ));
            return report;
        }
        if let Some(fresh_until) = fresh_until.filter(|until| instant > *until) {
            report.add_item(item(
                format!(
                    "CRL is stale: usable until {}, validation time {}",
                    format_instant(fresh_until),
                    format_instant(instant)
                ),
                ReportItemStatus::Indeterminate,
            ));
            return report;
        }

        match crl.find_revoked(&certificate.serial_number) {
            Some(entry) if entry.revocation_date <= instant => {
                log::info!("Certificate {name} is revoked according to CRL from {}", crl.issuer);
                report.add_item(item(
                    format!(
                        "Certificate {} was revoked on {}",
                        name,
                        format_instant(entry.revocation_date)
                    ),
                    ReportItemStatus::Invalid,
                ));
            }
            Some(entry) => {
                report.add_item(item(
                    format!(
                        "Certificate was revoked on {}, after the validation time",
                        format_instant(entry.revocation_date)
                    ),
                    ReportItemStatus::Info,
                ));
            }
            None => {
                log::debug!("Certificate {name} not found on CRL from {}", crl.issuer);
                report.add_item(item(
                    "Certificate not found on CRL".to_string(),
                    ReportItemStatus::Info,
                ));
            }
        }
        report
    }
}
