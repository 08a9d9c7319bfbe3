//! OCSP validation service.

use crate::domain::report::format_instant;
use crate::domain::{
    checks, CertStatus, CertificateExtension, CertificateSource, OcspResponse, ParsedCertificate,
    ReportItem, ReportItemStatus, SignatureValidationProperties, SingleResponse,
    ValidationContext, ValidationReport, ValidatorContext,
};
use crate::infra::error::ValidatorResult;
use crate::services::collaborators::{ChainValidation, SignatureVerifier, WalkState};
use std::sync::Arc;
use std::time::SystemTime;

/// Who signed an OCSP response.
enum Responder<'a> {
    Issuer,
    Delegated(&'a ParsedCertificate),
}

pub struct OcspValidator {
    properties: Arc<SignatureValidationProperties>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl OcspValidator {
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

    /// Validate one single response of `response` for `certificate`.
    #[allow(clippy::too_many_arguments)]
    pub async fn validate(
        &self,
        context: ValidationContext,
        certificate: &ParsedCertificate,
        issuer: &ParsedCertificate,
        single: &SingleResponse,
        response: &OcspResponse,
        instant: SystemTime,
        walk: WalkState,
        chain: &dyn ChainValidation,
    ) -> ValidationReport {
        let context = context.with_validator_context(ValidatorContext::OcspValidator);
        let name = certificate.display_name();
        let mut report = ValidationReport::new();
        let item = |message: String, status| {
            ReportItem::for_certificate(checks::OCSP_CHECK, name.clone(), message, status)
        };

        if !single.cert_id.matches(certificate, issuer) {
            report.add_item(item(
                "OCSP response does not refer to this certificate".to_string(),
                ReportItemStatus::Indeterminate,
            ));
            return report;
        }

        match self.identify_responder(response, issuer) {
            Ok(Some(Responder::Issuer)) => {
                log::debug!("OCSP response for {name} signed by issuer {}", issuer.subject);
            }
            Ok(Some(Responder::Delegated(responder))) => {
                log::debug!("OCSP response for {name} signed by delegated responder {}", responder.subject);
                let responder_report = chain
                    .validate_chain(
                        context.with_certificate_source(CertificateSource::OcspIssuer),
                        responder,
                        instant,
                        walk.descend(),
                    )
                    .await
                    .capped_at(ReportItemStatus::Indeterminate);
                let responder_status = responder_report.validation_result();
                report.extend_from(responder_report);
                if responder_status != ReportItemStatus::Info {
                    report.add_item(item(
                        format!("OCSP responder {} could not be validated", responder.subject),
                        ReportItemStatus::Indeterminate,
                    ));
                    return report;
                }
            }
            Ok(None) => {
                report.add_item(item(
                    "OCSP response is not signed by the issuer or an authorized responder"
                        .to_string(),
                    ReportItemStatus::Indeterminate,
                ));
                return report;
            }
            Err(e) => {
                log::warn!("OCSP signature verification failed: {e}");
                report.add_item(
                    item(
                        "Internal error while verifying OCSP response signature".to_string(),
                        ReportItemStatus::Indeterminate,
                    )
                    .with_cause(&e),
                );
                return report;
            }
        }

        let freshness = self.properties.freshness(&context);
        // overflow means the window never closes
        let fresh_until = single
            .next_update
            .unwrap_or(single.this_update)
            .checked_add(freshness);
        if instant < single.this_update || fresh_until.is_some_and(|until| instant > until) {
            report.add_item(item(
                format!(
                    "OCSP response valid from {} until {} does not cover validation time {}",
                    format_instant(single.this_update),
                    fresh_until.map_or_else(|| "further notice".to_string(), format_instant),
                    format_instant(instant)
                ),
                ReportItemStatus::Indeterminate,
            ));
            return report;
        }

        match &single.status {
            CertStatus::Good => {
                report.add_item(item(
                    "OCSP response reports the certificate as good".to_string(),
                    ReportItemStatus::Info,
                ));
            }
            CertStatus::Revoked {
                revocation_time, ..
            } if *revocation_time <= instant => {
                log::info!("Certificate {name} is revoked according to OCSP");
                report.add_item(item(
                    format!(
                        "Certificate {} was revoked on {}",
                        name,
                        format_instant(*revocation_time)
                    ),
                    ReportItemStatus::Invalid,
                ));
            }
            CertStatus::Revoked {
                revocation_time, ..
            } => {
                report.add_item(item(
                    format!(
                        "Certificate was revoked on {}, after the validation time",
                        format_instant(*revocation_time)
                    ),
                    ReportItemStatus::Info,
                ));
            }
            CertStatus::Unknown => {
                report.add_item(item(
                    "OCSP responder does not know the certificate".to_string(),
                    ReportItemStatus::Indeterminate,
                ));
            }
        }
        report
    }

    /// Find the key that verifies the response signature: the issuer's own key
    /// or that of an embedded responder certificate the issuer delegated to.
    fn identify_responder<'a>(
        &self,
        response: &'a OcspResponse,
        issuer: &ParsedCertificate,
    ) -> ValidatorResult<Option<Responder<'a>>> {
        if self.signed_by(response, issuer)? {
            return Ok(Some(Responder::Issuer));
        }

        let ocsp_signing = CertificateExtension::ocsp_signing();
        for candidate in &response.certificates {
            if !ocsp_signing.exists_in_certificate(candidate)
                || candidate.issuer_der != issuer.subject_der
            {
                continue;
            }
            let issued_by_issuer = self.verifier.verify(
                &candidate.tbs_der,
                &candidate.signature,
                &candidate.signature_algorithm,
                &issuer.public_key,
            )?;
            if issued_by_issuer && self.signed_by(response, candidate)? {
                return Ok(Some(Responder::Delegated(candidate)));
            }
        }
        Ok(None)
    }

    fn signed_by(&self, response: &OcspResponse, signer: &ParsedCertificate) -> ValidatorResult<bool> {
        self.verifier.verify(
            &response.tbs_der,
            &response.signature,
            &response.signature_algorithm,
            &signer.public_key,
        )
    }
}
