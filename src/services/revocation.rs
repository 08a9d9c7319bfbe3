//! Revocation data validation: gathers OCSP responses and CRLs from the
//! registered clients and reconciles them into a single verdict.
//!
//! OCSP evidence is considered before CRLs. Within a source, candidates are
//! evaluated concurrently and then examined newest first; the first one that
//! settles the question (INFO or INVALID) is adopted. Every other fragment
//! stays in the report, demoted to INFO.

use crate::domain::{
    checks, CertificateSource, CrlInfo, OcspResponse, OnlineFetching, ParsedCertificate,
    ReportItem, ReportItemStatus, SignatureValidationProperties, SingleResponse,
    ValidationContext, ValidationReport, ValidatorContext,
};
use crate::infra::error::{ValidatorError, ValidatorResult};
use crate::services::collaborators::{
    ChainValidation, CrlClient, OcspClient, SignatureVerifier, WalkState,
};
use crate::services::crl_validator::CrlValidator;
use crate::services::ocsp_validator::OcspValidator;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

/// Result of one evaluation pass.
#[derive(Default)]
struct Outcome {
    inconclusive: ValidationReport,
    verdict: Option<ValidationReport>,
}

impl Outcome {
    /// Take the first definitive fragment; every other fragment is kept with
    /// the inconclusive ones.
    fn adopt(&mut self, fragments: Vec<ValidationReport>) {
        let mut fragments = fragments.into_iter();
        for fragment in fragments.by_ref() {
            if fragment.validation_result().is_definitive() {
                self.verdict = Some(fragment);
                break;
            }
            self.inconclusive.extend_from(fragment);
        }
        for older in fragments {
            log::debug!(
                "Older revocation candidate superseded ({})",
                older.validation_result()
            );
            self.inconclusive.extend_from(older);
        }
    }

    fn then(mut self, next: Outcome) -> Outcome {
        self.inconclusive.extend_from(next.inconclusive);
        self.verdict = next.verdict;
        self
    }
}

pub struct RevocationDataValidator {
    properties: Arc<SignatureValidationProperties>,
    crl_validator: CrlValidator,
    ocsp_validator: OcspValidator,
    crl_clients: Vec<Arc<dyn CrlClient>>,
    ocsp_clients: Vec<Arc<dyn OcspClient>>,
}

impl RevocationDataValidator {
    #[must_use]
    pub fn new(
        properties: Arc<SignatureValidationProperties>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            crl_validator: CrlValidator::new(properties.clone(), verifier.clone()),
            ocsp_validator: OcspValidator::new(properties.clone(), verifier),
            properties,
            crl_clients: Vec::new(),
            ocsp_clients: Vec::new(),
        }
    }

    pub fn add_crl_client(&mut self, client: Arc<dyn CrlClient>) -> &mut Self {
        self.crl_clients.push(client);
        self
    }

    pub fn add_ocsp_client(&mut self, client: Arc<dyn OcspClient>) -> &mut Self {
        self.ocsp_clients.push(client);
        self
    }

    /// Check the revocation status of `certificate` at `instant`.
    ///
    /// `issuer` is `None` when the chain walk could not resolve it.
    pub async fn validate(
        &self,
        context: ValidationContext,
        certificate: &ParsedCertificate,
        issuer: Option<&ParsedCertificate>,
        instant: SystemTime,
        walk: WalkState,
        chain: &dyn ChainValidation,
    ) -> ValidationReport {
        let context = context.with_validator_context(ValidatorContext::RevocationDataValidator);
        let name = certificate.display_name();
        let mut report = ValidationReport::new();
        let item = |message: &str, status| {
            ReportItem::for_certificate(checks::REVOCATION_DATA_CHECK, name.clone(), message, status)
        };

        if context.certificate_source() == CertificateSource::OcspIssuer
            && certificate.has_ocsp_no_check()
        {
            report.add_item(item(
                "Revocation check skipped: OCSP responder certificate carries id-pkix-ocsp-nocheck",
                ReportItemStatus::Info,
            ));
            return report;
        }
        if certificate.is_self_signed() {
            report.add_item(item(
                "Revocation check is not required for a self-signed certificate",
                ReportItemStatus::Info,
            ));
            return report;
        }
        let Some(issuer) = issuer else {
            report.add_item(item(
                "Revocation status cannot be checked without the issuer certificate",
                ReportItemStatus::Indeterminate,
            ));
            return report;
        };

        let (online_ocsp, offline_ocsp): (Vec<_>, Vec<_>) =
            self.ocsp_clients.iter().cloned().partition(|c| c.is_online());
        let (online_crl, offline_crl): (Vec<_>, Vec<_>) =
            self.crl_clients.iter().cloned().partition(|c| c.is_online());

        let mode = self.properties.online_fetching(&context);
        log::debug!("Checking revocation of {name} ({mode:?})");
        let outcome = match mode {
            OnlineFetching::Never => {
                self.evaluate(&offline_ocsp, &offline_crl, context, certificate, issuer, instant, walk, chain)
                    .await
            }
            OnlineFetching::Always => {
                let ocsp: Vec<_> = offline_ocsp.into_iter().chain(online_ocsp).collect();
                let crl: Vec<_> = offline_crl.into_iter().chain(online_crl).collect();
                self.evaluate(&ocsp, &crl, context, certificate, issuer, instant, walk, chain)
                    .await
            }
            OnlineFetching::IfNoOtherOptions => {
                let embedded = self
                    .evaluate(&offline_ocsp, &offline_crl, context, certificate, issuer, instant, walk, chain)
                    .await;
                if embedded.verdict.is_some() || (online_ocsp.is_empty() && online_crl.is_empty()) {
                    embedded
                } else {
                    log::info!("No conclusive embedded revocation data for {name}, fetching online");
                    let online = self
                        .evaluate(&online_ocsp, &online_crl, context, certificate, issuer, instant, walk, chain)
                        .await;
                    embedded.then(online)
                }
            }
        };

        match outcome.verdict {
            Some(verdict) => {
                report.extend_from(outcome.inconclusive.demoted());
                report.extend_from(verdict);
            }
            None => {
                report.extend_from(outcome.inconclusive);
                report.add_item(item(
                    "No conclusive revocation data was found",
                    ReportItemStatus::Indeterminate,
                ));
            }
        }
        report
    }

    #[allow(clippy::too_many_arguments)]
    async fn evaluate(
        &self,
        ocsp_clients: &[Arc<dyn OcspClient>],
        crl_clients: &[Arc<dyn CrlClient>],
        context: ValidationContext,
        certificate: &ParsedCertificate,
        issuer: &ParsedCertificate,
        instant: SystemTime,
        walk: WalkState,
        chain: &dyn ChainValidation,
    ) -> Outcome {
        let mut outcome = Outcome::default();

        let (responses, failures) = self
            .gather(ocsp_clients.iter().map(|client| {
                self.bounded(walk, "OCSP", client.fetch(certificate, issuer))
            }))
            .await;
        outcome.inconclusive.extend_from(failures);

        let mut candidates: Vec<(&SingleResponse, &OcspResponse)> = responses
            .iter()
            .flat_map(|response| {
                response
                    .responses_for(certificate, issuer)
                    .map(move |single| (single, response))
            })
            .collect();
        candidates.sort_by(|a, b| b.0.this_update.cmp(&a.0.this_update));
        let fragments = join_all(candidates.iter().map(|(single, response)| {
            self.ocsp_validator.validate(
                context, certificate, issuer, single, response, instant, walk, chain,
            )
        }))
        .await;
        outcome.adopt(fragments);
        if outcome.verdict.is_some() {
            return outcome;
        }

        let (crls, failures) = self
            .gather(
                crl_clients
                    .iter()
                    .map(|client| self.bounded(walk, "CRL", client.fetch(certificate))),
            )
            .await;
        outcome.inconclusive.extend_from(failures);

        let mut crls: Vec<&CrlInfo> = crls.iter().collect();
        crls.sort_by(|a, b| b.this_update.cmp(&a.this_update));
        let fragments = join_all(crls.iter().map(|crl| {
            self.crl_validator
                .validate(context, certificate, issuer, crl, instant, walk, chain)
        }))
        .await;
        outcome.adopt(fragments);
        outcome
    }

    /// Run fetches concurrently; faults become INDETERMINATE items.
    async fn gather<T, F>(
        &self,
        fetches: impl Iterator<Item = F>,
    ) -> (Vec<T>, ValidationReport)
    where
        F: Future<Output = ValidatorResult<Vec<T>>>,
    {
        let mut values = Vec::new();
        let mut failures = ValidationReport::new();
        for result in join_all(fetches).await {
            match result {
                Ok(mut fetched) => values.append(&mut fetched),
                Err(e) => {
                    log::warn!("Revocation data fetch failed: {e}");
                    failures.add_item(
                        ReportItem::new(
                            checks::REVOCATION_DATA_CHECK,
                            "Failed to obtain revocation data",
                            ReportItemStatus::Indeterminate,
                        )
                        .with_cause(&e),
                    );
                }
            }
        }
        (values, failures)
    }

    /// Bound a fetch by the per-fetch timeout and the walk deadline.
    async fn bounded<T>(
        &self,
        walk: WalkState,
        source: &str,
        fetch: impl Future<Output = ValidatorResult<T>>,
    ) -> ValidatorResult<T> {
        let budget = self.properties.fetch_timeout().min(walk.remaining());
        match tokio::time::timeout(budget, fetch).await {
            Ok(result) => result,
            Err(_) => Err(ValidatorError::Timeout(format!(
                "{source} fetch did not complete within {budget:?}"
            ))),
        }
    }
}
