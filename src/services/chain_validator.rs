//! Certificate chain validation service.
//!
//! Walks from a certificate towards a trust anchor, one hop per loop
//! iteration. Each hop checks the validity period, the extensions required for
//! the certificate's role, trust, revocation and finally the issuer signature.
//! The hop counter lives in `WalkState` and is shared with nested walks started
//! for CRL issuers and OCSP responders.

use crate::domain::report::format_instant;
use crate::domain::{
    checks, CertificateExtension, CertificateSource, ParsedCertificate, ReportItem,
    ReportItemStatus, SignatureValidationProperties, ValidationContext, ValidationReport,
    ValidatorContext,
};
use crate::services::collaborators::{
    CertificateRetriever, ChainValidation, SignatureVerifier, TrustedCertificatesStore, WalkState,
};
use crate::services::revocation::RevocationDataValidator;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::SystemTime;

pub struct CertificateChainValidator {
    properties: Arc<SignatureValidationProperties>,
    retriever: Arc<dyn CertificateRetriever>,
    trust_store: Arc<dyn TrustedCertificatesStore>,
    verifier: Arc<dyn SignatureVerifier>,
    revocation: RevocationDataValidator,
}

impl CertificateChainValidator {
    #[must_use]
    pub fn new(
        properties: Arc<SignatureValidationProperties>,
        retriever: Arc<dyn CertificateRetriever>,
        trust_store: Arc<dyn TrustedCertificatesStore>,
        verifier: Arc<dyn SignatureVerifier>,
        revocation: RevocationDataValidator,
    ) -> Self {
        Self {
            properties,
            retriever,
            trust_store,
            verifier,
            revocation,
        }
    }

    #[must_use]
    pub fn properties(&self) -> &SignatureValidationProperties {
        &self.properties
    }

    /// Validate the chain of `certificate` at `instant` in `context`.
    pub async fn validate(
        &self,
        context: ValidationContext,
        certificate: &ParsedCertificate,
        instant: SystemTime,
    ) -> ValidationReport {
        let walk = WalkState::new(self.properties.validation_timeout());
        let report = self.walk(context, certificate, instant, walk).await;
        log::info!(
            "Chain validation of {} finished: {}",
            certificate.display_name(),
            report.validation_result()
        );
        report
    }

    fn should_stop(&self, context: &ValidationContext, report: &ValidationReport) -> bool {
        report.has_invalid() && !self.properties.continue_after_failure(context)
    }

    async fn walk(
        &self,
        context: ValidationContext,
        certificate: &ParsedCertificate,
        instant: SystemTime,
        mut walk: WalkState,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();
        let mut context = context.with_validator_context(ValidatorContext::ChainValidator);
        let mut current = certificate.clone();
        // CA certificates already passed below `current`, for pathLen checks
        let mut intermediates_below: i32 = 0;
        let max_depth = self.properties.max_chain_depth();

        loop {
            let name = current.display_name();
            if walk.depth > max_depth {
                report.add_item(ReportItem::for_certificate(
                    checks::CHAIN_CHECK,
                    name,
                    format!("Certificate chain exceeds the maximum depth of {max_depth}"),
                    ReportItemStatus::Invalid,
                ));
                break;
            }
            if walk.is_expired() {
                report.add_item(ReportItem::for_certificate(
                    checks::CHAIN_CHECK,
                    name,
                    "Validation time budget exhausted",
                    ReportItemStatus::Indeterminate,
                ));
                break;
            }
            log::debug!("Validating {name} as {:?} (depth {})", context.certificate_source(), walk.depth);

            if !current.is_valid_at(instant) {
                report.add_item(ReportItem::for_certificate(
                    checks::VALIDITY_PERIOD_CHECK,
                    name.clone(),
                    format!(
                        "Certificate {} is not valid at {}: validity period is {} to {}",
                        name,
                        format_instant(instant),
                        format_instant(current.not_before),
                        format_instant(current.not_after)
                    ),
                    ReportItemStatus::Invalid,
                ));
            }
            if self.should_stop(&context, &report) {
                break;
            }

            for extension in self.properties.required_extensions(&context) {
                if !extension.exists_in_certificate(&current) {
                    report.add_item(ReportItem::for_certificate(
                        checks::EXTENSIONS_CHECK,
                        name.clone(),
                        format!(
                            "Certificate {} lacks required {} for {:?}",
                            name,
                            extension,
                            context.certificate_source()
                        ),
                        ReportItemStatus::Invalid,
                    ));
                }
            }
            if context.certificate_source() == CertificateSource::CertIssuer {
                let declared = current.basic_constraints.and_then(|bc| bc.path_len_constraint);
                if let Some(declared) = declared {
                    if !CertificateExtension::path_len(intermediates_below).exists_in_certificate(&current) {
                        report.add_item(ReportItem::for_certificate(
                            checks::EXTENSIONS_CHECK,
                            name.clone(),
                            format!(
                                "Path length constraint {declared} of {name} exceeded by {intermediates_below} intermediate certificates"
                            ),
                            ReportItemStatus::Invalid,
                        ));
                    }
                }
            }
            if self.should_stop(&context, &report) {
                break;
            }

            if self.trust_store.is_trusted_for(&current, context.certificate_source()) {
                report.add_item(ReportItem::for_certificate(
                    checks::TRUST_CHECK,
                    name.clone(),
                    format!("Certificate {name} is trusted"),
                    ReportItemStatus::Info,
                ));
                break;
            }

            let lookup = if current.is_self_signed() {
                Ok(None)
            } else {
                self.retriever.find_issuer(&current)
            };
            let issuer = lookup.as_ref().ok().and_then(Option::as_ref);

            let revocation_report = self
                .revocation
                .validate(context, &current, issuer, instant, walk, self)
                .await;
            report.extend_from(revocation_report);
            if self.should_stop(&context, &report) {
                break;
            }

            if current.is_self_signed() {
                report.add_item(ReportItem::for_certificate(
                    checks::CHAIN_CHECK,
                    name.clone(),
                    format!("Self-signed certificate {name} is not a trust anchor"),
                    ReportItemStatus::Indeterminate,
                ));
                break;
            }
            let issuer = match lookup {
                Ok(Some(issuer)) => issuer,
                Ok(None) => {
                    report.add_item(ReportItem::for_certificate(
                        checks::CHAIN_CHECK,
                        name.clone(),
                        format!("Issuer {} of certificate {} could not be found", current.issuer, name),
                        ReportItemStatus::Indeterminate,
                    ));
                    break;
                }
                Err(e) => {
                    log::warn!("Issuer lookup for {name} failed: {e}");
                    report.add_item(
                        ReportItem::for_certificate(
                            checks::CHAIN_CHECK,
                            name.clone(),
                            "Internal error while retrieving the issuer certificate",
                            ReportItemStatus::Indeterminate,
                        )
                        .with_cause(&e),
                    );
                    break;
                }
            };

            match self.verifier.verify(
                &current.tbs_der,
                &current.signature,
                &current.signature_algorithm,
                &issuer.public_key,
            ) {
                Ok(true) => {}
                Ok(false) => report.add_item(ReportItem::for_certificate(
                    checks::CHAIN_CHECK,
                    name.clone(),
                    format!(
                        "Signature of {} does not verify with the key of {}",
                        name, issuer.subject
                    ),
                    ReportItemStatus::Invalid,
                )),
                Err(e) => report.add_item(
                    ReportItem::for_certificate(
                        checks::CHAIN_CHECK,
                        name.clone(),
                        "Internal error while verifying the certificate signature",
                        ReportItemStatus::Indeterminate,
                    )
                    .with_cause(&e),
                ),
            }
            if self.should_stop(&context, &report) {
                break;
            }

            if context.certificate_source() == CertificateSource::CertIssuer {
                intermediates_below += 1;
            }
            context = context.with_certificate_source(CertificateSource::CertIssuer);
            current = issuer;
            walk = walk.descend();
        }
        report
    }
}

impl ChainValidation for CertificateChainValidator {
    fn validate_chain<'a>(
        &'a self,
        context: ValidationContext,
        certificate: &'a ParsedCertificate,
        instant: SystemTime,
        walk: WalkState,
    ) -> BoxFuture<'a, ValidationReport> {
        Box::pin(self.walk(context, certificate, instant, walk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContextPattern, KeyUsage, OnlineFetching, TimeBasedContext};
    use crate::infra::error::ValidatorResult;
    use crate::test_fixtures::*;

    struct Setup {
        pki: TestPki,
        store: FakeStore,
        properties: SignatureValidationProperties,
        crls: Vec<crate::domain::CrlInfo>,
    }

    impl Setup {
        fn new() -> Self {
            let pki = TestPki::new();
            let store = pki.store();
            let mut properties = SignatureValidationProperties::new();
            properties.set_online_fetching(ContextPattern::any(), OnlineFetching::Never);
            let crls = vec![
                crl(&pki.root, day(10), Some(day(40)), vec![]),
                crl(&pki.ca, day(10), Some(day(40)), vec![]),
            ];
            Self {
                pki,
                store,
                properties,
                crls,
            }
        }

        fn validator(self) -> CertificateChainValidator {
            let properties = Arc::new(self.properties);
            let verifier: Arc<dyn SignatureVerifier> = Arc::new(FakeVerifier);
            let mut revocation = RevocationDataValidator::new(properties.clone(), verifier.clone());
            revocation.add_crl_client(FakeCrlClient::new(self.crls, false));
            let store = Arc::new(self.store);
            CertificateChainValidator::new(properties, store.clone(), store, verifier, revocation)
        }
    }

    fn signer_context() -> ValidationContext {
        ValidationContext::for_signer(TimeBasedContext::Present)
    }

    #[tokio::test]
    async fn anchored_chain_with_fresh_crls_is_valid() {
        let setup = Setup::new();
        let leaf = setup.pki.leaf.clone();
        let report = setup.validator().validate(signer_context(), &leaf, day(12)).await;
        assert_eq!(report.validation_result(), ReportItemStatus::Info, "{report}");
        assert!(report
            .items()
            .iter()
            .any(|i| i.check == checks::TRUST_CHECK && i.message.contains("CN=Root")));
    }

    #[tokio::test]
    async fn revoked_leaf_is_invalid() {
        let mut setup = Setup::new();
        setup.crls[1] = crl(&setup.pki.ca, day(10), Some(day(40)), vec![revoked(&[0x30], day(11))]);
        let leaf = setup.pki.leaf.clone();
        let report = setup.validator().validate(signer_context(), &leaf, day(12)).await;
        assert_eq!(report.validation_result(), ReportItemStatus::Invalid);
    }

    #[tokio::test]
    async fn expired_certificate_is_invalid() {
        let setup = Setup::new();
        let report = setup
            .validator()
            .validate(signer_context(), &TestPki::new().leaf, day(4000))
            .await;
        assert_eq!(report.validation_result(), ReportItemStatus::Invalid);
        assert_eq!(report.items()[0].check, checks::VALIDITY_PERIOD_CHECK);
    }

    #[tokio::test]
    async fn fail_fast_stops_after_first_invalid() {
        let mut setup = Setup::new();
        setup
            .properties
            .set_continue_after_failure(ContextPattern::any(), false);
        let leaf = setup.pki.leaf.clone();
        let report = setup.validator().validate(signer_context(), &leaf, day(4000)).await;
        assert_eq!(report.validation_result(), ReportItemStatus::Invalid);
        assert_eq!(report.items().len(), 1);
    }

    #[tokio::test]
    async fn continue_after_failure_collects_more_findings() {
        let setup = Setup::new();
        let leaf = setup.pki.leaf.clone();
        let report = setup.validator().validate(signer_context(), &leaf, day(4000)).await;
        assert!(report.items().len() > 1);
    }

    #[tokio::test]
    async fn missing_issuer_is_indeterminate() {
        let mut setup = Setup::new();
        setup.store.known.clear();
        let leaf = setup.pki.leaf.clone();
        let report = setup.validator().validate(signer_context(), &leaf, day(12)).await;
        assert_eq!(report.validation_result(), ReportItemStatus::Indeterminate);
        let last = report.items().last().unwrap();
        assert_eq!(last.check, checks::CHAIN_CHECK);
        assert!(last.message.contains("could not be found"));
    }

    #[tokio::test]
    async fn untrusted_self_signed_root_is_indeterminate() {
        let mut setup = Setup::new();
        let root = setup.pki.root.clone();
        setup.store.anchors.clear();
        setup.store.known.push(root);
        let leaf = setup.pki.leaf.clone();
        let report = setup.validator().validate(signer_context(), &leaf, day(12)).await;
        assert_eq!(report.validation_result(), ReportItemStatus::Indeterminate);
        assert!(report
            .items()
            .iter()
            .any(|i| i.message.contains("is not a trust anchor")));
    }

    #[tokio::test]
    async fn retriever_fault_is_indeterminate_with_cause() {
        let mut setup = Setup::new();
        setup.store.fail_lookup = true;
        let leaf = setup.pki.leaf.clone();
        let report = setup.validator().validate(signer_context(), &leaf, day(12)).await;
        assert_eq!(report.validation_result(), ReportItemStatus::Indeterminate);
        let last = report.items().last().unwrap();
        assert!(last.cause.as_deref().unwrap().contains("store offline"));
    }

    #[tokio::test]
    async fn forged_signature_is_invalid() {
        let setup = Setup::new();
        let forged = CertBuilder::new("CN=Forged")
            .issued_by(&setup.pki.ca)
            .signed_with(b"attacker key")
            .serial(&[0x66])
            .build();
        let report = setup.validator().validate(signer_context(), &forged, day(12)).await;
        assert_eq!(report.validation_result(), ReportItemStatus::Invalid);
        assert!(report
            .failures()
            .any(|i| i.message.contains("does not verify")));
    }

    #[tokio::test]
    async fn issuer_without_key_cert_sign_is_invalid() {
        let mut setup = Setup::new();
        let weak_ca = CertBuilder::new("CN=Weak CA")
            .issued_by(&setup.pki.root)
            .key_usage(&[KeyUsage::CrlSign])
            .ca(None)
            .build();
        let leaf = CertBuilder::new("CN=Leaf").issued_by(&weak_ca).build();
        setup.store.known.push(weak_ca);
        let report = setup.validator().validate(signer_context(), &leaf, day(12)).await;
        assert_eq!(report.validation_result(), ReportItemStatus::Invalid);
        assert!(report
            .failures()
            .any(|i| i.check == checks::EXTENSIONS_CHECK && i.message.contains("keyCertSign")));
    }

    #[tokio::test]
    async fn path_length_constraint_is_enforced() {
        let mut setup = Setup::new();
        let root = CertBuilder::new("CN=Strict Root")
            .key_usage(&[KeyUsage::KeyCertSign, KeyUsage::CrlSign])
            .ca(Some(0))
            .build();
        let ca = CertBuilder::new("CN=Sub CA").issued_by(&root).issuing_ca().build();
        let leaf = CertBuilder::new("CN=Leaf").issued_by(&ca).build();
        setup.store = FakeStore::with(vec![ca], vec![root]);
        let report = setup.validator().validate(signer_context(), &leaf, day(12)).await;
        assert!(report
            .failures()
            .any(|i| i.message.contains("Path length constraint 0")));
    }

    #[tokio::test]
    async fn depth_limit_is_enforced() {
        let mut setup = Setup::new();
        setup.properties.set_max_chain_depth(1);
        let leaf = setup.pki.leaf.clone();
        let report = setup.validator().validate(signer_context(), &leaf, day(12)).await;
        assert_eq!(report.validation_result(), ReportItemStatus::Invalid);
        assert!(report
            .failures()
            .any(|i| i.message.contains("maximum depth of 1")));
    }

    #[tokio::test]
    async fn trust_scoped_to_other_usage_is_not_used() {
        let mut setup = Setup::new();
        let root = setup.pki.root.clone();
        setup.store.anchors = vec![(root, Some(CertificateSource::Timestamp))];
        let leaf = setup.pki.leaf.clone();
        let report = setup.validator().validate(signer_context(), &leaf, day(12)).await;
        assert_ne!(report.validation_result(), ReportItemStatus::Info);
    }

    struct CountingRetriever(std::sync::atomic::AtomicUsize);

    impl CertificateRetriever for CountingRetriever {
        fn find_issuer(&self, _: &ParsedCertificate) -> ValidatorResult<Option<ParsedCertificate>> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test]
    async fn trusted_leaf_needs_no_lookup() {
        let setup = Setup::new();
        let leaf = setup.pki.leaf.clone();
        let retriever = Arc::new(CountingRetriever(Default::default()));
        let properties = Arc::new(setup.properties);
        let verifier: Arc<dyn SignatureVerifier> = Arc::new(FakeVerifier);
        let store = Arc::new(FakeStore::with(vec![], vec![leaf.clone()]));
        let validator = CertificateChainValidator::new(
            properties.clone(),
            retriever.clone(),
            store,
            verifier.clone(),
            RevocationDataValidator::new(properties, verifier),
        );
        let report = validator.validate(signer_context(), &leaf, day(12)).await;
        assert_eq!(report.validation_result(), ReportItemStatus::Info);
        assert_eq!(retriever.0.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
