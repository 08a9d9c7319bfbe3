//! Context-keyed validation policy.
//!
//! Each policy is a table of `(ContextPattern, value)` rules plus a default.
//! A pattern constrains any subset of the three context dimensions; lookups
//! pick the most specific matching rule.

use crate::domain::certificate::KeyUsage;
use crate::domain::constants::{
    DEFAULT_FRESHNESS_SECS, DEFAULT_HISTORICAL_FRESHNESS_SECS, DEFAULT_MAX_CHAIN_DEPTH,
};
use crate::domain::context::{
    CertificateSource, TimeBasedContext, ValidationContext, ValidatorContext,
};
use crate::domain::extensions::CertificateExtension;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When revocation data may be fetched from the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnlineFetching {
    Always,
    Never,
    IfNoOtherOptions,
}

/// Partial context; `None` matches any value of that dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_source: Option<CertificateSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_context: Option<ValidatorContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_based_context: Option<TimeBasedContext>,
}

impl ContextPattern {
    /// Pattern matching every context.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn source(mut self, source: CertificateSource) -> Self {
        self.certificate_source = Some(source);
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: ValidatorContext) -> Self {
        self.validator_context = Some(validator);
        self
    }

    #[must_use]
    pub fn time(mut self, time: TimeBasedContext) -> Self {
        self.time_based_context = Some(time);
        self
    }

    /// Pattern constraining every dimension to the values of `context`.
    #[must_use]
    pub fn exact(context: ValidationContext) -> Self {
        Self::any()
            .source(context.certificate_source())
            .validator(context.validator_context())
            .time(context.time_based_context())
    }

    #[must_use]
    pub fn matches(&self, context: &ValidationContext) -> bool {
        self.certificate_source
            .map_or(true, |s| s == context.certificate_source())
            && self
                .validator_context
                .map_or(true, |v| v == context.validator_context())
            && self
                .time_based_context
                .map_or(true, |t| t == context.time_based_context())
    }

    /// Ranking key: constrained dimension count, then which dimensions are
    /// constrained in priority order source > validator > time.
    fn rank(&self) -> (usize, bool, bool, bool) {
        let source = self.certificate_source.is_some();
        let validator = self.validator_context.is_some();
        let time = self.time_based_context.is_some();
        let constrained = [source, validator, time].iter().filter(|d| **d).count();
        (constrained, source, validator, time)
    }
}

/// Value of the most specific rule matching `context`, if any.
///
/// Two distinct patterns that both match a context and share a rank are
/// identical, so the result never depends on rule order.
pub fn resolve_most_specific<'a, T>(
    rules: &'a [(ContextPattern, T)],
    context: &ValidationContext,
) -> Option<&'a T> {
    rules
        .iter()
        .filter(|(pattern, _)| pattern.matches(context))
        .max_by_key(|(pattern, _)| pattern.rank())
        .map(|(_, value)| value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTable<T> {
    rules: Vec<(ContextPattern, T)>,
    default: T,
}

impl<T> PolicyTable<T> {
    pub fn new(default: T) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    /// Register a rule; an identical pattern replaces the previous value.
    pub fn set(&mut self, pattern: ContextPattern, value: T) {
        match self.rules.iter_mut().find(|(p, _)| *p == pattern) {
            Some(rule) => rule.1 = value,
            None => self.rules.push((pattern, value)),
        }
    }

    pub fn resolve(&self, context: &ValidationContext) -> &T {
        resolve_most_specific(&self.rules, context).unwrap_or(&self.default)
    }

    pub fn rules(&self) -> &[(ContextPattern, T)] {
        &self.rules
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignatureValidationProperties {
    continue_after_failure: PolicyTable<bool>,
    freshness: PolicyTable<Duration>,
    required_extensions: PolicyTable<Vec<CertificateExtension>>,
    online_fetching: PolicyTable<OnlineFetching>,
    max_chain_depth: usize,
    fetch_timeout: Duration,
    validation_timeout: Duration,
}

impl Default for SignatureValidationProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureValidationProperties {
    #[must_use]
    pub fn new() -> Self {
        let mut freshness = PolicyTable::new(Duration::from_secs(DEFAULT_FRESHNESS_SECS));
        freshness.set(
            ContextPattern::any().time(TimeBasedContext::Historical),
            Duration::from_secs(DEFAULT_HISTORICAL_FRESHNESS_SECS),
        );

        let mut required_extensions = PolicyTable::new(Vec::new());
        required_extensions.set(
            ContextPattern::any().source(CertificateSource::CertIssuer),
            vec![
                CertificateExtension::key_usage(&[KeyUsage::KeyCertSign]),
                CertificateExtension::ca(true),
            ],
        );
        required_extensions.set(
            ContextPattern::any().source(CertificateSource::CrlIssuer),
            vec![CertificateExtension::key_usage(&[KeyUsage::CrlSign])],
        );
        required_extensions.set(
            ContextPattern::any().source(CertificateSource::OcspIssuer),
            vec![CertificateExtension::ocsp_signing()],
        );
        required_extensions.set(
            ContextPattern::any().source(CertificateSource::Timestamp),
            vec![CertificateExtension::time_stamping()],
        );

        Self {
            continue_after_failure: PolicyTable::new(true),
            freshness,
            required_extensions,
            online_fetching: PolicyTable::new(OnlineFetching::IfNoOtherOptions),
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            fetch_timeout: Duration::from_secs(10),
            validation_timeout: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn continue_after_failure(&self, context: &ValidationContext) -> bool {
        *self.continue_after_failure.resolve(context)
    }

    #[must_use]
    pub fn freshness(&self, context: &ValidationContext) -> Duration {
        *self.freshness.resolve(context)
    }

    #[must_use]
    pub fn required_extensions(&self, context: &ValidationContext) -> &[CertificateExtension] {
        self.required_extensions.resolve(context)
    }

    #[must_use]
    pub fn online_fetching(&self, context: &ValidationContext) -> OnlineFetching {
        *self.online_fetching.resolve(context)
    }

    #[must_use]
    pub fn max_chain_depth(&self) -> usize {
        self.max_chain_depth
    }

    /// Upper bound for a single revocation fetch.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Upper bound for one whole validation, nested walks included.
    #[must_use]
    pub fn validation_timeout(&self) -> Duration {
        self.validation_timeout
    }

    pub fn set_continue_after_failure(&mut self, pattern: ContextPattern, value: bool) -> &mut Self {
        self.continue_after_failure.set(pattern, value);
        self
    }

    pub fn set_freshness(&mut self, pattern: ContextPattern, value: Duration) -> &mut Self {
        self.freshness.set(pattern, value);
        self
    }

    pub fn set_required_extensions(
        &mut self,
        pattern: ContextPattern,
        value: Vec<CertificateExtension>,
    ) -> &mut Self {
        self.required_extensions.set(pattern, value);
        self
    }

    pub fn set_online_fetching(&mut self, pattern: ContextPattern, value: OnlineFetching) -> &mut Self {
        self.online_fetching.set(pattern, value);
        self
    }

    pub fn set_max_chain_depth(&mut self, depth: usize) -> &mut Self {
        self.max_chain_depth = depth;
        self
    }

    pub fn set_fetch_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn set_validation_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.validation_timeout = timeout;
        self
    }
}
