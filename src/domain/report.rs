//! Validation report domain types.
//!
//! A `ValidationReport` is an ordered, append-only list of findings. Its status
//! is the worst status of any item it holds, so it can only get worse as items
//! are added. Validators build their own report fragments and the orchestrating
//! caller merges them; no report is ever shared between concurrent branches.

use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

/// Check identifiers used as `ReportItem::check`.
pub mod checks {
    pub const CERTIFICATE_CHECK: &str = "Certificate check.";
    pub const VALIDITY_PERIOD_CHECK: &str = "Certificate validity period check.";
    pub const EXTENSIONS_CHECK: &str = "Required certificate extensions check.";
    pub const TRUST_CHECK: &str = "Certificate trust check.";
    pub const CHAIN_CHECK: &str = "Certificate chain check.";
    pub const REVOCATION_DATA_CHECK: &str = "Revocation data check.";
    pub const CRL_CHECK: &str = "CRL response check.";
    pub const OCSP_CHECK: &str = "OCSP response check.";
}

/// Status of a single finding, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportItemStatus {
    Info,
    Indeterminate,
    Invalid,
}

impl ReportItemStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportItemStatus::Info => "INFO",
            ReportItemStatus::Indeterminate => "INDETERMINATE",
            ReportItemStatus::Invalid => "INVALID",
        }
    }

    /// `Info` and `Invalid` settle a question; `Indeterminate` does not.
    #[must_use]
    pub fn is_definitive(&self) -> bool {
        !matches!(self, ReportItemStatus::Indeterminate)
    }
}

impl fmt::Display for ReportItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One itemized finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportItem {
    /// Which check produced the finding (see [`checks`]).
    pub check: String,
    /// Human readable description.
    pub message: String,
    pub status: ReportItemStatus,
    /// Display name of the certificate the finding is about, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    /// Text of the underlying error for "internal error" findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ReportItem {
    #[must_use]
    pub fn new(check: &str, message: impl Into<String>, status: ReportItemStatus) -> Self {
        Self {
            check: check.to_string(),
            message: message.into(),
            status,
            certificate: None,
            cause: None,
        }
    }

    #[must_use]
    pub fn for_certificate(
        check: &str,
        certificate: impl Into<String>,
        message: impl Into<String>,
        status: ReportItemStatus,
    ) -> Self {
        Self {
            certificate: Some(certificate.into()),
            ..Self::new(check, message, status)
        }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl fmt::Display for ReportItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.status, self.check, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (cause: {cause})")?;
        }
        Ok(())
    }
}

/// Ordered collection of findings with an aggregate status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    items: Vec<ReportItem>,
    status: ReportItemStatus,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            status: ReportItemStatus::Info,
        }
    }

    /// Append a finding and raise the aggregate status if needed.
    pub fn add_item(&mut self, item: ReportItem) {
        self.status = self.status.max(item.status);
        self.items.push(item);
    }

    /// Worst status over all items; `Info` for an empty report.
    #[must_use]
    pub fn validation_result(&self) -> ReportItemStatus {
        self.status
    }

    #[must_use]
    pub fn items(&self) -> &[ReportItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items whose status is worse than `Info`.
    pub fn failures(&self) -> impl Iterator<Item = &ReportItem> {
        self.items
            .iter()
            .filter(|item| item.status != ReportItemStatus::Info)
    }

    #[must_use]
    pub fn has_invalid(&self) -> bool {
        self.status == ReportItemStatus::Invalid
    }

    /// Pure merge: items of `self` followed by items of `other`.
    #[must_use]
    pub fn merge(&self, other: &ValidationReport) -> ValidationReport {
        let mut merged = self.clone();
        merged.extend_from(other.clone());
        merged
    }

    /// Owned merge used at orchestration points once a fragment is complete.
    pub fn extend_from(&mut self, other: ValidationReport) {
        for item in other.items {
            self.add_item(item);
        }
    }

    /// Copy of this report with every finding re-labelled `Info`.
    ///
    /// Used for revocation candidates that were superseded by a conclusive one:
    /// their diagnostics are kept but must not override the adopted verdict.
    #[must_use]
    pub fn demoted(&self) -> ValidationReport {
        let mut demoted = ValidationReport::new();
        for item in &self.items {
            let mut item = item.clone();
            if item.status != ReportItemStatus::Info {
                item.message = format!("{} (superseded: {})", item.message, item.status);
                item.status = ReportItemStatus::Info;
            }
            demoted.add_item(item);
        }
        demoted
    }

    /// Copy of this report with every status lowered to at most `cap`.
    ///
    /// A failing responder or CRL issuer chain makes the evidence unusable; it
    /// does not make the certificate under check invalid.
    #[must_use]
    pub fn capped_at(&self, cap: ReportItemStatus) -> ValidationReport {
        let mut capped = ValidationReport::new();
        for item in &self.items {
            let mut item = item.clone();
            item.status = item.status.min(cap);
            capped.add_item(item);
        }
        capped
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation result: {}", self.status)?;
        for item in &self.items {
            writeln!(f, "  {item}")?;
        }
        Ok(())
    }
}

/// RFC 3339 rendering of an instant for report messages.
pub(crate) fn format_instant(instant: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(instant)
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
