use std::collections::BTreeMap;

use crate::domain::scangate::finding::{Finding, classify_by_severity};
use crate::domain::scangate::ignore_policy::IgnorePolicy;
use crate::domain::scangate::invariant_violation::InvariantViolation;
use crate::domain::scangate::severity::Severity;

/// The pass/fail decision over a list of findings.
///
/// It is derived from the findings and the ignore policy only, so recomputing
/// it for a report yields the same answer used to gate the promotion.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct GateVerdict {
    findings: Vec<Finding>,
    ignored: Vec<Finding>,
    passed: bool,
    unsupported_reason: Option<String>,
}

impl GateVerdict {
    /// Passes when there are no findings or when every finding is ignored.
    ///
    /// Ignored findings are always a subset of the findings, which makes
    /// "no more findings than ignored findings" equivalent to "all ignored".
    pub fn evaluate(
        findings: Vec<Finding>,
        policy: &IgnorePolicy,
    ) -> Result<Self, InvariantViolation> {
        let ignored = policy.select_ignored(&findings)?;
        let passed = findings.is_empty() || findings.len() <= ignored.len();

        Ok(Self {
            findings,
            ignored,
            passed,
            unsupported_reason: None,
        })
    }

    /// Images the backend cannot scan are treated as scanned with nothing
    /// failable: the placeholder finding is reported as ignored and the gate passes.
    pub fn for_unsupported_image(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let placeholder = Finding::unsupported_image(reason.clone());

        Self {
            findings: vec![placeholder.clone()],
            ignored: vec![placeholder],
            passed: true,
            unsupported_reason: Some(reason),
        }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn ignored(&self) -> &[Finding] {
        &self.ignored
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn unsupported_reason(&self) -> Option<&str> {
        self.unsupported_reason.as_deref()
    }

    pub fn unignored_count(&self) -> usize {
        self.findings.len().saturating_sub(self.ignored.len())
    }

    pub fn by_severity(&self) -> BTreeMap<Severity, Vec<Finding>> {
        classify_by_severity(&self.findings)
    }

    /// Human readable reason a finding did not count against the gate, if any.
    pub fn ignore_reason(&self, finding: &Finding, policy: &IgnorePolicy) -> Option<String> {
        if self.unsupported_reason.is_some() && finding.is_unsupported_image_placeholder() {
            return Some("unsupported image".to_string());
        }

        policy.is_ignored(finding).map(|reason| reason.to_string())
    }
}
