use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::domain::scangate::finding::Finding;
use crate::domain::scangate::invariant_violation::InvariantViolation;
use crate::domain::scangate::severity::Severity;

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum IgnoreReason {
    IgnoredSeverityLevel,
    IgnoredIndividualCve,
}

impl Display for IgnoreReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IgnoreReason::IgnoredSeverityLevel => "ignored severity level",
            IgnoreReason::IgnoredIndividualCve => "ignored individual CVE",
        })
    }
}

/// Exemptions declared by the user, by severity level or by finding id.
///
/// Both lists are deduplicated on construction and keep the order in which
/// they were first given, so they can be echoed back in reports.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct IgnorePolicy {
    severities: Vec<Severity>,
    finding_ids: Vec<String>,
}

impl IgnorePolicy {
    pub fn new<S, I>(severities: S, finding_ids: I) -> Self
    where
        S: IntoIterator<Item = Severity>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            severities: severities.into_iter().unique().collect(),
            finding_ids: finding_ids.into_iter().map(Into::into).unique().collect(),
        }
    }

    pub fn ignored_severities(&self) -> &[Severity] {
        &self.severities
    }

    pub fn ignored_finding_ids(&self) -> &[String] {
        &self.finding_ids
    }

    /// Severity is checked before the id, so a finding matching both is
    /// reported as [`IgnoreReason::IgnoredSeverityLevel`].
    pub fn is_ignored(&self, finding: &Finding) -> Option<IgnoreReason> {
        if self.severities.contains(&finding.severity()) {
            return Some(IgnoreReason::IgnoredSeverityLevel);
        }

        finding
            .id()
            .filter(|id| self.finding_ids.iter().any(|ignored| ignored == id))
            .map(|_| IgnoreReason::IgnoredIndividualCve)
    }

    pub fn select_ignored(&self, findings: &[Finding]) -> Result<Vec<Finding>, InvariantViolation> {
        let ignored = findings
            .iter()
            .filter(|finding| self.is_ignored(finding).is_some())
            .cloned()
            .collect_vec();

        if ignored.len() > findings.len() {
            return Err(InvariantViolation {
                ignored: ignored.len(),
                total: findings.len(),
            });
        }

        Ok(ignored)
    }
}
