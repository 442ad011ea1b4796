use std::path::{Path, PathBuf};
use std::time::Duration;

use itertools::Itertools;
use quick_junit::{NonSuccessKind, Property, Report, TestCase, TestCaseStatus, TestSuite};
use tracing::info;

use crate::domain::scangate::{
    finding::Finding, gate_verdict::GateVerdict, ignore_policy::IgnorePolicy, severity::Severity,
};

use super::{ReportError, ReportSink};

pub const JUNIT_SUITE_NAME: &str = "Container Image CVE scan";

const TEST_CASE_TIME: Duration = Duration::from_secs(1);

/// JUnit XML with one test case per severity level. A test case fails when
/// its severity bucket is not empty, ignored findings included, so CI
/// dashboards keep ignored CVEs visible.
pub struct JunitReport<'a> {
    verdict: &'a GateVerdict,
    policy: &'a IgnorePolicy,
}

impl<'a> JunitReport<'a> {
    pub fn new(verdict: &'a GateVerdict, policy: &'a IgnorePolicy) -> Self {
        Self { verdict, policy }
    }

    /// Renders the report. Text coming from the scanner is cleaned of
    /// characters XML 1.0 cannot carry.
    pub fn to_xml(&self) -> Result<String, quick_junit::SerializeError> {
        self.report().to_string()
    }

    fn report(&self) -> Report {
        let buckets = self.verdict.by_severity();

        let mut suite = TestSuite::new(JUNIT_SUITE_NAME);
        suite.add_property(Property::new("coverage.statements.pct", "100"));
        for severity in Severity::all() {
            let findings = buckets.get(&severity).map(Vec::as_slice).unwrap_or_default();
            suite.add_test_case(self.test_case(severity, findings));
        }

        let mut report = Report::new(JUNIT_SUITE_NAME);
        report.add_test_suite(suite);
        report
    }

    fn test_case(&self, severity: Severity, findings: &[Finding]) -> TestCase {
        let status = if findings.is_empty() {
            TestCaseStatus::success()
        } else {
            let mut failure = TestCaseStatus::non_success(NonSuccessKind::Failure);
            failure
                .set_message("Failed")
                .set_description(self.failure_output(findings));
            failure
        };

        let mut test_case = TestCase::new(severity.to_string(), status);
        test_case
            .set_classname(JUNIT_SUITE_NAME)
            .set_time(TEST_CASE_TIME);
        test_case
    }

    fn failure_output(&self, findings: &[Finding]) -> String {
        findings
            .iter()
            .map(|finding| {
                let name = finding
                    .id()
                    .or(finding.description())
                    .unwrap_or("unnamed finding");
                match self.verdict.ignore_reason(finding, self.policy) {
                    Some(reason) => format!("{name} ({reason})"),
                    None => name.to_string(),
                }
            })
            .join("\n")
    }
}

/// Writes the JUnit report to a file, replacing any previous content.
pub struct JunitReportFile {
    path: PathBuf,
}

impl JunitReportFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ReportSink for JunitReportFile {
    fn publish(&self, verdict: &GateVerdict, policy: &IgnorePolicy) -> Result<(), ReportError> {
        info!("writing junit report to: {}", self.path.display());
        let xml = JunitReport::new(verdict, policy)
            .to_xml()
            .map_err(|source| ReportError::Render {
                report: "junit",
                source: Box::new(source),
            })?;
        std::fs::write(&self.path, xml).map_err(|source| ReportError::Io {
            report: "junit",
            source,
        })
    }
}
