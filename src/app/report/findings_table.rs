use std::fmt::{Display, Formatter};
use std::io::Write;

use itertools::Itertools;
use markdown_table::{Heading, HeadingAlignment, MarkdownTable};

use crate::domain::scangate::{gate_verdict::GateVerdict, ignore_policy::IgnorePolicy};

use super::{ReportError, ReportSink};

/// Human readable rendering of a verdict: one row per finding followed by the
/// policy that was applied and the final result.
pub struct FindingsTable<'a> {
    verdict: &'a GateVerdict,
    policy: &'a IgnorePolicy,
}

impl<'a> FindingsTable<'a> {
    pub fn new(verdict: &'a GateVerdict, policy: &'a IgnorePolicy) -> Self {
        Self { verdict, policy }
    }

    fn table_section(&self) -> String {
        if self.verdict.findings().is_empty() {
            return "No findings were reported by the scan".to_string();
        }

        let headers = ["CVE", "Severity", "Ignored?", "Description", "URI"]
            .into_iter()
            .map(|title| Heading::new(title.to_string(), Some(HeadingAlignment::Left)))
            .collect_vec();

        let data = self
            .verdict
            .findings()
            .iter()
            .map(|finding| {
                let ignored = self
                    .verdict
                    .ignore_reason(finding, self.policy)
                    .map(|reason| format!("Yes ({reason})"))
                    .unwrap_or_else(|| "No".to_string());

                vec![
                    cell(finding.id().unwrap_or_default()),
                    finding.severity().to_string(),
                    ignored,
                    cell(finding.description().unwrap_or_default()),
                    cell(finding.uri().unwrap_or_default()),
                ]
            })
            .collect_vec();

        let mut table = MarkdownTable::new(data);
        table.with_headings(headers);

        table.as_markdown().unwrap_or_default()
    }
}

impl Display for FindingsTable<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nFound the following CVEs")?;
        writeln!(f, "{}", self.table_section().trim_end())?;
        writeln!(f)?;
        writeln!(
            f,
            "Ignored CVE severity levels: {}",
            self.policy.ignored_severities().iter().join(", ")
        )?;
        writeln!(
            f,
            "Ignored CVE's:               {}",
            self.policy.ignored_finding_ids().join(", ")
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "Final scan result: {}",
            if self.verdict.passed() {
                "Passed"
            } else {
                "Failed"
            }
        )
    }
}

fn cell(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .join(" ")
        .replace('|', "\\|")
}

/// Prints the findings table to standard output.
pub struct ConsoleReport;

impl ReportSink for ConsoleReport {
    fn publish(&self, verdict: &GateVerdict, policy: &IgnorePolicy) -> Result<(), ReportError> {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{}", FindingsTable::new(verdict, policy))
            .and_then(|_| stdout.flush())
            .map_err(|source| ReportError::Io {
                report: "console",
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{FindingsTable, cell};
    use crate::domain::scangate::{
        finding::Finding, gate_verdict::GateVerdict, ignore_policy::IgnorePolicy,
        severity::Severity,
    };

    #[test]
    fn it_renders_every_finding_with_its_ignore_status() {
        let policy = IgnorePolicy::new([Severity::Low], ["CVE-2"]);
        let verdict = GateVerdict::evaluate(
            vec![
                Finding::new(Severity::Critical)
                    .with_id("CVE-1")
                    .with_description("remote code execution")
                    .with_uri("https://security-tracker.debian.org/tracker/CVE-1"),
                Finding::new(Severity::High).with_id("CVE-2"),
                Finding::new(Severity::Low).with_id("CVE-3"),
            ],
            &policy,
        )
        .unwrap();

        let rendered = FindingsTable::new(&verdict, &policy).to_string();

        assert!(rendered.contains("Found the following CVEs"));
        assert!(rendered.contains("CVE-1"));
        assert!(rendered.contains("remote code execution"));
        assert!(rendered.contains("https://security-tracker.debian.org/tracker/CVE-1"));
        assert!(rendered.contains("Yes (ignored individual CVE)"));
        assert!(rendered.contains("Yes (ignored severity level)"));
        assert!(rendered.contains("Ignored CVE severity levels: Low\n"));
        assert!(rendered.contains("Ignored CVE's:               CVE-2\n"));
        assert!(rendered.ends_with("Final scan result: Failed\n"));
    }

    #[test]
    fn it_renders_an_empty_scan() {
        let policy = IgnorePolicy::default();
        let verdict = GateVerdict::evaluate(vec![], &policy).unwrap();

        let rendered = FindingsTable::new(&verdict, &policy).to_string();

        assert!(rendered.contains("No findings were reported by the scan"));
        assert!(rendered.ends_with("Final scan result: Passed\n"));
    }

    #[test]
    fn it_labels_the_unsupported_image_placeholder() {
        let policy = IgnorePolicy::default();
        let verdict = GateVerdict::for_unsupported_image("UnsupportedImageError: nope");

        let rendered = FindingsTable::new(&verdict, &policy).to_string();

        assert!(rendered.contains("ECR_ERROR_UNSUPPORTED_IMAGE"));
        assert!(rendered.contains("Yes (unsupported image)"));
        assert!(rendered.ends_with("Final scan result: Passed\n"));
    }

    #[test]
    fn it_keeps_cells_on_a_single_line() {
        assert_eq!(cell("first line\n  second | line\n"), "first line second \\| line");
    }
}
