use serde::Deserialize;

use crate::app::{ScanStatus, ScanStatusReport};
use crate::domain::scangate::{finding::Finding, severity::Severity};

impl From<DescribeImageScanFindingsResponse> for ScanStatusReport {
    fn from(response: DescribeImageScanFindingsResponse) -> Self {
        let (status, description) = match response.image_scan_status {
            Some(ImageScanStatus {
                status,
                description,
            }) => (status_for(&status), description),
            None => (ScanStatus::Pending, None),
        };

        let mut report = ScanStatusReport::new(status);
        report.description = description;

        if report.status == ScanStatus::Complete {
            report.findings = Some(
                response
                    .image_scan_findings
                    .map(findings_for)
                    .unwrap_or_default(),
            );
        }

        report
    }
}

fn status_for(status: &str) -> ScanStatus {
    match status {
        "PENDING" => ScanStatus::Pending,
        "IN_PROGRESS" => ScanStatus::InProgress,
        // enhanced scanning reports continuous scans as ACTIVE once the first one finished
        "COMPLETE" | "ACTIVE" => ScanStatus::Complete,
        "FAILED" => ScanStatus::Failed,
        "UNSUPPORTED_IMAGE" => ScanStatus::UnsupportedImage,
        other => ScanStatus::Other(other.to_string()),
    }
}

fn findings_for(findings: ImageScanFindings) -> Vec<Finding> {
    let basic = findings.findings.into_iter().map(|f| {
        let mut finding = Finding::new(f.severity.into());
        if let Some(name) = f.name {
            finding = finding.with_id(name);
        }
        if let Some(description) = f.description {
            finding = finding.with_description(description);
        }
        if let Some(uri) = f.uri {
            finding = finding.with_uri(uri);
        }
        finding
    });

    let enhanced = findings.enhanced_findings.into_iter().map(|f| {
        let details = f.package_vulnerability_details.unwrap_or_default();
        let mut finding = Finding::new(f.severity.into());
        if let Some(id) = details.vulnerability_id.or(f.title) {
            finding = finding.with_id(id);
        }
        if let Some(description) = f.description {
            finding = finding.with_description(description);
        }
        if let Some(uri) = details.source_url {
            finding = finding.with_uri(uri);
        }
        finding
    });

    basic.chain(enhanced).collect()
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum EcrSeverity {
    Critical,
    High,
    Medium,
    Low,
    Informational,
    #[serde(other)]
    Undefined,
}

impl From<EcrSeverity> for Severity {
    fn from(value: EcrSeverity) -> Self {
        match value {
            EcrSeverity::Critical => Severity::Critical,
            EcrSeverity::High => Severity::High,
            EcrSeverity::Medium => Severity::Medium,
            EcrSeverity::Low => Severity::Low,
            EcrSeverity::Informational => Severity::Informational,
            EcrSeverity::Undefined => Severity::Undefined,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DescribeImageScanFindingsResponse {
    #[serde(default)]
    pub image_scan_status: Option<ImageScanStatus>,
    #[serde(default)]
    pub image_scan_findings: Option<ImageScanFindings>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImageScanStatus {
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ImageScanFindings {
    #[serde(default)]
    pub findings: Vec<BasicFinding>,
    #[serde(default)]
    pub enhanced_findings: Vec<EnhancedFinding>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BasicFinding {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default = "undefined_severity")]
    pub severity: EcrSeverity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EnhancedFinding {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "undefined_severity")]
    pub severity: EcrSeverity,
    #[serde(default)]
    pub package_vulnerability_details: Option<PackageVulnerabilityDetails>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(super) struct PackageVulnerabilityDetails {
    #[serde(default)]
    pub vulnerability_id: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

fn undefined_severity() -> EcrSeverity {
    EcrSeverity::Undefined
}
