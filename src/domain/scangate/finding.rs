use std::collections::BTreeMap;

use crate::domain::scangate::severity::Severity;

/// Id given to the finding synthesized when the backend cannot scan an image.
pub const UNSUPPORTED_IMAGE_FINDING_ID: &str = "ECR_ERROR_UNSUPPORTED_IMAGE";

#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct Finding {
    id: Option<String>,
    severity: Severity,
    description: Option<String>,
    uri: Option<String>,
}

impl Finding {
    pub fn new(severity: Severity) -> Self {
        Self {
            id: None,
            severity,
            description: None,
            uri: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// The informational placeholder reported for images the backend refuses to scan.
    pub fn unsupported_image(description: impl Into<String>) -> Self {
        Finding::new(Severity::Informational)
            .with_id(UNSUPPORTED_IMAGE_FINDING_ID)
            .with_description(description)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn is_unsupported_image_placeholder(&self) -> bool {
        self.id() == Some(UNSUPPORTED_IMAGE_FINDING_ID)
    }
}

/// Groups findings by severity, keeping the original order inside each bucket.
///
/// Every severity level is present as a key, even when its bucket is empty.
pub fn classify_by_severity(findings: &[Finding]) -> BTreeMap<Severity, Vec<Finding>> {
    let mut buckets: BTreeMap<Severity, Vec<Finding>> = Severity::all()
        .into_iter()
        .map(|severity| (severity, Vec::new()))
        .collect();

    for finding in findings {
        buckets
            .entry(finding.severity())
            .or_default()
            .push(finding.clone());
    }

    buckets
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::{Finding, classify_by_severity};
    use crate::domain::scangate::severity::Severity;

    #[test]
    fn it_returns_a_bucket_for_every_severity_even_without_findings() {
        let buckets = classify_by_severity(&[]);

        assert_eq!(buckets.keys().copied().collect_vec(), Severity::all());
        assert!(buckets.values().all(Vec::is_empty));
    }

    #[test]
    fn it_groups_findings_keeping_their_order() {
        let findings = vec![
            Finding::new(Severity::High).with_id("CVE-1"),
            Finding::new(Severity::Low).with_id("CVE-2"),
            Finding::new(Severity::High).with_id("CVE-3"),
            Finding::new(Severity::Undefined),
        ];

        let buckets = classify_by_severity(&findings);

        assert_eq!(buckets.len(), Severity::all().len());
        assert_eq!(
            buckets[&Severity::High]
                .iter()
                .filter_map(Finding::id)
                .collect_vec(),
            vec!["CVE-1", "CVE-3"]
        );
        assert_eq!(buckets[&Severity::Low].len(), 1);
        assert_eq!(buckets[&Severity::Undefined].len(), 1);
        assert_eq!(
            buckets.values().map(Vec::len).sum::<usize>(),
            findings.len()
        );
    }

    #[test]
    fn it_builds_the_unsupported_image_placeholder() {
        let finding = Finding::unsupported_image("UnsupportedImageError: bad media type");

        assert_eq!(finding.id(), Some("ECR_ERROR_UNSUPPORTED_IMAGE"));
        assert_eq!(finding.severity(), Severity::Informational);
        assert_eq!(
            finding.description(),
            Some("UnsupportedImageError: bad media type")
        );
        assert!(finding.uri().is_none());
        assert!(finding.is_unsupported_image_placeholder());
    }
}
