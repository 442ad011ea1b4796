#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mockall::mock;
use promotion_gate::{
    app::{
        RegistryClient, RegistryError, ScanBackend, ScanBackendError, ScanStatusReport,
        ScanWaitSettings,
        config::GateConfig,
        report::{ReportError, ReportSink},
    },
    domain::scangate::{
        gate_verdict::GateVerdict, ignore_policy::IgnorePolicy, image_identity::ImageIdentity,
        image_reference::ImageReference,
    },
};

pub const STAGE_REPOSITORY: &str = "123456789012.dkr.ecr.eu-west-1.amazonaws.com/scanning";
pub const STAGE_DIGEST: &str =
    "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

mock! {
    pub RegistryClient {}
    #[async_trait::async_trait]
    impl RegistryClient for RegistryClient {
        async fn tag(&self, source: &ImageReference, target: &ImageReference) -> Result<(), RegistryError>;
        async fn push(&self, image: &ImageReference) -> Result<ImageIdentity, RegistryError>;
    }
}

mock! {
    pub ScanBackend {}
    #[async_trait::async_trait]
    impl ScanBackend for ScanBackend {
        async fn query_scan_status(&self, image: &ImageIdentity, repository: &str) -> Result<ScanStatusReport, ScanBackendError>;
    }
}

/// Registry that expects the image to be staged exactly once and nothing else.
pub fn registry_expecting_only_staging() -> MockRegistryClient {
    let mut registry = MockRegistryClient::new();
    expect_staging(&mut registry);
    registry
}

pub fn expect_staging(registry: &mut MockRegistryClient) {
    registry
        .expect_tag()
        .withf(|_, target| target.repository() == STAGE_REPOSITORY)
        .times(1)
        .returning(|_, _| Ok(()));
    registry
        .expect_push()
        .withf(|image| image.repository() == STAGE_REPOSITORY)
        .times(1)
        .returning(|image| Ok(ImageIdentity::new(STAGE_DIGEST, image.tag())));
}

/// Answers with the given reports in order, repeating the last one forever.
pub fn scan_backend_answering(reports: Vec<ScanStatusReport>) -> MockScanBackend {
    let mut reports = VecDeque::from(reports);
    let mut backend = MockScanBackend::new();
    backend
        .expect_query_scan_status()
        .withf(|image, repository| image.digest() == STAGE_DIGEST && repository == "scanning")
        .returning(move |_, _| {
            let report = if reports.len() > 1 {
                reports.pop_front()
            } else {
                reports.front().cloned()
            };
            Ok(report.expect("at least one scripted report"))
        });
    backend
}

#[derive(Clone, Default)]
pub struct RecordingReport {
    pub verdicts: Arc<Mutex<Vec<GateVerdict>>>,
}

impl ReportSink for RecordingReport {
    fn publish(&self, verdict: &GateVerdict, _policy: &IgnorePolicy) -> Result<(), ReportError> {
        self.verdicts
            .lock()
            .expect("recorder lock is not poisoned")
            .push(verdict.clone());
        Ok(())
    }
}

impl RecordingReport {
    pub fn published(&self) -> Vec<GateVerdict> {
        self.verdicts
            .lock()
            .expect("recorder lock is not poisoned")
            .clone()
    }
}

pub fn image(reference: &str) -> ImageReference {
    reference.parse().expect("valid image reference")
}

/// Configuration with timeouts short enough for tests.
pub fn config_for(images: &[&str], policy: IgnorePolicy) -> GateConfig {
    let mut images = images.iter().map(|i| image(i));
    let primary = images.next().expect("at least one image");
    let mut config = GateConfig::new(primary, images.collect(), image(STAGE_REPOSITORY));
    config.ignore_policy = policy;
    config.scan_wait = ScanWaitSettings {
        poll_interval: Duration::from_millis(5),
        timeout: Duration::from_millis(150),
        call_timeout: Duration::from_millis(100),
    };
    config
}
