use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use thiserror::Error;

use crate::domain::scangate::{finding::Finding, image_identity::ImageIdentity};

#[async_trait::async_trait]
pub trait ScanBackend {
    async fn query_scan_status(
        &self,
        image: &ImageIdentity,
        repository: &str,
    ) -> Result<ScanStatusReport, ScanBackendError>;
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum ScanStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
    UnsupportedImage,
    Other(String),
}

impl ScanStatus {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, ScanStatus::Pending | ScanStatus::InProgress)
    }
}

impl Display for ScanStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ScanStatus::Pending => "PENDING",
            ScanStatus::InProgress => "IN_PROGRESS",
            ScanStatus::Complete => "COMPLETE",
            ScanStatus::Failed => "FAILED",
            ScanStatus::UnsupportedImage => "UNSUPPORTED_IMAGE",
            ScanStatus::Other(other) => other,
        })
    }
}

/// One answer of the scanning backend about an image.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ScanStatusReport {
    pub status: ScanStatus,
    pub description: Option<String>,
    pub findings: Option<Vec<Finding>>,
}

impl ScanStatusReport {
    pub fn new(status: ScanStatus) -> Self {
        Self {
            status,
            description: None,
            findings: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = Some(findings);
        self
    }
}

#[derive(Error, Debug)]
pub enum ScanBackendError {
    #[error("error in the scanning backend: {0}")]
    BackendError(#[from] Box<dyn Error + Send + Sync>),

    #[error("scan status query did not answer within {0:?}")]
    CallTimedOut(Duration),

    #[error(
        "image scan finished with status {status}: {}",
        .description.as_deref().unwrap_or("no description provided")
    )]
    ScanFailed {
        status: ScanStatus,
        description: Option<String>,
    },
}
