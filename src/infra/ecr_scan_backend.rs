use crate::app::{ScanBackend, ScanBackendError, ScanStatus, ScanStatusReport};
use crate::domain::scangate::image_identity::ImageIdentity;

use super::aws_cli::{AwsCli, AwsCliError};
use super::ecr_scan_findings_response::DescribeImageScanFindingsResponse;

impl From<AwsCliError> for ScanBackendError {
    fn from(value: AwsCliError) -> Self {
        ScanBackendError::BackendError(Box::new(value))
    }
}

/// Reads the result of ECR basic and enhanced image scanning through the aws cli.
#[derive(Clone, Debug)]
pub struct EcrScanBackend {
    aws: AwsCli,
    region: Option<String>,
}

impl EcrScanBackend {
    pub fn new(aws: AwsCli, region: Option<String>) -> Self {
        Self { aws, region }
    }

    fn describe_args(&self, image: &ImageIdentity, repository: &str) -> Vec<String> {
        let mut args = vec![
            "ecr".to_string(),
            "describe-image-scan-findings".to_string(),
            "--repository-name".to_string(),
            repository.to_string(),
            "--image-id".to_string(),
            format!("imageDigest={},imageTag={}", image.digest(), image.tag()),
            "--output".to_string(),
            "json".to_string(),
        ];
        if let Some(region) = &self.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        args
    }

    async fn describe(
        &self,
        image: &ImageIdentity,
        repository: &str,
    ) -> Result<ScanStatusReport, AwsCliError> {
        report_from_cli_result(self.aws.run(self.describe_args(image, repository)).await)
    }
}

fn report_from_cli_result(
    result: Result<Vec<u8>, AwsCliError>,
) -> Result<ScanStatusReport, AwsCliError> {
    let stdout = match result {
        Ok(stdout) => stdout,
        // ECR answers this until the scan of a freshly pushed image has been registered
        Err(error) if error.is_aws_error("ScanNotFoundException") => {
            return Ok(ScanStatusReport::new(ScanStatus::Pending));
        }
        Err(error) => return Err(error),
    };

    let response: DescribeImageScanFindingsResponse = serde_json::from_slice(&stdout)?;
    Ok(response.into())
}

#[async_trait::async_trait]
impl ScanBackend for EcrScanBackend {
    async fn query_scan_status(
        &self,
        image: &ImageIdentity,
        repository: &str,
    ) -> Result<ScanStatusReport, ScanBackendError> {
        Ok(self.describe(image, repository).await?)
    }
}
