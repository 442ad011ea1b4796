use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Error, Debug)]
pub(in crate::infra) enum AwsCliError {
    #[error("error executing the aws cli: {0}")]
    CommandExecution(#[from] std::io::Error),

    #[error("aws cli exited with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },

    #[error("error deserializing the aws cli output: {0}")]
    OutputDeserialization(#[from] serde_json::Error),
}

impl AwsCliError {
    /// Whether the cli failed with the given AWS error code.
    pub(in crate::infra) fn is_aws_error(&self, code: &str) -> bool {
        matches!(self, AwsCliError::CommandFailed { stderr, .. } if stderr.contains(code))
    }
}

#[derive(Clone, Debug)]
pub struct AwsCli {
    binary: PathBuf,
}

impl AwsCli {
    pub fn new(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    pub(in crate::infra) async fn run<I, S>(&self, args: I) -> Result<Vec<u8>, AwsCliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().collect();
        debug!(
            "running {} {}",
            self.binary.display(),
            args.iter()
                .map(|a| a.as_ref().to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(AwsCliError::CommandFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    /// Password for `docker login` against the ECR registries of a region.
    pub(in crate::infra) async fn ecr_login_password(
        &self,
        region: &str,
    ) -> Result<String, AwsCliError> {
        let stdout = self
            .run(["ecr", "get-login-password", "--region", region])
            .await?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::{AwsCli, AwsCliError};

    #[tokio::test]
    async fn it_returns_the_standard_output() {
        let cli = AwsCli::new("echo");

        let stdout = cli.run(["ecr", "describe-images"]).await.unwrap();

        assert_eq!(String::from_utf8(stdout).unwrap(), "ecr describe-images\n");
    }

    #[tokio::test]
    async fn it_asks_for_the_login_password_of_the_region() {
        let cli = AwsCli::new("echo");

        assert_eq!(
            cli.ecr_login_password("eu-west-1").await.unwrap(),
            "ecr get-login-password --region eu-west-1"
        );
    }

    #[tokio::test]
    async fn it_reports_failures_with_the_standard_error() {
        let cli = AwsCli::new("sh");

        let error = cli
            .run([
                "-c",
                "echo 'An error occurred (ScanNotFoundException) when calling the DescribeImageScanFindings operation' >&2; exit 254",
            ])
            .await
            .unwrap_err();

        assert!(matches!(error, AwsCliError::CommandFailed { status: 254, .. }));
        assert!(error.is_aws_error("ScanNotFoundException"));
        assert!(!error.is_aws_error("RepositoryNotFoundException"));
    }

    #[tokio::test]
    async fn it_fails_when_the_binary_does_not_exist() {
        let cli = AwsCli::new("/nonexistent/aws");

        assert!(matches!(
            cli.run(["ecr"]).await,
            Err(AwsCliError::CommandExecution(_))
        ));
    }
}
