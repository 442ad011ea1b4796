use std::collections::HashMap;
use std::sync::LazyLock;

use bollard::{
    Docker,
    auth::DockerCredentials,
    query_parameters::{PushImageOptionsBuilder, TagImageOptionsBuilder},
};
use futures::StreamExt;
use regex::Regex;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::app::{RegistryClient, RegistryError};
use crate::domain::scangate::{image_identity::ImageIdentity, image_reference::ImageReference};

use super::aws_cli::{AwsCli, AwsCliError};

static PUSHED_DIGEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<tag>[\w][\w.-]{0,127}): digest: (?P<digest>sha256:[a-f0-9]{64}) size: \d+$",
    )
    .expect("push digest pattern is valid")
});

#[derive(Error, Debug)]
pub(in crate::infra) enum DockerRegistryClientError {
    #[error("internal docker client error: {0:?}")]
    Docker(#[from] bollard::errors::Error),

    #[error("unable to retrieve registry credentials: {0}")]
    Credentials(#[from] AwsCliError),

    #[error("the docker daemon reported an error while pushing {image}: {message}")]
    PushFailed { image: String, message: String },

    #[error("{0} was pushed, but no digest was reported by the docker daemon")]
    MissingDigest(String),
}

impl From<DockerRegistryClientError> for RegistryError {
    fn from(value: DockerRegistryClientError) -> Self {
        RegistryError::RegistryClientError(Box::new(value))
    }
}

/// Extracts the identity of a pushed image from the last status line of a push,
/// `<tag>: digest: sha256:<hex> size: <bytes>`.
fn identity_from_push_status(status: &str) -> Option<ImageIdentity> {
    PUSHED_DIGEST
        .captures(status.trim())
        .map(|captures| ImageIdentity::new(&captures["digest"], &captures["tag"]))
}

/// Tags and pushes images through the local docker daemon. ECR registries are
/// authenticated with a password obtained from the aws cli, other registries
/// rely on the daemon's own credentials.
pub struct DockerRegistryClient {
    docker_client: Docker,
    aws: AwsCli,
    credentials: Mutex<HashMap<String, DockerCredentials>>,
}

impl DockerRegistryClient {
    pub fn new(docker_client: Docker, aws: AwsCli) -> Self {
        Self {
            docker_client,
            aws,
            credentials: Default::default(),
        }
    }

    async fn credentials_for(
        &self,
        image: &ImageReference,
    ) -> Result<Option<DockerCredentials>, DockerRegistryClientError> {
        let Some(region) = image.ecr_region() else {
            return Ok(None);
        };

        let mut credentials = self.credentials.lock().await;
        if let Some(cached) = credentials.get(image.domain()) {
            return Ok(Some(cached.clone()));
        }

        debug!("retrieving ECR credentials for {}", image.domain());
        let password = self.aws.ecr_login_password(region).await?;
        let fresh = DockerCredentials {
            username: Some("AWS".to_string()),
            password: Some(password),
            serveraddress: Some(image.domain().to_string()),
            ..Default::default()
        };
        credentials.insert(image.domain().to_string(), fresh.clone());

        Ok(Some(fresh))
    }

    async fn push_image(
        &self,
        image: &ImageReference,
    ) -> Result<ImageIdentity, DockerRegistryClientError> {
        let credentials = self.credentials_for(image).await?;
        let mut results = self.docker_client.push_image(
            &image.repository(),
            Some(PushImageOptionsBuilder::default().tag(image.tag()).build()),
            credentials,
        );

        let mut identity = None;
        while let Some(result) = results.next().await {
            let info = result?;
            if let Some(message) = info.error {
                return Err(DockerRegistryClientError::PushFailed {
                    image: image.to_string(),
                    message,
                });
            }
            if let Some(status) = info.status {
                info!("docker-push: {status}");
                if let Some(pushed) = identity_from_push_status(&status) {
                    identity = Some(pushed);
                }
            }
        }

        identity.ok_or_else(|| DockerRegistryClientError::MissingDigest(image.to_string()))
    }

    async fn tag_image(
        &self,
        source: &ImageReference,
        target: &ImageReference,
    ) -> Result<(), DockerRegistryClientError> {
        self.docker_client
            .tag_image(
                &source.to_string(),
                Some(
                    TagImageOptionsBuilder::default()
                        .repo(&target.repository())
                        .tag(target.tag())
                        .build(),
                ),
            )
            .await?;
        debug!("tagged {source} as {target}");
        Ok(())
    }
}

#[async_trait::async_trait]
impl RegistryClient for DockerRegistryClient {
    async fn tag(
        &self,
        source: &ImageReference,
        target: &ImageReference,
    ) -> Result<(), RegistryError> {
        Ok(self.tag_image(source, target).await?)
    }

    async fn push(&self, image: &ImageReference) -> Result<ImageIdentity, RegistryError> {
        Ok(self.push_image(image).await?)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::identity_from_push_status;

    const DIGEST: &str = "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn it_reads_the_identity_from_the_final_push_status() {
        let identity = identity_from_push_status(&format!(
            "promotion-gate-scan-1: digest: {DIGEST} size: 1570"
        ))
        .unwrap();

        assert_eq!(identity.tag(), "promotion-gate-scan-1");
        assert_eq!(identity.digest(), DIGEST);
    }

    #[rstest]
    #[case(
        "The push refers to repository [123456789012.dkr.ecr.eu-west-1.amazonaws.com/scanning]"
    )]
    #[case("Preparing")]
    #[case("Layer already exists")]
    #[case("latest: digest: sha256:tooshort size: 1570")]
    fn it_ignores_progress_statuses(#[case] status: &str) {
        assert!(identity_from_push_status(status).is_none());
    }
}
