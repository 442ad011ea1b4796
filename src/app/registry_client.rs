use std::error::Error;

use thiserror::Error;

use crate::domain::scangate::{image_identity::ImageIdentity, image_reference::ImageReference};

#[async_trait::async_trait]
pub trait RegistryClient {
    async fn tag(
        &self,
        source: &ImageReference,
        target: &ImageReference,
    ) -> Result<(), RegistryError>;

    async fn push(&self, image: &ImageReference) -> Result<ImageIdentity, RegistryError>;
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry client error: {0}")]
    RegistryClientError(#[from] Box<dyn Error + Send + Sync>),
}
