use thiserror::Error;

use super::config::GateConfig;
use super::registry_client::RegistryClient;
use super::report::ReportSink;
use super::scan_backend::ScanBackend;

pub struct Components {
    pub registry: Box<dyn RegistryClient + Send + Sync>,
    pub scan_backend: Box<dyn ScanBackend + Send + Sync>,
    pub reports: Vec<Box<dyn ReportSink + Send + Sync>>,
}

#[derive(Error, Debug)]
pub enum ComponentFactoryError {
    #[error("unable to connect to the docker daemon: {0}")]
    DockerClientError(String),

    #[error("unable to determine the AWS region of {0}")]
    UnknownRegion(String),
}

pub trait ComponentFactory {
    fn create_components(&self, config: &GateConfig) -> Result<Components, ComponentFactoryError>;
}
