mod aws_cli;
mod component_factory_impl;
mod docker_registry_client;
mod ecr_scan_backend;
mod ecr_scan_findings_response;

pub use aws_cli::AwsCli;
pub use component_factory_impl::ConcreteComponentFactory;
pub use docker_registry_client::DockerRegistryClient;
pub use ecr_scan_backend::EcrScanBackend;
