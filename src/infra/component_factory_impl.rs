use bollard::Docker;

use crate::{
    app::{
        component_factory::{ComponentFactory, ComponentFactoryError, Components},
        config::GateConfig,
        report::report_sinks_for,
    },
    infra::{AwsCli, DockerRegistryClient, EcrScanBackend},
};

pub struct ConcreteComponentFactory;

impl ComponentFactory for ConcreteComponentFactory {
    fn create_components(&self, config: &GateConfig) -> Result<Components, ComponentFactoryError> {
        let aws = AwsCli::new(&config.aws_cli);

        let region = config
            .stage_repository
            .ecr_region()
            .map(str::to_string)
            .ok_or_else(|| {
                ComponentFactoryError::UnknownRegion(config.stage_repository.repository())
            })?;
        let scan_backend = EcrScanBackend::new(aws.clone(), Some(region));

        let docker_client = Docker::connect_with_local_defaults()
            .map_err(|e| ComponentFactoryError::DockerClientError(e.to_string()))?;
        let registry = DockerRegistryClient::new(docker_client, aws);

        Ok(Components {
            registry: Box::new(registry),
            scan_backend: Box::new(scan_backend),
            reports: report_sinks_for(config.junit_report_path.as_deref()),
        })
    }
}
