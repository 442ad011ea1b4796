use std::process::ExitCode;

use clap::Parser;
use promotion_gate::app::{
    PromotionOutcome, PromotionPipeline,
    component_factory::ComponentFactory,
    config::{CliArgs, GateConfig},
};
use promotion_gate::infra::ConcreteComponentFactory;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Components could not be created, reported like a transport failure.
const COMPONENTS_UNAVAILABLE: u8 = 5;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match GateConfig::try_from(CliArgs::parse()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(e.exit_code());
        }
    };

    let components = match ConcreteComponentFactory.create_components(&config) {
        Ok(components) => components,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(COMPONENTS_UNAVAILABLE);
        }
    };

    match PromotionPipeline::from_components(&components, &config)
        .run()
        .await
    {
        Ok(PromotionOutcome::Promoted { pushed }) => {
            info!("promotion finished, {} references pushed", pushed.len());
            ExitCode::SUCCESS
        }
        Ok(PromotionOutcome::SkippedByFlag) => {
            info!("promotion skipped, the image passed the scan");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
