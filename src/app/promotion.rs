use std::fmt::{Display, Formatter};
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::domain::scangate::{
    image_reference::{ImageReference, ImageReferenceError},
    invariant_violation::InvariantViolation,
};

use super::component_factory::Components;
use super::config::GateConfig;
use super::gate_decision::{GateError, decide};
use super::registry_client::{RegistryClient, RegistryError};
use super::report::{ReportError, ReportSink};
use super::scan_backend::{ScanBackend, ScanBackendError};
use super::scan_waiter::ScanWaiter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromotionStep {
    TagForScan,
    PushForScan,
    PushToDestination,
    TagAdditional,
    PushAdditional,
}

impl Display for PromotionStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PromotionStep::TagForScan => "tagging the image for scanning",
            PromotionStep::PushForScan => "pushing the image for scanning",
            PromotionStep::PushToDestination => "pushing the image to its destination",
            PromotionStep::TagAdditional => "tagging the image with an additional tag",
            PromotionStep::PushAdditional => "pushing an additional tag",
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PromotionOutcome {
    /// Every reference that reached its destination, in push order.
    Promoted { pushed: Vec<ImageReference> },
    SkippedByFlag,
}

#[derive(Error, Debug)]
pub enum PromotionError {
    #[error("{step} failed: {source}")]
    Registry {
        step: PromotionStep,
        #[source]
        source: RegistryError,
    },

    #[error("{step} did not finish within {timeout:?}")]
    CallTimedOut {
        step: PromotionStep,
        timeout: Duration,
    },

    #[error(transparent)]
    InvalidTag(#[from] ImageReferenceError),

    #[error(
        "timed out after {0:?} waiting for the image scan to complete, the image was not promoted"
    )]
    ScanTimeout(Duration),

    #[error("image scan could not be completed: {0}")]
    ScanBackend(ScanBackendError),

    #[error("internal error, aborting: {0}")]
    InternalInvariantViolation(InvariantViolation),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(
        "there are CVEs found! Please, fix them first. Will not proceed with pushing to the destination registries ({unignored} unignored findings)"
    )]
    GateBlocked { unignored: usize },
}

impl From<GateError> for PromotionError {
    fn from(value: GateError) -> Self {
        match value {
            GateError::ScanTimedOut(waited) => PromotionError::ScanTimeout(waited),
            GateError::Backend(error) => PromotionError::ScanBackend(error),
            GateError::InvariantViolation(violation) => {
                PromotionError::InternalInvariantViolation(violation)
            }
        }
    }
}

impl PromotionError {
    pub fn exit_code(&self) -> u8 {
        match self {
            PromotionError::InvalidTag(_) => 2,
            PromotionError::GateBlocked { .. } => 3,
            PromotionError::ScanTimeout(_) => 4,
            PromotionError::Registry { .. }
            | PromotionError::CallTimedOut { .. }
            | PromotionError::ScanBackend(_)
            | PromotionError::Report(_) => 5,
            PromotionError::InternalInvariantViolation(_) => 70,
        }
    }
}

/// Tag under which the image is pushed to the scanning repository. Unique per
/// second and per destination tag.
pub fn scanning_tag(now: DateTime<Utc>, destination: &ImageReference) -> String {
    ImageReference::sanitize_tag(&format!(
        "promotion-gate-scan-{}-{}",
        now.timestamp(),
        destination.tag()
    ))
}

/// Drives one gate run: stage the image, wait for its scan, decide, report and
/// promote. Runs strictly sequentially.
pub struct PromotionPipeline<'a, R: ?Sized, S: ?Sized> {
    registry: &'a R,
    scan_backend: &'a S,
    reports: &'a [Box<dyn ReportSink + Send + Sync>],
    config: &'a GateConfig,
}

impl<'a> PromotionPipeline<'a, dyn RegistryClient + Send + Sync, dyn ScanBackend + Send + Sync> {
    pub fn from_components(components: &'a Components, config: &'a GateConfig) -> Self {
        Self::new(
            components.registry.as_ref(),
            components.scan_backend.as_ref(),
            &components.reports,
            config,
        )
    }
}

impl<'a, R, S> PromotionPipeline<'a, R, S>
where
    R: RegistryClient + Sync + ?Sized,
    S: ScanBackend + Sync + ?Sized,
{
    pub fn new(
        registry: &'a R,
        scan_backend: &'a S,
        reports: &'a [Box<dyn ReportSink + Send + Sync>],
        config: &'a GateConfig,
    ) -> Self {
        Self {
            registry,
            scan_backend,
            reports,
            config,
        }
    }

    pub async fn run(&self) -> Result<PromotionOutcome, PromotionError> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<PromotionOutcome, PromotionError> {
        let source = self.config.primary_image();
        let staging = self
            .config
            .stage_repository
            .with_tag(&scanning_tag(now, source))?;

        info!("tagging {source} as {staging}");
        self.bounded(PromotionStep::TagForScan, self.registry.tag(source, &staging))
            .await?;

        info!("pushing {staging} to the scanning repository");
        let identity = self
            .bounded(PromotionStep::PushForScan, self.registry.push(&staging))
            .await?;

        info!("waiting for the scan of {identity} to complete");
        let outcome = ScanWaiter::new(self.scan_backend, self.config.scan_wait)
            .wait_for(&identity, self.config.stage_repository.path())
            .await;

        let verdict = decide(outcome, &self.config.ignore_policy)?;
        for report in self.reports {
            report.publish(&verdict, &self.config.ignore_policy)?;
        }

        if !verdict.passed() {
            error!(
                "{} findings are not ignored, {source} will not be promoted",
                verdict.unignored_count()
            );
            return Err(PromotionError::GateBlocked {
                unignored: verdict.unignored_count(),
            });
        }

        if self.config.skip_push {
            info!("skip push is enabled, not pushing to the destination registries");
            return Ok(PromotionOutcome::SkippedByFlag);
        }

        self.promote().await
    }

    async fn promote(&self) -> Result<PromotionOutcome, PromotionError> {
        let mut pushed = Vec::new();

        for image in self.config.images() {
            if let Err(error) = self.promote_image(image, &mut pushed).await {
                if !pushed.is_empty() {
                    warn!(
                        "promotion aborted, these references were already pushed and are left in place: {}",
                        pushed.iter().join(", ")
                    );
                }
                return Err(error);
            }
        }

        info!("promoted {} references", pushed.len());
        Ok(PromotionOutcome::Promoted { pushed })
    }

    async fn promote_image(
        &self,
        image: &ImageReference,
        pushed: &mut Vec<ImageReference>,
    ) -> Result<(), PromotionError> {
        info!("pushing {image}");
        let identity = self
            .bounded(PromotionStep::PushToDestination, self.registry.push(image))
            .await?;
        info!("pushed {identity}");
        pushed.push(image.clone());

        for tag in &self.config.additional_tags {
            let tagged = image.with_tag(tag)?;
            info!("pushing additional tag {tagged}");
            self.bounded(PromotionStep::TagAdditional, self.registry.tag(image, &tagged))
                .await?;
            self.bounded(PromotionStep::PushAdditional, self.registry.push(&tagged))
                .await?;
            pushed.push(tagged);
        }

        Ok(())
    }

    async fn bounded<T>(
        &self,
        step: PromotionStep,
        call: impl Future<Output = Result<T, RegistryError>>,
    ) -> Result<T, PromotionError> {
        match timeout(self.config.call_timeout(), call).await {
            Ok(result) => result.map_err(|source| PromotionError::Registry { step, source }),
            Err(_) => Err(PromotionError::CallTimedOut {
                step,
                timeout: self.config.call_timeout(),
            }),
        }
    }
}
