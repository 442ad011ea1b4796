use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use itertools::Itertools;
use thiserror::Error;
use tracing::info;

use crate::domain::scangate::{
    ignore_policy::IgnorePolicy,
    image_reference::{ImageReference, ImageReferenceError},
    severity::{InvalidSeverityError, Severity},
};

use super::scan_waiter::ScanWaitSettings;

/// Pushes container images to a scanning repository, waits for the
/// vulnerability scan and promotes them only when no unignored finding remains.
#[derive(Parser, Debug, Clone)]
#[command(name = "promotion-gate", version, about)]
pub struct CliArgs {
    /// Space-separated list of full image references to push.
    #[arg(short = 'i', long, env = "PROMOTION_GATE_IMAGES")]
    pub images: String,

    /// ECR repository where the image is sent for scanning before pushing it to
    /// the destination. Defaults to the repository of the first image.
    #[arg(
        short = 's',
        long,
        env = "PROMOTION_GATE_STAGE_REPO",
        default_value = ""
    )]
    pub stage_repo: String,

    /// Space-separated list of severity levels to ignore. Valid levels are:
    /// Critical, High, Medium, Low, Informational, Undefined.
    #[arg(
        short = 'l',
        long,
        env = "PROMOTION_GATE_IGNORE_LEVELS",
        default_value = ""
    )]
    pub ignore_levels: String,

    /// Space-separated list of individual CVEs to ignore.
    #[arg(
        short = 'c',
        long,
        env = "PROMOTION_GATE_IGNORE_CVE",
        default_value = ""
    )]
    pub ignore_cve: String,

    /// Writes the scan result in JUnit format to this path.
    #[arg(short = 'j', long, env = "PROMOTION_GATE_JUNIT_REPORT_PATH")]
    pub junit_report_path: Option<PathBuf>,

    /// Maximum time, in minutes, to wait for the image scan to complete.
    #[arg(
        long,
        env = "PROMOTION_GATE_SCAN_WAIT_TIMEOUT",
        default_value_t = 20,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub scan_wait_timeout: u64,

    /// Time, in seconds, between two scan status queries.
    #[arg(
        long,
        env = "PROMOTION_GATE_POLL_INTERVAL",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,

    /// Maximum time, in seconds, for a single registry or scanner call.
    #[arg(
        long,
        env = "PROMOTION_GATE_CALL_TIMEOUT",
        default_value_t = 120,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub call_timeout: u64,

    /// Space-separated list of extra tags pushed for every image after promotion.
    #[arg(
        short = 't',
        long,
        env = "PROMOTION_GATE_ADDITIONAL_TAGS",
        default_value = ""
    )]
    pub additional_tags: String,

    /// Only push to the scanning repository, never to the destination.
    #[arg(short = 'p', long, env = "PROMOTION_GATE_SKIP_PUSH")]
    pub skip_push: bool,

    /// Path to the aws cli binary.
    #[arg(long, env = "PROMOTION_GATE_AWS_CLI", default_value = "aws")]
    pub aws_cli: PathBuf,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidSeverity(#[from] InvalidSeverityError),

    #[error(transparent)]
    InvalidImageReference(#[from] ImageReferenceError),

    #[error("at least one image reference must be provided")]
    NoImages,

    #[error("a scan wait timeout of {0} minutes is too large")]
    ScanWaitTimeoutTooLarge(u64),
}

/// Everything a gate run needs, validated and frozen before any network call.
#[derive(Clone, Debug)]
pub struct GateConfig {
    primary_image: ImageReference,
    other_images: Vec<ImageReference>,
    pub stage_repository: ImageReference,
    pub ignore_policy: IgnorePolicy,
    pub junit_report_path: Option<PathBuf>,
    pub scan_wait: ScanWaitSettings,
    pub additional_tags: Vec<String>,
    pub skip_push: bool,
    pub aws_cli: PathBuf,
}

impl GateConfig {
    /// Builds a configuration with default timeouts and no exemptions.
    pub fn new(
        primary_image: ImageReference,
        other_images: Vec<ImageReference>,
        stage_repository: ImageReference,
    ) -> Self {
        Self {
            primary_image,
            other_images,
            stage_repository,
            ignore_policy: IgnorePolicy::default(),
            junit_report_path: None,
            scan_wait: ScanWaitSettings::default(),
            additional_tags: Vec::new(),
            skip_push: false,
            aws_cli: PathBuf::from("aws"),
        }
    }

    /// The image that gets scanned; the other images are assumed to be the same image.
    pub fn primary_image(&self) -> &ImageReference {
        &self.primary_image
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageReference> {
        std::iter::once(&self.primary_image).chain(self.other_images.iter())
    }

    /// Bound of every single registry or scanner call.
    pub fn call_timeout(&self) -> Duration {
        self.scan_wait.call_timeout
    }
}

impl TryFrom<CliArgs> for GateConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        Severity::validate(args.ignore_levels.split_whitespace())?;
        let ignored_severities = args
            .ignore_levels
            .split_whitespace()
            .map(str::parse::<Severity>)
            .collect::<Result<Vec<_>, _>>()?;
        let ignore_policy =
            IgnorePolicy::new(ignored_severities, args.ignore_cve.split_whitespace());

        let mut images = args
            .images
            .split_whitespace()
            .unique()
            .map(str::parse::<ImageReference>)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();
        let primary_image = images.next().ok_or(ConfigError::NoImages)?;
        let other_images = images.collect_vec();

        let stage_repository = if args.stage_repo.trim().is_empty() {
            info!(
                "stage repository is not specified, the repository of {primary_image} will be used as a scanning silo"
            );
            primary_image.clone()
        } else {
            args.stage_repo.trim().parse::<ImageReference>()?
        }
        .require_ecr()?;

        let additional_tags = args
            .additional_tags
            .split_whitespace()
            .unique()
            .map(|tag| primary_image.with_tag(tag).map(|_| tag.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        let scan_wait_timeout = args
            .scan_wait_timeout
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or(ConfigError::ScanWaitTimeoutTooLarge(args.scan_wait_timeout))?;

        Ok(Self {
            primary_image,
            other_images,
            stage_repository,
            ignore_policy,
            junit_report_path: args.junit_report_path,
            scan_wait: ScanWaitSettings {
                poll_interval: Duration::from_secs(args.poll_interval),
                timeout: scan_wait_timeout,
                call_timeout: Duration::from_secs(args.call_timeout),
            },
            additional_tags,
            skip_push: args.skip_push,
            aws_cli: args.aws_cli,
        })
    }
}

impl ConfigError {
    pub fn exit_code(&self) -> u8 {
        2
    }
}
