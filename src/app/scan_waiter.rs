use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::domain::scangate::{finding::Finding, image_identity::ImageIdentity};

use super::scan_backend::{ScanBackend, ScanBackendError, ScanStatus, ScanStatusReport};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_SCAN_WAIT_TIMEOUT: Duration = Duration::from_secs(20 * 60);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Deadline used when the scan wait timeout does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Text the scanning backend puts in the status description of images it cannot scan.
pub const UNSUPPORTED_IMAGE_MARKER: &str = "UnsupportedImageError";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanWaitSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub call_timeout: Duration,
}

impl Default for ScanWaitSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_SCAN_WAIT_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub enum ScanOutcome {
    Findings(Vec<Finding>),
    Unsupported { reason: String },
    TimedOut { waited: Duration },
    BackendError(ScanBackendError),
}

/// Whether a terminal scan status means "this image cannot be scanned".
///
/// The backend reports unsupported images as a plain failure and only tells
/// them apart in the free-text description, so this relies on
/// [`UNSUPPORTED_IMAGE_MARKER`] being present in it. If the backend changes
/// that wording, unsupported images start being reported as failed scans.
pub fn is_unsupported_image(status: &ScanStatus, description: Option<&str>) -> bool {
    match status {
        ScanStatus::UnsupportedImage => true,
        ScanStatus::Failed => description.is_some_and(|d| d.contains(UNSUPPORTED_IMAGE_MARKER)),
        _ => false,
    }
}

/// Polls the scanning backend at a fixed interval until the scan of an image
/// leaves the in-progress state or the deadline passes.
pub struct ScanWaiter<'a, S: ?Sized> {
    backend: &'a S,
    settings: ScanWaitSettings,
}

impl<'a, S> ScanWaiter<'a, S>
where
    S: ScanBackend + Sync + ?Sized,
{
    pub fn new(backend: &'a S, settings: ScanWaitSettings) -> Self {
        Self { backend, settings }
    }

    pub async fn wait_for(&self, image: &ImageIdentity, repository: &str) -> ScanOutcome {
        let started = Instant::now();
        let deadline = started
            .checked_add(self.settings.timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            let call_budget = self.settings.call_timeout.min(remaining);

            let report = match timeout(
                call_budget,
                self.backend.query_scan_status(image, repository),
            )
            .await
            {
                Ok(Ok(report)) => report,
                Ok(Err(error)) => return ScanOutcome::BackendError(error),
                Err(_) if Instant::now() >= deadline => {
                    return ScanOutcome::TimedOut {
                        waited: started.elapsed(),
                    };
                }
                Err(_) => {
                    return ScanOutcome::BackendError(ScanBackendError::CallTimedOut(
                        self.settings.call_timeout,
                    ));
                }
            };

            if !report.status.is_in_progress() {
                info!("image scan status: {}", report.status);
                return Self::terminal_outcome(report);
            }

            if Instant::now() >= deadline {
                warn!(
                    "image scan still {} after {:?}, giving up",
                    report.status,
                    started.elapsed()
                );
                return ScanOutcome::TimedOut {
                    waited: started.elapsed(),
                };
            }

            debug!(
                attempt,
                "image scan status for {image} is {}, checking again in {:?}",
                report.status,
                self.settings.poll_interval
            );
            sleep(
                self.settings
                    .poll_interval
                    .min(deadline.saturating_duration_since(Instant::now())),
            )
            .await;
        }
    }

    fn terminal_outcome(report: ScanStatusReport) -> ScanOutcome {
        match report.status {
            ScanStatus::Complete => ScanOutcome::Findings(report.findings.unwrap_or_default()),
            status if is_unsupported_image(&status, report.description.as_deref()) => {
                let reason = report
                    .description
                    .unwrap_or_else(|| UNSUPPORTED_IMAGE_MARKER.to_string());
                warn!("the scanning backend does not support this image: {reason}");
                ScanOutcome::Unsupported { reason }
            }
            status => ScanOutcome::BackendError(ScanBackendError::ScanFailed {
                status,
                description: report.description,
            }),
        }
    }
}
