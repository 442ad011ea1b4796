pub mod component_factory;
pub mod config;
mod gate_decision;
mod promotion;
mod registry_client;
pub mod report;
mod scan_backend;
mod scan_waiter;

pub use gate_decision::{GateError, decide};
pub use promotion::{
    PromotionError, PromotionOutcome, PromotionPipeline, PromotionStep, scanning_tag,
};
pub use registry_client::{RegistryClient, RegistryError};
pub use scan_backend::{ScanBackend, ScanBackendError, ScanStatus, ScanStatusReport};
pub use scan_waiter::{
    DEFAULT_CALL_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_SCAN_WAIT_TIMEOUT, ScanOutcome,
    ScanWaitSettings, ScanWaiter, UNSUPPORTED_IMAGE_MARKER, is_unsupported_image,
};
