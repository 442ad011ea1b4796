use thiserror::Error;

/// Raised when more findings are ignored than were reported.
///
/// It can only happen through a logic error in this crate, never through user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "internal logic error: {ignored} findings were ignored out of {total} reported findings, please report this to the maintainers"
)]
pub struct InvariantViolation {
    pub ignored: usize,
    pub total: usize,
}
