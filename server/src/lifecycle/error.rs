use thiserror::Error;

use crate::artifact::ArtifactError;
use crate::store::StoreError;
use crate::time_window::TimeWindowError;

/// Why a lifecycle operation did not complete.
///
/// Scan outcomes such as an already redeemed or expired ticket are not
/// errors; they come back as [`ScanOutcome`](crate::models::ticket::ScanOutcome).
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{0}")]
    MalformedInput(String),

    #[error(transparent)]
    TimeWindow(#[from] TimeWindowError),

    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Event not found")]
    EventNotFound,

    #[error(transparent)]
    Render(#[from] ArtifactError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
