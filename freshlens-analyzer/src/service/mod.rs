//! Service layer
//!
//! Services chain source lookups, the run orchestrator and the pure
//! analysis functions into the pipelines behind each report.
//!
//! Every service is generic over the source traits so it can run against an
//! in-memory fake in tests.

pub mod opportunities;
pub mod overlap;
pub mod runs;
pub mod selection;

use freshlens_client::ClientError;
use thiserror::Error;

use crate::scheduler::BatchError;

pub use opportunities::find_opportunities;
pub use overlap::{OverlapAnalysis, analyze_overlap};
pub use runs::{RunAnalysis, analyze_runs};
pub use selection::{RunSelection, SelectedRuns, select_runs};

/// Failure of a whole pipeline
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}
