//! Error taxonomy spanning every engine operation.

use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::capability::CapabilityError;
use crate::draw::DrawError;
use crate::query::ValidationError;

/// Root error type for the workbench engine.
#[derive(Debug, Error)]
pub enum WorkbenchError {
    /// Malformed query: empty group, unknown field or operator/type
    /// mismatch. Surfaced synchronously at build time.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Draw session misuse or too few vertices.
    #[error(transparent)]
    Draw(#[from] DrawError),

    /// Analysis precondition failure or an aborting capability error.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// A geometry or render call outside an analysis batch failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// Type alias for results using [`WorkbenchError`].
pub type Result<T> = std::result::Result<T, WorkbenchError>;
