//! Upgrade error types.

use unitdeploy_protocol::{ModuleHash, ShapeError, UnitId, UpgradeStep};
use unitdeploy_transfer::TransferError;

/// Failure reported by a [`RemoteManagement`](crate::RemoteManagement) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("rejected by platform (code {code}): {message}")]
    Rejected { code: u32, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    ResponseShape(#[from] ShapeError),
}

/// Errors produced by an upgrade run.
///
/// Every variant except [`PreconditionUnmet`](Self::PreconditionUnmet) is tied
/// to the step that failed, which is also the step of the last `Error`
/// progress event.
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    #[error("precondition unmet: {0}")]
    PreconditionUnmet(String),

    #[error("unit {unit} already runs module {hash}")]
    UnchangedCode { unit: UnitId, hash: ModuleHash },

    #[error("{step} failed: {source}")]
    Remote {
        step: UpgradeStep,
        #[source]
        source: RemoteError,
    },

    #[error("{step} failed: unexpected response shape: {source}")]
    ResponseShape {
        step: UpgradeStep,
        #[source]
        source: ShapeError,
    },

    #[error("{step} failed: {source}")]
    Transfer {
        step: UpgradeStep,
        #[source]
        source: TransferError,
    },
}

impl UpgradeError {
    /// Attributes a remote failure to `step`.
    ///
    /// Shape violations are lifted out of [`RemoteError`] so callers can
    /// tell contract breaches apart from ordinary rejections.
    pub fn remote(step: UpgradeStep, err: RemoteError) -> Self {
        match err {
            RemoteError::ResponseShape(source) => UpgradeError::ResponseShape { step, source },
            source => UpgradeError::Remote { step, source },
        }
    }

    /// The step that failed, if the failure happened inside the pipeline.
    pub fn step(&self) -> Option<UpgradeStep> {
        match self {
            UpgradeError::PreconditionUnmet(_) => None,
            UpgradeError::UnchangedCode { .. } => Some(UpgradeStep::AssertingExistingCode),
            UpgradeError::Remote { step, .. }
            | UpgradeError::ResponseShape { step, .. }
            | UpgradeError::Transfer { step, .. } => Some(*step),
        }
    }

    /// `true` when the unit already runs the proposed module.
    pub fn is_unchanged_code(&self) -> bool {
        matches!(self, UpgradeError::UnchangedCode { .. })
    }
}
