use std::fmt;

use serde::{Deserialize, Serialize};

/// A step of the upgrade pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeStep {
    AssertingExistingCode,
    StoppingUnit,
    TakingSnapshot,
    InstallingCode,
    RestartingUnit,
}

impl fmt::Display for UpgradeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpgradeStep::AssertingExistingCode => "asserting existing code",
            UpgradeStep::StoppingUnit => "stopping unit",
            UpgradeStep::TakingSnapshot => "taking snapshot",
            UpgradeStep::InstallingCode => "installing code",
            UpgradeStep::RestartingUnit => "restarting unit",
        };
        f.write_str(s)
    }
}

/// State of a step at the time a progress event is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepState {
    InProgress,
    Success,
    Error,
}

/// Emitted when a step starts (`InProgress`) and once more when it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub step: UpgradeStep,
    pub state: StepState,
}

impl ProgressEvent {
    pub const fn new(step: UpgradeStep, state: StepState) -> Self {
        Self { step, state }
    }

    pub const fn in_progress(step: UpgradeStep) -> Self {
        Self::new(step, StepState::InProgress)
    }

    pub const fn success(step: UpgradeStep) -> Self {
        Self::new(step, StepState::Success)
    }

    pub const fn error(step: UpgradeStep) -> Self {
        Self::new(step, StepState::Error)
    }

    /// Returns `true` once the step has resolved either way.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, StepState::InProgress)
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.step, self.state)
    }
}
