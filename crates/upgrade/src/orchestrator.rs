//! Fleet orchestrator for rolling one module out to several units.
//!
//! Units are upgraded one after another. A failure is recorded and the
//! rollout moves on to the next unit. Cancellation is only checked between
//! units, so a unit is never abandoned mid-pipeline.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use unitdeploy_protocol::{ProgressEvent, UnitId};

use crate::config::UpgradeConfig;
use crate::error::UpgradeError;
use crate::pipeline::UnitUpgrade;
use crate::progress::ProgressReporter;
use crate::remote::RemoteManagement;
use crate::types::{UpgradeOutcome, UpgradeRequest};

/// Event emitted during a rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetEvent {
    /// Step transition of one unit's pipeline.
    Progress { unit: UnitId, event: ProgressEvent },
    Completed { unit: UnitId },
    /// The unit already runs the module.
    Skipped { unit: UnitId },
    Failed { unit: UnitId, error: String },
}

/// Final state of one unit after a rollout.
#[derive(Debug)]
pub enum UnitStatus {
    Upgraded(UpgradeOutcome),
    Unchanged,
    Failed(UpgradeError),
    /// The rollout was cancelled before this unit started.
    Cancelled,
}

/// Result of a rollout for one unit.
#[derive(Debug)]
pub struct UnitUpgradeResult {
    pub unit: UnitId,
    pub status: UnitStatus,
}

impl UnitUpgradeResult {
    /// `true` if the unit ends up running the module.
    pub fn is_success(&self) -> bool {
        matches!(self.status, UnitStatus::Upgraded(_) | UnitStatus::Unchanged)
    }
}

/// Forwards one unit's progress onto the fleet channel.
struct UnitProgress {
    unit: UnitId,
    tx: mpsc::UnboundedSender<FleetEvent>,
}

impl ProgressReporter for UnitProgress {
    fn report(&self, event: ProgressEvent) {
        if event.is_terminal() {
            debug!(unit = %self.unit, %event, "unit step resolved");
        }
        let _ = self.tx.send(FleetEvent::Progress {
            unit: self.unit.clone(),
            event,
        });
    }
}

/// Upgrades several units to the same module.
pub struct UpgradeOrchestrator {
    config: UpgradeConfig,
    events_tx: mpsc::UnboundedSender<FleetEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<FleetEvent>>,
    cancel: CancellationToken,
}

impl Default for UpgradeOrchestrator {
    fn default() -> Self {
        Self::new(UpgradeConfig::default())
    }
}

impl UpgradeOrchestrator {
    pub fn new(config: UpgradeConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<FleetEvent>> {
        self.events_rx.take()
    }

    /// Returns the token that stops the rollout before the next unit.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Upgrades every unit in `units`, in order, using `template` for
    /// everything but the target unit.
    ///
    /// Returns one result per unit, in the same order.
    pub async fn upgrade_units(
        &self,
        remote: &dyn RemoteManagement,
        template: &UpgradeRequest,
        units: &[UnitId],
    ) -> Vec<UnitUpgradeResult> {
        let mut results = Vec::with_capacity(units.len());

        for unit in units {
            if self.cancel.is_cancelled() {
                info!(unit = %unit, "rollout cancelled, unit not started");
                results.push(UnitUpgradeResult {
                    unit: unit.clone(),
                    status: UnitStatus::Cancelled,
                });
                continue;
            }

            let mut req = template.clone();
            req.unit = unit.clone();
            results.push(self.upgrade_single(remote, &req).await);
        }

        results
    }

    async fn upgrade_single(
        &self,
        remote: &dyn RemoteManagement,
        req: &UpgradeRequest,
    ) -> UnitUpgradeResult {
        let unit = req.unit.clone();
        let reporter = UnitProgress {
            unit: unit.clone(),
            tx: self.events_tx.clone(),
        };

        let status = match UnitUpgrade::new(remote, &self.config)
            .run(req, Some(&reporter))
            .await
        {
            Ok(outcome) => {
                let _ = self
                    .events_tx
                    .send(FleetEvent::Completed { unit: unit.clone() });
                info!(unit = %unit, module_hash = %outcome.module_hash, "unit upgraded");
                UnitStatus::Upgraded(outcome)
            }
            Err(err) if err.is_unchanged_code() => {
                let _ = self.events_tx.send(FleetEvent::Skipped { unit: unit.clone() });
                info!(unit = %unit, "unit already runs this module, skipped");
                UnitStatus::Unchanged
            }
            Err(err) => {
                let _ = self.events_tx.send(FleetEvent::Failed {
                    unit: unit.clone(),
                    error: err.to_string(),
                });
                error!(unit = %unit, error = %err, "upgrade failed");
                UnitStatus::Failed(err)
            }
        };

        UnitUpgradeResult { unit, status }
    }
}
