//! Upgrade state machine for a single unit.
//!
//! Steps run in a fixed order, each optional except the install:
//!
//! 1. **AssertingExistingCode** (unless `reset`): abort if the unit already
//!    runs the proposed module
//! 2. **StoppingUnit** (if `stop_unit`)
//! 3. **TakingSnapshot** (if `take_snapshot`)
//! 4. **InstallingCode**: single call, or chunk + reconcile + upload + install
//! 5. **RestartingUnit** (if `stop_unit`)
//!
//! Every executed step emits `InProgress` before its first remote call and
//! `Success` or `Error` once it resolves. The first failing step ends the
//! run. A failure after the unit was stopped leaves it stopped. That
//! includes a failed chunk store cleanup after a successful chunked
//! install: the new code is in place but the unit is not restarted.

use std::future::Future;

use tracing::{debug, info};
use unitdeploy_protocol::{
    ModuleHash, ProgressEvent, SnapshotId, UnitId, UpgradeStep, optional_from_wire,
};
use unitdeploy_transfer::{
    ContentHasher, Sha256Hasher, TransferError, chunk_module, needs_chunking, ordered_handles,
    validate_chunk_order,
};

use crate::chunk_store::reconcile;
use crate::config::{SnapshotPolicy, UpgradeConfig};
use crate::error::{RemoteError, UpgradeError};
use crate::progress::{Progress, ProgressReporter};
use crate::remote::{ChunkedInstall, RemoteManagement};
use crate::types::{InstallSummary, UpgradeOutcome, UpgradeRequest};
use crate::uploader::upload_chunks;

/// Runs upgrade requests against one platform connection.
pub struct UnitUpgrade<'a> {
    remote: &'a dyn RemoteManagement,
    config: &'a UpgradeConfig,
    hasher: &'a dyn ContentHasher,
}

impl<'a> UnitUpgrade<'a> {
    pub fn new(remote: &'a dyn RemoteManagement, config: &'a UpgradeConfig) -> Self {
        Self {
            remote,
            config,
            hasher: &Sha256Hasher,
        }
    }

    /// Replaces the SHA-256 hasher used for module and chunk digests.
    pub fn with_hasher(mut self, hasher: &'a dyn ContentHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Runs the full pipeline for `req`.
    ///
    /// Preconditions are checked before any remote call or progress event.
    pub async fn run(
        &self,
        req: &UpgradeRequest,
        reporter: Option<&dyn ProgressReporter>,
    ) -> Result<UpgradeOutcome, UpgradeError> {
        check_preconditions(req, self.config)?;

        let progress = Progress::new(reporter);
        let unit = &req.unit;
        let module_hash = self.hasher.digest(&req.module);

        debug!(
            unit = %unit,
            module_hash = %module_hash,
            bytes = req.module.len(),
            "upgrade started"
        );

        if !req.reset {
            run_step(
                progress,
                unit,
                UpgradeStep::AssertingExistingCode,
                self.assert_code_changed(unit, module_hash),
            )
            .await?;
        }

        if req.stop_unit {
            run_step(progress, unit, UpgradeStep::StoppingUnit, async {
                self.remote
                    .stop(unit)
                    .await
                    .map_err(|e| UpgradeError::remote(UpgradeStep::StoppingUnit, e))
            })
            .await?;
        }

        let snapshot = if req.take_snapshot {
            Some(
                run_step(
                    progress,
                    unit,
                    UpgradeStep::TakingSnapshot,
                    self.take_snapshot(unit),
                )
                .await?,
            )
        } else {
            None
        };

        let install = run_step(
            progress,
            unit,
            UpgradeStep::InstallingCode,
            self.install(req, module_hash),
        )
        .await?;

        if req.stop_unit {
            run_step(progress, unit, UpgradeStep::RestartingUnit, async {
                self.remote
                    .start(unit)
                    .await
                    .map_err(|e| UpgradeError::remote(UpgradeStep::RestartingUnit, e))
            })
            .await?;
        }

        info!(unit = %unit, module_hash = %module_hash, "upgrade completed");

        Ok(UpgradeOutcome {
            unit: unit.clone(),
            module_hash,
            install,
            snapshot,
        })
    }

    async fn assert_code_changed(
        &self,
        unit: &UnitId,
        module_hash: ModuleHash,
    ) -> Result<(), UpgradeError> {
        let installed = self
            .remote
            .read_module_hash(unit)
            .await
            .map_err(|e| UpgradeError::remote(UpgradeStep::AssertingExistingCode, e))?;

        if installed == Some(module_hash) {
            return Err(UpgradeError::UnchangedCode {
                unit: unit.clone(),
                hash: module_hash,
            });
        }
        Ok(())
    }

    async fn take_snapshot(&self, unit: &UnitId) -> Result<SnapshotId, UpgradeError> {
        let step = UpgradeStep::TakingSnapshot;

        let replace = match self.config.snapshot_policy {
            SnapshotPolicy::Append => None,
            SnapshotPolicy::Replace => {
                let existing = self
                    .remote
                    .list_snapshots(unit)
                    .await
                    .map_err(|e| UpgradeError::remote(step, e))?;
                optional_from_wire("snapshot", existing)
                    .map_err(|source| UpgradeError::ResponseShape { step, source })?
            }
        };

        let id = self
            .remote
            .snapshot(unit, replace.as_ref())
            .await
            .map_err(|e| UpgradeError::remote(step, e))?;
        debug!(unit = %unit, snapshot = %id, replaced = replace.is_some(), "snapshot taken");
        Ok(id)
    }

    async fn install(
        &self,
        req: &UpgradeRequest,
        module_hash: ModuleHash,
    ) -> Result<InstallSummary, UpgradeError> {
        if needs_chunking(req.module.len(), self.config.chunk_threshold_bytes) {
            return self.install_chunked(req, module_hash).await;
        }

        self.remote
            .install_single(&req.unit, req.mode, &req.init_arg, &req.module)
            .await
            .map_err(|e| UpgradeError::remote(UpgradeStep::InstallingCode, e))?;
        Ok(InstallSummary::Single {
            bytes: req.module.len(),
        })
    }

    async fn install_chunked(
        &self,
        req: &UpgradeRequest,
        module_hash: ModuleHash,
    ) -> Result<InstallSummary, UpgradeError> {
        let step = UpgradeStep::InstallingCode;
        let remote_err = move |e: RemoteError| UpgradeError::remote(step, e);
        let transfer_err = move |source: TransferError| UpgradeError::Transfer { step, source };
        let store = req.chunk_store();
        let mut cleared_before = false;

        if req.pre_clear_chunks {
            self.remote
                .clear_chunk_store(store)
                .await
                .map_err(remote_err)?;
            cleared_before = true;
        }

        let chunks =
            chunk_module(&req.module, self.config.chunk_size, self.hasher).map_err(transfer_err)?;
        validate_chunk_order(&chunks).map_err(transfer_err)?;

        let plan = reconcile(self.remote, &req.unit, req.chunk_store_scope.as_ref(), chunks)
            .await
            .map_err(remote_err)?;
        if plan.must_clear {
            debug!(store = %store, stored = plan.stored, "clearing stale chunks");
            self.remote
                .clear_chunk_store(store)
                .await
                .map_err(remote_err)?;
            cleared_before = true;
        }

        let results = upload_chunks(
            self.remote,
            store,
            &plan.to_upload,
            self.config.upload_concurrency,
        )
        .await
        .map_err(remote_err)?;
        let uploaded = results.len();
        let handles = ordered_handles(results).map_err(transfer_err)?;

        self.remote
            .install_chunked(ChunkedInstall {
                unit: &req.unit,
                store,
                mode: req.mode,
                init_arg: &req.init_arg,
                chunks: &handles,
                module_hash,
            })
            .await
            .map_err(remote_err)?;

        // A shared store keeps its chunks for the next unit.
        let cleared_after = req.chunk_store_scope.is_none();
        if cleared_after {
            self.remote
                .clear_chunk_store(store)
                .await
                .map_err(remote_err)?;
        }

        Ok(InstallSummary::Chunked {
            store: store.clone(),
            chunks: handles.len(),
            uploaded,
            cleared_before,
            cleared_after,
        })
    }
}

/// Upgrades one unit with the default configuration.
pub async fn run_upgrade(
    remote: &dyn RemoteManagement,
    req: &UpgradeRequest,
    reporter: Option<&dyn ProgressReporter>,
) -> Result<UpgradeOutcome, UpgradeError> {
    let config = UpgradeConfig::default();
    UnitUpgrade::new(remote, &config).run(req, reporter).await
}

fn check_preconditions(req: &UpgradeRequest, config: &UpgradeConfig) -> Result<(), UpgradeError> {
    if req.unit.is_blank() {
        return Err(UpgradeError::PreconditionUnmet(
            "target unit id is required".into(),
        ));
    }
    if req.chunk_store_scope.as_ref().is_some_and(UnitId::is_blank) {
        return Err(UpgradeError::PreconditionUnmet(
            "chunk store scope id must not be blank".into(),
        ));
    }
    config.validate()
}

/// Wraps one step with its progress events.
async fn run_step<T>(
    progress: Progress<'_>,
    unit: &UnitId,
    step: UpgradeStep,
    work: impl Future<Output = Result<T, UpgradeError>>,
) -> Result<T, UpgradeError> {
    progress.emit(ProgressEvent::in_progress(step));
    debug!(unit = %unit, %step, "step started");

    match work.await {
        Ok(value) => {
            progress.emit(ProgressEvent::success(step));
            Ok(value)
        }
        Err(err) => {
            debug!(unit = %unit, %step, error = %err, "step failed");
            progress.emit(ProgressEvent::error(step));
            Err(err)
        }
    }
}
