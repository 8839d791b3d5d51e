//! Data types for an upgrade run.

use std::sync::Arc;

use unitdeploy_protocol::{ModuleHash, SnapshotId, UnitId, UpgradeMode};

/// Everything needed to upgrade one unit.
#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    /// Unit receiving the code.
    pub unit: UnitId,
    /// Shared chunk store used instead of the unit's own, so that several
    /// units upgraded to the same module can reuse uploaded chunks.
    pub chunk_store_scope: Option<UnitId>,
    pub module: Arc<[u8]>,
    /// Encoded init/upgrade argument passed to the module.
    pub init_arg: Vec<u8>,
    pub mode: UpgradeMode,
    /// Clear the chunk store before anything is uploaded.
    pub pre_clear_chunks: bool,
    pub take_snapshot: bool,
    /// Skip the unchanged-code check and install regardless.
    pub reset: bool,
    /// Stop the unit before and start it after the install.
    pub stop_unit: bool,
}

impl UpgradeRequest {
    pub fn new(unit: impl Into<UnitId>, module: impl Into<Arc<[u8]>>) -> Self {
        Self {
            unit: unit.into(),
            chunk_store_scope: None,
            module: module.into(),
            init_arg: Vec::new(),
            mode: UpgradeMode::default(),
            pre_clear_chunks: false,
            take_snapshot: true,
            reset: false,
            stop_unit: true,
        }
    }

    pub fn with_chunk_store_scope(mut self, scope: impl Into<UnitId>) -> Self {
        self.chunk_store_scope = Some(scope.into());
        self
    }

    pub fn with_init_arg(mut self, init_arg: impl Into<Vec<u8>>) -> Self {
        self.init_arg = init_arg.into();
        self
    }

    pub fn with_mode(mut self, mode: UpgradeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_pre_clear_chunks(mut self, pre_clear: bool) -> Self {
        self.pre_clear_chunks = pre_clear;
        self
    }

    pub fn with_snapshot(mut self, take_snapshot: bool) -> Self {
        self.take_snapshot = take_snapshot;
        self
    }

    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    pub fn with_stop_unit(mut self, stop_unit: bool) -> Self {
        self.stop_unit = stop_unit;
        self
    }

    /// The unit whose chunk store receives uploads for this request.
    pub fn chunk_store(&self) -> &UnitId {
        self.chunk_store_scope.as_ref().unwrap_or(&self.unit)
    }
}

/// How the code was transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSummary {
    /// Whole module sent in one call.
    Single { bytes: usize },
    /// Module uploaded through a chunk store.
    Chunked {
        store: UnitId,
        chunks: usize,
        uploaded: usize,
        cleared_before: bool,
        cleared_after: bool,
    },
}

/// Result of a successful upgrade run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOutcome {
    pub unit: UnitId,
    pub module_hash: ModuleHash,
    pub install: InstallSummary,
    /// Snapshot taken before the install, kept for manual rollback.
    pub snapshot: Option<SnapshotId>,
}
