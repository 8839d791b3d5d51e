//! Unit code upgrade flow: assert, stop, snapshot, install, restart.
//!
//! This crate implements the **upgrade logic** for replacing the code
//! module of a remote unit. It has no transport dependencies: the
//! application provides a [`RemoteManagement`] implementation that talks to
//! the platform's management interface.
//!
//! # Pipeline
//!
//! 1. **Assert**: stop early if the unit already runs the module
//! 2. **Stop**: halt the unit
//! 3. **Snapshot**: capture its state for manual rollback
//! 4. **Install**: single call, or chunked through the unit's chunk store
//!    (reconcile, clear, upload in bounded batches, install by handle)
//! 5. **Restart**: start the unit again
//!
//! [`UpgradeOrchestrator`] runs the pipeline over several units in turn.

pub mod chunk_store;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod remote;
pub mod types;
pub mod uploader;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience.
pub use chunk_store::{ReconcilePlan, reconcile};
pub use config::{ConfigError, SnapshotPolicy, UpgradeConfig};
pub use error::{RemoteError, UpgradeError};
pub use orchestrator::{FleetEvent, UnitStatus, UnitUpgradeResult, UpgradeOrchestrator};
pub use pipeline::{UnitUpgrade, run_upgrade};
pub use progress::{ChannelReporter, ProgressReporter};
pub use remote::{ChunkedInstall, RemoteFuture, RemoteManagement};
pub use types::{InstallSummary, UpgradeOutcome, UpgradeRequest};
pub use uploader::upload_chunks;
