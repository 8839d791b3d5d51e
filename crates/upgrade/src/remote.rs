//! Remote management API consumed by the upgrade pipeline.
//!
//! The application implements [`RemoteManagement`] on top of whatever
//! transport reaches the platform. Keeping it a trait keeps the pipeline
//! decoupled from that transport and testable with fakes.

use std::future::Future;
use std::pin::Pin;

use unitdeploy_protocol::{ChunkHandle, ModuleHash, SnapshotId, UnitId, UpgradeMode};

use crate::error::RemoteError;

/// Boxed future returned by every remote call.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// Arguments of a chunked install.
#[derive(Debug, Clone, Copy)]
pub struct ChunkedInstall<'a> {
    /// Unit receiving the code.
    pub unit: &'a UnitId,
    /// Unit whose chunk store holds the uploaded chunks.
    pub store: &'a UnitId,
    pub mode: UpgradeMode,
    pub init_arg: &'a [u8],
    /// Chunk handles, ascending by order id.
    pub chunks: &'a [ChunkHandle],
    /// Digest of the whole module, verified by the platform after reassembly.
    pub module_hash: ModuleHash,
}

/// Request/response calls exposed by the platform's management interface.
///
/// Calls are never retried by the pipeline; a failure is final for the run.
pub trait RemoteManagement: Send + Sync {
    /// Returns the hash of the module currently installed on `unit`, if any.
    fn read_module_hash<'a>(&'a self, unit: &'a UnitId) -> RemoteFuture<'a, Option<ModuleHash>>;

    fn stop<'a>(&'a self, unit: &'a UnitId) -> RemoteFuture<'a, ()>;

    fn start<'a>(&'a self, unit: &'a UnitId) -> RemoteFuture<'a, ()>;

    /// Lists the snapshots currently held for `unit`.
    fn list_snapshots<'a>(&'a self, unit: &'a UnitId) -> RemoteFuture<'a, Vec<SnapshotId>>;

    /// Takes a snapshot of a stopped unit, optionally replacing an existing one.
    fn snapshot<'a>(
        &'a self,
        unit: &'a UnitId,
        replace: Option<&'a SnapshotId>,
    ) -> RemoteFuture<'a, SnapshotId>;

    /// Installs a whole module with a single call.
    fn install_single<'a>(
        &'a self,
        unit: &'a UnitId,
        mode: UpgradeMode,
        init_arg: &'a [u8],
        module: &'a [u8],
    ) -> RemoteFuture<'a, ()>;

    /// Lists the handles of chunks held by the chunk store of `store`.
    fn list_stored_chunks<'a>(&'a self, store: &'a UnitId) -> RemoteFuture<'a, Vec<ChunkHandle>>;

    fn clear_chunk_store<'a>(&'a self, store: &'a UnitId) -> RemoteFuture<'a, ()>;

    /// Uploads one chunk and returns the store's handle for it.
    fn upload_chunk<'a>(&'a self, store: &'a UnitId, bytes: &'a [u8])
    -> RemoteFuture<'a, ChunkHandle>;

    /// Installs a module reassembled from previously uploaded chunks.
    fn install_chunked<'a>(&'a self, install: ChunkedInstall<'a>) -> RemoteFuture<'a, ()>;
}
