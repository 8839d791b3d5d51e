//! In-memory platform that records every call, for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use unitdeploy_protocol::{ChunkHandle, ModuleHash, SnapshotId, UnitId, UpgradeMode};
use unitdeploy_transfer::{ContentHasher, Sha256Hasher};

use crate::error::RemoteError;
use crate::remote::{ChunkedInstall, RemoteFuture, RemoteManagement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    ReadModuleHash,
    Stop,
    Start,
    ListSnapshots,
    Snapshot,
    InstallSingle,
    ListStoredChunks,
    ClearChunkStore,
    UploadChunk,
    InstallChunked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    ReadModuleHash(UnitId),
    Stop(UnitId),
    Start(UnitId),
    ListSnapshots(UnitId),
    Snapshot {
        unit: UnitId,
        replace: Option<SnapshotId>,
    },
    InstallSingle {
        unit: UnitId,
        mode: UpgradeMode,
        bytes: usize,
    },
    ListStoredChunks(UnitId),
    ClearChunkStore(UnitId),
    UploadChunk {
        store: UnitId,
        bytes: usize,
    },
    InstallChunked {
        unit: UnitId,
        store: UnitId,
        chunks: Vec<ChunkHandle>,
        module_hash: ModuleHash,
    },
}

impl Call {
    pub(crate) fn op(&self) -> Op {
        match self {
            Call::ReadModuleHash(_) => Op::ReadModuleHash,
            Call::Stop(_) => Op::Stop,
            Call::Start(_) => Op::Start,
            Call::ListSnapshots(_) => Op::ListSnapshots,
            Call::Snapshot { .. } => Op::Snapshot,
            Call::InstallSingle { .. } => Op::InstallSingle,
            Call::ListStoredChunks(_) => Op::ListStoredChunks,
            Call::ClearChunkStore(_) => Op::ClearChunkStore,
            Call::UploadChunk { .. } => Op::UploadChunk,
            Call::InstallChunked { .. } => Op::InstallChunked,
        }
    }
}

type DelayFn = fn(&[u8]) -> Duration;

/// Fake platform. Chunk handles are store-local slot names, deliberately
/// unrelated to the chunk's content hash.
#[derive(Default)]
pub(crate) struct FakePlatform {
    calls: Mutex<Vec<Call>>,
    installed: Mutex<HashMap<UnitId, ModuleHash>>,
    stores: Mutex<HashMap<UnitId, Vec<(ChunkHandle, Vec<u8>)>>>,
    snapshots: Mutex<HashMap<UnitId, Vec<SnapshotId>>>,
    failures: Mutex<HashMap<Op, RemoteError>>,
    fail_upload_at: Mutex<Option<usize>>,
    upload_delay: Mutex<Option<DelayFn>>,
    uploads_started: AtomicUsize,
    uploads_completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed_at_start: Mutex<Vec<usize>>,
    next_handle: AtomicUsize,
    next_snapshot: AtomicUsize,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_installed(&self, unit: &str, hash: ModuleHash) {
        self.installed
            .lock()
            .unwrap()
            .insert(UnitId::new(unit), hash);
    }

    pub(crate) fn installed(&self, unit: &str) -> Option<ModuleHash> {
        self.installed
            .lock()
            .unwrap()
            .get(&UnitId::new(unit))
            .copied()
    }

    pub(crate) fn store_chunk(&self, store: &str, bytes: &[u8]) {
        let handle = self.next_handle(&UnitId::new(store));
        self.stores
            .lock()
            .unwrap()
            .entry(UnitId::new(store))
            .or_default()
            .push((handle, bytes.to_vec()));
    }

    pub(crate) fn stored_count(&self, store: &str) -> usize {
        self.stores
            .lock()
            .unwrap()
            .get(&UnitId::new(store))
            .map_or(0, Vec::len)
    }

    pub(crate) fn add_snapshot(&self, unit: &str, id: &str) {
        self.snapshots
            .lock()
            .unwrap()
            .entry(UnitId::new(unit))
            .or_default()
            .push(SnapshotId::new(id));
    }

    pub(crate) fn snapshots(&self, unit: &str) -> Vec<SnapshotId> {
        self.snapshots
            .lock()
            .unwrap()
            .get(&UnitId::new(unit))
            .cloned()
            .unwrap_or_default()
    }

    /// Makes every call of `op` fail with `err`.
    pub(crate) fn fail(&self, op: Op, err: RemoteError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    /// Makes the `index`-th upload (0-based, in start order) fail.
    pub(crate) fn fail_upload_at(&self, index: usize) {
        *self.fail_upload_at.lock().unwrap() = Some(index);
    }

    /// Delays each upload by a duration derived from its bytes.
    pub(crate) fn delay_uploads(&self, delay: DelayFn) {
        *self.upload_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn ops(&self) -> Vec<Op> {
        self.calls().iter().map(Call::op).collect()
    }

    pub(crate) fn count(&self, op: Op) -> usize {
        self.ops().into_iter().filter(|o| *o == op).count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// For every upload, in start order, how many uploads had already
    /// completed when it started.
    pub(crate) fn completed_at_start(&self) -> Vec<usize> {
        self.completed_at_start.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), RemoteError> {
        let op = call.op();
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_handle(&self, store: &UnitId) -> ChunkHandle {
        let slot = self.next_handle.fetch_add(1, Ordering::SeqCst);
        ChunkHandle::new(format!("{store}#slot-{slot}").into_bytes())
    }

    fn rejected(message: &str) -> RemoteError {
        RemoteError::Rejected {
            code: 5,
            message: message.to_string(),
        }
    }
}

impl RemoteManagement for FakePlatform {
    fn read_module_hash<'a>(&'a self, unit: &'a UnitId) -> RemoteFuture<'a, Option<ModuleHash>> {
        Box::pin(async move {
            self.record(Call::ReadModuleHash(unit.clone()))?;
            Ok(self.installed.lock().unwrap().get(unit).copied())
        })
    }

    fn stop<'a>(&'a self, unit: &'a UnitId) -> RemoteFuture<'a, ()> {
        Box::pin(async move { self.record(Call::Stop(unit.clone())) })
    }

    fn start<'a>(&'a self, unit: &'a UnitId) -> RemoteFuture<'a, ()> {
        Box::pin(async move { self.record(Call::Start(unit.clone())) })
    }

    fn list_snapshots<'a>(&'a self, unit: &'a UnitId) -> RemoteFuture<'a, Vec<SnapshotId>> {
        Box::pin(async move {
            self.record(Call::ListSnapshots(unit.clone()))?;
            Ok(self
                .snapshots
                .lock()
                .unwrap()
                .get(unit)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn snapshot<'a>(
        &'a self,
        unit: &'a UnitId,
        replace: Option<&'a SnapshotId>,
    ) -> RemoteFuture<'a, SnapshotId> {
        Box::pin(async move {
            self.record(Call::Snapshot {
                unit: unit.clone(),
                replace: replace.cloned(),
            })?;
            let id = SnapshotId::new(format!(
                "{unit}-snap-{}",
                self.next_snapshot.fetch_add(1, Ordering::SeqCst)
            ));
            let mut snapshots = self.snapshots.lock().unwrap();
            let held = snapshots.entry(unit.clone()).or_default();
            if let Some(old) = replace {
                if !held.contains(old) {
                    return Err(Self::rejected("snapshot to replace not found"));
                }
                held.retain(|s| s != old);
            }
            held.push(id.clone());
            Ok(id)
        })
    }

    fn install_single<'a>(
        &'a self,
        unit: &'a UnitId,
        mode: UpgradeMode,
        _init_arg: &'a [u8],
        module: &'a [u8],
    ) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            self.record(Call::InstallSingle {
                unit: unit.clone(),
                mode,
                bytes: module.len(),
            })?;
            self.installed
                .lock()
                .unwrap()
                .insert(unit.clone(), Sha256Hasher.digest(module));
            Ok(())
        })
    }

    fn list_stored_chunks<'a>(&'a self, store: &'a UnitId) -> RemoteFuture<'a, Vec<ChunkHandle>> {
        Box::pin(async move {
            self.record(Call::ListStoredChunks(store.clone()))?;
            Ok(self
                .stores
                .lock()
                .unwrap()
                .get(store)
                .map(|chunks| chunks.iter().map(|(h, _)| h.clone()).collect())
                .unwrap_or_default())
        })
    }

    fn clear_chunk_store<'a>(&'a self, store: &'a UnitId) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            self.record(Call::ClearChunkStore(store.clone()))?;
            self.stores.lock().unwrap().remove(store);
            Ok(())
        })
    }

    fn upload_chunk<'a>(
        &'a self,
        store: &'a UnitId,
        bytes: &'a [u8],
    ) -> RemoteFuture<'a, ChunkHandle> {
        Box::pin(async move {
            self.record(Call::UploadChunk {
                store: store.clone(),
                bytes: bytes.len(),
            })?;

            let index = self.uploads_started.fetch_add(1, Ordering::SeqCst);
            self.completed_at_start
                .lock()
                .unwrap()
                .push(self.uploads_completed.load(Ordering::SeqCst));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = *self.upload_delay.lock().unwrap();
            match delay {
                Some(delay) => tokio::time::sleep(delay(bytes)).await,
                None => tokio::task::yield_now().await,
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.uploads_completed.fetch_add(1, Ordering::SeqCst);

            if *self.fail_upload_at.lock().unwrap() == Some(index) {
                return Err(RemoteError::Transport("connection reset".into()));
            }

            let handle = self.next_handle(store);
            self.stores
                .lock()
                .unwrap()
                .entry(store.clone())
                .or_default()
                .push((handle.clone(), bytes.to_vec()));
            Ok(handle)
        })
    }

    fn install_chunked<'a>(&'a self, install: ChunkedInstall<'a>) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            self.record(Call::InstallChunked {
                unit: install.unit.clone(),
                store: install.store.clone(),
                chunks: install.chunks.to_vec(),
                module_hash: install.module_hash,
            })?;

            let module = {
                let stores = self.stores.lock().unwrap();
                let stored = stores
                    .get(install.store)
                    .ok_or_else(|| Self::rejected("chunk store is empty"))?;
                let mut module = Vec::new();
                for handle in install.chunks {
                    let (_, bytes) = stored
                        .iter()
                        .find(|(h, _)| h == handle)
                        .ok_or_else(|| Self::rejected("unknown chunk handle"))?;
                    module.extend_from_slice(bytes);
                }
                module
            };

            if Sha256Hasher.digest(&module) != install.module_hash {
                return Err(Self::rejected("reassembled module hash mismatch"));
            }
            self.installed
                .lock()
                .unwrap()
                .insert(install.unit.clone(), install.module_hash);
            Ok(())
        })
    }
}
