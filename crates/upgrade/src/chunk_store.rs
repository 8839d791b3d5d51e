//! Chunk store reconciliation.
//!
//! Decides which chunks still have to be uploaded and whether the remote
//! store must be purged first. The reconciler only reads; clearing is left
//! to the pipeline.

use tracing::debug;
use unitdeploy_protocol::UnitId;
use unitdeploy_transfer::Chunk;

use crate::error::RemoteError;
use crate::remote::RemoteManagement;

/// Outcome of comparing proposed chunks with a remote chunk store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan<'a> {
    /// Chunks that must be uploaded, in order.
    pub to_upload: Vec<Chunk<'a>>,
    /// The store holds chunks that must be purged before uploading.
    pub must_clear: bool,
    /// Number of chunks the store held when queried.
    pub stored: usize,
}

/// Queries the chunk store of `scope` (or of `target` when unscoped) and
/// plans the upload of `proposed`.
///
/// Stored chunk handles are opaque store references, not content hashes, so
/// they are never compared with the proposed chunks. Whenever the store
/// holds anything, every proposed chunk is uploaded and the store is flagged
/// for clearing.
pub async fn reconcile<'a>(
    remote: &dyn RemoteManagement,
    target: &UnitId,
    scope: Option<&UnitId>,
    proposed: Vec<Chunk<'a>>,
) -> Result<ReconcilePlan<'a>, RemoteError> {
    let store = scope.unwrap_or(target);
    let stored = remote.list_stored_chunks(store).await?.len();

    if stored > 0 && scope.is_some() {
        debug!(
            store = %store,
            stored,
            proposed = proposed.len(),
            "shared chunk store not empty, chunk reuse disabled"
        );
    }

    Ok(ReconcilePlan {
        to_upload: proposed,
        must_clear: stored > 0,
        stored,
    })
}
