//! Batched chunk upload.
//!
//! Chunks are sent in consecutive batches of at most `concurrency` uploads.
//! Uploads inside a batch run concurrently; the next batch starts only once
//! every upload of the current one has resolved, so no more than
//! `concurrency` chunks are ever in flight.

use futures_util::future::try_join_all;
use tracing::debug;
use unitdeploy_protocol::UnitId;
use unitdeploy_transfer::{Chunk, ChunkUploadResult};

use crate::error::RemoteError;
use crate::remote::RemoteManagement;

/// Uploads `chunks` to the chunk store of `store`.
///
/// Results are returned in input order; callers still sort by order id
/// before installing. The first failed upload aborts the whole operation;
/// uploads still running in that batch are dropped and no later batch is
/// started.
pub async fn upload_chunks(
    remote: &dyn RemoteManagement,
    store: &UnitId,
    chunks: &[Chunk<'_>],
    concurrency: usize,
) -> Result<Vec<ChunkUploadResult>, RemoteError> {
    let batch_size = concurrency.max(1);
    let batches = chunks.len().div_ceil(batch_size);
    let mut results = Vec::with_capacity(chunks.len());

    for (index, batch) in chunks.chunks(batch_size).enumerate() {
        debug!(
            store = %store,
            batch = index + 1,
            batches,
            size = batch.len(),
            "uploading chunk batch"
        );

        let uploads = batch.iter().map(|chunk| async move {
            let handle = remote.upload_chunk(store, chunk.data).await?;
            Ok::<_, RemoteError>(ChunkUploadResult {
                order_id: chunk.order_id,
                handle,
            })
        });
        results.extend(try_join_all(uploads).await?);
    }

    debug!(store = %store, chunks = results.len(), "chunk upload complete");
    Ok(results)
}
