use unitdeploy_protocol::ChunkHandle;

use crate::TransferError;
use crate::types::{Chunk, ChunkUploadResult};

/// Checks that chunk order ids are exactly `0..n` in sequence.
pub fn validate_chunk_order(chunks: &[Chunk<'_>]) -> Result<(), TransferError> {
    for (expected, chunk) in chunks.iter().enumerate() {
        if chunk.order_id != expected {
            return Err(TransferError::ChunkOrder(format!(
                "expected order id {expected}, found {}",
                chunk.order_id
            )));
        }
    }
    Ok(())
}

/// Sorts upload results by order id and returns the handles in that order.
///
/// Rejects gaps and duplicates: the installer reassembles the module from
/// the handle list positionally, so a hole would produce a corrupt module.
pub fn ordered_handles(
    mut results: Vec<ChunkUploadResult>,
) -> Result<Vec<ChunkHandle>, TransferError> {
    results.sort_by_key(|r| r.order_id);

    for (expected, result) in results.iter().enumerate() {
        if result.order_id < expected {
            return Err(TransferError::ChunkOrder(format!(
                "duplicate order id {}",
                result.order_id
            )));
        }
        if result.order_id > expected {
            return Err(TransferError::ChunkOrder(format!(
                "missing order id {expected}"
            )));
        }
    }

    Ok(results.into_iter().map(|r| r.handle).collect())
}
