use sha2::{Digest, Sha256};
use unitdeploy_protocol::ModuleHash;

use crate::TransferError;
use crate::types::Chunk;

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Computes content digests for chunks and whole modules.
///
/// The pipeline only ever hashes through this trait, so tests can swap in
/// a deterministic fake without touching the upload logic.
pub trait ContentHasher: Send + Sync {
    fn digest(&self, data: &[u8]) -> ModuleHash;
}

/// SHA-256, the digest the platform reports for installed modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn digest(&self, data: &[u8]) -> ModuleHash {
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        ModuleHash::new(bytes)
    }
}

// ---------------------------------------------------------------------------
// Chunking
// ---------------------------------------------------------------------------

/// Returns `true` if a module of `len` bytes must go through the chunk store.
///
/// Modules at or below `threshold` are installed in a single call.
pub fn needs_chunking(len: usize, threshold: usize) -> bool {
    len > threshold
}

/// Splits `module` into consecutive chunks of at most `chunk_size` bytes.
///
/// Order ids are assigned densely from 0; only the last chunk may be short.
/// An empty module yields no chunks.
pub fn chunk_module<'a>(
    module: &'a [u8],
    chunk_size: usize,
    hasher: &dyn ContentHasher,
) -> Result<Vec<Chunk<'a>>, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::InvalidChunkSize);
    }

    Ok(module
        .chunks(chunk_size)
        .enumerate()
        .map(|(order_id, data)| Chunk {
            order_id,
            data,
            content_hash: hasher.digest(data),
        })
        .collect())
}
