use unitdeploy_protocol::{ChunkHandle, ModuleHash};

/// A slice of a module, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Zero-based position of this chunk within the module.
    pub order_id: usize,
    /// Raw chunk bytes, borrowed from the module.
    pub data: &'a [u8],
    /// Digest of `data`.
    pub content_hash: ModuleHash,
}

impl Chunk<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Outcome of uploading one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkUploadResult {
    pub order_id: usize,
    /// Token returned by the chunk store. Opaque; see [`ChunkHandle`].
    pub handle: ChunkHandle,
}
