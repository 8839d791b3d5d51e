//! Module chunking with content hashing and chunk-order bookkeeping.
//!
//! Large modules are split into fixed-size, ordered chunks before they are
//! pushed to a remote chunk store. The order id is the only ordering key:
//! chunk uploads may finish in any order, and [`ordered_handles`] restores
//! the sequence before the handles are handed to the installer.

mod chunked;
mod types;
mod validation;

pub use chunked::{ContentHasher, Sha256Hasher, chunk_module, needs_chunking};
pub use types::{Chunk, ChunkUploadResult};
pub use validation::{ordered_handles, validate_chunk_order};

pub use unitdeploy_protocol::constants::{CHUNK_THRESHOLD_BYTES, DEFAULT_CHUNK_SIZE};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error("chunk order violated: {0}")]
    ChunkOrder(String),
}
