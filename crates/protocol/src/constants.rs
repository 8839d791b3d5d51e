/// Modules strictly larger than this are uploaded in chunks; anything at or
/// below it is installed with a single call.
pub const CHUNK_THRESHOLD_BYTES: usize = 2_000_000;

/// Default chunk size (1 MB).
///
/// The platform rejects chunks above 1 MiB, so this stays a round number
/// safely under that limit.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

/// Number of chunk uploads in flight per batch.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 12;

/// Length in bytes of a content digest.
pub const HASH_LEN: usize = 32;
