//! Module inspection: hash and transfer plan.

use std::fmt::Write;

use unitdeploy_protocol::ModuleHash;
use unitdeploy_transfer::{ContentHasher, Sha256Hasher, chunk_module, needs_chunking};
use unitdeploy_upgrade::UpgradeConfig;

pub fn module_hash(module: &[u8]) -> ModuleHash {
    Sha256Hasher.digest(module)
}

/// Describes how `module` would be sent to a unit under `config`.
pub fn render_plan(module: &[u8], config: &UpgradeConfig) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "module hash: {}", module_hash(module))?;
    writeln!(out, "size:        {} bytes", module.len())?;

    if !needs_chunking(module.len(), config.chunk_threshold_bytes) {
        writeln!(
            out,
            "transfer:    single call (threshold {} bytes)",
            config.chunk_threshold_bytes
        )?;
        return Ok(out);
    }

    let chunks = chunk_module(module, config.chunk_size, &Sha256Hasher)?;
    let batches = chunks.len().div_ceil(config.upload_concurrency.max(1));
    writeln!(
        out,
        "transfer:    chunked, {} chunks in {} batches of up to {}",
        chunks.len(),
        batches,
        config.upload_concurrency
    )?;
    for chunk in &chunks {
        writeln!(
            out,
            "  #{:<5} {:>9} bytes  {}",
            chunk.order_id,
            chunk.len(),
            chunk.content_hash
        )?;
    }
    Ok(out)
}
