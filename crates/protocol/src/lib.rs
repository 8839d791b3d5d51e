//! Domain types shared by the upgrade pipeline and the adapters that talk
//! to the remote platform.

pub mod constants;
pub mod progress;
pub mod types;
pub mod wire;

// Re-export primary types for convenience.
pub use progress::{ProgressEvent, StepState, UpgradeStep};
pub use types::{
    ChunkHandle, MemoryPersistence, ModuleHash, SnapshotId, UnitId, UpgradeMode, UpgradeOptions,
};
pub use wire::{ShapeError, optional_from_wire};
