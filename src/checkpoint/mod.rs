//! The checkpoint protocol: snapshot/restore channel state keyed by thread
//! (SPEC_FULL.md §4.5), with a lineage DAG via `parent_checkpoint_id`.

mod checkpointer;
mod data;
mod memory_checkpointer;
mod serializer;

pub use checkpointer::Checkpointer;
pub use data::{CheckpointData, CheckpointMetadata, CheckpointSource};
pub use memory_checkpointer::InMemoryCheckpointer;
pub use serializer::{JsonSerializer, Serializer};
