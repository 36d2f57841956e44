//! The `Checkpointer` trait, grounded on this codebase's `Checkpointer`
//! abstraction (see its memory module: distinct from `Store`, one
//! checkpoint per thread-step rather than arbitrary key/value pairs).

use async_trait::async_trait;

use crate::error::EngineError;

use super::{CheckpointData, CheckpointMetadata};

/// Persists and retrieves checkpoints. Implementations must be safe to
/// share across concurrently running schedulers (SPEC_FULL.md §5).
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Durable write. Returns the id actually stored (implementations MAY
    /// accept `data.checkpoint_id` as-is, which the in-memory reference does).
    async fn save(&self, thread_id: &str, data: CheckpointData) -> Result<String, EngineError>;

    async fn load(&self, checkpoint_id: &str) -> Result<Option<CheckpointData>, EngineError>;

    /// The checkpoint with the highest `step_number` for `thread_id`; ties
    /// broken by `created_at`.
    async fn load_latest(&self, thread_id: &str) -> Result<Option<CheckpointData>, EngineError>;

    /// The earliest checkpoint saved for `thread_id` (thread root). Backend
    /// policy beyond that is unspecified; see DESIGN.md Open Question.
    async fn load_by_thread(&self, thread_id: &str) -> Result<Option<CheckpointData>, EngineError>;

    /// Metadata for `thread_id`'s checkpoints, newest first, capped at
    /// `limit` entries when given.
    async fn list(
        &self,
        thread_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointMetadata>, EngineError>;

    /// True iff a checkpoint with this id existed and was removed.
    async fn delete(&self, checkpoint_id: &str) -> Result<bool, EngineError>;

    /// Number of checkpoints removed.
    async fn delete_by_thread(&self, thread_id: &str) -> Result<usize, EngineError>;

    async fn exists(&self, checkpoint_id: &str) -> Result<bool, EngineError>;
}
