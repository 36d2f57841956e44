//! Run configuration, mirroring the plain-struct style of this codebase's
//! other per-run config types (e.g. `RunnableConfig`).

use std::sync::Arc;
use std::time::Duration;

use crate::checkpoint::{JsonSerializer, Serializer};

/// Configuration for a single `Scheduler::run` invocation.
#[derive(Clone)]
pub struct SchedulerConfig {
    /// Identifies the conversation/session a checkpoint belongs to. Required
    /// when a checkpointer is attached; a run without one is not resumable.
    pub thread_id: Option<String>,
    /// Hard cap on the number of supersteps before the run fails with
    /// `EngineError::Execution`. `None` means unbounded.
    pub max_steps: Option<usize>,
    /// Wall-clock budget for a single step's fire phase. `None` means unbounded.
    pub step_timeout: Option<Duration>,
    /// Save a checkpoint after every committed step rather than only at the
    /// end of the run. Defaults to `true`, matching SPEC_FULL.md §6.
    pub checkpoint_every_step: bool,
    /// A `Checkpoint` save failure aborts the run unless this is set, in
    /// which case already-committed channel state is kept and the run
    /// continues (SPEC_FULL.md §7). Defaults to `false`.
    pub best_effort_checkpoints: bool,
    /// Encodes each channel's checkpoint `Value` into `CheckpointData::channel_states`.
    pub serializer: Arc<dyn Serializer>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_id: None,
            max_steps: None,
            step_timeout: None,
            checkpoint_every_step: true,
            best_effort_checkpoints: false,
            serializer: Arc::new(JsonSerializer),
        }
    }
}

impl std::fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("thread_id", &self.thread_id)
            .field("max_steps", &self.max_steps)
            .field("step_timeout", &self.step_timeout)
            .field("checkpoint_every_step", &self.checkpoint_every_step)
            .field("best_effort_checkpoints", &self.best_effort_checkpoints)
            .finish()
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    pub fn with_checkpoint_every_step(mut self, enabled: bool) -> Self {
        self.checkpoint_every_step = enabled;
        self
    }

    pub fn with_best_effort_checkpoints(mut self, enabled: bool) -> Self {
        self.best_effort_checkpoints = enabled;
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: the builder methods populate fields as expected.
    #[test]
    fn builder_methods_set_fields() {
        let cfg = SchedulerConfig::new()
            .with_thread_id("t1")
            .with_max_steps(10)
            .with_step_timeout(Duration::from_secs(5))
            .with_checkpoint_every_step(false);
        assert_eq!(cfg.thread_id.as_deref(), Some("t1"));
        assert_eq!(cfg.max_steps, Some(10));
        assert_eq!(cfg.step_timeout, Some(Duration::from_secs(5)));
        assert!(!cfg.checkpoint_every_step);
    }

    /// **Scenario**: default config checkpoints every step but aborts on checkpoint failure.
    #[test]
    fn default_checkpoints_every_step_and_is_not_best_effort() {
        let cfg = SchedulerConfig::new();
        assert!(cfg.checkpoint_every_step);
        assert!(!cfg.best_effort_checkpoints);
    }
}
