//! Logging utilities for graph execution.
//!
//! Provides structured logging for run start/completion, step activation
//! and commit, and checkpoint failures.

/// Log the start of a run.
pub fn log_run_start(graph_name: &str, thread_id: Option<&str>) {
    #[cfg(feature = "tracing")]
    tracing::info!(graph = graph_name, thread_id, "Starting run");

    #[cfg(not(feature = "tracing"))]
    eprintln!(
        "[INFO] Starting run: graph={} thread_id={:?}",
        graph_name, thread_id
    );
}

/// Log a step's activation set before its fire phase begins.
pub fn log_step_start(step: usize, activated: &[String]) {
    #[cfg(feature = "tracing")]
    tracing::debug!(step, ?activated, "Step activated");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[DEBUG] Step {} activated: {:?}", step, activated);
}

/// Log the channels changed by a step's commit.
pub fn log_step_commit(step: usize, changed: &[String]) {
    #[cfg(feature = "tracing")]
    tracing::debug!(step, ?changed, "Step committed");

    #[cfg(not(feature = "tracing"))]
    eprintln!("[DEBUG] Step {} committed: {:?}", step, changed);
}

/// Log the completion of a run.
pub fn log_run_complete(graph_name: &str, final_step: usize) {
    #[cfg(feature = "tracing")]
    tracing::info!(graph = graph_name, final_step, "Run complete");

    #[cfg(not(feature = "tracing"))]
    eprintln!(
        "[INFO] Run complete: graph={} final_step={}",
        graph_name, final_step
    );
}

/// Log a checkpoint save failure tolerated under `best_effort_checkpoints`.
pub fn log_checkpoint_failed(error: &crate::error::EngineError) {
    #[cfg(feature = "tracing")]
    tracing::warn!(%error, "Checkpoint save failed, continuing (best_effort_checkpoints)");

    #[cfg(not(feature = "tracing"))]
    eprintln!(
        "[WARN] Checkpoint save failed, continuing (best_effort_checkpoints): {}",
        error
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_logging_functions() {
        log_run_start("pipeline", Some("t1"));
        log_step_start(1, &["uppercase".to_string()]);
        log_step_commit(1, &["output".to_string()]);
        log_run_complete("pipeline", 1);
        log_checkpoint_failed(&EngineError::checkpoint("disk full"));
    }
}
