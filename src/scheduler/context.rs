//! Per-fire context handed to context-aware nodes.

use tokio::sync::watch;

use super::StepRecord;

/// Read-only view of the run's progress, passed to nodes built with
/// `Node::with_context`. Cheap to clone: the history is an `Arc`-backed
/// slice shared across every node fired in the same step.
#[derive(Clone)]
pub struct ExecutionContext {
    step: usize,
    thread_id: String,
    cancelled: watch::Receiver<bool>,
    history: std::sync::Arc<Vec<StepRecord>>,
}

impl ExecutionContext {
    pub fn new(
        step: usize,
        thread_id: String,
        cancelled: watch::Receiver<bool>,
        history: Vec<StepRecord>,
    ) -> Self {
        Self {
            step,
            thread_id,
            cancelled,
            history: std::sync::Arc::new(history),
        }
    }

    /// The superstep number currently executing (0-indexed; 0 is the seed step).
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// True once the run has been asked to cancel. Long-running nodes should
    /// poll this cooperatively rather than relying on external interruption.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Completed steps so far, oldest first. Does not include the in-flight step.
    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: a freshly built context reports its step and is not cancelled.
    #[test]
    fn fresh_context_reports_step_and_not_cancelled() {
        let (_tx, rx) = watch::channel(false);
        let ctx = ExecutionContext::new(3, "thread-1".to_string(), rx, Vec::new());
        assert_eq!(ctx.step(), 3);
        assert_eq!(ctx.thread_id(), "thread-1");
        assert!(!ctx.is_cancelled());
        assert!(ctx.history().is_empty());
    }

    /// **Scenario**: flipping the watch sender is observed by a cloned context.
    #[test]
    fn cancellation_is_observed_through_clone() {
        let (tx, rx) = watch::channel(false);
        let ctx = ExecutionContext::new(0, "t".to_string(), rx, Vec::new());
        let ctx2 = ctx.clone();
        tx.send(true).unwrap();
        assert!(ctx2.is_cancelled());
    }
}
