//! A record of one completed superstep, kept for `ExecutionContext::history`.

/// Which nodes fired in a step, and when it committed.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: usize,
    pub fired: Vec<String>,
    pub committed_at_millis: u128,
}

impl StepRecord {
    pub fn new(step: usize, fired: Vec<String>, committed_at_millis: u128) -> Self {
        Self {
            step,
            fired,
            committed_at_millis,
        }
    }
}
