//! Engine-wide error taxonomy.
//!
//! Every fallible operation in this crate — channel updates, graph
//! validation, scheduling, checkpointing — returns `EngineError`. There is
//! one flat enum rather than a separate error type per module: callers of
//! the scheduler only ever need to match on one type.

use thiserror::Error;

/// Closed taxonomy of engine failures.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Read or checkpoint attempted on a channel with no stored value.
    #[error("channel '{channel}' is empty{}", fmt_reason(reason))]
    EmptyChannel {
        channel: String,
        reason: Option<String>,
    },

    /// A batch violated a channel variant's update precondition (arity,
    /// type mismatch, disallowed null, reducer failure).
    #[error("invalid update on channel '{channel}': {reason}")]
    InvalidUpdate {
        channel: String,
        reason: String,
        #[source]
        cause: Option<Box<EngineError>>,
    },

    /// A node raised, or the scheduler hit a step/time limit.
    #[error("execution failed{}: {reason}", fmt_node(node, *step))]
    Execution {
        node: Option<String>,
        step: usize,
        reason: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// One or more `Validator` rules failed; the scheduler refuses to run.
    #[error("graph validation failed: {}", errors.join("; "))]
    GraphValidation { errors: Vec<String> },

    /// Serialization, storage, or restoration failure in the checkpoint protocol.
    #[error("checkpoint error{}: {reason}", fmt_checkpoint_id(checkpoint_id))]
    Checkpoint {
        checkpoint_id: Option<String>,
        reason: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl EngineError {
    pub fn empty_channel(channel: impl Into<String>) -> Self {
        Self::EmptyChannel {
            channel: channel.into(),
            reason: None,
        }
    }

    pub fn empty_channel_because(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EmptyChannel {
            channel: channel.into(),
            reason: Some(reason.into()),
        }
    }

    pub fn invalid_update(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUpdate {
            channel: channel.into(),
            reason: reason.into(),
            cause: None,
        }
    }

    pub fn execution(step: usize, reason: impl Into<String>) -> Self {
        Self::Execution {
            node: None,
            step,
            reason: reason.into(),
            cause: None,
        }
    }

    pub fn execution_in_node(
        node: impl Into<String>,
        step: usize,
        reason: impl Into<String>,
        cause: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Execution {
            node: Some(node.into()),
            step,
            reason: reason.into(),
            cause: Some(cause),
        }
    }

    pub fn graph_validation(errors: Vec<String>) -> Self {
        Self::GraphValidation { errors }
    }

    pub fn checkpoint(reason: impl Into<String>) -> Self {
        Self::Checkpoint {
            checkpoint_id: None,
            reason: reason.into(),
            cause: None,
        }
    }

    pub fn checkpoint_for(checkpoint_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Checkpoint {
            checkpoint_id: Some(checkpoint_id.into()),
            reason: reason.into(),
            cause: None,
        }
    }

    /// Wraps an `EmptyChannel`/`InvalidUpdate` raised mid-fire into `Execution`,
    /// per the propagation policy in §7: these never reach the caller directly.
    pub fn into_execution(self, node: Option<String>, step: usize) -> Self {
        match self {
            Self::Execution { .. } => self,
            other => Self::Execution {
                node,
                step,
                reason: other.to_string(),
                cause: Some(Box::new(other)),
            },
        }
    }
}

fn fmt_reason(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!(" ({r})"),
        None => String::new(),
    }
}

fn fmt_node(node: &Option<String>, step: usize) -> String {
    match node {
        Some(n) => format!(" in node '{n}' at step {step}"),
        None => format!(" at step {step}"),
    }
}

fn fmt_checkpoint_id(id: &Option<String>) -> String {
    match id {
        Some(i) => format!(" ({i})"),
        None => String::new(),
    }
}
