//! Checkpoint data shapes, grounded on this codebase's `Checkpoint<S>` /
//! `CheckpointMetadata` / `CheckpointSource` in its memory module, widened
//! to the field layout SPEC_FULL.md §3/§6 specify: a top-level
//! `step_number`/`created_at` on `CheckpointData` alongside the bookkeeping
//! `CheckpointMetadata`, plus `executed_nodes` and `tags`.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Why a checkpoint was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointSource {
    /// The initial seed before any superstep ran.
    Input,
    /// Taken during or after a normal superstep loop.
    Loop,
    /// Taken in response to an explicit external state update.
    Update,
    /// Taken when forking a new thread from an existing checkpoint.
    Fork,
}

/// Non-state bookkeeping attached to every checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    pub step_number: usize,
    /// Nodes that fired in the step this checkpoint was taken after,
    /// lexicographically ordered (empty for the step-0 input checkpoint).
    pub executed_nodes: Vec<String>,
    /// Forms the lineage DAG; `None` for the first checkpoint of a thread.
    pub parent_checkpoint_id: Option<String>,
    pub tags: HashMap<String, String>,
}

/// A full snapshot of every non-empty channel's checkpointable state at a
/// given step, serialized to bytes via the configured `Serializer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointData {
    pub checkpoint_id: String,
    pub thread_id: String,
    pub step_number: usize,
    pub channel_states: HashMap<String, Vec<u8>>,
    /// Reserved for future per-node memory; the scheduler never writes to
    /// this today, so it is always empty.
    pub node_states: HashMap<String, Vec<u8>>,
    pub metadata: CheckpointMetadata,
    #[serde(with = "instant_millis")]
    pub created_at: u128,
}

impl CheckpointData {
    /// Builds a checkpoint with a fresh id of the form `{millis}-{step}`,
    /// matching this codebase's existing `Checkpoint::from_state` id recipe.
    pub fn new(
        thread_id: impl Into<String>,
        step_number: usize,
        source: CheckpointSource,
        channel_states: HashMap<String, Vec<u8>>,
    ) -> Self {
        let created_at = now_millis();
        Self {
            checkpoint_id: format!("{created_at}-{step_number}"),
            thread_id: thread_id.into(),
            step_number,
            channel_states,
            node_states: HashMap::new(),
            metadata: CheckpointMetadata {
                source,
                step_number,
                executed_nodes: Vec::new(),
                parent_checkpoint_id: None,
                tags: HashMap::new(),
            },
            created_at,
        }
    }

    pub fn with_parent(mut self, parent_checkpoint_id: impl Into<String>) -> Self {
        self.metadata.parent_checkpoint_id = Some(parent_checkpoint_id.into());
        self
    }

    pub fn with_executed_nodes(mut self, executed_nodes: Vec<String>) -> Self {
        self.metadata.executed_nodes = executed_nodes;
        self
    }

    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.metadata.tags = tags;
        self
    }

    pub fn parent_checkpoint_id(&self) -> Option<&str> {
        self.metadata.parent_checkpoint_id.as_deref()
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Encodes `u128` millisecond timestamps as `{"__instant_millis__": "<digits>"}`
/// rather than a bare JSON number, so values beyond `f64`'s exact integer
/// range survive a round-trip through generic JSON tooling.
mod instant_millis {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(millis: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::json!({ "__instant_millis__": millis.to_string() }).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let value = Value::deserialize(deserializer)?;
        value
            .get("__instant_millis__")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<u128>().ok())
            .ok_or_else(|| D::Error::custom("expected {\"__instant_millis__\": \"<millis>\"}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: a fresh checkpoint's id embeds its step number.
    #[test]
    fn checkpoint_id_embeds_step() {
        let cp = CheckpointData::new("t1", 5, CheckpointSource::Loop, HashMap::new());
        assert!(cp.checkpoint_id.ends_with("-5"), "{}", cp.checkpoint_id);
        assert!(cp.metadata.parent_checkpoint_id.is_none());
        assert_eq!(cp.step_number, cp.metadata.step_number);
    }

    /// **Scenario**: with_parent records the lineage edge on the metadata.
    #[test]
    fn with_parent_sets_lineage() {
        let cp = CheckpointData::new("t1", 1, CheckpointSource::Loop, HashMap::new())
            .with_parent("0-0");
        assert_eq!(cp.parent_checkpoint_id(), Some("0-0"));
    }

    /// **Scenario**: with_executed_nodes records which nodes fired.
    #[test]
    fn with_executed_nodes_sets_metadata() {
        let cp = CheckpointData::new("t1", 1, CheckpointSource::Loop, HashMap::new())
            .with_executed_nodes(vec!["process".to_string()]);
        assert_eq!(cp.metadata.executed_nodes, vec!["process".to_string()]);
    }
}
