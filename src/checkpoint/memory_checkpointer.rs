//! In-memory reference `Checkpointer`, grounded on this codebase's
//! `InMemoryVectorStore` shape but using a single `Mutex` rather than a
//! per-entry concurrent map: saves and thread-index updates must be
//! atomic together, which a `DashMap` alone cannot guarantee (SPEC_FULL.md §5).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::EngineError;

use super::{CheckpointData, CheckpointMetadata, Checkpointer};

struct Inner {
    by_id: HashMap<String, CheckpointData>,
    /// checkpoint ids per thread, in save order (oldest first).
    by_thread: HashMap<String, Vec<String>>,
}

/// Non-persistent `Checkpointer` suitable for tests, doctests, and the
/// bundled demo binary.
pub struct InMemoryCheckpointer {
    inner: Mutex<Inner>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                by_id: HashMap::new(),
                by_thread: HashMap::new(),
            }),
        }
    }
}

impl Default for InMemoryCheckpointer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, thread_id: &str, data: CheckpointData) -> Result<String, EngineError> {
        let mut inner = self.inner.lock().expect("checkpointer mutex poisoned");
        let id = data.checkpoint_id.clone();
        inner
            .by_thread
            .entry(thread_id.to_string())
            .or_default()
            .push(id.clone());
        inner.by_id.insert(id.clone(), data);
        Ok(id)
    }

    async fn load(&self, checkpoint_id: &str) -> Result<Option<CheckpointData>, EngineError> {
        let inner = self.inner.lock().expect("checkpointer mutex poisoned");
        Ok(inner.by_id.get(checkpoint_id).cloned())
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Option<CheckpointData>, EngineError> {
        let inner = self.inner.lock().expect("checkpointer mutex poisoned");
        let Some(ids) = inner.by_thread.get(thread_id) else {
            return Ok(None);
        };
        let latest = ids
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .max_by_key(|cp| (cp.step_number, cp.created_at));
        Ok(latest.cloned())
    }

    async fn load_by_thread(&self, thread_id: &str) -> Result<Option<CheckpointData>, EngineError> {
        let inner = self.inner.lock().expect("checkpointer mutex poisoned");
        let Some(ids) = inner.by_thread.get(thread_id) else {
            return Ok(None);
        };
        let earliest_id = match ids.first() {
            Some(id) => id,
            None => return Ok(None),
        };
        Ok(inner.by_id.get(earliest_id).cloned())
    }

    async fn list(
        &self,
        thread_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointMetadata>, EngineError> {
        let inner = self.inner.lock().expect("checkpointer mutex poisoned");
        let ids = inner.by_thread.get(thread_id).cloned().unwrap_or_default();
        let mut entries: Vec<&CheckpointData> =
            ids.iter().filter_map(|id| inner.by_id.get(id)).collect();
        entries.sort_by_key(|cp| std::cmp::Reverse((cp.step_number, cp.created_at)));
        let metadata = entries.into_iter().map(|cp| cp.metadata.clone());
        Ok(match limit {
            Some(n) => metadata.take(n).collect(),
            None => metadata.collect(),
        })
    }

    async fn delete(&self, checkpoint_id: &str) -> Result<bool, EngineError> {
        let mut inner = self.inner.lock().expect("checkpointer mutex poisoned");
        match inner.by_id.remove(checkpoint_id) {
            Some(checkpoint) => {
                if let Some(ids) = inner.by_thread.get_mut(&checkpoint.thread_id) {
                    ids.retain(|id| id != checkpoint_id);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_thread(&self, thread_id: &str) -> Result<usize, EngineError> {
        let mut inner = self.inner.lock().expect("checkpointer mutex poisoned");
        match inner.by_thread.remove(thread_id) {
            Some(ids) => {
                for id in &ids {
                    inner.by_id.remove(id);
                }
                Ok(ids.len())
            }
            None => Ok(0),
        }
    }

    async fn exists(&self, checkpoint_id: &str) -> Result<bool, EngineError> {
        let inner = self.inner.lock().expect("checkpointer mutex poisoned");
        Ok(inner.by_id.contains_key(checkpoint_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointSource;
    use std::collections::HashMap as StdHashMap;

    fn checkpoint(thread: &str, step: usize) -> CheckpointData {
        CheckpointData::new(thread, step, CheckpointSource::Loop, StdHashMap::new())
    }

    /// **Scenario 7**: save then load_latest returns the highest-step checkpoint,
    /// and delete/exists agree afterward.
    #[tokio::test]
    async fn save_two_then_load_latest_delete_exists() {
        let cp = InMemoryCheckpointer::new();
        let first = checkpoint("t1", 1);
        let first_id = first.checkpoint_id.clone();
        cp.save("t1", first).await.unwrap();
        cp.save("t1", checkpoint("t1", 2)).await.unwrap();

        let latest = cp.load_latest("t1").await.unwrap().unwrap();
        assert_eq!(latest.step_number, 2);

        assert!(cp.delete(&first_id).await.unwrap());
        assert!(!cp.exists(&first_id).await.unwrap());
    }

    /// **Scenario**: load_by_thread returns the earliest checkpoint saved for the thread.
    #[tokio::test]
    async fn load_by_thread_returns_earliest() {
        let cp = InMemoryCheckpointer::new();
        cp.save("t1", checkpoint("t1", 0)).await.unwrap();
        cp.save("t1", checkpoint("t1", 1)).await.unwrap();
        let earliest = cp.load_by_thread("t1").await.unwrap().unwrap();
        assert_eq!(earliest.step_number, 0);
    }

    /// **Scenario**: list returns newest-first metadata, honoring an optional limit.
    #[tokio::test]
    async fn list_is_newest_first_and_respects_limit() {
        let cp = InMemoryCheckpointer::new();
        for step in 0..3 {
            cp.save("t1", checkpoint("t1", step)).await.unwrap();
        }
        let all = cp.list("t1", None).await.unwrap();
        let steps: Vec<usize> = all.iter().map(|m| m.step_number).collect();
        assert_eq!(steps, vec![2, 1, 0]);

        let limited = cp.list("t1", Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].step_number, 2);
    }

    /// **Scenario**: deleting a thread removes every checkpoint belonging to it
    /// and reports how many were removed.
    #[tokio::test]
    async fn delete_by_thread_removes_all_checkpoints() {
        let cp = InMemoryCheckpointer::new();
        cp.save("t1", checkpoint("t1", 0)).await.unwrap();
        cp.save("t1", checkpoint("t1", 1)).await.unwrap();
        let removed = cp.delete_by_thread("t1").await.unwrap();
        assert_eq!(removed, 2);
        assert!(cp.list("t1", None).await.unwrap().is_empty());
    }

    /// **Scenario**: load on an unknown id returns None rather than erroring.
    #[tokio::test]
    async fn load_unknown_id_returns_none() {
        let cp = InMemoryCheckpointer::new();
        assert!(cp.load("missing").await.unwrap().is_none());
    }

    /// **Scenario**: load_latest on an unknown thread returns None.
    #[tokio::test]
    async fn load_latest_unknown_thread_returns_none() {
        let cp = InMemoryCheckpointer::new();
        assert!(cp.load_latest("missing").await.unwrap().is_none());
    }
}
