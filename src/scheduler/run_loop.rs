//! The superstep loop: seed, then repeatedly activate -> fire -> commit
//! until quiescence, a halt signal, a step limit, or a timeout.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::watch;

use crate::checkpoint::{CheckpointData, CheckpointSource, Checkpointer};
use crate::error::EngineError;
use crate::graph::Graph;
use crate::logging;
use crate::node::{NodeInput, NodeOutput};

use super::{ExecutionContext, SchedulerConfig, StepRecord};

/// Owns a graph's live channel state and drives it through supersteps.
pub struct Scheduler {
    graph: Graph,
    config: SchedulerConfig,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
    history: Vec<StepRecord>,
    last_checkpoint_id: Option<String>,
    /// Conservative-restart activations computed by `resume()`, consumed by
    /// the first `run()` call afterward (SPEC_FULL.md §4.5).
    resumed_pending: Option<BTreeSet<String>>,
}

impl Scheduler {
    pub fn new(graph: Graph, config: SchedulerConfig) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            graph,
            config,
            checkpointer: None,
            cancel_tx,
            cancel_rx,
            history: Vec::new(),
            last_checkpoint_id: None,
            resumed_pending: None,
        }
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// A handle callers can use to request cooperative cancellation mid-run.
    pub fn cancel_handle(&self) -> watch::Sender<bool> {
        self.cancel_tx.clone()
    }

    /// Rebuilds a scheduler from a saved checkpoint: channels are restored
    /// via `Channel::from_checkpoint`, and the step counter resumes after
    /// the checkpoint's recorded step. `pending_activations` for the next
    /// `run()` call is the conservative restart described in SPEC_FULL.md
    /// §4.5: the union of subscribers of every channel present (non-empty)
    /// in the checkpoint, since per-channel version-at-checkpoint-time is
    /// not separately tracked across the resume boundary.
    pub fn resume(
        mut graph: Graph,
        config: SchedulerConfig,
        checkpoint: &CheckpointData,
    ) -> Result<Self, EngineError> {
        for (name, bytes) in &checkpoint.channel_states {
            let current = graph.channels.get(name).ok_or_else(|| {
                EngineError::checkpoint_for(
                    checkpoint.checkpoint_id.clone(),
                    format!("checkpoint references unknown channel '{name}'"),
                )
            })?;
            let value = config.serializer.deserialize(bytes)?;
            let restored = current.from_checkpoint(&value)?;
            graph.channels.insert(name.clone(), restored);
        }

        let mut pending = BTreeSet::new();
        for name in checkpoint.channel_states.keys() {
            if !graph.channels[name].is_empty() {
                pending.extend(graph.subscribers_of(name).iter().cloned());
            }
        }

        let mut scheduler = Self::new(graph, config);
        scheduler.history.push(StepRecord::new(
            checkpoint.step_number,
            checkpoint.metadata.executed_nodes.clone(),
            checkpoint.created_at,
        ));
        scheduler.last_checkpoint_id = Some(checkpoint.checkpoint_id.clone());
        scheduler.resumed_pending = Some(pending);
        Ok(scheduler)
    }

    /// The step number a resumed scheduler would start counting from.
    pub fn resumed_step(&self) -> usize {
        self.history.last().map(|r| r.step).unwrap_or(0)
    }

    /// Applies a human-in-the-loop or out-of-band correction directly to
    /// channels, outside the normal fire/commit loop, then checkpoints the
    /// result tagged `CheckpointSource::Update` (SPEC_FULL.md §4.5/§6: "an
    /// explicit external state update"). Each channel receives a single-value
    /// batch, exactly like seeding. Checkpointing is a no-op without a
    /// configured checkpointer, same as the per-step checkpoint in `run`.
    pub async fn apply_external_update(
        &mut self,
        updates: HashMap<String, Value>,
    ) -> Result<(), EngineError> {
        for (channel, value) in &updates {
            if !self.graph.has_channel(channel) {
                return Err(EngineError::graph_validation(vec![format!(
                    "external update references unknown channel '{channel}'"
                )]));
            }
            let chan = self.graph.channels.get_mut(channel).expect("checked above");
            chan.update(std::slice::from_ref(value))
                .map_err(|e| e.into_execution(None, self.resumed_step()))?;
        }
        let step = self.resumed_step();
        self.save_checkpoint(step, CheckpointSource::Update, Vec::new())
            .await
    }

    /// Snapshots the current channel state as a new lineage root under
    /// `new_thread_id`, tagged `CheckpointSource::Fork` and parented on the
    /// last checkpoint saved under this scheduler's own thread (SPEC_FULL.md
    /// §9: "`parent_checkpoint_id` forms a DAG permitting fork/branch").
    /// Returns the forked checkpoint; resume a scheduler from it with
    /// `Scheduler::resume` under a config carrying `new_thread_id`.
    pub async fn fork_thread(
        &self,
        new_thread_id: impl Into<String>,
    ) -> Result<CheckpointData, EngineError> {
        let checkpointer = self.checkpointer.clone().ok_or_else(|| {
            EngineError::checkpoint("forking a thread requires a configured checkpointer")
        })?;
        let new_thread_id = new_thread_id.into();
        let step = self.resumed_step();
        let mut checkpoint =
            self.build_checkpoint(&new_thread_id, step, CheckpointSource::Fork, Vec::new())?;
        checkpoint.checkpoint_id = checkpointer.save(&new_thread_id, checkpoint.clone()).await?;
        Ok(checkpoint)
    }

    /// Seeds the graph's input channels with `input`, then runs supersteps
    /// until quiescence, a halt signal, the step cap, or the step timeout.
    /// Returns the final value of every declared output channel.
    pub async fn run(
        &mut self,
        input: HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>, EngineError> {
        logging::log_run_start(&self.graph.name, self.config.thread_id.as_deref());

        // Only a fresh (non-resumed) run seeds a step-0 checkpoint: a resumed
        // scheduler already carries the restored checkpoint's history entry.
        let is_fresh_start = self.history.is_empty();

        let mut pending: BTreeSet<String> = self.resumed_pending.take().unwrap_or_default();
        for (channel, value) in &input {
            if !self.graph.has_channel(channel) {
                return Err(EngineError::graph_validation(vec![format!(
                    "seed input references unknown channel '{channel}'"
                )]));
            }
            let chan = self.graph.channels.get_mut(channel).expect("checked above");
            chan.update(std::slice::from_ref(value))
                .map_err(|e| e.into_execution(None, 0))?;
            pending.extend(self.graph.subscribers_of(channel).iter().cloned());
        }

        if is_fresh_start && self.config.checkpoint_every_step {
            self.save_checkpoint(0, CheckpointSource::Input, Vec::new())
                .await?;
        }

        let mut step = self.resumed_step();
        loop {
            if pending.is_empty() {
                break;
            }
            if let Some(halt) = self.graph.halt_channel() {
                if self.channel_is_truthy(halt) {
                    break;
                }
            }
            if let Some(max_steps) = self.config.max_steps {
                if step >= max_steps {
                    return Err(EngineError::execution(
                        step,
                        format!("exceeded max_steps ({max_steps}) without quiescence"),
                    ));
                }
            }
            if *self.cancel_rx.borrow() {
                return Err(EngineError::execution(step, "run was cancelled"));
            }

            step += 1;
            let fired_names: Vec<String> = pending.iter().cloned().collect();
            logging::log_step_start(step, &fired_names);

            let outputs = self.fire_step(step, &fired_names).await?;

            // Buffer every fired node's writes per channel (fired-order, i.e.
            // lexicographic, then intra-node order) before committing anything,
            // per §4.4.e: two nodes writing the same channel this step must be
            // combined into one `update(batch)` call, not applied as separate
            // single-element updates (which would let a non-accumulate `Topic`
            // silently drop a fan-in write, or hide a `LastValue` write conflict
            // behind last-writer-wins).
            let mut write_buffer: HashMap<String, Vec<Value>> = HashMap::new();
            for (name, output) in fired_names.iter().zip(outputs.into_iter()) {
                let output = output.map_err(|e| {
                    let reason = e.to_string();
                    EngineError::execution_in_node(name.clone(), step, reason, e)
                })?;
                let writes = self.graph.node(name).expect("fired node exists").write_set();
                let values = gather_writes(writes, output)?;
                for (channel, value) in values {
                    if !self.graph.has_channel(&channel) {
                        return Err(EngineError::execution(
                            step,
                            format!("node '{name}' wrote to unknown channel '{channel}'"),
                        ));
                    }
                    write_buffer.entry(channel).or_default().push(value);
                }
            }

            let mut changed_channels: BTreeSet<String> = BTreeSet::new();
            let mut channel_names: Vec<String> = write_buffer.keys().cloned().collect();
            channel_names.sort();
            for channel in channel_names {
                let batch = write_buffer.remove(&channel).expect("key present");
                let chan = self
                    .graph
                    .channels
                    .get_mut(&channel)
                    .expect("channel existence checked while buffering");
                let changed = chan
                    .update(&batch)
                    .map_err(|e| e.into_execution(None, step))?;
                if changed {
                    changed_channels.insert(channel);
                }
            }

            pending.clear();
            for channel in &changed_channels {
                pending.extend(self.graph.subscribers_of(channel).iter().cloned());
            }

            let committed_at = now_millis();
            self.history.push(StepRecord::new(step, fired_names.clone(), committed_at));
            logging::log_step_commit(step, &changed_channels.iter().cloned().collect::<Vec<_>>());

            if self.config.checkpoint_every_step {
                self.save_checkpoint(step, CheckpointSource::Loop, fired_names.clone())
                    .await?;
            }
        }

        if self.checkpointer.is_some() && !self.config.checkpoint_every_step {
            let last_fired = self
                .history
                .last()
                .map(|r| r.fired.clone())
                .unwrap_or_default();
            self.save_checkpoint(step, CheckpointSource::Loop, last_fired)
                .await?;
        }

        logging::log_run_complete(&self.graph.name, step);
        self.collect_outputs(step)
    }

    async fn fire_step(
        &mut self,
        step: usize,
        fired_names: &[String],
    ) -> Result<Vec<Result<NodeOutput, crate::node::NodeError>>, EngineError> {
        let ctx = ExecutionContext::new(
            step,
            self.config.thread_id.clone().unwrap_or_default(),
            self.cancel_rx.clone(),
            self.history.clone(),
        );

        let mut futures = Vec::with_capacity(fired_names.len());
        for name in fired_names {
            let node = self.graph.node(name).expect("fired node exists").clone();
            let input = self.snapshot_input(&node)?;
            let ctx = ctx.clone();
            futures.push(async move { node.fire(input, &ctx).await });
        }

        let timed = match self.config.step_timeout {
            Some(timeout) => tokio::time::timeout(timeout, join_all(futures))
                .await
                .map_err(|_| {
                    self.cancel_tx.send_replace(true);
                    EngineError::execution(step, format!("step timed out after {timeout:?}"))
                })?,
            None => join_all(futures).await,
        };
        Ok(timed)
    }

    fn snapshot_input(&mut self, node: &crate::node::Node) -> Result<NodeInput, EngineError> {
        let read_set = node.read_set();
        if read_set.len() == 1 {
            let channel = &read_set[0];
            let chan = self
                .graph
                .channels
                .get_mut(channel)
                .ok_or_else(|| EngineError::execution(0, format!("node '{}' reads unknown channel '{channel}'", node.name())))?;
            return Ok(NodeInput::Single(chan.get()?));
        }
        let mut map = HashMap::with_capacity(read_set.len());
        for channel in read_set {
            let chan = self
                .graph
                .channels
                .get_mut(channel)
                .ok_or_else(|| EngineError::execution(0, format!("node '{}' reads unknown channel '{channel}'", node.name())))?;
            map.insert(channel.clone(), chan.get()?);
        }
        Ok(NodeInput::Multi(map))
    }

    fn channel_is_truthy(&mut self, channel: &str) -> bool {
        self.graph
            .channels
            .get_mut(channel)
            .and_then(|c| c.get().ok())
            .map(|v| v.as_bool().unwrap_or(!v.is_null()))
            .unwrap_or(false)
    }

    fn collect_outputs(&mut self, step: usize) -> Result<HashMap<String, Value>, EngineError> {
        let mut out = HashMap::new();
        for name in self.graph.output_channels().to_vec() {
            let chan = self
                .graph
                .channels
                .get_mut(&name)
                .ok_or_else(|| EngineError::execution(step, format!("output channel '{name}' does not exist")))?;
            if chan.is_empty() {
                continue;
            }
            out.insert(name, chan.get()?);
        }
        Ok(out)
    }

    async fn save_checkpoint(
        &mut self,
        step: usize,
        source: CheckpointSource,
        executed_nodes: Vec<String>,
    ) -> Result<(), EngineError> {
        let Some(checkpointer) = self.checkpointer.clone() else {
            return Ok(());
        };
        let thread_id = self.config.thread_id.clone().ok_or_else(|| {
            EngineError::checkpoint("checkpointing requires SchedulerConfig.thread_id")
        })?;

        let result = self.build_checkpoint(&thread_id, step, source, executed_nodes);
        let checkpoint = match result {
            Ok(checkpoint) => checkpoint,
            Err(e) if self.config.best_effort_checkpoints => {
                logging::log_checkpoint_failed(&e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match checkpointer.save(&thread_id, checkpoint.clone()).await {
            Ok(id) => {
                self.last_checkpoint_id = Some(id);
                Ok(())
            }
            Err(e) if self.config.best_effort_checkpoints => {
                logging::log_checkpoint_failed(&e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn build_checkpoint(
        &self,
        thread_id: &str,
        step: usize,
        source: CheckpointSource,
        executed_nodes: Vec<String>,
    ) -> Result<CheckpointData, EngineError> {
        let mut channel_states = HashMap::new();
        for (name, chan) in &self.graph.channels {
            if chan.is_empty() {
                continue;
            }
            let value = chan.checkpoint()?;
            let bytes = self.config.serializer.serialize(&value)?;
            channel_states.insert(name.clone(), bytes);
        }
        let mut checkpoint =
            CheckpointData::new(thread_id, step, source, channel_states).with_executed_nodes(executed_nodes);
        if let Some(parent) = &self.last_checkpoint_id {
            checkpoint = checkpoint.with_parent(parent.clone());
        }
        Ok(checkpoint)
    }
}

/// Maps a node's output onto (channel, value) pairs per its declared write set.
fn gather_writes(
    write_set: &[String],
    output: NodeOutput,
) -> Result<Vec<(String, Value)>, EngineError> {
    match output {
        NodeOutput::Single(value) => {
            if write_set.len() != 1 {
                return Err(EngineError::execution(
                    0,
                    format!(
                        "node returned a single value but its write set has {} channels",
                        write_set.len()
                    ),
                ));
            }
            Ok(vec![(write_set[0].clone(), value)])
        }
        NodeOutput::Multi(map) => {
            for channel in map.keys() {
                if !write_set.iter().any(|w| w == channel) {
                    return Err(EngineError::execution(
                        0,
                        format!("node wrote to channel '{channel}' outside its declared write set"),
                    ));
                }
            }
            Ok(map.into_iter().collect())
        }
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis()
}
