//! # pregel-channels
//!
//! A stateful dataflow graph execution engine: typed channels, a Pregel-style
//! superstep scheduler, and a checkpoint protocol for resumable runs.
//!
//! ## Design Principles
//!
//! - **Channels, not shared state**: nodes never see each other directly —
//!   they read and write named [`channel::Channel`]s, and the graph's
//!   subscriber index decides who fires next.
//! - **Superstep execution**: every run proceeds activate -> fire -> commit,
//!   in lexicographic node-name order within a step, until quiescence, a
//!   halt signal, a step cap, or a timeout (SPEC_FULL.md §4.4).
//! - **Checkpoints are channel snapshots**: a run can be saved after any
//!   step and resumed later, conservatively reactivating every subscriber of
//!   a restored non-empty channel.
//!
//! ## Main Modules
//!
//! - [`channel`]: [`LastValue`], [`Topic`], [`BinaryOperator`], [`Ephemeral`] — the four channel variants.
//! - [`node`]: [`Node`] — a named function plus its subscribe/read/write sets.
//! - [`graph`]: [`Graph`], [`GraphBuilder`] — assemble and validate a topology.
//! - [`scheduler`]: [`Scheduler`], [`SchedulerConfig`], [`ExecutionContext`] — run supersteps.
//! - [`checkpoint`]: [`Checkpointer`], [`InMemoryCheckpointer`], [`Serializer`] — save/resume state.
//! - [`value`]: [`ValueType`] — the element-type contract channels validate against.
//! - [`error`]: [`EngineError`] — the one error type every fallible operation returns.
//!
//! ## Quick Start
//!
//! ```rust
//! use pregel_channels::channel::LastValue;
//! use pregel_channels::graph::GraphBuilder;
//! use pregel_channels::node::{Node, NodeInput, NodeOutput};
//! use pregel_channels::scheduler::{Scheduler, SchedulerConfig};
//! use pregel_channels::value::ValueType;
//! use std::collections::HashMap;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let graph = GraphBuilder::new("uppercase")
//!     .add_channel(Box::new(LastValue::new("input", ValueType::String)))
//!     .add_channel(Box::new(LastValue::new("output", ValueType::String)))
//!     .add_input_channel("input")
//!     .add_output_channel("output")
//!     .add_node(Node::new(
//!         "uppercase",
//!         vec!["input".into()],
//!         vec!["input".into()],
//!         vec!["output".into()],
//!         |input: NodeInput| async move {
//!             let s = input.as_single().unwrap().as_str().unwrap().to_uppercase();
//!             Ok(NodeOutput::single(s))
//!         },
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let mut scheduler = Scheduler::new(graph, SchedulerConfig::new());
//! let mut input = HashMap::new();
//! input.insert("input".to_string(), serde_json::json!("hello"));
//! let out = scheduler.run(input).await.unwrap();
//! assert_eq!(out["output"], serde_json::json!("HELLO"));
//! # }
//! ```
//!
//! ## Features
//!
//! - `tracing`: structured logging via the `tracing` crate instead of
//!   `eprintln!` fallbacks.

pub mod channel;
pub mod checkpoint;
pub mod error;
pub mod graph;
pub mod logging;
pub mod node;
pub mod scheduler;
pub mod value;

pub use channel::{BinaryOperator, Channel, Ephemeral, LastValue, Reducer, Topic};
pub use checkpoint::{
    CheckpointData, CheckpointMetadata, CheckpointSource, Checkpointer, InMemoryCheckpointer,
    JsonSerializer, Serializer,
};
pub use error::EngineError;
pub use graph::{validate, Graph, GraphBuilder, ValidationResult};
pub use node::{Node, NodeError, NodeInput, NodeOutput};
pub use scheduler::{ExecutionContext, Scheduler, SchedulerConfig, StepRecord};
pub use value::ValueType;
