//! Nodes: a user function plus subscription metadata (SPEC_FULL.md §4.2).
//!
//! A `Node` is immutable after graph build and stateless from the engine's
//! perspective — any persistent state a node needs must live in a channel.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::scheduler::ExecutionContext;

/// Assembled read-set values passed into a node function. `Single` is used
/// when the node's read set has exactly one channel; `Multi` otherwise.
#[derive(Debug, Clone)]
pub enum NodeInput {
    Single(Value),
    Multi(HashMap<String, Value>),
}

impl NodeInput {
    /// Convenience accessor for single-channel nodes.
    pub fn as_single(&self) -> Option<&Value> {
        match self {
            NodeInput::Single(v) => Some(v),
            NodeInput::Multi(_) => None,
        }
    }

    /// Convenience accessor for multi-channel nodes.
    pub fn get(&self, channel: &str) -> Option<&Value> {
        match self {
            NodeInput::Multi(map) => map.get(channel),
            NodeInput::Single(_) => None,
        }
    }
}

/// Writes produced by a node function. `Single` targets the node's one
/// write-set channel; `Multi` must key exactly the declared write set (a
/// channel may be omitted to skip writing it this step).
#[derive(Debug, Clone)]
pub enum NodeOutput {
    Single(Value),
    Multi(HashMap<String, Value>),
}

impl NodeOutput {
    pub fn single(value: impl Into<Value>) -> Self {
        NodeOutput::Single(value.into())
    }

    pub fn multi(map: HashMap<String, Value>) -> Self {
        NodeOutput::Multi(map)
    }
}

/// A node's failure type: any boxed error, matching this codebase's use of
/// `Box<dyn std::error::Error + Send + Sync>` for user-supplied callbacks.
pub type NodeError = Box<dyn std::error::Error + Send + Sync>;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Internal call shape both node constructors unify behind, so the fire
/// phase never has to branch on which shape a node was built with.
#[async_trait]
trait NodeCall: Send + Sync {
    async fn call(
        &self,
        input: NodeInput,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError>;
}

struct PlainFn<F>(F);

#[async_trait]
impl<F, Fut> NodeCall for PlainFn<F>
where
    F: Fn(NodeInput) -> Fut + Send + Sync,
    Fut: Future<Output = Result<NodeOutput, NodeError>> + Send + 'static,
{
    async fn call(&self, input: NodeInput, _ctx: &ExecutionContext) -> Result<NodeOutput, NodeError> {
        (self.0)(input).await
    }
}

struct ContextFn<F>(F);

#[async_trait]
impl<F> NodeCall for ContextFn<F>
where
    F: for<'a> Fn(NodeInput, &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutput, NodeError>>
        + Send
        + Sync,
{
    async fn call(&self, input: NodeInput, ctx: &ExecutionContext) -> Result<NodeOutput, NodeError> {
        (self.0)(input, ctx).await
    }
}

/// A node: unique name, subscribe/read/write sets, and a user function.
///
/// Cheap to clone — the function itself is held behind an `Arc`, so cloning
/// a node out of the graph to fire it concurrently never duplicates state.
#[derive(Clone)]
pub struct Node {
    name: String,
    subscribe: Vec<String>,
    read: Vec<String>,
    write: Vec<String>,
    triggers_only: bool,
    call: Arc<dyn NodeCall>,
}

impl Node {
    /// Builds a node from a context-free function: `NodeInput -> Result<NodeOutput, NodeError>`.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        subscribe: Vec<String>,
        read: Vec<String>,
        write: Vec<String>,
        func: F,
    ) -> Self
    where
        F: Fn(NodeInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NodeOutput, NodeError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            subscribe,
            read,
            write,
            triggers_only: false,
            call: Arc::new(PlainFn(func)),
        }
    }

    /// Builds a node whose function additionally receives an `ExecutionContext`
    /// (read-only step number, thread id, cancellation signal, step history).
    pub fn with_context<F>(
        name: impl Into<String>,
        subscribe: Vec<String>,
        read: Vec<String>,
        write: Vec<String>,
        func: F,
    ) -> Self
    where
        F: for<'a> Fn(NodeInput, &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutput, NodeError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            subscribe,
            read,
            write,
            triggers_only: false,
            call: Arc::new(ContextFn(func)),
        }
    }

    /// Marks the node as subscribing without consuming the channel's value
    /// (the node still fires on activation, but the channel need not be in
    /// its read set).
    pub fn triggers_only(mut self, triggers_only: bool) -> Self {
        self.triggers_only = triggers_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self) -> &[String] {
        &self.subscribe
    }

    pub fn read_set(&self) -> &[String] {
        &self.read
    }

    pub fn write_set(&self) -> &[String] {
        &self.write
    }

    pub fn is_triggers_only(&self) -> bool {
        self.triggers_only
    }

    pub(crate) async fn fire(
        &self,
        input: NodeInput,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutput, NodeError> {
        self.call.call(input, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ExecutionContext;
    use serde_json::json;
    use tokio::sync::watch;

    fn test_ctx() -> ExecutionContext {
        let (_tx, rx) = watch::channel(false);
        ExecutionContext::new(0, "t".to_string(), rx, Vec::new())
    }

    /// **Scenario**: a plain (context-free) node transforms single input to single output.
    #[tokio::test]
    async fn plain_node_transforms_input() {
        let node = Node::new(
            "process",
            vec!["input".into()],
            vec!["input".into()],
            vec!["output".into()],
            |input: NodeInput| async move {
                let s = input.as_single().unwrap().as_str().unwrap().to_uppercase();
                Ok(NodeOutput::single(s))
            },
        );
        let out = node
            .fire(NodeInput::Single(json!("hello")), &test_ctx())
            .await
            .unwrap();
        match out {
            NodeOutput::Single(v) => assert_eq!(v, json!("HELLO")),
            _ => panic!("expected Single"),
        }
    }

    /// **Scenario**: a context-aware node can read the step number from ExecutionContext.
    #[tokio::test]
    async fn context_aware_node_reads_step() {
        let node = Node::with_context(
            "stamp",
            vec!["input".into()],
            vec!["input".into()],
            vec!["output".into()],
            |_input: NodeInput, ctx: &ExecutionContext| {
                Box::pin(async move { Ok(NodeOutput::single(json!(ctx.step()))) })
            },
        );
        let (_tx, rx) = watch::channel(false);
        let ctx = ExecutionContext::new(7, "t".to_string(), rx, Vec::new());
        let out = node.fire(NodeInput::Single(Value::Null), &ctx).await.unwrap();
        match out {
            NodeOutput::Single(v) => assert_eq!(v, json!(7)),
            _ => panic!("expected Single"),
        }
    }

    /// **Scenario**: a node function's error propagates out of fire().
    #[tokio::test]
    async fn node_error_propagates() {
        let node = Node::new(
            "fails",
            vec!["input".into()],
            vec!["input".into()],
            vec!["output".into()],
            |_input: NodeInput| async move {
                Err::<NodeOutput, NodeError>("boom".into())
            },
        );
        let err = node
            .fire(NodeInput::Single(Value::Null), &test_ctx())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
