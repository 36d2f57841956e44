//! End-to-end demo: a one-node uppercase pipeline, run to quiescence and
//! checkpointed after its single step (SPEC_FULL.md §8 scenario 6).

use std::collections::HashMap;
use std::sync::Arc;

use pregel_channels::channel::LastValue;
use pregel_channels::checkpoint::{Checkpointer, InMemoryCheckpointer};
use pregel_channels::graph::GraphBuilder;
use pregel_channels::node::{Node, NodeInput, NodeOutput};
use pregel_channels::scheduler::{Scheduler, SchedulerConfig};
use pregel_channels::value::ValueType;

#[tokio::main]
async fn main() {
    let graph = GraphBuilder::new("uppercase-pipeline")
        .add_channel(Box::new(LastValue::new("input", ValueType::String)))
        .add_channel(Box::new(LastValue::new("output", ValueType::String)))
        .add_input_channel("input")
        .add_output_channel("output")
        .add_node(Node::new(
            "process",
            vec!["input".into()],
            vec!["input".into()],
            vec!["output".into()],
            |input: NodeInput| async move {
                let s = input.as_single().unwrap().as_str().unwrap().to_uppercase();
                Ok(NodeOutput::single(s))
            },
        ))
        .build()
        .expect("pipeline graph is valid");

    let checkpointer: Arc<dyn Checkpointer> = Arc::new(InMemoryCheckpointer::new());
    let config = SchedulerConfig::new().with_thread_id("demo");
    let mut scheduler = Scheduler::new(graph, config).with_checkpointer(checkpointer.clone());

    let mut input = HashMap::new();
    input.insert("input".to_string(), serde_json::json!("hello"));
    let output = scheduler.run(input).await.expect("run completes");
    println!("output: {:?}", output);

    let saved = checkpointer
        .load_latest("demo")
        .await
        .expect("checkpoint lookup succeeds")
        .expect("a checkpoint was saved");
    println!(
        "checkpoint {} at step {}",
        saved.checkpoint_id, saved.step_number
    );
}
